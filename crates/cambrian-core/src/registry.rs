//! Per-agent tool registry
//!
//! One [`ToolRecord`] per tool the agent has created. The registry is
//! append-and-update: records are never deleted, adoption counts and test
//! fields only move forward, and external readers get immutable snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::complexity::ComplexityScore;

/// Registry consistency errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A tool with this name already exists for the agent
    #[error("tool '{name}' is already registered for agent '{agent}'")]
    DuplicateTool { agent: String, name: String },

    /// The named tool does not exist in this registry
    #[error("tool '{name}' is not registered for agent '{agent}'")]
    UnknownTool { agent: String, name: String },
}

/// Durable metadata for one created tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub name: String,
    pub description: String,
    /// Persisted source file name (`<name>.tool`)
    pub file: String,
    /// Stored source text, scored by the TCI analyzer
    pub source: String,
    /// Declared parameter schema
    pub parameters: Value,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub created_in_round: u32,
    /// Successful composed calls into this tool; never decremented
    pub adoption_count: u64,
    pub has_test: bool,
    pub test_file: Option<String>,
    pub test_results_file: Option<String>,
    pub test_passed: Option<bool>,
    pub last_tested: Option<DateTime<Utc>>,
    /// Whether the last test run itself executed (false when the test
    /// module failed to load)
    pub test_execution_success: Option<bool>,
    /// Runner failure text from the last run that never executed
    #[serde(default)]
    pub last_test_error: Option<String>,
    pub complexity: Option<ComplexityScore>,
}

impl ToolRecord {
    pub fn new(name: &str, description: &str, created_by: &str, round: u32) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            file: format!("{name}.tool"),
            source: String::new(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            created_in_round: round,
            adoption_count: 0,
            has_test: false,
            test_file: None,
            test_results_file: None,
            test_passed: None,
            last_tested: None,
            test_execution_success: None,
            last_test_error: None,
            complexity: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Non-blank source lines, the LOC figure used by the metrics layer.
    pub fn lines_of_code(&self) -> usize {
        self.source.lines().filter(|l| !l.trim().is_empty()).count()
    }
}

/// An agent's durable index of its own created tools.
///
/// Single-writer by construction: only the owning agent's turn mutates it.
/// Readers (metrics, composition tracker) work from [`ToolRegistry::snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRegistry {
    agent_id: String,
    tools: BTreeMap<String, ToolRecord>,
}

impl ToolRegistry {
    pub fn new(agent_id: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            tools: BTreeMap::new(),
        }
    }

    /// Rebuild a registry from persisted records, keeping their adoption and
    /// test history (unlike [`ToolRegistry::register`], which resets it).
    pub fn hydrate(agent_id: &str, records: Vec<ToolRecord>) -> Self {
        let tools = records.into_iter().map(|r| (r.name.clone(), r)).collect();
        Self {
            agent_id: agent_id.to_string(),
            tools,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Insert a new record. Adoption and test fields are reset to their
    /// initial state regardless of what the caller supplied.
    pub fn register(&mut self, mut record: ToolRecord) -> Result<(), RegistryError> {
        if self.tools.contains_key(&record.name) {
            return Err(RegistryError::DuplicateTool {
                agent: self.agent_id.clone(),
                name: record.name.clone(),
            });
        }
        record.adoption_count = 0;
        record.has_test = false;
        record.test_passed = None;
        debug!(agent = %self.agent_id, tool = %record.name, "registered tool");
        self.tools.insert(record.name.clone(), record);
        Ok(())
    }

    /// Record the outcome of a test run for the named tool. `error` carries
    /// the runner's failure text when the run never executed.
    pub fn record_test_result(
        &mut self,
        name: &str,
        passed: bool,
        executed: bool,
        timestamp: DateTime<Utc>,
        error: Option<String>,
    ) -> Result<(), RegistryError> {
        let record = self.get_mut(name)?;
        record.has_test = true;
        record.test_passed = Some(passed);
        record.test_execution_success = Some(executed);
        record.last_tested = Some(timestamp);
        record.last_test_error = error;
        record.test_file = Some(format!("_tests/{name}_test.json"));
        record.test_results_file = Some(format!("_testResults/{name}_results.json"));
        Ok(())
    }

    /// Credit one adoption to the named tool.
    ///
    /// Returns `false` for an unknown callee: composition against an
    /// untracked tool is logged and ignored, never fatal to the round.
    pub fn record_composition(&mut self, callee: &str) -> bool {
        match self.tools.get_mut(callee) {
            Some(record) => {
                record.adoption_count += 1;
                true
            }
            None => {
                warn!(
                    agent = %self.agent_id,
                    callee,
                    "composition credited against unknown tool; ignoring"
                );
                false
            }
        }
    }

    /// Replace the complexity score. Idempotent for identical input.
    pub fn update_complexity(
        &mut self,
        name: &str,
        score: ComplexityScore,
    ) -> Result<(), RegistryError> {
        let record = self.get_mut(name)?;
        record.complexity = Some(score);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolRecord> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Immutable copy of all records, for the metrics aggregator and stores.
    pub fn snapshot(&self) -> Vec<ToolRecord> {
        self.tools.values().cloned().collect()
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut ToolRecord, RegistryError> {
        let agent = self.agent_id.clone();
        self.tools
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownTool {
                agent,
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(name: &str) -> ToolRegistry {
        let mut reg = ToolRegistry::new("agent_1");
        reg.register(ToolRecord::new(name, "a tool", "agent_1", 1))
            .unwrap();
        reg
    }

    #[test]
    fn register_resets_volatile_fields() {
        let mut reg = ToolRegistry::new("agent_1");
        let mut record = ToolRecord::new("adder", "adds numbers", "agent_1", 2);
        record.adoption_count = 9;
        record.has_test = true;
        record.test_passed = Some(true);
        reg.register(record).unwrap();

        let stored = reg.get("adder").unwrap();
        assert_eq!(stored.adoption_count, 0);
        assert!(!stored.has_test);
        assert_eq!(stored.test_passed, None);
    }

    #[test]
    fn duplicate_registration_leaves_original_intact() {
        let mut reg = registry_with("adder");
        reg.record_composition("adder");

        let dup = ToolRecord::new("adder", "a different adder", "agent_1", 3);
        let err = reg.register(dup).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool { .. }));

        let stored = reg.get("adder").unwrap();
        assert_eq!(stored.description, "a tool");
        assert_eq!(stored.adoption_count, 1);
    }

    #[test]
    fn composition_increments_exactly_one() {
        let mut reg = registry_with("adder");
        reg.register(ToolRecord::new("sorter", "sorts", "agent_1", 1))
            .unwrap();

        assert!(reg.record_composition("adder"));
        assert_eq!(reg.get("adder").unwrap().adoption_count, 1);
        assert_eq!(reg.get("sorter").unwrap().adoption_count, 0);
    }

    #[test]
    fn unknown_composition_is_noop() {
        let mut reg = registry_with("adder");
        assert!(!reg.record_composition("ghost"));
        assert_eq!(reg.get("adder").unwrap().adoption_count, 0);
    }

    #[test]
    fn test_result_updates_fields() {
        let mut reg = registry_with("adder");
        let now = Utc::now();
        reg.record_test_result("adder", true, true, now, None).unwrap();

        let record = reg.get("adder").unwrap();
        assert!(record.has_test);
        assert_eq!(record.test_passed, Some(true));
        assert_eq!(record.last_tested, Some(now));
        assert_eq!(record.test_execution_success, Some(true));
        assert_eq!(record.last_test_error, None);
    }

    #[test]
    fn failed_run_keeps_its_error_until_the_next_pass() {
        let mut reg = registry_with("adder");
        reg.record_test_result("adder", false, false, Utc::now(), Some("bad module".into()))
            .unwrap();
        assert_eq!(reg.get("adder").unwrap().last_test_error.as_deref(), Some("bad module"));

        reg.record_test_result("adder", true, true, Utc::now(), None).unwrap();
        assert_eq!(reg.get("adder").unwrap().last_test_error, None);
    }

    #[test]
    fn test_result_for_unknown_tool_errors() {
        let mut reg = registry_with("adder");
        let err = reg
            .record_test_result("ghost", true, true, Utc::now(), None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTool { .. }));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut reg = registry_with("adder");
        let snap = reg.snapshot();
        reg.record_composition("adder");
        assert_eq!(snap[0].adoption_count, 0);
        assert_eq!(reg.get("adder").unwrap().adoption_count, 1);
    }
}
