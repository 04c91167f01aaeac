//! Bridge from external tool-test reports into registry test fields
//!
//! Tool tests are run by an external verifier which leaves one JSON report
//! per tool. The bridge loads the report and feeds the registry: a report
//! that cannot be loaded still lands as a failed, non-executed test run —
//! never silently dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use cambrian_core::registry::{RegistryError, ToolRegistry};

#[derive(Debug, Error)]
pub enum TestRunError {
    #[error("no test report for tool '{0}'")]
    NotFound(String),

    #[error("failed to read test report: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed test report: {0}")]
    Malformed(String),
}

/// One test case inside a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub test_name: String,
    pub passed: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// The full report the external verifier writes per tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub tool_name: String,
    pub timestamp: DateTime<Utc>,
    pub tests: Vec<TestCase>,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub all_passed: bool,
}

/// Source of test reports.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, tool_name: &str) -> Result<TestReport, TestRunError>;
}

/// Reads `<dir>/<tool>_results.json` reports.
pub struct JsonFileRunner {
    dir: PathBuf,
}

impl JsonFileRunner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TestRunner for JsonFileRunner {
    async fn run(&self, tool_name: &str) -> Result<TestReport, TestRunError> {
        let path = self.dir.join(format!("{tool_name}_results.json"));
        let text = match fs::read_to_string(&path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TestRunError::NotFound(tool_name.to_string()));
            }
            Err(e) => return Err(e.into()),
            Ok(text) => text,
        };
        serde_json::from_str(&text).map_err(|e| TestRunError::Malformed(e.to_string()))
    }
}

/// Run the tool's tests and record the result on its registry.
///
/// A runner failure is recorded as `test_passed = false` with
/// `test_execution_success = false` and the runner's error text kept on the
/// record; only an unknown tool name is an error.
pub async fn run_and_record(
    runner: &dyn TestRunner,
    registry: &mut ToolRegistry,
    tool_name: &str,
) -> Result<(), RegistryError> {
    match runner.run(tool_name).await {
        Ok(report) => {
            info!(
                tool = tool_name,
                passed = report.passed_tests,
                failed = report.failed_tests,
                all_passed = report.all_passed,
                "test report recorded"
            );
            registry.record_test_result(tool_name, report.all_passed, true, report.timestamp, None)
        }
        Err(e) => {
            warn!(tool = tool_name, error = %e, "test run failed to execute");
            registry.record_test_result(tool_name, false, false, Utc::now(), Some(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cambrian_core::registry::ToolRecord;
    use serde_json::json;

    fn registry_with(name: &str) -> ToolRegistry {
        let mut registry = ToolRegistry::new("agent_1");
        registry
            .register(ToolRecord::new(name, "a tool", "agent_1", 1))
            .unwrap();
        registry
    }

    fn write_report(dir: &std::path::Path, tool: &str, all_passed: bool) {
        let report = json!({
            "tool_name": tool,
            "timestamp": Utc::now(),
            "tests": [
                {"test_name": "basic", "passed": all_passed},
                {"test_name": "edge", "passed": true},
            ],
            "total_tests": 2,
            "passed_tests": if all_passed { 2 } else { 1 },
            "failed_tests": if all_passed { 0 } else { 1 },
            "all_passed": all_passed,
        });
        std::fs::write(
            dir.join(format!("{tool}_results.json")),
            report.to_string(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn passing_report_marks_tool_tested() {
        let dir = tempfile::tempdir().unwrap();
        write_report(dir.path(), "square", true);
        let runner = JsonFileRunner::new(dir.path());
        let mut registry = registry_with("square");

        run_and_record(&runner, &mut registry, "square").await.unwrap();
        let record = registry.get("square").unwrap();
        assert!(record.has_test);
        assert_eq!(record.test_passed, Some(true));
        assert_eq!(record.test_execution_success, Some(true));
    }

    #[tokio::test]
    async fn failing_report_is_recorded_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        write_report(dir.path(), "square", false);
        let runner = JsonFileRunner::new(dir.path());
        let mut registry = registry_with("square");

        run_and_record(&runner, &mut registry, "square").await.unwrap();
        assert_eq!(registry.get("square").unwrap().test_passed, Some(false));
        assert_eq!(
            registry.get("square").unwrap().test_execution_success,
            Some(true)
        );
    }

    #[tokio::test]
    async fn missing_report_is_a_non_executed_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = JsonFileRunner::new(dir.path());
        let mut registry = registry_with("square");

        run_and_record(&runner, &mut registry, "square").await.unwrap();
        let record = registry.get("square").unwrap();
        assert!(record.has_test);
        assert_eq!(record.test_passed, Some(false));
        assert_eq!(record.test_execution_success, Some(false));
        // The runner's complaint survives on the record.
        assert!(record.last_test_error.as_deref().unwrap().contains("no test report"));
    }

    #[tokio::test]
    async fn malformed_report_surfaces_as_runner_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("square_results.json"), "not json").unwrap();
        let runner = JsonFileRunner::new(dir.path());
        let err = runner.run("square").await.unwrap_err();
        assert!(matches!(err, TestRunError::Malformed(_)));
    }
}
