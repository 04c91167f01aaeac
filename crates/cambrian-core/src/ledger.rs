//! Append-only round ledger
//!
//! One [`RoundRecord`] per completed round, one [`RoundEntry`] per agent
//! turn. The ledger is the metrics aggregator's second input next to the
//! registry snapshots; nothing ever rewrites a recorded round.

use serde::{Deserialize, Serialize};

/// How an agent's turn resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The provider timed out or failed; the agent said nothing
    Silent,
    /// The agent spoke but no actionable intent was parsed
    NoAction,
    /// A tool ran to a successful outcome
    Acted { tool: String },
    /// A tool ran and failed
    Failed { tool: String },
}

/// One agent's turn within a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEntry {
    pub agent_id: String,
    pub outcome: ActionOutcome,
    pub energy_delta: f64,
}

/// All turns of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub entries: Vec<RoundEntry>,
}

impl RoundRecord {
    pub fn new(round: u32) -> Self {
        Self {
            round,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, agent_id: &str, outcome: ActionOutcome, energy_delta: f64) {
        self.entries.push(RoundEntry {
            agent_id: agent_id.to_string(),
            outcome,
            energy_delta,
        });
    }
}

/// The full run history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundLedger {
    records: Vec<RoundRecord>,
}

impl RoundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: RoundRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Turns for one agent across the whole run, in round order.
    pub fn entries_for(&self, agent_id: &str) -> Vec<&RoundEntry> {
        self.records
            .iter()
            .flat_map(|r| r.entries.iter())
            .filter(|e| e.agent_id == agent_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_accumulates_rounds() {
        let mut ledger = RoundLedger::new();
        let mut round = RoundRecord::new(1);
        round.push("agent_1", ActionOutcome::Acted { tool: "square".into() }, 12.0);
        round.push("agent_2", ActionOutcome::Silent, 0.0);
        ledger.append(round);

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries_for("agent_1").len(), 1);
        assert_eq!(ledger.entries_for("agent_2")[0].outcome, ActionOutcome::Silent);
    }

    #[test]
    fn outcome_round_trips_through_json() {
        let entry = RoundEntry {
            agent_id: "agent_1".into(),
            outcome: ActionOutcome::Failed { tool: "sorter".into() },
            energy_delta: 0.0,
        };
        let text = serde_json::to_string(&entry).unwrap();
        assert!(text.contains("\"kind\":\"failed\""));
        let back: RoundEntry = serde_json::from_str(&text).unwrap();
        assert_eq!(back, entry);
    }
}
