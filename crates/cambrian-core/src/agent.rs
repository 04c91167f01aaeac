//! Agents and their energy accounting

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::registry::ToolRegistry;

/// One simulated agent: identity, energy balance, and its tool registry.
///
/// Agents are created at simulation start and never destroyed mid-run; an
/// agent at the energy floor still takes its turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub energy: f64,
    /// Last round this agent acted in
    pub round: u32,
    pub registry: ToolRegistry,
}

impl Agent {
    pub fn new(id: &str, initial_energy: f64) -> Self {
        Self {
            id: id.to_string(),
            energy: initial_energy,
            round: 0,
            registry: ToolRegistry::new(id),
        }
    }

    /// Apply a signed energy delta, clamping the balance at `floor`.
    /// Returns the balance after clamping.
    pub fn apply_energy(&mut self, delta: f64, floor: f64) -> f64 {
        let before = self.energy;
        self.energy = (self.energy + delta).max(floor);
        debug!(
            agent = %self.id,
            delta,
            before,
            after = self.energy,
            "energy settled"
        );
        self.energy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_agent_has_empty_registry() {
        let agent = Agent::new("agent_1", 20.0);
        assert_eq!(agent.energy, 20.0);
        assert!(agent.registry.is_empty());
        assert_eq!(agent.registry.agent_id(), "agent_1");
    }

    #[test]
    fn energy_clamps_at_floor() {
        let mut agent = Agent::new("agent_1", 3.0);
        assert_eq!(agent.apply_energy(-10.0, 0.0), 0.0);
        assert_eq!(agent.apply_energy(4.5, 0.0), 4.5);
    }

    proptest! {
        #[test]
        fn energy_never_drops_below_floor(
            start in 0.0f64..1000.0,
            deltas in proptest::collection::vec(-50.0f64..50.0, 0..64),
            floor in 0.0f64..10.0,
        ) {
            let mut agent = Agent::new("agent_p", start.max(floor));
            for delta in deltas {
                let after = agent.apply_energy(delta, floor);
                prop_assert!(after >= floor);
            }
        }
    }
}
