//! Round orchestration for Cambrian.
//!
//! The [`orchestrator`] drives each agent's turn through the
//! solicit/parse/act/settle state machine; the [`test_bridge`] feeds external
//! tool-test reports into registries; the [`toolkit`] is the plugin surface
//! binding created tools to runnable implementations.

pub mod orchestrator;
pub mod test_bridge;
pub mod toolkit;

pub use orchestrator::{Orchestrator, SimulationConfig};
pub use test_bridge::{run_and_record, JsonFileRunner, TestCase, TestReport, TestRunError, TestRunner};
pub use toolkit::ToolKit;
