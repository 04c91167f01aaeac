//! Core types for the Cambrian tool economy.
//!
//! This crate holds everything the rest of the workspace builds on:
//!
//! - [`tool`] — the tool contract, outcome normalization, and the adapter
//!   that contains panics and enforces per-call timeouts
//! - [`registry`] — per-agent registries of created tools
//! - [`complexity`] — the static Tool Complexity Index analyzer
//! - [`context`] — composition tracking with depth/cycle guards and
//!   settlement-buffered effects
//! - [`exchange`] — population-wide tool name resolution
//! - [`agent`] / [`ledger`] — agents, energy accounting, round history

pub mod agent;
pub mod complexity;
pub mod context;
pub mod exchange;
pub mod ledger;
pub mod registry;
pub mod tool;

pub use agent::Agent;
pub use complexity::{
    analyze_dir, analyze_source, AnalysisError, BatchReport, ComplexityScore, TciWeights,
};
pub use context::{CallEdge, CallGraph, ContextEffects, ExecutionContext, SYSTEM_OWNER};
pub use exchange::{ResolvedTool, ToolExchange};
pub use ledger::{ActionOutcome, RoundEntry, RoundLedger, RoundRecord};
pub use registry::{RegistryError, ToolRecord, ToolRegistry};
pub use tool::{run_tool, Outcome, ParamMap, Tool, ToolSpec};
