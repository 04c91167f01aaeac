//! Composition tracking and the execution context
//!
//! Every running tool receives an [`ExecutionContext`] and makes nested calls
//! through [`ExecutionContext::call_tool`]. The context enforces the depth
//! bound and the cycle check, resolves callees through the exchange, and
//! buffers every observable effect (call edges, adoption credits, utility
//! rewards) until the round settles. Nothing is committed to any registry
//! from inside a call tree; the orchestrator drains the buffer at its single
//! commit point, so an aborted round leaves registries untouched.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::exchange::ToolExchange;
use crate::tool::{run_tool, Outcome, ParamMap};

/// System-owned tools never receive utility rewards.
pub const SYSTEM_OWNER: &str = "system";

/// One observed tool-to-tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
    pub round: u32,
    pub success: bool,
}

impl CallEdge {
    pub fn new(caller: &str, callee: &str, round: u32, success: bool) -> Self {
        Self {
            caller: caller.to_string(),
            callee: callee.to_string(),
            round,
            success,
        }
    }
}

/// Accumulated composition history, the input to compositional scoring.
///
/// Failed edges are kept for the record but only successful ones contribute
/// to fan-out and reachable depth.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CallGraph {
    edges: Vec<CallEdge>,
    adjacency: HashMap<String, BTreeSet<String>>,
}

impl CallGraph {
    pub fn add_edge(&mut self, edge: CallEdge) {
        if edge.success {
            self.adjacency
                .entry(edge.caller.clone())
                .or_default()
                .insert(edge.callee.clone());
        }
        self.edges.push(edge);
    }

    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    /// Distinct tools this tool has successfully called.
    pub fn fan_out(&self, name: &str) -> usize {
        self.adjacency.get(name).map_or(0, BTreeSet::len)
    }

    /// Longest successful call chain reachable from this tool.
    pub fn max_depth_from(&self, name: &str) -> usize {
        let mut visiting = HashSet::new();
        self.depth_walk(name, &mut visiting)
    }

    fn depth_walk(&self, name: &str, visiting: &mut HashSet<String>) -> usize {
        if !visiting.insert(name.to_string()) {
            return 0;
        }
        let mut depth = 0;
        if let Some(callees) = self.adjacency.get(name) {
            for c in callees {
                // A back-edge to a tool already on the walk is not a
                // longer chain; skip it rather than count the hop.
                if visiting.contains(c.as_str()) {
                    continue;
                }
                depth = depth.max(1 + self.depth_walk(c, visiting));
            }
        }
        visiting.remove(name);
        depth
    }
}

/// Effects buffered during a call tree, drained at settlement.
#[derive(Debug, Default, Clone)]
pub struct ContextEffects {
    /// Every call made through the context, in completion order
    pub edges: Vec<CallEdge>,
    /// `(owner, callee)` adoption credits, one per successful composed call
    pub adoptions: Vec<(String, String)>,
    /// Energy owed to tool creators for others using their tools
    pub utility_rewards: HashMap<String, f64>,
}

/// Per-invocation execution context handed to running tools.
///
/// Cloning is shallow: children share the root's effect buffer, so a nested
/// call's effects land in the same drain.
#[derive(Clone)]
pub struct ExecutionContext {
    exchange: Arc<ToolExchange>,
    agent_id: String,
    round: u32,
    max_depth: usize,
    call_timeout: Duration,
    /// Tool currently executing in this frame; `None` at the agent's root
    current_tool: Option<String>,
    /// Names of every tool on the active call path, root first
    call_stack: Vec<String>,
    effects: Arc<Mutex<ContextEffects>>,
}

impl ExecutionContext {
    /// Context for an agent's direct action, before any tool is on the stack.
    pub fn root(
        exchange: Arc<ToolExchange>,
        agent_id: &str,
        round: u32,
        max_depth: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            exchange,
            agent_id: agent_id.to_string(),
            round,
            max_depth,
            call_timeout,
            current_tool: None,
            call_stack: Vec::new(),
            effects: Arc::new(Mutex::new(ContextEffects::default())),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn depth(&self) -> usize {
        self.call_stack.len()
    }

    fn child(&self, tool: &str) -> Self {
        let mut next = self.clone();
        next.current_tool = Some(tool.to_string());
        next.call_stack.push(tool.to_string());
        next
    }

    fn effects_guard(&self) -> MutexGuard<'_, ContextEffects> {
        // A poisoned buffer only means a tool panicked mid-record; the
        // partial effects are still the ones to settle.
        match self.effects.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Drain all buffered effects. Called once, at settlement, on the root.
    pub fn take_effects(&self) -> ContextEffects {
        std::mem::take(&mut *self.effects_guard())
    }

    /// Invoke a tool by name from inside (or at the root of) a call tree.
    ///
    /// Guards fire in order: depth bound, then cycle check, then resolution.
    /// A guard failure fails only this innermost call; completed shallower
    /// calls keep their recorded effects. The callee's failure is returned
    /// as-is, never retried and never masked.
    pub fn call_tool<'a>(&'a self, name: &'a str, params: &'a ParamMap) -> BoxFuture<'a, Outcome> {
        async move {
            if self.call_stack.len() >= self.max_depth {
                warn!(
                    agent = %self.agent_id,
                    tool = name,
                    depth = self.call_stack.len(),
                    "composition depth exceeded"
                );
                return Outcome::failure(format!(
                    "composition depth exceeded calling '{}' (max {})",
                    name, self.max_depth
                ));
            }
            if self.call_stack.iter().any(|t| t == name) {
                warn!(agent = %self.agent_id, tool = name, "circular tool dependency");
                return Outcome::failure(format!(
                    "circular dependency: '{}' is already on the call stack",
                    name
                ));
            }
            let Some(resolved) = self.exchange.resolve(&self.agent_id, name) else {
                return Outcome::failure(format!("tool '{}' not found", name));
            };

            let frame = self.child(name);
            let outcome = run_tool(resolved.tool.as_ref(), params, &frame, self.call_timeout).await;

            debug!(
                agent = %self.agent_id,
                tool = name,
                owner = %resolved.owner,
                success = outcome.success,
                "tool call completed"
            );
            self.record(name, &resolved.owner, &outcome);
            outcome
        }
        .boxed()
    }

    fn record(&self, callee: &str, owner: &str, outcome: &Outcome) {
        let mut effects = self.effects_guard();
        if let Some(caller) = &self.current_tool {
            effects
                .edges
                .push(CallEdge::new(caller, callee, self.round, outcome.success));
            if outcome.success {
                effects
                    .adoptions
                    .push((owner.to_string(), callee.to_string()));
            }
        }
        if outcome.success && owner != self.agent_id && owner != SYSTEM_OWNER {
            let reward = (outcome.energy_delta / 3.0).floor().max(1.0);
            *effects.utility_rewards.entry(owner.to_string()).or_insert(0.0) += reward;
        }
    }
}
