//! Population-wide tool name resolution
//!
//! The exchange is the only lookup path from a tool name to a runnable
//! implementation. It is filled by explicit registration at startup or at
//! settlement (never by reflection or dynamic loading), and resolution
//! prefers the calling agent's own tools before the rest of the population.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::tool::Tool;

/// A resolved callee: who owns it and the implementation to run.
#[derive(Clone)]
pub struct ResolvedTool {
    pub owner: String,
    pub tool: Arc<dyn Tool>,
}

/// Name → (owner, implementation) table for the whole population.
///
/// Owners are agent ids or [`crate::context::SYSTEM_OWNER`] for built-ins.
/// A registry record with no entry here is a metadata-only tool: visible to
/// the metrics layer, not callable.
#[derive(Default)]
pub struct ToolExchange {
    by_owner: RwLock<BTreeMap<String, BTreeMap<String, Arc<dyn Tool>>>>,
}

impl ToolExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind (or rebind) an implementation under an owner.
    pub fn register(&self, owner: &str, tool: Arc<dyn Tool>) {
        let name = tool.spec().name.clone();
        debug!(owner, tool = %name, "bound tool implementation");
        self.write()
            .entry(owner.to_string())
            .or_default()
            .insert(name, tool);
    }

    /// Resolve a name for a calling agent: own tools first, then the rest of
    /// the population in stable owner order.
    pub fn resolve(&self, agent_id: &str, name: &str) -> Option<ResolvedTool> {
        let table = self.read();
        if let Some(tool) = table.get(agent_id).and_then(|own| own.get(name)) {
            return Some(ResolvedTool {
                owner: agent_id.to_string(),
                tool: Arc::clone(tool),
            });
        }
        for (owner, tools) in table.iter() {
            if owner == agent_id {
                continue;
            }
            if let Some(tool) = tools.get(name) {
                return Some(ResolvedTool {
                    owner: owner.clone(),
                    tool: Arc::clone(tool),
                });
            }
        }
        None
    }

    /// Whether any owner has bound this name.
    pub fn contains(&self, name: &str) -> bool {
        self.read().values().any(|tools| tools.contains_key(name))
    }

    /// All bound names, deduplicated, in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read()
            .values()
            .flat_map(|tools| tools.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, BTreeMap<String, Arc<dyn Tool>>>> {
        match self.by_owner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, BTreeMap<String, Arc<dyn Tool>>>> {
        match self.by_owner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
