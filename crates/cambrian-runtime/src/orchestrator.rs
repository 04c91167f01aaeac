//! Turn-based round orchestration
//!
//! Each agent's turn walks `Soliciting → Parsing → Acting → Settling`.
//! Soliciting is the only suspension point; a provider timeout or failure
//! degrades to a silent turn. Settling is the single commit point: energy,
//! call edges, adoption credits, utility rewards, and tool creation all land
//! there and nowhere else, so a turn abandoned in any earlier phase leaves
//! every registry untouched. Nothing terminates the run except the
//! configured round count.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use cambrian_core::agent::Agent;
use cambrian_core::complexity::{analyze_source, TciWeights};
use cambrian_core::context::{CallGraph, ExecutionContext};
use cambrian_core::exchange::ToolExchange;
use cambrian_core::ledger::{ActionOutcome, RoundLedger, RoundRecord};
use cambrian_core::registry::{RegistryError, ToolRecord};
use cambrian_core::tool::{Outcome, Tool, ToolSpec};
use cambrian_llm::intent::ActionIntent;
use cambrian_llm::provider::{TalkContext, TalkProvider};

use crate::toolkit::ToolKit;

const RECENT_TALKS: usize = 6;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub rounds: u32,
    pub max_call_depth: usize,
    pub solicit_timeout: Duration,
    /// Per-call timeout inside a call tree
    pub act_timeout: Duration,
    /// Intents below this confidence are dropped as `NoAction`
    pub confidence_threshold: f64,
    pub energy_floor: f64,
    pub initial_energy: f64,
    pub tci_weights: TciWeights,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rounds: 10,
            max_call_depth: 5,
            solicit_timeout: Duration::from_secs(10),
            act_timeout: Duration::from_secs(30),
            confidence_threshold: 0.5,
            energy_floor: 0.0,
            initial_energy: 20.0,
            tci_weights: TciWeights::default(),
        }
    }
}

/// One turn's progress through the state machine.
enum Phase {
    Soliciting,
    Parsing {
        talk: String,
    },
    Acting {
        intent: ActionIntent,
    },
    Settling {
        outcome: ActionOutcome,
        result: Option<Outcome>,
        ctx: Option<ExecutionContext>,
    },
}

/// Drives the population through rounds, one agent turn at a time.
pub struct Orchestrator {
    config: SimulationConfig,
    provider: Arc<dyn TalkProvider>,
    exchange: Arc<ToolExchange>,
    toolkit: ToolKit,
    agents: Vec<Agent>,
    graph: CallGraph,
    ledger: RoundLedger,
    recent: VecDeque<String>,
}

impl Orchestrator {
    pub fn new(config: SimulationConfig, provider: Arc<dyn TalkProvider>) -> Self {
        Self {
            config,
            provider,
            exchange: Arc::new(ToolExchange::new()),
            toolkit: ToolKit::with_builtins(),
            agents: Vec::new(),
            graph: CallGraph::default(),
            ledger: RoundLedger::new(),
            recent: VecDeque::new(),
        }
    }

    pub fn with_toolkit(mut self, toolkit: ToolKit) -> Self {
        self.toolkit = toolkit;
        self
    }

    pub fn add_agent(&mut self, id: &str) {
        info!(agent = id, energy = self.config.initial_energy, "agent joined");
        self.agents.push(Agent::new(id, self.config.initial_energy));
    }

    /// Seed an agent with an existing tool: record in its registry and,
    /// when an implementation is given, bind it on the exchange.
    pub fn install_tool(
        &mut self,
        agent_id: &str,
        record: ToolRecord,
        implementation: Option<Arc<dyn Tool>>,
    ) -> Result<(), RegistryError> {
        let name = record.name.clone();
        let agent = self
            .agents
            .iter_mut()
            .find(|a| a.id == agent_id)
            .ok_or_else(|| RegistryError::UnknownTool {
                agent: agent_id.to_string(),
                name: name.clone(),
            })?;
        agent.registry.register(record)?;
        if let Some(tool) = implementation {
            self.exchange.register(agent_id, tool);
        }
        Ok(())
    }

    /// Bind a system-owned built-in on the exchange, outside any registry.
    pub fn install_builtin(&mut self, tool: Arc<dyn Tool>) {
        self.exchange.register(cambrian_core::context::SYSTEM_OWNER, tool);
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn graph(&self) -> &CallGraph {
        &self.graph
    }

    pub fn ledger(&self) -> &RoundLedger {
        &self.ledger
    }

    pub fn exchange(&self) -> Arc<ToolExchange> {
        Arc::clone(&self.exchange)
    }

    /// One registry snapshot per agent, in agent order.
    pub fn registry_snapshots(&self) -> Vec<Vec<ToolRecord>> {
        self.agents.iter().map(|a| a.registry.snapshot()).collect()
    }

    /// Run all configured rounds.
    pub async fn run(&mut self) -> &RoundLedger {
        for round in 1..=self.config.rounds {
            self.run_round(round).await;
        }
        &self.ledger
    }

    pub async fn run_round(&mut self, round: u32) {
        info!(round, agents = self.agents.len(), "round started");
        let mut record = RoundRecord::new(round);
        for idx in 0..self.agents.len() {
            let agent_id = self.agents[idx].id.clone();
            let (outcome, delta) = self.take_turn(idx, round).await;
            debug!(round, agent = %agent_id, ?outcome, delta, "turn settled");
            record.push(&agent_id, outcome, delta);
        }
        self.ledger.append(record);
    }

    async fn take_turn(&mut self, idx: usize, round: u32) -> (ActionOutcome, f64) {
        let mut phase = Phase::Soliciting;
        loop {
            phase = match phase {
                Phase::Soliciting => self.solicit(idx, round).await,
                Phase::Parsing { talk } => self.parse(&talk).await,
                Phase::Acting { intent } => self.act(idx, round, intent).await,
                Phase::Settling {
                    outcome,
                    result,
                    ctx,
                } => return self.settle(idx, round, outcome, result, ctx),
            };
        }
    }

    async fn solicit(&mut self, idx: usize, round: u32) -> Phase {
        let agent = &self.agents[idx];
        let talk_ctx = TalkContext {
            energy: agent.energy,
            round,
            tool_names: self.exchange.names(),
            recent: self.recent.iter().cloned().collect(),
        };
        let solicited = timeout(
            self.config.solicit_timeout,
            self.provider.generate_talk(&agent.id, &talk_ctx),
        )
        .await;
        match solicited {
            Ok(Ok(talk)) => {
                self.remember(&talk);
                Phase::Parsing { talk }
            }
            Ok(Err(e)) => {
                warn!(agent = %agent.id, error = %e, "provider failed; turn is silent");
                Self::settling(ActionOutcome::Silent)
            }
            Err(_) => {
                warn!(agent = %agent.id, "solicit timed out; turn is silent");
                Self::settling(ActionOutcome::Silent)
            }
        }
    }

    async fn parse(&mut self, talk: &str) -> Phase {
        let intent = match self.provider.parse_intent(talk).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, "intent parsing failed");
                return Self::settling(ActionOutcome::NoAction);
            }
        };
        let Some(tool) = intent.tool_name.as_deref() else {
            return Self::settling(ActionOutcome::NoAction);
        };
        if intent.confidence < self.config.confidence_threshold {
            debug!(tool, confidence = intent.confidence, "intent below threshold");
            return Self::settling(ActionOutcome::NoAction);
        }
        if !self.exchange.contains(tool) {
            warn!(tool, "intent names an unknown tool");
            return Self::settling(ActionOutcome::NoAction);
        }
        Phase::Acting { intent }
    }

    async fn act(&mut self, idx: usize, round: u32, intent: ActionIntent) -> Phase {
        let Some(tool) = intent.tool_name.clone() else {
            return Self::settling(ActionOutcome::NoAction);
        };
        let ctx = ExecutionContext::root(
            Arc::clone(&self.exchange),
            &self.agents[idx].id,
            round,
            self.config.max_call_depth,
            self.config.act_timeout,
        );
        let result = ctx.call_tool(&tool, &intent.parameters).await;
        let outcome = if result.success {
            ActionOutcome::Acted { tool }
        } else {
            ActionOutcome::Failed { tool }
        };
        Phase::Settling {
            outcome,
            result: Some(result),
            ctx: Some(ctx),
        }
    }

    /// The single commit point for a turn.
    fn settle(
        &mut self,
        idx: usize,
        round: u32,
        outcome: ActionOutcome,
        result: Option<Outcome>,
        ctx: Option<ExecutionContext>,
    ) -> (ActionOutcome, f64) {
        let floor = self.config.energy_floor;
        let delta = result.as_ref().map_or(0.0, |o| o.energy_delta);
        self.agents[idx].apply_energy(delta, floor);
        self.agents[idx].round = round;

        if let Some(ctx) = ctx {
            let acting_agent = self.agents[idx].id.clone();
            let effects = ctx.take_effects();
            let callers: BTreeSet<String> =
                effects.edges.iter().map(|e| e.caller.clone()).collect();
            for edge in effects.edges {
                self.graph.add_edge(edge);
            }
            for (owner, callee) in effects.adoptions {
                if let Some(agent) = self.agents.iter_mut().find(|a| a.id == owner) {
                    agent.registry.record_composition(&callee);
                }
            }
            for (owner, reward) in effects.utility_rewards {
                if let Some(agent) = self.agents.iter_mut().find(|a| a.id == owner) {
                    info!(creator = %owner, reward, "utility reward for tool usage");
                    agent.apply_energy(reward, floor);
                }
            }
            for caller in callers {
                // The record to refresh belongs to whoever the acting agent's
                // call resolved to, not the first agent holding that name.
                if let Some(resolved) = self.exchange.resolve(&acting_agent, &caller) {
                    self.rescore(&resolved.owner, &caller);
                }
            }
        }

        if let Some(result) = &result {
            if result.success {
                if let Some(created) = result.payload.get("created_tool").and_then(Value::as_object)
                {
                    self.settle_created_tool(idx, round, created);
                }
            }
        }

        (outcome, delta)
    }

    /// Register, score, and bind a tool created during this turn.
    fn settle_created_tool(&mut self, idx: usize, round: u32, created: &Map<String, Value>) {
        let agent_id = self.agents[idx].id.clone();
        let Some(name) = created.get("name").and_then(Value::as_str) else {
            warn!(agent = %agent_id, "created tool has no name; skipping");
            return;
        };
        let description = created
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let source = created
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let parameters = created
            .get("parameters")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({"type": "object", "properties": {}}));

        let record = ToolRecord::new(name, description, &agent_id, round)
            .with_source(source)
            .with_parameters(parameters.clone());
        let spec = ToolSpec::new(name, description).with_parameters(parameters);
        let score = analyze_source(name, source, &spec, &self.graph, self.config.tci_weights);

        let agent = &mut self.agents[idx];
        if let Err(e) = agent.registry.register(record) {
            warn!(agent = %agent_id, tool = name, error = %e, "tool creation rejected");
            return;
        }
        if let Err(e) = agent.registry.update_complexity(name, score) {
            warn!(agent = %agent_id, tool = name, error = %e, "complexity update failed");
        }

        match created.get("implementation").and_then(Value::as_str) {
            Some(implementation) => match self.toolkit.build(implementation, spec) {
                Some(tool) => {
                    info!(agent = %agent_id, tool = name, implementation, "tool created and bound");
                    self.exchange.register(&agent_id, tool);
                }
                None => {
                    warn!(
                        agent = %agent_id,
                        tool = name,
                        implementation,
                        "unknown implementation; tool is metadata-only"
                    );
                }
            },
            None => {
                warn!(agent = %agent_id, tool = name, "no implementation named; tool is metadata-only");
            }
        }
    }

    /// Refresh a tool's complexity on its owner's record after its fan-out
    /// changed. System-owned tools have no record and are skipped.
    fn rescore(&mut self, owner: &str, name: &str) {
        let Some(owner_idx) = self.agents.iter().position(|a| a.id == owner) else {
            return;
        };
        let (source, description, parameters) = {
            let record = match self.agents[owner_idx].registry.get(name) {
                Some(record) => record,
                None => return,
            };
            (
                record.source.clone(),
                record.description.clone(),
                record.parameters.clone(),
            )
        };
        let spec = ToolSpec::new(name, &description).with_parameters(parameters);
        let score = analyze_source(name, &source, &spec, &self.graph, self.config.tci_weights);
        if let Err(e) = self.agents[owner_idx].registry.update_complexity(name, score) {
            warn!(tool = name, error = %e, "rescore failed");
        }
    }

    fn settling(outcome: ActionOutcome) -> Phase {
        Phase::Settling {
            outcome,
            result: None,
            ctx: None,
        }
    }

    fn remember(&mut self, talk: &str) {
        if self.recent.len() == RECENT_TALKS {
            self.recent.pop_front();
        }
        self.recent.push_back(talk.to_string());
    }
}
