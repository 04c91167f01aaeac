//! Two agents, three rounds: one drafts a tool, one composes, metrics at the
//! end. Run with `cargo run -p cambrian-demo`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use cambrian_core::registry::ToolRecord;
use cambrian_llm::mock::MockProvider;
use cambrian_metrics::compute_snapshot;
use cambrian_runtime::orchestrator::{Orchestrator, SimulationConfig};
use cambrian_runtime::toolkit::{DraftTool, MultiplyTool, SquareTool};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Scripted talks, consumed in turn order (agent_1 then agent_2 per round).
    let provider = MockProvider::new(vec![
        r#"{"tool": "square", "params": {"number": 4}}"#.to_string(),
        r#"{"tool": "draft_tool", "params": {"name": "greeter", "description": "format a greeting string", "source": "return 'hello ' + name\n", "implementation": "echo"}}"#.to_string(),
        r#"{"tool": "greeter", "params": {"name": "cambrian"}}"#.to_string(),
        "Considering what to build next.".to_string(),
        r#"{"tool": "multiply", "params": {"a": 6, "b": 7}}"#.to_string(),
        "Enough for today.".to_string(),
    ]);

    let config = SimulationConfig {
        rounds: 3,
        solicit_timeout: Duration::from_secs(1),
        act_timeout: Duration::from_secs(2),
        ..SimulationConfig::default()
    };
    let mut orchestrator = Orchestrator::new(config, Arc::new(provider));
    orchestrator.add_agent("agent_1");
    orchestrator.add_agent("agent_2");
    orchestrator.install_builtin(Arc::new(DraftTool::with_default_spec()));
    orchestrator.install_tool(
        "agent_1",
        ToolRecord::new("multiply", "Multiply two numbers", "agent_1", 0),
        Some(Arc::new(MultiplyTool::with_default_spec())),
    )?;
    orchestrator.install_tool(
        "agent_1",
        ToolRecord::new("square", "Square a number via multiply", "agent_1", 0)
            .with_source("return ctx.call_tool('multiply', {'a': number, 'b': number})\n"),
        Some(Arc::new(SquareTool::with_default_spec())),
    )?;

    orchestrator.run().await;

    for record in orchestrator.ledger().records() {
        println!("round {}:", record.round);
        for entry in &record.entries {
            println!("  {} -> {:?} ({:+.1})", entry.agent_id, entry.outcome, entry.energy_delta);
        }
    }

    for agent in orchestrator.agents() {
        println!(
            "{}: {:.1} energy, tools {:?}",
            agent.id,
            agent.energy,
            agent.registry.names()
        );
    }

    let snapshot = compute_snapshot(&orchestrator.registry_snapshots(), orchestrator.graph(), 3);
    println!("metrics: {snapshot:#?}");
    Ok(())
}
