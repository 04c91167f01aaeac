//! `cambrian run`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use cambrian_core::ledger::ActionOutcome;
use cambrian_core::registry::ToolRecord;
use cambrian_llm::http::{HttpProvider, HttpProviderConfig};
use cambrian_llm::mock::MockProvider;
use cambrian_llm::provider::{LlmError, TalkProvider};
use cambrian_metrics::compute_snapshot;
use cambrian_persist::{FileBackend, LedgerStore, RegistryStore, StorageBackend, StorageExt};
use cambrian_runtime::orchestrator::{Orchestrator, SimulationConfig};
use cambrian_runtime::toolkit::{DraftTool, MultiplyTool, SquareTool};

#[derive(Args)]
pub struct RunArgs {
    /// Number of agents in the population
    #[arg(long, default_value_t = 2)]
    pub agents: usize,

    /// Rounds to simulate
    #[arg(long, default_value_t = 10)]
    pub rounds: u32,

    /// Talk provider: mock or http
    #[arg(long, default_value = "mock")]
    pub provider: String,

    /// Model name for the http provider
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL for the http provider
    #[arg(long)]
    pub base_url: Option<String>,

    /// Persist registries, ledger, and the call graph under this directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Maximum composition call depth
    #[arg(long, default_value_t = 5)]
    pub max_depth: usize,
}

async fn build_provider(args: &RunArgs) -> Result<Arc<dyn TalkProvider>> {
    match args.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::default())),
        "http" => {
            let mut config = HttpProviderConfig::default();
            if let Some(model) = &args.model {
                config.model = model.clone();
            }
            if let Some(base_url) = &args.base_url {
                config.base_url = base_url.clone();
            }
            let base_url = config.base_url.clone();
            let provider = HttpProvider::new(config)?;
            if !provider.is_available().await {
                return Err(LlmError::NotAvailable(format!(
                    "no model server answering at {base_url}"
                ))
                .into());
            }
            Ok(Arc::new(provider))
        }
        other => bail!("unknown provider '{other}' (expected mock or http)"),
    }
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let provider = build_provider(&args).await?;
    let config = SimulationConfig {
        rounds: args.rounds,
        max_call_depth: args.max_depth,
        solicit_timeout: Duration::from_secs(30),
        ..SimulationConfig::default()
    };

    let mut orchestrator = Orchestrator::new(config, provider);
    for i in 1..=args.agents {
        orchestrator.add_agent(&format!("agent_{i}"));
    }
    orchestrator.install_builtin(Arc::new(DraftTool::with_default_spec()));
    if args.agents > 0 {
        // Seed the first agent with the arithmetic pair so composition has
        // something to grow from.
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
    }

    println!(
        "{} {} agents, {} rounds, provider {}",
        "cambrian".bold().green(),
        args.agents,
        args.rounds,
        args.provider
    );

    orchestrator.run().await;

    for record in orchestrator.ledger().records() {
        println!("{}", format!("round {}", record.round).bold());
        for entry in &record.entries {
            let line = match &entry.outcome {
                ActionOutcome::Silent => format!("{}  stayed silent", entry.agent_id).dimmed(),
                ActionOutcome::NoAction => format!("{}  no action", entry.agent_id).dimmed(),
                ActionOutcome::Acted { tool } => format!(
                    "{}  used {} ({:+.1} energy)",
                    entry.agent_id, tool, entry.energy_delta
                )
                .green(),
                ActionOutcome::Failed { tool } => {
                    format!("{}  failed {}", entry.agent_id, tool).red()
                }
            };
            println!("  {line}");
        }
    }

    println!("\n{}", "final standings".bold());
    for agent in orchestrator.agents() {
        println!(
            "  {}  {:.1} energy, {} tools",
            agent.id.cyan(),
            agent.energy,
            agent.registry.len()
        );
    }

    let snapshot = compute_snapshot(
        &orchestrator.registry_snapshots(),
        orchestrator.graph(),
        args.rounds,
    );
    println!("\n{}", "emergence metrics".bold());
    println!("  total tools          {}", snapshot.total_tools);
    println!("  category entropy     {:.3}", snapshot.category_entropy);
    println!("  concentration        {:.3}", snapshot.category_concentration);
    println!("  complexity variance  {:.3}", snapshot.agent_complexity_variance);
    println!("  unique patterns      {:.3}", snapshot.unique_pattern_ratio);
    println!("  center drift         {:.3}", snapshot.center_drift_rate);
    println!("  loc consistency      {:.3}", snapshot.loc_consistency);
    println!("  redundancy           {:.3}", snapshot.redundancy_rate);

    if let Some(data_dir) = &args.data_dir {
        persist_run(&orchestrator, data_dir).await?;
        println!("\nsaved run state to {}", data_dir.display().to_string().cyan());
    }
    Ok(())
}

async fn persist_run(orchestrator: &Orchestrator, data_dir: &PathBuf) -> Result<()> {
    let backend: Arc<dyn StorageBackend> = Arc::new(FileBackend::new(data_dir));
    let registry_store = RegistryStore::new(Arc::clone(&backend));
    for agent in orchestrator.agents() {
        registry_store.save(&agent.registry).await?;
    }
    let ledger_store = LedgerStore::new(Arc::clone(&backend));
    ledger_store.save(orchestrator.ledger()).await?;
    backend.set("graph/edges", orchestrator.graph()).await?;
    Ok(())
}
