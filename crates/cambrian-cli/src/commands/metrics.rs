//! `cambrian metrics`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use cambrian_core::context::CallGraph;
use cambrian_core::registry::ToolRecord;
use cambrian_metrics::compute_snapshot;
use cambrian_persist::{FileBackend, LedgerStore, RegistryStore, StorageBackend, StorageExt};

#[derive(Args)]
pub struct MetricsArgs {
    /// Data directory of a persisted run
    pub data_dir: PathBuf,
}

pub async fn execute(args: MetricsArgs) -> Result<()> {
    let backend: Arc<dyn StorageBackend> = Arc::new(FileBackend::new(&args.data_dir));
    let registry_store = RegistryStore::new(Arc::clone(&backend));

    let mut snapshots: Vec<Vec<ToolRecord>> = Vec::new();
    for agent_id in registry_store.list_agents().await? {
        if let Some(registry) = registry_store.load(&agent_id).await? {
            snapshots.push(registry.snapshot());
        }
    }

    let ledger = LedgerStore::new(Arc::clone(&backend)).load().await?;
    let graph: CallGraph = backend.get("graph/edges").await?.unwrap_or_default();

    let snapshot = compute_snapshot(&snapshots, &graph, ledger.len() as u32);
    println!(
        "{} over {} agents, {} rounds",
        "emergence metrics".bold(),
        snapshots.len(),
        ledger.len()
    );
    println!("  total tools          {}", snapshot.total_tools);
    println!("  category entropy     {:.3}", snapshot.category_entropy);
    println!("  concentration        {:.3}", snapshot.category_concentration);
    println!("  complexity variance  {:.3}", snapshot.agent_complexity_variance);
    println!("  unique patterns      {:.3}", snapshot.unique_pattern_ratio);
    println!("  center drift         {:.3}", snapshot.center_drift_rate);
    println!("  loc consistency      {:.3}", snapshot.loc_consistency);
    println!("  redundancy           {:.3}", snapshot.redundancy_rate);
    Ok(())
}
