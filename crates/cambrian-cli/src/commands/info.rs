//! `cambrian info`

use anyhow::Result;
use colored::Colorize;

use cambrian_runtime::orchestrator::SimulationConfig;
use cambrian_runtime::toolkit::ToolKit;

pub fn execute() -> Result<()> {
    let config = SimulationConfig::default();
    let toolkit = ToolKit::with_builtins();

    println!("{} {}", "cambrian".bold().green(), env!("CARGO_PKG_VERSION"));
    println!("\n{}", "defaults".bold());
    println!("  rounds                {}", config.rounds);
    println!("  max call depth        {}", config.max_call_depth);
    println!("  solicit timeout       {:?}", config.solicit_timeout);
    println!("  act timeout           {:?}", config.act_timeout);
    println!("  confidence threshold  {}", config.confidence_threshold);
    println!("  energy floor          {}", config.energy_floor);
    println!("  initial energy        {}", config.initial_energy);

    println!("\n{}", "built-in implementations".bold());
    for name in toolkit.implementation_names() {
        println!("  {name}");
    }
    Ok(())
}
