//! `cambrian analyze`

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use cambrian_core::complexity::{analyze_dir, TciWeights};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Directory of .tool sources
    pub dir: PathBuf,
}

fn band(tci: f64) -> colored::ColoredString {
    if tci >= 6.0 {
        "high".red()
    } else if tci >= 3.0 {
        "moderate".yellow()
    } else {
        "low".green()
    }
}

pub fn execute(args: AnalyzeArgs) -> Result<()> {
    let report = analyze_dir(&args.dir, TciWeights::default())?;
    if report.scores.is_empty() {
        println!("no .tool sources under {}", args.dir.display());
        return Ok(());
    }

    println!(
        "{:<24} {:>6} {:>6} {:>6} {:>6}  {}",
        "tool".bold(),
        "code",
        "iface",
        "comp",
        "tci",
        "band"
    );
    for (name, score) in &report.scores {
        println!(
            "{:<24} {:>6.2} {:>6.2} {:>6.2} {:>6.2}  {}",
            name,
            score.code_complexity,
            score.interface_complexity,
            score.compositional_complexity,
            score.tci_score,
            band(score.tci_score)
        );
    }

    let tcis: Vec<f64> = report.scores.iter().map(|(_, s)| s.tci_score).collect();
    let min = tcis.iter().copied().fold(f64::INFINITY, f64::min);
    let max = tcis.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    println!(
        "\n{} tools  mean {:.2}  min {:.2}  max {:.2}",
        report.scores.len(),
        report.mean_tci(),
        min,
        max
    );

    if !report.errors.is_empty() {
        println!("\n{}", "skipped (scored zero):".yellow());
        for err in &report.errors {
            println!("  {err}");
        }
    }
    Ok(())
}
