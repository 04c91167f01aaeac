//! Tool Complexity Index (TCI) analyzer
//!
//! Static scoring of a tool on a 10-point scale built from three sub-scores:
//!
//! - code complexity (max 3.0): structural density of the source
//! - interface complexity (max 2.0): declared parameter surface
//! - compositional complexity (max 5.0): observed fan-out in the call graph
//!
//! Scoring is deterministic: identical source text and call-graph state yield
//! bit-identical scores. Batch analysis over a tool directory is parallelized
//! per file and isolates malformed inputs as zero scores with a recorded
//! diagnostic instead of aborting the batch.

use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use crate::context::CallGraph;
use crate::tool::ToolSpec;

const CODE_CAP: f64 = 3.0;
const INTERFACE_CAP: f64 = 2.0;
const COMPOSITIONAL_CAP: f64 = 5.0;

/// Failures surfaced by batch analysis. Per-file, never batch-fatal.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read tool source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tool source '{name}' is empty")]
    EmptySource { name: String },
}

/// Relative weighting of the three sub-scores in the composite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TciWeights {
    pub code: f64,
    pub interface: f64,
    pub compositional: f64,
}

impl Default for TciWeights {
    fn default() -> Self {
        Self {
            code: 1.0,
            interface: 1.0,
            compositional: 1.0,
        }
    }
}

/// The three sub-scores plus the weighted composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityScore {
    pub code_complexity: f64,
    pub interface_complexity: f64,
    pub compositional_complexity: f64,
    pub tci_score: f64,
}

impl ComplexityScore {
    pub fn zero() -> Self {
        Self {
            code_complexity: 0.0,
            interface_complexity: 0.0,
            compositional_complexity: 0.0,
            tci_score: 0.0,
        }
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

fn branch_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(if|elif|else if|match|switch|case|when)\b").unwrap())
}

fn loop_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(for|while|loop)\b").unwrap())
}

fn handler_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(try|except|catch|rescue|finally)\b").unwrap())
}

fn context_use_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(ctx|context)\s*\.\s*call_tool\b").unwrap())
}

fn code_lines(source: &str) -> Vec<&str> {
    source
        .lines()
        .map(str::trim_end)
        .filter(|l| {
            let t = l.trim_start();
            !t.is_empty() && !t.starts_with('#') && !t.starts_with("//")
        })
        .collect()
}

fn indent_depth(line: &str) -> usize {
    let spaces = line
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum::<usize>();
    spaces / 4
}

/// Structural density of the source, capped at 3.0.
///
/// Counts branch, loop, and error-handling constructs plus nesting beyond the
/// first level, then normalizes by line count so a long but linear source does
/// not outscore a short but branching one. A flat straight-line tool scores 0.
fn score_code(lines: &[&str]) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }
    let mut structure = 0usize;
    let mut max_depth = 0usize;
    for line in lines {
        structure += branch_re().find_iter(line).count();
        structure += loop_re().find_iter(line).count();
        structure += handler_re().find_iter(line).count();
        max_depth = max_depth.max(indent_depth(line));
    }
    structure += max_depth.saturating_sub(1);

    let denom = (lines.len() / 4).max(1) as f64;
    CODE_CAP * (structure as f64 / denom).min(1.0)
}

/// Declared interface surface, capped at 2.0.
fn score_interface(spec: &ToolSpec, lines: &[&str]) -> f64 {
    let params = spec.parameter_names().len() as f64;
    let mut score = (params / 5.0).min(1.0);
    if spec.has_compound_parameters() {
        score += 0.5;
    }
    if lines.iter().any(|l| context_use_re().is_match(l)) {
        score += 0.5;
    }
    score.min(INTERFACE_CAP)
}

/// Observed composition, capped at 5.0: fan-out dominates, reachable call
/// depth adds up to one point. Zero for a tool that calls nothing.
fn score_compositional(name: &str, graph: &CallGraph) -> f64 {
    let fan_out = graph.fan_out(name) as f64;
    let depth = graph.max_depth_from(name) as f64;
    (fan_out * 0.5).min(4.0) + (depth * 0.25).min(1.0)
}

/// Score one tool from its source, declared spec, and the current call graph.
pub fn analyze_source(
    name: &str,
    source: &str,
    spec: &ToolSpec,
    graph: &CallGraph,
    weights: TciWeights,
) -> ComplexityScore {
    let lines = code_lines(source);
    let code = round3(score_code(&lines));
    let interface = round3(score_interface(spec, &lines));
    let compositional = round3(score_compositional(name, graph));
    let tci = round3(
        code * weights.code + interface * weights.interface + compositional * weights.compositional,
    );
    debug!(
        tool = name,
        code, interface, compositional, tci, "scored tool"
    );
    ComplexityScore {
        code_complexity: code,
        interface_complexity: interface,
        compositional_complexity: compositional,
        tci_score: tci,
    }
}

/// Result of scoring one directory of `*.tool` sources.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Scores by tool name, sorted by name
    pub scores: Vec<(String, ComplexityScore)>,
    /// Per-file failures; each also contributed a zero score
    pub errors: Vec<AnalysisError>,
}

impl BatchReport {
    pub fn mean_tci(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.scores.iter().map(|(_, s)| s.tci_score).sum();
        round3(sum / self.scores.len() as f64)
    }
}

/// Score every `*.tool` file in `dir` in parallel.
///
/// Interface and compositional information are unavailable in batch mode, so
/// files are scored on code complexity with an empty spec and call graph
/// unless the caller layers those in afterwards. Unreadable or empty files
/// score zero and record an error; the batch always completes.
pub fn analyze_dir(dir: &Path, weights: TciWeights) -> Result<BatchReport, std::io::Error> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "tool"))
        .collect();
    paths.sort();

    let results: Vec<(String, ComplexityScore, Option<AnalysisError>)> = paths
        .par_iter()
        .map(|path| {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match std::fs::read_to_string(path) {
                Err(source) => (
                    name,
                    ComplexityScore::zero(),
                    Some(AnalysisError::Io {
                        path: path.clone(),
                        source,
                    }),
                ),
                Ok(text) if text.trim().is_empty() => {
                    let err = AnalysisError::EmptySource { name: name.clone() };
                    (name, ComplexityScore::zero(), Some(err))
                }
                Ok(text) => {
                    let spec = ToolSpec::new(&name, "");
                    let score =
                        analyze_source(&name, &text, &spec, &CallGraph::default(), weights);
                    (name, score, None)
                }
            }
        })
        .collect();

    let mut report = BatchReport::default();
    for (name, score, error) in results {
        report.scores.push((name, score));
        if let Some(err) = error {
            report.errors.push(err);
        }
    }
    Ok(report)
}
