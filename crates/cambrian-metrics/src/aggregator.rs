//! Emergent-metric aggregation
//!
//! A [`MetricSnapshot`] is a pure function of registry snapshots, the
//! composition graph, and the round count. It never mutates its inputs and
//! is safe to recompute incrementally after every round.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use cambrian_core::context::CallGraph;
use cambrian_core::registry::ToolRecord;

use crate::categorize::{categorize, Category};

/// Population-level measurements for one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub total_tools: usize,
    /// Normalized Shannon entropy over tool categories: 0 when one category
    /// dominates, 1 when evenly split over the observed categories
    pub category_entropy: f64,
    /// Mean per-agent share of that agent's dominant category
    pub category_concentration: f64,
    /// Population variance of per-agent mean TCI
    pub agent_complexity_variance: f64,
    /// Structurally-unique fingerprints over total tools
    pub unique_pattern_ratio: f64,
    /// Mean round-over-round movement of the population's mean TCI, in [0, 1]
    pub center_drift_rate: f64,
    /// `1 / (1 + variance/mean)` of tool source line counts
    pub loc_consistency: f64,
    /// Duplicated lower-cased tool names over total
    pub redundancy_rate: f64,
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Compute a snapshot over one registry snapshot per agent.
///
/// `rounds` is the number of completed rounds; the complexity centroid per
/// round is reconstructed from each tool's creation round, so drift covers
/// rounds in which nothing was created too.
pub fn compute_snapshot(
    registries: &[Vec<ToolRecord>],
    graph: &CallGraph,
    rounds: u32,
) -> MetricSnapshot {
    let all: Vec<&ToolRecord> = registries.iter().flatten().collect();
    if all.is_empty() {
        return MetricSnapshot::default();
    }

    let categories: Vec<Category> = all
        .iter()
        .map(|r| categorize(&r.name, &r.description))
        .collect();

    let snapshot = MetricSnapshot {
        total_tools: all.len(),
        category_entropy: round3(category_entropy(&categories)),
        category_concentration: round3(category_concentration(registries)),
        agent_complexity_variance: round3(agent_complexity_variance(registries)),
        unique_pattern_ratio: round3(unique_pattern_ratio(&all, &categories, graph)),
        center_drift_rate: round3(center_drift_rate(&all, rounds)),
        loc_consistency: round3(loc_consistency(&all)),
        redundancy_rate: round3(redundancy_rate(&all)),
    };
    debug!(total = snapshot.total_tools, entropy = snapshot.category_entropy, "metrics computed");
    snapshot
}

fn category_entropy(categories: &[Category]) -> f64 {
    let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
    for c in categories {
        *counts.entry(*c).or_insert(0) += 1;
    }
    let observed = counts.len();
    if observed <= 1 {
        return 0.0;
    }
    let total = categories.len() as f64;
    let raw: f64 = counts
        .values()
        .map(|&n| {
            let p = n as f64 / total;
            -p * p.log2()
        })
        .sum();
    raw / (observed as f64).log2()
}

fn category_concentration(registries: &[Vec<ToolRecord>]) -> f64 {
    let shares: Vec<f64> = registries
        .iter()
        .filter(|records| !records.is_empty())
        .map(|records| {
            let mut counts: HashMap<Category, usize> = HashMap::new();
            for r in records {
                *counts.entry(categorize(&r.name, &r.description)).or_insert(0) += 1;
            }
            let dominant = counts.values().copied().max().unwrap_or(0);
            dominant as f64 / records.len() as f64
        })
        .collect();
    mean(&shares)
}

fn agent_complexity_variance(registries: &[Vec<ToolRecord>]) -> f64 {
    let means: Vec<f64> = registries
        .iter()
        .filter(|records| !records.is_empty())
        .map(|records| {
            let scores: Vec<f64> = records
                .iter()
                .map(|r| r.complexity.map_or(0.0, |c| c.tci_score))
                .collect();
            mean(&scores)
        })
        .collect();
    variance(&means)
}

fn unique_pattern_ratio(all: &[&ToolRecord], categories: &[Category], graph: &CallGraph) -> f64 {
    let fingerprints: HashSet<String> = all
        .iter()
        .zip(categories)
        .map(|(record, category)| {
            let params = record
                .parameters
                .get("properties")
                .and_then(|p| p.as_object())
                .map_or(0, |p| p.len());
            format!("{}_{}_{}", category.as_str(), params, graph.fan_out(&record.name))
        })
        .collect();
    fingerprints.len() as f64 / all.len() as f64
}

fn center_drift_rate(all: &[&ToolRecord], rounds: u32) -> f64 {
    let last_round = rounds.max(all.iter().map(|r| r.created_in_round).max().unwrap_or(0));
    if last_round < 2 {
        return 0.0;
    }
    let mut deltas = Vec::new();
    let mut previous: Option<f64> = None;
    for round in 1..=last_round {
        let scores: Vec<f64> = all
            .iter()
            .filter(|r| r.created_in_round <= round)
            .map(|r| r.complexity.map_or(0.0, |c| c.tci_score))
            .collect();
        if scores.is_empty() {
            continue;
        }
        let center = mean(&scores);
        if let Some(prev) = previous {
            deltas.push((center - prev).abs());
        }
        previous = Some(center);
    }
    let drift = mean(&deltas);
    drift / (1.0 + drift)
}

fn loc_consistency(all: &[&ToolRecord]) -> f64 {
    let locs: Vec<f64> = all.iter().map(|r| r.lines_of_code() as f64).collect();
    let m = mean(&locs);
    if m == 0.0 {
        return 1.0;
    }
    1.0 / (1.0 + variance(&locs) / m)
}

fn redundancy_rate(all: &[&ToolRecord]) -> f64 {
    let mut seen = HashSet::new();
    let mut duplicates = 0usize;
    for record in all {
        if !seen.insert(record.name.to_lowercase()) {
            duplicates += 1;
        }
    }
    duplicates as f64 / all.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use cambrian_core::complexity::ComplexityScore;
    use cambrian_core::context::CallEdge;

    fn record(name: &str, description: &str, round: u32, tci: f64) -> ToolRecord {
        let mut r = ToolRecord::new(name, description, "agent_1", round);
        r.complexity = Some(ComplexityScore {
            code_complexity: 0.0,
            interface_complexity: 0.0,
            compositional_complexity: 0.0,
            tci_score: tci,
        });
        r.source = "return 1\n".to_string();
        r
    }

    #[test]
    fn empty_population_is_all_zero() {
        let snap = compute_snapshot(&[], &CallGraph::default(), 5);
        assert_eq!(snap, MetricSnapshot::default());
    }

    #[test]
    fn entropy_is_zero_when_one_category_dominates() {
        let registries = vec![vec![
            record("square", "multiply by itself", 1, 1.0),
            record("adder", "add numbers", 1, 1.0),
            record("divider", "divide numbers", 1, 1.0),
        ]];
        let snap = compute_snapshot(&registries, &CallGraph::default(), 1);
        assert_eq!(snap.category_entropy, 0.0);
        assert_eq!(snap.category_concentration, 1.0);
    }

    #[test]
    fn entropy_is_one_when_evenly_split() {
        let registries = vec![vec![
            record("square", "multiply", 1, 1.0),
            record("upper", "uppercase a string", 1, 1.0),
            record("fetcher", "pull a url", 1, 1.0),
            record("zzz", "mystery", 1, 1.0),
        ]];
        let snap = compute_snapshot(&registries, &CallGraph::default(), 1);
        assert_eq!(snap.category_entropy, 1.0);
    }

    #[test]
    fn redundancy_counts_case_insensitive_duplicates() {
        let registries = vec![
            vec![record("Sorter", "orders a list", 1, 1.0)],
            vec![record("sorter", "orders a list too", 1, 1.0)],
            vec![record("square", "multiply", 1, 1.0)],
        ];
        let snap = compute_snapshot(&registries, &CallGraph::default(), 1);
        assert!((snap.redundancy_rate - 1.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn complexity_variance_spreads_with_agents() {
        let uniform = vec![
            vec![record("a1", "add", 1, 2.0)],
            vec![record("a2", "add", 1, 2.0)],
        ];
        let spread = vec![
            vec![record("a1", "add", 1, 0.5)],
            vec![record("a2", "add", 1, 4.5)],
        ];
        let flat = compute_snapshot(&uniform, &CallGraph::default(), 1);
        let wide = compute_snapshot(&spread, &CallGraph::default(), 1);
        assert_eq!(flat.agent_complexity_variance, 0.0);
        assert!(wide.agent_complexity_variance > 1.0);
    }

    #[test]
    fn fingerprints_use_fan_out() {
        let mut graph = CallGraph::default();
        graph.add_edge(CallEdge::new("square", "multiply", 1, true));
        // Same category and param count; fan-out separates them.
        let registries = vec![vec![
            record("square", "multiply by itself", 1, 1.0),
            record("multiply", "multiply two numbers", 1, 1.0),
        ]];
        let with_graph = compute_snapshot(&registries, &graph, 1);
        let without = compute_snapshot(&registries, &CallGraph::default(), 1);
        assert_eq!(with_graph.unique_pattern_ratio, 1.0);
        assert_eq!(without.unique_pattern_ratio, 0.5);
    }

    #[test]
    fn drift_reflects_centroid_movement() {
        let moving = vec![vec![
            record("a", "add", 1, 1.0),
            record("b", "add", 2, 5.0),
            record("c", "add", 3, 9.0),
        ]];
        let still = vec![vec![
            record("a", "add", 1, 2.0),
            record("b", "add", 2, 2.0),
            record("c", "add", 3, 2.0),
        ]];
        let hot = compute_snapshot(&moving, &CallGraph::default(), 3);
        let cold = compute_snapshot(&still, &CallGraph::default(), 3);
        assert!(hot.center_drift_rate > cold.center_drift_rate);
        assert_eq!(cold.center_drift_rate, 0.0);
        assert!(hot.center_drift_rate <= 1.0);
    }

    #[test]
    fn loc_consistency_is_one_for_identical_sizes() {
        let registries = vec![vec![
            record("a", "add", 1, 1.0),
            record("b", "add", 1, 1.0),
        ]];
        let snap = compute_snapshot(&registries, &CallGraph::default(), 1);
        assert_eq!(snap.loc_consistency, 1.0);
    }
}
