//! Emergent-behavior metrics for Cambrian.
//!
//! Aggregates registry snapshots and the composition graph into a
//! [`MetricSnapshot`]: category entropy and concentration, complexity
//! variance and drift, structural uniqueness, size consistency, redundancy.

pub mod aggregator;
pub mod categorize;

pub use aggregator::{compute_snapshot, MetricSnapshot};
pub use categorize::{categorize, Category};
