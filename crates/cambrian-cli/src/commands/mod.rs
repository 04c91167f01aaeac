pub mod analyze;
pub mod info;
pub mod metrics;
pub mod run;
