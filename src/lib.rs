//! Service Availability Checker Library
//!
//! This library probes a fixed roster of named HTTP endpoints concurrently,
//! classifies each outcome as up or down, and keeps the latest batch of
//! results together with a derived summary.

pub mod errors;
pub mod models;
pub mod config;
pub mod probe;
pub mod checker;
pub mod scheduler;

pub use errors::{CheckerError, Result};
pub use models::{CheckReport, EndpointSpec, ProbeResult, ProbeStatus, ResultBatch, Summary};
pub use config::Config;
pub use probe::{ProbeOutcome, probe, probe_with_limiter};
pub use checker::ServiceChecker;
pub use scheduler::PeriodicChecker;
