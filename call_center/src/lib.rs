//! Call center as a multi-server queue with impatient callers
//!
//! Calls arrive at random, are answered by the first free agent or wait in a single
//! FIFO line, and hang up if nobody answers within the wait threshold. A run
//! produces one [`Metrics`] record: calls served and abandoned, average wait,
//! utilization and time-weighted queue length.
//!
//! Components:
//! - `arrivals`: arrival process and per-call service durations
//! - `pool`: agents, lowest idle id first
//! - `queue`: the waiting line
//! - `controller`: the per-call state machine driving the two above
//! - `stats`: push-style accumulator producing [`Metrics`]
//! - `simulation` / `replication`: single runs, traces and Monte-Carlo batches
//!
//! ```no_run
//! use call_center::{CallCenterConfig, simulation};
//!
//! let metrics = simulation::run(&CallCenterConfig::baseline()).unwrap();
//! println!("{:.1}% utilization", metrics.utilization_pct);
//! ```

pub mod arrivals;
pub mod call;
pub mod config;
pub mod controller;
pub mod error;
pub mod output;
pub mod pool;
pub mod queue;
pub mod replication;
pub mod sampler;
pub mod simulation;
pub mod stats;

pub use call::{Call, CallState};
pub use config::{CallCenterConfig, DistributionKind, ExperimentFile, ScenarioSpec};
pub use error::{CallCenterError, Result};
pub use stats::Metrics;

/// All events in a call-center run
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Kick-off at t=0; draws the first inter-arrival gap
    Start,
    Arrival,
    ServiceCompletion { agent_id: usize, call_id: usize },
    AbandonDeadline { call_id: usize },
}
