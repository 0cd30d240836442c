//! Error taxonomy for call-center runs
//!
//! Every variant is fatal for the run that raised it: the simulation is a single
//! deterministic pass, so nothing is retried and partial metrics are discarded.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CallCenterError>;

#[derive(Error, Debug)]
pub enum CallCenterError {
    /// An event was scheduled before the current clock time
    #[error(transparent)]
    InvalidSchedule(#[from] des::Error),

    /// A sampler produced a negative or non-finite value
    #[error("invalid {stream} sample: {value}")]
    InvalidSample { stream: &'static str, value: f64 },

    /// Release of an agent that was not serving a call
    #[error("agent {agent_id} released while not busy")]
    NotBusy { agent_id: usize },

    /// A completion named a different call than the one the agent was serving
    #[error("agent {agent_id} completed call {completed} while serving call {serving}")]
    CallMismatch {
        agent_id: usize,
        serving: usize,
        completed: usize,
    },

    /// The inter-arrival stream stopped advancing the clock
    #[error("arrivals stalled at t={t} after {zero_gaps} zero-length gaps")]
    StalledArrivals { t: f64, zero_gaps: usize },

    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// An event referenced a call id that was never issued
    #[error("unknown call {call_id}")]
    UnknownCall { call_id: usize },

    #[error("simulation produced no metrics")]
    MissingMetrics,

    #[error("failed to read experiment file: {0}")]
    Io(#[from] std::io::Error),
}

impl CallCenterError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        CallCenterError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
