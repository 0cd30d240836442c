use serde::{Deserialize, Serialize};

/// Where a call is in its lifecycle
///
/// `Queued` has two mutually exclusive exits: `InService` or `Abandoned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallState {
    Arrived,
    Queued,
    InService,
    Completed,
    Abandoned,
}

/// One customer interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub id: usize,
    pub arrival_time: f64,
    /// Sampled once at arrival and never resampled
    pub service_duration: f64,
    /// `arrival_time + wait_threshold`; only meaningful while queued
    pub wait_deadline: f64,
    pub state: CallState,
    pub agent_id: Option<usize>,
    pub service_start: Option<f64>,
    /// Completion or abandonment time
    pub end_time: Option<f64>,
}

impl Call {
    pub fn new(id: usize, arrival_time: f64, service_duration: f64, wait_threshold: f64) -> Self {
        Call {
            id,
            arrival_time,
            service_duration,
            wait_deadline: arrival_time + wait_threshold,
            state: CallState::Arrived,
            agent_id: None,
            service_start: None,
            end_time: None,
        }
    }

    /// Time spent queued before reaching an agent; `None` until service starts
    pub fn wait_time(&self) -> Option<f64> {
        self.service_start.map(|start| start - self.arrival_time)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, CallState::Completed | CallState::Abandoned)
    }
}
