//! Statistics accumulator and the per-run metrics record
//!
//! The controller pushes every state transition into [`StatisticsAccumulator`];
//! nothing is polled. Time-weighted quantities (agent busy time and the queue-length
//! integral) only count the part of each interval inside `[0, horizon]`, so calls that
//! finish after the horizon never push utilization above 100%.
//!
//! Average wait covers served calls only. Abandoned calls contribute to the
//! abandonment count and rate but not to the wait statistics.

use serde::{Deserialize, Serialize};

/// Aggregate outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub agent_count: usize,
    pub calls_arrived: usize,
    pub calls_served: usize,
    pub calls_abandoned: usize,
    /// Sum of waits of served calls
    pub total_wait_time: f64,
    pub max_wait_time: f64,
    pub queue_length_integral: f64,
    /// Busy minutes per agent; index is agent id - 1
    pub agent_busy_time: Vec<f64>,
    pub avg_wait_time: f64,
    pub abandonment_rate: f64,
    pub utilization_pct: f64,
    pub avg_queue_length: f64,
}

impl Metrics {
    /// Calls that neither reached an agent nor hung up
    pub fn unresolved_calls(&self) -> usize {
        self.calls_arrived
            .saturating_sub(self.calls_served + self.calls_abandoned)
    }
}

#[derive(Debug, Clone)]
pub struct StatisticsAccumulator {
    horizon: f64,
    calls_arrived: usize,
    calls_served: usize,
    calls_abandoned: usize,
    total_wait_time: f64,
    max_wait_time: f64,
    queue_length: usize,
    queue_changed_at: f64,
    queue_length_integral: f64,
    busy_since: Vec<Option<f64>>,
    busy_time: Vec<f64>,
}

impl StatisticsAccumulator {
    pub fn new(agent_count: usize, horizon: f64) -> Self {
        StatisticsAccumulator {
            horizon,
            calls_arrived: 0,
            calls_served: 0,
            calls_abandoned: 0,
            total_wait_time: 0.0,
            max_wait_time: 0.0,
            queue_length: 0,
            queue_changed_at: 0.0,
            queue_length_integral: 0.0,
            busy_since: vec![None; agent_count],
            busy_time: vec![0.0; agent_count],
        }
    }

    fn clip(&self, t: f64) -> f64 {
        t.min(self.horizon)
    }

    pub fn record_arrival(&mut self) {
        self.calls_arrived += 1;
    }

    /// A call reached `agent_id` after waiting `wait` (0 for immediate service)
    pub fn record_service_start(&mut self, agent_id: usize, wait: f64, now: f64) {
        self.calls_served += 1;
        self.total_wait_time += wait;
        self.max_wait_time = self.max_wait_time.max(wait);
        if let Some(slot) = agent_id
            .checked_sub(1)
            .and_then(|index| self.busy_since.get_mut(index))
        {
            *slot = Some(now);
        }
    }

    pub fn record_release(&mut self, agent_id: usize, now: f64) {
        let Some(index) = agent_id.checked_sub(1) else {
            return;
        };
        let Some(start) = self.busy_since.get_mut(index).and_then(Option::take) else {
            return;
        };
        let busy = self.clip(now) - self.clip(start);
        self.busy_time[index] += busy;
    }

    pub fn record_abandonment(&mut self) {
        self.calls_abandoned += 1;
    }

    /// Close the interval at the previous queue size and start one at `length`
    pub fn record_queue_length(&mut self, now: f64, length: usize) {
        let elapsed = self.clip(now) - self.clip(self.queue_changed_at);
        self.queue_length_integral += elapsed * self.queue_length as f64;
        self.queue_changed_at = now;
        self.queue_length = length;
    }

    /// Metrics with still-open intervals flushed up to the horizon
    pub fn finalize(&self) -> Metrics {
        let horizon = self.horizon;
        let agent_count = self.busy_time.len();

        let open_queue = (horizon - self.clip(self.queue_changed_at)) * self.queue_length as f64;
        let queue_length_integral = self.queue_length_integral + open_queue;

        let agent_busy_time: Vec<f64> = self
            .busy_time
            .iter()
            .zip(&self.busy_since)
            .map(|(busy, since)| match since {
                Some(start) => busy + (horizon - self.clip(*start)),
                None => *busy,
            })
            .collect();

        let avg_wait_time = if self.calls_served > 0 {
            self.total_wait_time / self.calls_served as f64
        } else {
            0.0
        };
        let abandonment_rate = if self.calls_arrived > 0 {
            self.calls_abandoned as f64 / self.calls_arrived as f64
        } else {
            0.0
        };
        let total_busy: f64 = agent_busy_time.iter().sum();
        // clamp only absorbs float rounding; clipping already bounds each agent
        let utilization_pct =
            (total_busy / (agent_count as f64 * horizon) * 100.0).clamp(0.0, 100.0);

        Metrics {
            agent_count,
            calls_arrived: self.calls_arrived,
            calls_served: self.calls_served,
            calls_abandoned: self.calls_abandoned,
            total_wait_time: self.total_wait_time,
            max_wait_time: self.max_wait_time,
            queue_length_integral,
            agent_busy_time,
            avg_wait_time,
            abandonment_rate,
            utilization_pct,
            avg_queue_length: queue_length_integral / horizon,
        }
    }
}
