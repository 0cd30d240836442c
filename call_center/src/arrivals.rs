//! Arrival process
//!
//! Draws inter-arrival gaps and stamps each new call with its service duration.
//! No arrival is ever scheduled past the horizon; an arrival exactly at the horizon
//! still happens.
//!
//! Zero gaps are valid (simultaneous callers), but a gap stream that stops advancing
//! the clock would never reach the horizon. After [`MAX_ZERO_GAPS`] zero gaps in a row
//! the run fails with `StalledArrivals`.

use crate::call::Call;
use crate::error::{CallCenterError, Result};
use crate::sampler::{Sampler, checked_sample};

/// Consecutive zero-length gaps tolerated before the arrival stream counts as stalled
pub const MAX_ZERO_GAPS: usize = 10_000;

pub struct ArrivalGenerator {
    inter_arrival: Box<dyn Sampler>,
    service: Box<dyn Sampler>,
    horizon: f64,
    next_call_id: usize,
    zero_gaps: usize,
}

impl ArrivalGenerator {
    pub fn new(inter_arrival: Box<dyn Sampler>, service: Box<dyn Sampler>, horizon: f64) -> Self {
        ArrivalGenerator {
            inter_arrival,
            service,
            horizon,
            next_call_id: 0,
            zero_gaps: 0,
        }
    }

    /// Draw the next gap after `now` and return the arrival time, unless it would
    /// land past the horizon
    pub fn schedule_after(&mut self, now: f64) -> Result<Option<f64>> {
        let gap = checked_sample(self.inter_arrival.as_mut(), "inter-arrival")?;
        if gap > 0.0 {
            self.zero_gaps = 0;
        } else {
            self.zero_gaps += 1;
            if self.zero_gaps > MAX_ZERO_GAPS {
                return Err(CallCenterError::StalledArrivals {
                    t: now,
                    zero_gaps: self.zero_gaps,
                });
            }
        }
        let t = now + gap;
        Ok((t <= self.horizon).then_some(t))
    }

    /// Create the call arriving at `now` with a fresh id and its own service duration
    pub fn next_call(&mut self, now: f64, wait_threshold: f64) -> Result<Call> {
        let service_duration = checked_sample(self.service.as_mut(), "service")?;
        let id = self.next_call_id;
        self.next_call_id += 1;
        Ok(Call::new(id, now, service_duration, wait_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallCenterError;
    use crate::sampler::{Empirical, Fixed};

    #[test]
    fn stops_scheduling_past_the_horizon() {
        let mut generator =
            ArrivalGenerator::new(Box::new(Fixed(4.0)), Box::new(Fixed(1.0)), 10.0);

        assert_eq!(generator.schedule_after(0.0).unwrap(), Some(4.0));
        assert_eq!(generator.schedule_after(4.0).unwrap(), Some(8.0));
        assert_eq!(generator.schedule_after(8.0).unwrap(), None);
    }

    #[test]
    fn arrival_exactly_at_horizon_is_kept() {
        let mut generator =
            ArrivalGenerator::new(Box::new(Fixed(5.0)), Box::new(Fixed(1.0)), 10.0);
        assert_eq!(generator.schedule_after(5.0).unwrap(), Some(10.0));
    }

    #[test]
    fn call_ids_are_sequential_and_durations_fixed_at_arrival() {
        let mut generator = ArrivalGenerator::new(
            Box::new(Fixed(1.0)),
            Box::new(Empirical::new(vec![3.0, 7.0])),
            100.0,
        );

        let first = generator.next_call(0.0, 5.0).unwrap();
        let second = generator.next_call(2.0, 5.0).unwrap();

        assert_eq!((first.id, second.id), (0, 1));
        assert_eq!(first.service_duration, 3.0);
        assert_eq!(second.service_duration, 7.0);
        assert_eq!(second.wait_deadline, 7.0);
        assert_eq!(generator.next_call(3.0, 5.0).unwrap().id, 2);
    }

    #[test]
    fn negative_gap_is_an_invalid_sample() {
        let mut generator =
            ArrivalGenerator::new(Box::new(Fixed(-1.0)), Box::new(Fixed(1.0)), 10.0);
        let err = generator.schedule_after(0.0).unwrap_err();
        assert!(matches!(
            err,
            CallCenterError::InvalidSample {
                stream: "inter-arrival",
                ..
            }
        ));
    }

    #[test]
    fn endless_zero_gaps_stall_the_arrival_stream() {
        let mut generator =
            ArrivalGenerator::new(Box::new(Fixed(0.0)), Box::new(Fixed(1.0)), 10.0);

        for _ in 0..MAX_ZERO_GAPS {
            assert_eq!(generator.schedule_after(0.0).unwrap(), Some(0.0));
        }
        let err = generator.schedule_after(0.0).unwrap_err();
        assert!(matches!(
            err,
            CallCenterError::StalledArrivals {
                zero_gaps,
                ..
            } if zero_gaps == MAX_ZERO_GAPS + 1
        ));
    }

    #[test]
    fn a_positive_gap_resets_the_zero_gap_count() {
        let mut values = vec![0.0; MAX_ZERO_GAPS];
        values.push(1.0);
        let mut generator =
            ArrivalGenerator::new(Box::new(Empirical::new(values)), Box::new(Fixed(1.0)), 1e9);

        // Two full cycles of the sequence never exceed the limit
        let mut now = 0.0;
        for _ in 0..2 * (MAX_ZERO_GAPS + 1) {
            now = generator.schedule_after(now).unwrap().unwrap();
        }
        assert_eq!(now, 2.0);
    }
}
