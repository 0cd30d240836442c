//! Call lifecycle controller
//!
//! The only component that mutates the agent pool and the waiting queue. It reacts
//! to one event at a time:
//!
//! - `Start`: schedule the first arrival
//! - `Arrival`: create the call, serve it at once or queue it with an abandon
//!   deadline, then schedule the next arrival
//! - `ServiceCompletion`: release the agent and immediately hand it the head of the
//!   queue, before any other event at the same instant
//! - `AbandonDeadline`: drop the call if it is still queued, otherwise do nothing
//!
//! Deadlines are never removed from the event queue when a call reaches an agent
//! early; the fired deadline sees the call is no longer queued and is ignored.

use des::{Agent, Response};
use tracing::{debug, trace};

use crate::Event;
use crate::arrivals::ArrivalGenerator;
use crate::call::{Call, CallState};
use crate::config::CallCenterConfig;
use crate::error::{CallCenterError, Result};
use crate::pool::AgentPool;
use crate::queue::WaitingQueue;
use crate::stats::{Metrics, StatisticsAccumulator};

pub struct CallCenter {
    wait_threshold: f64,
    arrivals: ArrivalGenerator,
    pool: AgentPool,
    queue: WaitingQueue,
    /// Every call ever created; a call's id is its index
    calls: Vec<Call>,
    stats: StatisticsAccumulator,
}

impl CallCenter {
    pub fn new(config: &CallCenterConfig, arrivals: ArrivalGenerator) -> Self {
        CallCenter {
            wait_threshold: config.wait_threshold,
            arrivals,
            pool: AgentPool::new(config.agent_count),
            queue: WaitingQueue::new(),
            calls: Vec::new(),
            stats: StatisticsAccumulator::new(config.agent_count, config.sim_time),
        }
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn into_calls(self) -> Vec<Call> {
        self.calls
    }

    pub fn pool(&self) -> &AgentPool {
        &self.pool
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    fn call_mut(&mut self, call_id: usize) -> Result<&mut Call> {
        self.calls
            .get_mut(call_id)
            .ok_or(CallCenterError::UnknownCall { call_id })
    }

    fn on_start(&mut self, now: f64) -> Result<Response<Event>> {
        Ok(match self.arrivals.schedule_after(now)? {
            Some(t) => Response::event(t, Event::Arrival),
            None => Response::new(),
        })
    }

    fn on_arrival(&mut self, now: f64) -> Result<Response<Event>> {
        let mut events = Vec::new();

        let call = self.arrivals.next_call(now, self.wait_threshold)?;
        let call_id = call.id;
        trace!(call_id, t = now, service = call.service_duration, "call arrived");
        self.calls.push(call);
        self.stats.record_arrival();

        match self.pool.try_assign(call_id) {
            Some(agent_id) => self.start_service(now, call_id, agent_id, &mut events)?,
            None => {
                let deadline = self.enqueue(now, call_id)?;
                events.push((deadline, Event::AbandonDeadline { call_id }));
            }
        }

        if let Some(t) = self.arrivals.schedule_after(now)? {
            events.push((t, Event::Arrival));
        }
        Ok(Response::events(events))
    }

    fn enqueue(&mut self, now: f64, call_id: usize) -> Result<f64> {
        let call = self.call_mut(call_id)?;
        call.state = CallState::Queued;
        let deadline = call.wait_deadline;

        self.queue.push_back(call_id);
        self.stats.record_queue_length(now, self.queue.len());
        trace!(call_id, t = now, queued = self.queue.len(), "call queued");
        Ok(deadline)
    }

    fn start_service(
        &mut self,
        now: f64,
        call_id: usize,
        agent_id: usize,
        events: &mut Vec<(f64, Event)>,
    ) -> Result<()> {
        let call = self.call_mut(call_id)?;
        call.state = CallState::InService;
        call.agent_id = Some(agent_id);
        call.service_start = Some(now);
        let wait = now - call.arrival_time;
        let completion = now + call.service_duration;

        self.stats.record_service_start(agent_id, wait, now);
        trace!(call_id, agent_id, t = now, wait, "service started");
        events.push((completion, Event::ServiceCompletion { agent_id, call_id }));
        Ok(())
    }

    fn on_service_completion(
        &mut self,
        now: f64,
        agent_id: usize,
        call_id: usize,
    ) -> Result<Response<Event>> {
        let serving = self.pool.release(agent_id)?;
        if serving != call_id {
            return Err(CallCenterError::CallMismatch {
                agent_id,
                serving,
                completed: call_id,
            });
        }
        let call = self.call_mut(call_id)?;
        call.state = CallState::Completed;
        call.end_time = Some(now);

        self.stats.record_release(agent_id, now);
        trace!(call_id, agent_id, t = now, "service completed");

        let mut events = Vec::new();
        self.dispatch(now, &mut events)?;
        Ok(Response::events(events))
    }

    /// Hand idle agents to the longest-waiting calls
    fn dispatch(&mut self, now: f64, events: &mut Vec<(f64, Event)>) -> Result<()> {
        while let Some(call_id) = self.queue.front() {
            let Some(agent_id) = self.pool.try_assign(call_id) else {
                break;
            };
            self.queue.pop_front();
            self.stats.record_queue_length(now, self.queue.len());
            self.start_service(now, call_id, agent_id, events)?;
        }
        Ok(())
    }

    fn on_abandon_deadline(&mut self, now: f64, call_id: usize) -> Result<Response<Event>> {
        let call = self.call_mut(call_id)?;
        if call.state != CallState::Queued {
            debug!(call_id, t = now, state = ?call.state, "stale abandon deadline ignored");
            return Ok(Response::new());
        }
        call.state = CallState::Abandoned;
        call.end_time = Some(now);

        self.queue.remove(call_id);
        self.stats.record_queue_length(now, self.queue.len());
        self.stats.record_abandonment();
        trace!(call_id, t = now, "call abandoned");
        Ok(Response::new())
    }
}

impl Agent<Event, Metrics, CallCenterError> for CallCenter {
    fn act(&mut self, now: f64, event: &Event) -> Result<Response<Event>> {
        match event {
            Event::Start => self.on_start(now),
            Event::Arrival => self.on_arrival(now),
            Event::ServiceCompletion { agent_id, call_id } => {
                self.on_service_completion(now, *agent_id, *call_id)
            }
            Event::AbandonDeadline { call_id } => self.on_abandon_deadline(now, *call_id),
        }
    }

    fn stats(&self) -> Metrics {
        self.stats.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{Empirical, Fixed};

    fn center(agents: usize, wait_threshold: f64, services: Vec<f64>) -> CallCenter {
        let mut config = CallCenterConfig::baseline().with_agents(agents);
        config.wait_threshold = wait_threshold;
        config.sim_time = 100.0;
        let arrivals = ArrivalGenerator::new(
            Box::new(Fixed(1000.0)),
            Box::new(Empirical::new(services)),
            config.sim_time,
        );
        CallCenter::new(&config, arrivals)
    }

    #[test]
    fn arrival_with_idle_agent_is_served_immediately() {
        let mut center = center(2, 5.0, vec![4.0]);

        let response = center.act(10.0, &Event::Arrival).unwrap();

        assert_eq!(
            response.events,
            vec![(
                14.0,
                Event::ServiceCompletion {
                    agent_id: 1,
                    call_id: 0
                }
            )]
        );
        assert_eq!(center.calls()[0].state, CallState::InService);
        assert_eq!(center.calls()[0].wait_time(), Some(0.0));
        assert_eq!(center.pool().busy_count(), 1);
    }

    #[test]
    fn arrival_with_all_agents_busy_is_queued_with_deadline() {
        let mut center = center(1, 5.0, vec![4.0]);
        center.act(10.0, &Event::Arrival).unwrap();

        let response = center.act(11.0, &Event::Arrival).unwrap();

        assert_eq!(
            response.events,
            vec![(16.0, Event::AbandonDeadline { call_id: 1 })]
        );
        assert_eq!(center.calls()[1].state, CallState::Queued);
        assert_eq!(center.queue_len(), 1);
    }

    #[test]
    fn completion_promotes_queue_head_to_freed_agent() {
        let mut center = center(1, 5.0, vec![4.0, 2.0, 3.0]);
        center.act(10.0, &Event::Arrival).unwrap();
        center.act(11.0, &Event::Arrival).unwrap();
        center.act(12.0, &Event::Arrival).unwrap();

        let response = center
            .act(
                14.0,
                &Event::ServiceCompletion {
                    agent_id: 1,
                    call_id: 0,
                },
            )
            .unwrap();

        assert_eq!(
            response.events,
            vec![(
                16.0,
                Event::ServiceCompletion {
                    agent_id: 1,
                    call_id: 1
                }
            )]
        );
        assert_eq!(center.calls()[0].state, CallState::Completed);
        assert_eq!(center.calls()[1].wait_time(), Some(3.0));
        assert_eq!(center.calls()[2].state, CallState::Queued);
        assert_eq!(center.queue_len(), 1);
    }

    #[test]
    fn stale_deadline_is_a_no_op() {
        let mut center = center(1, 5.0, vec![2.0, 2.0]);
        center.act(0.0, &Event::Arrival).unwrap();
        center.act(1.0, &Event::Arrival).unwrap();
        center
            .act(
                2.0,
                &Event::ServiceCompletion {
                    agent_id: 1,
                    call_id: 0,
                },
            )
            .unwrap();

        let response = center
            .act(6.0, &Event::AbandonDeadline { call_id: 1 })
            .unwrap();

        assert!(response.events.is_empty());
        assert_eq!(center.calls()[1].state, CallState::InService);
        assert_eq!(center.stats().calls_abandoned, 0);
    }

    #[test]
    fn deadline_while_queued_abandons() {
        let mut center = center(1, 2.0, vec![10.0, 1.0]);
        center.act(0.0, &Event::Arrival).unwrap();
        center.act(1.0, &Event::Arrival).unwrap();

        center
            .act(3.0, &Event::AbandonDeadline { call_id: 1 })
            .unwrap();

        let call = &center.calls()[1];
        assert_eq!(call.state, CallState::Abandoned);
        assert_eq!(call.end_time, Some(call.arrival_time + 2.0));
        assert_eq!(center.queue_len(), 0);
        assert_eq!(center.stats().calls_abandoned, 1);
    }

    #[test]
    fn completion_for_idle_agent_is_not_busy() {
        let mut center = center(1, 5.0, vec![1.0]);
        center.act(0.0, &Event::Arrival).unwrap();
        center
            .act(
                1.0,
                &Event::ServiceCompletion {
                    agent_id: 1,
                    call_id: 0,
                },
            )
            .unwrap();

        let err = center
            .act(
                2.0,
                &Event::ServiceCompletion {
                    agent_id: 1,
                    call_id: 0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CallCenterError::NotBusy { agent_id: 1 }));
    }

    #[test]
    fn completion_naming_another_call_is_rejected() {
        let mut center = center(2, 5.0, vec![4.0, 6.0]);
        center.act(0.0, &Event::Arrival).unwrap();
        center.act(1.0, &Event::Arrival).unwrap();

        // Agent 1 serves call 0, not call 1
        let err = center
            .act(
                4.0,
                &Event::ServiceCompletion {
                    agent_id: 1,
                    call_id: 1,
                },
            )
            .unwrap_err();

        assert!(matches!(
            err,
            CallCenterError::CallMismatch {
                agent_id: 1,
                serving: 0,
                completed: 1
            }
        ));
        assert_eq!(center.calls()[1].state, CallState::InService);
        assert_eq!(center.calls()[1].end_time, None);
    }

    #[test]
    fn events_for_unknown_calls_are_rejected() {
        let mut center = center(1, 5.0, vec![1.0]);
        let err = center
            .act(1.0, &Event::AbandonDeadline { call_id: 9 })
            .unwrap_err();
        assert!(matches!(err, CallCenterError::UnknownCall { call_id: 9 }));
    }
}
