//! Discrete event simulation kernel
//!
//! An [`EventQueue`] owns the simulation clock and a priority queue of pending
//! events. An [`EventLoop`] pops events one at a time and broadcasts them to every
//! registered [`Agent`], scheduling whatever events the agents respond with.
//!
//! Time is a non-negative `f64`. Events sharing a timestamp fire in the order they
//! were scheduled, so a run is fully reproducible for a fixed input.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::marker::PhantomData;

use tracing::debug;

pub mod parallel;

/// Errors raised by the kernel itself
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("cannot schedule event at t={at}: clock is already at t={now}")]
    InvalidSchedule { at: f64, now: f64 },
}

struct Event<T> {
    t: f64,
    seq: u64,
    data: T,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Event<T> {}

impl<T> Ord for Event<T> {
    // BinaryHeap is a max-heap: reverse so the earliest (then first scheduled) wins
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .t
            .total_cmp(&self.t)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Simulation clock plus the set of pending timed events
pub struct EventQueue<T> {
    heap: BinaryHeap<Event<T>>,
    now: f64,
    next_seq: u64,
}

impl<T> EventQueue<T> {
    pub fn new() -> EventQueue<T> {
        EventQueue {
            heap: BinaryHeap::new(),
            now: 0.0,
            next_seq: 0,
        }
    }

    /// Current simulated time
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Timestamp of the earliest pending event, if any
    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|event| event.t)
    }

    /// Insert an event at `t`, which must be finite and not before `now`
    pub fn schedule(&mut self, t: f64, data: T) -> Result<(), Error> {
        if !t.is_finite() || t < self.now {
            return Err(Error::InvalidSchedule { at: t, now: self.now });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Event { t, seq, data });
        Ok(())
    }

    /// Remove the earliest event and advance the clock to its timestamp
    pub fn next(&mut self) -> Option<(f64, T)> {
        let event = self.heap.pop()?;
        self.now = event.t;
        Some((event.t, event.data))
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Events an agent wants scheduled in reaction to the event it just saw
#[derive(Debug)]
pub struct Response<T> {
    pub events: Vec<(f64, T)>,
}

impl<T> Response<T> {
    pub fn new() -> Response<T> {
        Response { events: Vec::new() }
    }

    pub fn event(t: f64, data: T) -> Response<T> {
        Response {
            events: vec![(t, data)],
        }
    }

    pub fn events(events: Vec<(f64, T)>) -> Response<T> {
        Response { events }
    }
}

impl<T> Default for Response<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Participant in a simulation
///
/// - `T`: event type
/// - `S`: observable stats reported at the end of (or during) a run
/// - `E`: error type; must absorb kernel errors so scheduling failures propagate
pub trait Agent<T, S, E = Error> {
    fn act(&mut self, _now: f64, _event: &T) -> Result<Response<T>, E> {
        Ok(Response::new())
    }

    fn stats(&self) -> S;
}

/// Drives an [`EventQueue`] by broadcasting each fired event to its agents
///
/// `A` defaults to a trait object so heterogeneous agents can share a loop. A loop
/// over one concrete agent type can hand its agents back with
/// [`EventLoop::into_agents`] once the run is over.
pub struct EventLoop<T, S, E = Error, A: ?Sized = dyn Agent<T, S, E>> {
    queue: EventQueue<T>,
    agents: Vec<Box<A>>,
    _stats: PhantomData<fn() -> (S, E)>,
}

impl<T, S, E, A> EventLoop<T, S, E, A>
where
    E: From<Error>,
    A: Agent<T, S, E> + ?Sized,
{
    pub fn new(events: Vec<(f64, T)>, agents: Vec<Box<A>>) -> Result<EventLoop<T, S, E, A>, E> {
        let mut queue = EventQueue::new();
        for (t, data) in events {
            queue.schedule(t, data)?;
        }
        Ok(EventLoop {
            queue,
            agents,
            _stats: PhantomData,
        })
    }

    pub fn now(&self) -> f64 {
        self.queue.now()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Fire the earliest event; returns false when nothing was pending
    fn broadcast(&mut self) -> Result<bool, E> {
        let Some((now, event)) = self.queue.next() else {
            return Ok(false);
        };
        for agent in &mut self.agents {
            let response = agent.act(now, &event)?;
            for (t, data) in response.events {
                self.queue.schedule(t, data)?;
            }
        }
        Ok(true)
    }

    /// Fire every event with a timestamp no later than `until`
    pub fn run(&mut self, until: f64) -> Result<(), E> {
        while let Some(t) = self.queue.peek_time() {
            if t > until {
                debug!(now = self.now(), pending = self.pending(), until, "run stopped at horizon");
                break;
            }
            self.broadcast()?;
        }
        Ok(())
    }

    /// Fire events until none remain
    pub fn run_to_completion(&mut self) -> Result<(), E> {
        while self.broadcast()? {}
        Ok(())
    }

    pub fn stats(&self) -> Vec<S> {
        self.agents.iter().map(|agent| agent.stats()).collect()
    }

    /// Consume the loop, returning its agents in registration order
    pub fn into_agents(self) -> Vec<Box<A>> {
        self.agents
    }
}
