//! Parallel execution of independent EventLoop replications
//!
//! Each replication builds its own [`EventLoop`] from a replication id, runs it on a
//! rayon worker, and reports the stats of all its agents. Replications share no
//! state, so the results only depend on what the builder derives from the id.
//!
//! # Example
//!
//! ```rust
//! use des::parallel::{ParallelRunner, simple_progress_reporter};
//! use des::{Agent, Error, EventLoop};
//! # struct TestAgent(usize);
//! # impl Agent<u8, usize> for TestAgent {
//! #     fn stats(&self) -> usize { self.0 }
//! # }
//!
//! let results = ParallelRunner::new(100, |replication_id| {
//!     let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![Box::new(TestAgent(replication_id))];
//!     EventLoop::<u8, usize, Error>::new(vec![(0.0, 1)], agents)
//! })
//! .progress(simple_progress_reporter(10))
//! .num_threads(8)
//! .run(f64::INFINITY);
//!
//! assert_eq!(results.len(), 100);
//! ```
//!
//! # Determinism
//!
//! Results are deterministic when the builder derives every seed from the
//! replication id and agents draw only from seeded RNGs. Execution order and thread
//! count then have no influence on the output.
//!
//! # Error Handling
//!
//! A replication that fails to build, fails during the run, or panics is reported as
//! `Err(String)` in its slot. The other replications carry on.

use crate::{Error, EventLoop};
use rayon::prelude::*;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Executes multiple EventLoop replications in parallel
///
/// Generic over:
/// - `T`: Event type
/// - `S`: Stats type
/// - `E`: Error type raised by agents
/// - `F`: Builder function type
pub struct ParallelRunner<T, S, E, F>
where
    F: Fn(usize) -> Result<EventLoop<T, S, E>, E> + Send + Sync,
    S: Send,
    E: From<Error> + Display,
{
    num_replications: usize,
    builder: F,
    num_threads: Option<usize>,
    progress_callback: Option<ProgressCallback>,
    _marker: PhantomData<fn() -> (T, S, E)>,
}

impl<T, S, E, F> ParallelRunner<T, S, E, F>
where
    F: Fn(usize) -> Result<EventLoop<T, S, E>, E> + Send + Sync,
    S: Send,
    E: From<Error> + Display,
{
    /// Create a new parallel runner
    ///
    /// * `num_replications` - Number of independent replications to run
    /// * `builder` - Closure that creates a fresh EventLoop for a given replication id
    pub fn new(num_replications: usize, builder: F) -> Self {
        ParallelRunner {
            num_replications,
            builder,
            num_threads: None,
            progress_callback: None,
            _marker: PhantomData,
        }
    }

    /// Set number of threads (defaults to rayon's global pool)
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Set progress callback, called with `(completed, total)` after each replication
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    fn run_one(&self, replication_id: usize, run_until: f64) -> Result<Vec<S>, String> {
        let replication = || -> Result<Vec<S>, String> {
            let mut event_loop = (self.builder)(replication_id).map_err(|e| e.to_string())?;
            event_loop.run(run_until).map_err(|e| e.to_string())?;
            Ok(event_loop.stats())
        };
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(replication));

        match outcome {
            Ok(result) => result,
            Err(panic) => Err(if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            }),
        }
    }

    /// Execute all replications and return results in replication order
    ///
    /// `run_until` is passed to [`EventLoop::run`]; use `f64::INFINITY` to drain
    /// each event queue.
    pub fn run(self, run_until: f64) -> Vec<Result<Vec<S>, String>> {
        let progress_counter = AtomicUsize::new(0);

        let execute = || {
            (0..self.num_replications)
                .into_par_iter()
                .map(|replication_id| {
                    let result = self.run_one(replication_id, run_until);

                    let completed = progress_counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback(completed, self.num_replications);
                    }
                    result
                })
                .collect()
        };

        // Fall back to the global pool if a dedicated one cannot be built
        let pool = self
            .num_threads
            .and_then(|n| rayon::ThreadPoolBuilder::new().num_threads(n).build().ok());

        match pool {
            Some(pool) => pool.install(execute),
            None => execute(),
        }
    }
}

/// Run replications in parallel with the default thread pool
pub fn run_parallel<T, S, E, F>(
    num_replications: usize,
    builder: F,
    run_until: f64,
) -> Vec<Result<Vec<S>, String>>
where
    F: Fn(usize) -> Result<EventLoop<T, S, E>, E> + Send + Sync,
    S: Send,
    E: From<Error> + Display,
{
    ParallelRunner::new(num_replications, builder).run(run_until)
}

/// Run replications in batches to limit the number of live event loops
pub fn run_batched<T, S, E, F>(
    num_replications: usize,
    batch_size: usize,
    builder: F,
    run_until: f64,
) -> Vec<Result<Vec<S>, String>>
where
    F: Fn(usize) -> Result<EventLoop<T, S, E>, E> + Send + Sync,
    S: Send,
    E: From<Error> + Display,
{
    let mut all_results = Vec::with_capacity(num_replications);

    for batch_start in (0..num_replications).step_by(batch_size.max(1)) {
        let batch_end = (batch_start + batch_size.max(1)).min(num_replications);
        let batch_results = run_parallel(
            batch_end - batch_start,
            |local_id| builder(batch_start + local_id),
            run_until,
        );
        all_results.extend(batch_results);
    }

    all_results
}

/// Progress callback that logs every `interval` completed replications
pub fn simple_progress_reporter(interval: usize) -> impl Fn(usize, usize) + Send + Sync {
    let interval = interval.max(1);
    move |completed, total| {
        if completed % interval == 0 || completed == total {
            tracing::info!("completed {}/{} replications", completed, total);
        }
    }
}
