use crate::error::{EngineError, EngineResult};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;

/// Bounded worker pool for per-frame cell evaluation.
///
/// [`Scheduler::run`] keeps at most `workers` jobs in flight, refills a slot as soon as a
/// result arrives, and returns only after every submitted job has reported back. Results
/// are handed to the caller's fold on the calling thread, one at a time.
pub struct Scheduler {
    pool: rayon::ThreadPool,
    workers: usize,
}

/// Counters for one [`Scheduler::run`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub submitted: usize,
    pub completed: usize,
    pub peak_in_flight: usize,
}

impl Scheduler {
    pub fn new(workers: usize) -> EngineResult<Self> {
        if workers == 0 {
            return Err(EngineError::config("workers", "must be >= 1"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("cell-worker-{i}"))
            .build()
            .map_err(|err| EngineError::WorkerPool {
                reason: err.to_string(),
            })?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `task` over every job and folds each result as it completes.
    ///
    /// A panicking task does not wedge the drain: the remaining jobs still finish and the
    /// call reports [`EngineError::TaskPanicked`].
    pub fn run<J, R, T, F>(&self, jobs: Vec<J>, task: T, mut fold: F) -> EngineResult<RunStats>
    where
        J: Send,
        R: Send,
        T: Fn(J) -> R + Sync,
        F: FnMut(R),
    {
        let mut stats = RunStats {
            submitted: jobs.len(),
            ..RunStats::default()
        };
        if jobs.is_empty() {
            return Ok(stats);
        }

        let (tx, rx) = mpsc::sync_channel::<Option<R>>(self.workers);
        let task = &task;
        let mut failed = 0usize;

        self.pool.in_place_scope(|scope| {
            let mut pending = jobs.into_iter();
            let mut in_flight = 0usize;
            let dispatch = |job: J| {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| task(job))).ok();
                    // The receiver outlives the scope, so the send cannot fail.
                    let _ = tx.send(result);
                });
            };

            for job in pending.by_ref().take(self.workers) {
                dispatch(job);
                in_flight += 1;
            }
            stats.peak_in_flight = in_flight;

            while in_flight > 0 {
                let Ok(message) = rx.recv() else { break };
                in_flight -= 1;
                match message {
                    Some(result) => {
                        fold(result);
                        stats.completed += 1;
                    }
                    None => failed += 1,
                }
                if let Some(job) = pending.next() {
                    dispatch(job);
                    in_flight += 1;
                }
            }
        });

        if failed > 0 {
            tracing::error!(failed, "cell evaluation tasks panicked");
            return Err(EngineError::TaskPanicked { failed });
        }
        Ok(stats)
    }
}
