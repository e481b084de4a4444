//! Sampler — one fixed-duration burst of concurrent writers.
//!
//! A burst spawns `n` worker tasks, lets them write for a fixed window and
//! reduces their outcomes into a single [`Sample`].
//!
//! # High-level flow
//! 1. A fresh [`StopSignal`] and a start [`Barrier`] sized for `n + 1`
//!    parties are created.
//! 2. `n` worker tasks are spawned with ids `1..=n`. Each opens its session
//!    and waits on the barrier.
//! 3. Once the barrier releases, the sampler sleeps until the burst deadline,
//!    logging a countdown every `tick`.
//! 4. The stop signal is raised and every worker task is joined. No subset
//!    is ever used: the join waits for all `n` outcomes.
//! 5. Any [`WorkerOutcome::Failed`] turns the burst into a
//!    [`SampleError::WorkerFailed`]; otherwise the counts are summed.
//!
//! A worker stuck inside [`Writer::write`] blocks step 4 indefinitely.
//! Timeouts are the writer's job.

use std::{future::Future, sync::Arc, time::Duration};

use futures::future::join_all;
use serde::Serialize;
use tokio::{sync::Barrier, time::Instant};
use typed_builder::TypedBuilder;

use crate::{
    worker::{run_worker, StopSignal, WorkerOutcome},
    writer::Writer,
};

/// The throughput measured by one successful burst.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sample {
    /// Number of concurrent workers in the burst.
    pub workers: usize,
    /// Completed writes per worker, indexed by `worker id - 1`.
    pub counts: Vec<u64>,
    /// Sum of `counts`.
    pub total: u64,
    /// Measured burst window, from start barrier release to stop signal.
    pub elapsed: Duration,
}

impl Sample {
    pub fn new(counts: Vec<u64>, elapsed: Duration) -> Self {
        Self {
            workers: counts.len(),
            total: counts.iter().sum(),
            counts,
            elapsed,
        }
    }

    /// Writes per second over the measured window.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total as f64 / secs
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("a burst needs at least one worker")]
    NoWorkers,
    #[error("{} of {workers} workers failed (ids {failed:?})", failed.len())]
    WorkerFailed { workers: usize, failed: Vec<usize> },
}

/// Anything that can measure throughput at a given worker count.
///
/// The search driver only talks to this trait, which keeps it testable with
/// scripted samples.
pub trait Sampler
where
    Self: Send + Sync,
{
    fn sample(&self, workers: usize) -> impl Future<Output = Result<Sample, SampleError>> + Send;
}

/// Runs real bursts of [`run_worker`] tasks against a [`Writer`].
#[derive(TypedBuilder)]
pub struct BurstSampler<W: Writer> {
    /// The writer shared by every worker of every burst.
    pub writer: Arc<W>,
    /// Length of the burst window.
    #[builder(default = Duration::from_secs(3))]
    pub duration: Duration,
    /// Interval between countdown log lines.
    #[builder(default = Duration::from_secs(1))]
    pub tick: Duration,
}

impl<W: Writer> Sampler for BurstSampler<W> {
    async fn sample(&self, workers: usize) -> Result<Sample, SampleError> {
        if workers == 0 {
            return Err(SampleError::NoWorkers);
        }
        tracing::info!("Starting {workers} workers");

        let stop = StopSignal::new();
        let start = Arc::new(Barrier::new(workers + 1));
        let handles: Vec<_> = (1..=workers)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    Arc::clone(&self.writer),
                    stop.clone(),
                    Arc::clone(&start),
                ))
            })
            .collect();

        start.wait().await;
        let started = Instant::now();
        countdown(started + self.duration, self.tick).await;
        stop.raise();
        let elapsed = started.elapsed();

        tracing::debug!("Joining {workers} workers...");
        let outcomes = join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(i, res)| match res {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Worker {} panicked: {e}", i + 1);
                    WorkerOutcome::Failed
                }
            });

        let (counts, failed) = reduce(outcomes);
        if !failed.is_empty() {
            return Err(SampleError::WorkerFailed { workers, failed });
        }

        for (i, count) in counts.iter().enumerate() {
            tracing::info!("Worker {}: {count}", i + 1);
        }
        let sample = Sample::new(counts, elapsed);
        tracing::info!("Total: {} ({:.1}/s)", sample.total, sample.rate());
        Ok(sample)
    }
}

/// Sleep until `deadline`, logging the whole seconds left every `tick`.
async fn countdown(deadline: Instant, tick: Duration) {
    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let left = deadline - now;
        tracing::info!("{}s", left.as_secs_f64().ceil() as u64);
        tokio::time::sleep_until(deadline.min(now + tick)).await;
    }
}

/// Split outcomes into per-worker counts and the ids of failed workers.
fn reduce(outcomes: impl IntoIterator<Item = WorkerOutcome>) -> (Vec<u64>, Vec<usize>) {
    let mut counts = Vec::new();
    let mut failed = Vec::new();
    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            WorkerOutcome::Completed(c) => counts.push(c),
            WorkerOutcome::Failed => {
                counts.push(0);
                failed.push(i + 1);
            }
        }
    }
    (counts, failed)
}
