//! The worker loop: one task hammering the [`Writer`] until the burst ends.

use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use futures::FutureExt;
use tokio::sync::Barrier;

use crate::writer::Writer;

/// Shared flag that ends a burst.
///
/// Raised exactly once by the sampler and polled by every worker before each
/// write. A new burst always creates a new signal.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the signal to raised. Raising twice is a no-op.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What a single worker reports back at the end of a burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The worker wrote `count` times before seeing the stop signal.
    Completed(u64),
    /// The session could not be opened, or a write failed.
    Failed,
}

/// Run one worker to completion and return its outcome.
///
/// The worker opens its session and then waits on `start` together with its
/// siblings and the sampler, so the burst window only opens once everyone is
/// connected (or has failed to connect). After that it writes until `stop`
/// is raised. The first error ends the worker with [`WorkerOutcome::Failed`]
/// and discards its count. A panic inside `open` is caught so the barrier is
/// still reached; later panics are left to the sampler's join.
pub async fn run_worker<W: Writer>(
    id: usize,
    writer: Arc<W>,
    stop: StopSignal,
    start: Arc<Barrier>,
) -> WorkerOutcome {
    tracing::debug!("Worker {id} opening session.");
    let session = AssertUnwindSafe(writer.open()).catch_unwind().await;
    start.wait().await;

    let mut session = match session {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => {
            tracing::error!("Worker {id}: {e}");
            return WorkerOutcome::Failed;
        }
        Err(_) => {
            tracing::error!("Worker {id} panicked while opening its session.");
            return WorkerOutcome::Failed;
        }
    };
    tracing::debug!("Worker {id} started.");

    let mut count = 0u64;
    while !stop.is_raised() {
        if let Err(e) = writer.write(&mut session, count).await {
            tracing::error!("Worker {id}: {e}");
            // the session is abandoned rather than closed
            return WorkerOutcome::Failed;
        }
        count += 1;
    }

    tracing::debug!("Worker {id} stopping after {count} writes.");
    if let Err(e) = writer.close(session).await {
        tracing::debug!("Worker {id}: ignoring {e}");
    }
    WorkerOutcome::Completed(count)
}
