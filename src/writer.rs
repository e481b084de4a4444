use std::future::Future;

/// Failures a [`Writer`] can report.
///
/// The worker loop folds `Connect` and `Write` into a failed outcome for the
/// whole burst. `Close` is only ever logged.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("failed to open a session: {0}")]
    Connect(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("failed to close the session: {0}")]
    Close(String),
}

/// The datastore capability driven by every worker of a burst.
///
/// A `Writer` hands out one [`Writer::Session`] per worker and performs a
/// single unit of work per [`Writer::write`] call. Workers own their session
/// for the whole burst, so sessions never need to be shared.
///
/// Workers call `write` in a tight loop and never yield on their own. The
/// returned futures must reach a real await point (network I/O, a channel,
/// `tokio::task::yield_now`) or a burst with more workers than runtime
/// threads will starve the timer that ends it.
///
/// # Example
/// ```rust
/// use saturn::{Writer, WriterError};
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// #[derive(Default)]
/// struct Counting(AtomicU64);
///
/// impl Writer for Counting {
///     type Session = ();
///
///     async fn open(&self) -> Result<(), WriterError> {
///         Ok(())
///     }
///
///     async fn write(&self, _: &mut (), _seq: u64) -> Result<(), WriterError> {
///         self.0.fetch_add(1, Ordering::Relaxed);
///         tokio::task::yield_now().await;
///         Ok(())
///     }
///
///     async fn close(&self, _: ()) -> Result<(), WriterError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Writer
where
    Self: Send + Sync + 'static,
{
    /// Per-worker connection state.
    type Session: Send;

    /// Acquire a fresh session for one worker.
    fn open(&self) -> impl Future<Output = Result<Self::Session, WriterError>> + Send;

    /// Perform one write. `seq` is the worker-local iteration number.
    fn write(
        &self,
        session: &mut Self::Session,
        seq: u64,
    ) -> impl Future<Output = Result<(), WriterError>> + Send;

    /// Release a session. Best effort: errors are ignored by the caller.
    fn close(&self, session: Self::Session) -> impl Future<Output = Result<(), WriterError>> + Send;
}
