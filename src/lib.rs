//! Saturn — find how many concurrent writers a datastore can take.
//!
//! Saturn answers one question: at which worker count does sustained insert
//! throughput stop increasing? It measures throughput in fixed-duration
//! bursts of concurrent writers and doubles the number of writers until a
//! burst no longer beats the best one so far.
//!
//! # Architecture
//!
//! The building blocks, leaf first:
//!
//! - [`Writer`]: the datastore capability. Opens a session per worker and
//!   performs one write per call. A PostgreSQL implementation lives in
//!   [`postgres`] (feature `postgres`, enabled by default).
//! - [`worker::run_worker`]: the worker loop. Writes until the burst's
//!   [`StopSignal`] is raised and reports a single [`WorkerOutcome`].
//! - [`Sampler`]: measures one burst at a given worker count.
//!   [`BurstSampler`] is the real one: it spawns the workers, waits out the
//!   burst window, raises the stop signal and joins every worker.
//! - [`Search`]: the doubling search driving a `Sampler`.
//! - [`Reporter`]: turns the final [`SearchReport`] into output.
//!
//! Failures travel up as values: a failed worker makes a failed sample, and
//! a failed sample ends the search with [`SearchError::SampleFailed`] naming
//! the power of two that broke.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use saturn::{BurstSampler, Search, postgres::PostgresWriter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sampler = BurstSampler::builder()
//!         .writer(Arc::new(PostgresWriter::new("postgres://mq@localhost/mq")))
//!         .duration(Duration::from_secs(3))
//!         .build();
//!
//!     let outcome = Search::builder().build().run(&sampler).await?;
//!     println!("best: {:?} workers", outcome.best_workers);
//!     Ok(())
//! }
//! ```
//!
//! # Feature flags
//!
//! - `postgres`: the [`postgres::PostgresWriter`].
//! - `cli`: the `saturn` binary; implies `postgres`. (Enabled by default)

#[cfg(feature = "postgres")]
pub mod postgres;
/// Presentation of search results
pub mod report;
/// Fixed-duration bursts of concurrent writers
pub mod sample;
/// The doubling search over worker counts
pub mod search;
/// The worker loop and its stop signal
pub mod worker;
/// The datastore capability
pub mod writer;

pub use report::{JsonReporter, Reporter, SearchReport, StdoutReporter};
pub use sample::{BurstSampler, Sample, SampleError, Sampler};
pub use search::{Search, SearchError, SearchOutcome};
pub use worker::{StopSignal, WorkerOutcome};
pub use writer::{Writer, WriterError};
