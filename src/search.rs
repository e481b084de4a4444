//! Doubling search over the worker count.
//!
//! [`Search::run`] samples `2^p` workers for `p = start_power, start_power + 1, ...`
//! and stops at the first sample whose total is not strictly greater than the
//! best seen so far. A burst of zero writes on the very first sample therefore
//! ends the search immediately.
//!
//! Reaching `max_power` while totals are still rising is not an error: the
//! search ends with no plateau and the best sample seen so far.
//!
//! With `refine` enabled, the gap between the last improving power of two and
//! the plateau is then walked one worker at a time, again stopping at the
//! first non-improvement.

use serde::Serialize;
use typed_builder::TypedBuilder;

use crate::sample::{Sample, SampleError, Sampler};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("failed to sample 2^{power} = {workers} workers")]
    SampleFailed {
        power: u32,
        workers: usize,
        #[source]
        source: SampleError,
    },
    #[error("failed to sample {workers} workers while refining")]
    RefineFailed {
        workers: usize,
        #[source]
        source: SampleError,
    },
}

/// Where the search ended up.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// Highest total seen; 0 if nothing improved on an empty burst.
    pub best_total: u64,
    /// Worker count that produced `best_total`.
    pub best_workers: Option<usize>,
    /// Worker count of the first burst that did not improve; `None` if the
    /// power limit was reached first.
    pub plateau: Option<usize>,
    /// Every sample taken, in order.
    pub samples: Vec<Sample>,
}

impl SearchOutcome {
    /// Record `sample` and report whether it beat the best total.
    fn offer(&mut self, sample: Sample) -> bool {
        let improved = sample.total > self.best_total;
        if improved {
            self.best_total = sample.total;
            self.best_workers = Some(sample.workers);
        }
        self.samples.push(sample);
        improved
    }
}

#[derive(Clone, Debug, TypedBuilder)]
pub struct Search {
    /// Exponent of the first worker count.
    #[builder(default = 0)]
    pub start_power: u32,
    /// Largest exponent the search may reach.
    #[builder(default = 20)]
    pub max_power: u32,
    /// Walk the gap below the plateau linearly once doubling stops.
    #[builder(default = false)]
    pub refine: bool,
}

impl Search {
    pub async fn run<S: Sampler>(&self, sampler: &S) -> Result<SearchOutcome, SearchError> {
        let mut outcome = SearchOutcome::default();
        let mut power = self.start_power;

        let plateau = loop {
            let Some(workers) = self.workers_at(power) else {
                tracing::warn!(
                    "No plateau up to 2^{} workers, best total {}",
                    self.max_power,
                    outcome.best_total
                );
                return Ok(outcome);
            };
            let sample = sampler
                .sample(workers)
                .await
                .map_err(|source| SearchError::SampleFailed {
                    power,
                    workers,
                    source,
                })?;
            if !outcome.offer(sample) {
                break workers;
            }
            power += 1;
        };
        outcome.plateau = Some(plateau);
        tracing::info!(
            "Plateau at {plateau} workers, best total {}",
            outcome.best_total
        );

        if self.refine {
            self.refine_below(sampler, plateau, &mut outcome).await?;
        }
        Ok(outcome)
    }

    async fn refine_below<S: Sampler>(
        &self,
        sampler: &S,
        plateau: usize,
        outcome: &mut SearchOutcome,
    ) -> Result<(), SearchError> {
        // nothing to refine if the first burst already plateaued
        let Some(from) = outcome.best_workers else {
            return Ok(());
        };
        for workers in from + 1..plateau {
            let sample = sampler
                .sample(workers)
                .await
                .map_err(|source| SearchError::RefineFailed { workers, source })?;
            if !outcome.offer(sample) {
                break;
            }
        }
        tracing::info!(
            "Refined to {:?} workers, best total {}",
            outcome.best_workers,
            outcome.best_total
        );
        Ok(())
    }

    /// `2^power`, or `None` past `max_power` or the width of `usize`.
    fn workers_at(&self, power: u32) -> Option<usize> {
        if power > self.max_power {
            return None;
        }
        1usize.checked_shl(power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::VecDeque, sync::Mutex, time::Duration};

    /// Replays scripted totals and records which worker counts were asked for.
    struct Scripted {
        totals: Mutex<VecDeque<Option<u64>>>,
        calls: Mutex<Vec<usize>>,
    }

    impl Scripted {
        fn new(totals: impl IntoIterator<Item = Option<u64>>) -> Self {
            Self {
                totals: Mutex::new(totals.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn ok(totals: &[u64]) -> Self {
            Self::new(totals.iter().copied().map(Some))
        }

        fn calls(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Sampler for Scripted {
        async fn sample(&self, workers: usize) -> Result<Sample, SampleError> {
            self.calls.lock().unwrap().push(workers);
            let next = self
                .totals
                .lock()
                .unwrap()
                .pop_front()
                .expect("sampled more often than scripted");
            match next {
                Some(total) => {
                    let mut counts = vec![0; workers];
                    counts[0] = total;
                    Ok(Sample::new(counts, Duration::from_secs(1)))
                }
                None => Err(SampleError::WorkerFailed {
                    workers,
                    failed: vec![1],
                }),
            }
        }
    }

    fn doubling() -> Search {
        Search::builder().build()
    }

    fn refining(start_power: u32) -> Search {
        Search::builder()
            .start_power(start_power)
            .refine(true)
            .build()
    }

    #[tokio::test]
    async fn stops_at_first_non_increase() {
        let sampler = Scripted::ok(&[10, 25, 40, 38]);

        let outcome = doubling().run(&sampler).await.unwrap();

        assert_eq!(sampler.calls(), vec![1, 2, 4, 8]);
        assert_eq!(outcome.best_total, 40);
        assert_eq!(outcome.best_workers, Some(4));
        assert_eq!(outcome.plateau, Some(8));
        assert_eq!(outcome.samples.len(), 4);
    }

    #[tokio::test]
    async fn equal_total_counts_as_plateau() {
        let sampler = Scripted::ok(&[10, 10]);

        let outcome = doubling().run(&sampler).await.unwrap();

        assert_eq!(sampler.calls(), vec![1, 2]);
        assert_eq!(outcome.best_workers, Some(1));
    }

    #[tokio::test]
    async fn first_failure_aborts_without_second_sample() {
        let sampler = Scripted::new([None]);

        let err = doubling().run(&sampler).await.unwrap_err();

        assert!(matches!(
            err,
            SearchError::SampleFailed {
                power: 0,
                workers: 1,
                ..
            }
        ));
        assert_eq!(sampler.calls(), vec![1]);
    }

    #[tokio::test]
    async fn later_failure_names_its_power() {
        let sampler = Scripted::new([Some(5), Some(9), None]);
        let search = Search::builder().start_power(2).build();

        let err = search.run(&sampler).await.unwrap_err();

        assert_eq!(err.to_string(), "failed to sample 2^4 = 16 workers");
        assert_eq!(sampler.calls(), vec![4, 8, 16]);
    }

    #[tokio::test]
    async fn zero_throughput_first_sample_plateaus() {
        let sampler = Scripted::ok(&[0]);

        let outcome = refining(0).run(&sampler).await.unwrap();

        assert_eq!(sampler.calls(), vec![1]);
        assert_eq!(outcome.best_total, 0);
        assert_eq!(outcome.best_workers, None);
    }

    #[tokio::test]
    async fn max_power_ends_without_plateau() {
        let sampler = Scripted::ok(&[1, 2, 3]);
        let search = Search::builder().max_power(2).refine(true).build();

        let outcome = search.run(&sampler).await.unwrap();

        assert_eq!(sampler.calls(), vec![1, 2, 4]);
        assert_eq!(outcome.plateau, None);
        assert_eq!(outcome.best_workers, Some(4));
        assert_eq!(outcome.best_total, 3);
    }

    #[tokio::test]
    async fn power_beyond_usize_samples_nothing() {
        let sampler = Scripted::ok(&[]);
        let search = Search::builder()
            .start_power(200)
            .max_power(u32::MAX)
            .build();

        let outcome = search.run(&sampler).await.unwrap();

        assert!(sampler.calls().is_empty());
        assert_eq!(outcome, SearchOutcome::default());
    }

    async fn check_refine(start_power: u32, totals: &[u64], calls: &[usize], best_workers: usize) {
        let sampler = Scripted::ok(totals);

        let outcome = refining(start_power).run(&sampler).await.unwrap();

        assert_eq!(sampler.calls(), calls, "totals {totals:?}");
        assert_eq!(outcome.best_workers, Some(best_workers), "totals {totals:?}");
    }

    #[tokio::test]
    async fn refine_walks_the_gap_below_the_plateau() {
        check_refine(0, &[1, 1], &[1, 2], 1).await;
        check_refine(0, &[1, 2, 1, 1], &[1, 2, 4, 3], 2).await;
        check_refine(0, &[1, 2, 1, 3], &[1, 2, 4, 3], 3).await;
        check_refine(0, &[1, 2, 3, 4, 5, 1, 1], &[1, 2, 4, 8, 16, 32, 17], 16).await;
        check_refine(0, &[1, 2, 3, 1, 4, 5, 1], &[1, 2, 4, 8, 5, 6, 7], 6).await;
        check_refine(2, &[1, 1, 1], &[4, 8, 5], 4).await;
    }

    #[tokio::test]
    async fn refine_failure_is_reported() {
        let sampler = Scripted::new([Some(1), Some(2), Some(1), None]);

        let err = refining(0).run(&sampler).await.unwrap_err();

        assert!(matches!(err, SearchError::RefineFailed { workers: 3, .. }));
    }
}
