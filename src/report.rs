use serde::Serialize;
use std::fmt::Write as _;
use std::future::Future;

use crate::search::SearchOutcome;

/// One burst as it appears in a [`SearchReport`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BurstReport {
    pub workers: usize,
    pub total: u64,
    /// Writes per second over the measured window.
    pub rate: f64,
}

/// The processed, presentation-ready form of a [`SearchOutcome`].
///
/// Pure data: building a report performs no I/O. Sending it somewhere is the
/// job of a [`Reporter`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchReport {
    pub bursts: Vec<BurstReport>,
    pub best_workers: Option<usize>,
    pub best_total: u64,
    /// `None` when the power limit was reached before throughput stopped rising.
    pub plateau: Option<usize>,
}

impl From<&SearchOutcome> for SearchReport {
    fn from(outcome: &SearchOutcome) -> Self {
        Self {
            bursts: outcome
                .samples
                .iter()
                .map(|s| BurstReport {
                    workers: s.workers,
                    total: s.total,
                    rate: s.rate(),
                })
                .collect(),
            best_workers: outcome.best_workers,
            best_total: outcome.best_total,
            plateau: outcome.plateau,
        }
    }
}

/// Consumes a [`SearchReport`] and sends it somewhere.
pub trait Reporter {
    fn report(
        &self,
        report: &SearchReport,
    ) -> impl Future<Output = Result<(), Box<dyn std::error::Error>>>;
}

/// Plain text on stdout, one line per burst.
pub struct StdoutReporter;

impl StdoutReporter {
    pub fn render(report: &SearchReport) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        for b in &report.bursts {
            let _ = writeln!(
                out,
                "{:>8} workers: {:>12} writes ({:.1}/s)",
                b.workers, b.total, b.rate
            );
        }
        if report.plateau.is_none() && !report.bursts.is_empty() {
            out.push_str("No plateau within the power limit\n");
        }
        match report.best_workers {
            Some(w) => {
                let _ = writeln!(out, "Best: {w} workers, {} writes", report.best_total);
            }
            None => out.push_str("Best: no throughput measured\n"),
        }
        out
    }
}

impl Reporter for StdoutReporter {
    async fn report(&self, report: &SearchReport) -> Result<(), Box<dyn std::error::Error>> {
        print!("{}", Self::render(report));
        Ok(())
    }
}

/// The report serialized as a single JSON document on stdout.
pub struct JsonReporter;

impl Reporter for JsonReporter {
    async fn report(&self, report: &SearchReport) -> Result<(), Box<dyn std::error::Error>> {
        let value = serde_json::to_string(report)?;
        println!("{value}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;
    use std::time::Duration;

    fn outcome() -> SearchOutcome {
        SearchOutcome {
            best_total: 40,
            best_workers: Some(4),
            plateau: Some(4),
            samples: vec![
                Sample::new(vec![10], Duration::from_secs(2)),
                Sample::new(vec![20, 20, 0, 0], Duration::from_secs(2)),
            ],
        }
    }

    #[test]
    fn report_keeps_burst_order_and_rates() {
        let report = SearchReport::from(&outcome());
        assert_eq!(
            report.bursts,
            vec![
                BurstReport {
                    workers: 1,
                    total: 10,
                    rate: 5.0,
                },
                BurstReport {
                    workers: 4,
                    total: 40,
                    rate: 20.0,
                },
            ]
        );
        assert_eq!(report.best_workers, Some(4));
    }

    #[test]
    fn text_ends_with_best() {
        let text = StdoutReporter::render(&SearchReport::from(&outcome()));
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.lines().last(), Some("Best: 4 workers, 40 writes"));

        let empty = StdoutReporter::render(&SearchReport::from(&SearchOutcome::default()));
        assert_eq!(empty, "Best: no throughput measured\n");
    }

    #[test]
    fn text_notes_missing_plateau() {
        let mut outcome = outcome();
        outcome.plateau = None;

        let text = StdoutReporter::render(&SearchReport::from(&outcome));

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "No plateau within the power limit");
    }

    #[test]
    fn json_shape() {
        let value = serde_json::to_value(SearchReport::from(&outcome())).unwrap();
        assert_eq!(value["best_total"], 40);
        assert_eq!(value["bursts"][0]["workers"], 1);
        assert_eq!(value["bursts"][1]["rate"], 20.0);
    }
}
