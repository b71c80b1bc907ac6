//! Collection of accepted results.

use crate::models::{DetailResult, FetchOutcome, ResultSet, RunSummary};

/// Accumulates outcomes into the run's result set and summary.
///
/// Owned by the single consumer of the dispatcher's completion stream, so
/// it needs no synchronisation of its own.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<DetailResult>,
    summary: RunSummary,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an outcome, keeping its result if it was accepted.
    pub fn add(&mut self, outcome: FetchOutcome) {
        self.summary.record(&outcome);
        if let FetchOutcome::Accepted(result) = outcome {
            self.results.push(result);
        }
    }

    /// Counts so far.
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Close the run, returning results in the order they were added.
    pub fn finalize(self) -> (ResultSet, RunSummary) {
        (ResultSet::new(self.results), self.summary)
    }
}
