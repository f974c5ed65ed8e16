//! In-memory session state: the results of the latest run and the reset
//! boundary.
//!
//! `process` and `reset` both take `&mut self`, so a reset can never
//! interleave with a run in progress.

use crate::aggregate::{aggregate, AggregatedDataset};
use crate::error::ExtractError;
use crate::orchestrator::PipelineOrchestrator;
use crate::output::{ExtractionResult, ExtractionStats};
use tracing::debug;

/// Holds the results of the most recent run until the next run or reset.
#[derive(Debug, Default)]
pub struct ExtractionSession {
    results: Vec<ExtractionResult>,
    dataset: Option<AggregatedDataset>,
    stats: Option<ExtractionStats>,
}

impl ExtractionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `orchestrator` over `document` and keep what it produced.
    ///
    /// * Document errors (unreadable PDF, zero pages, pdfium unavailable)
    ///   leave the previous state untouched.
    /// * [`ExtractError::NoDataExtracted`] replaces the previous state with the
    ///   new (all failed) results and no dataset.
    pub async fn process(
        &mut self,
        orchestrator: &PipelineOrchestrator,
        document: &[u8],
    ) -> Result<&AggregatedDataset, ExtractError> {
        let (results, stats) = orchestrator.run_with_stats(document).await?;

        let outcome = aggregate(&results);
        self.results = results;
        self.stats = Some(stats);

        match outcome {
            Ok(dataset) => Ok(&*self.dataset.insert(dataset)),
            Err(e) => {
                self.dataset = None;
                Err(e)
            }
        }
    }

    /// Per-page results of the last run, in page order.
    pub fn results(&self) -> &[ExtractionResult] {
        &self.results
    }

    pub fn dataset(&self) -> Option<&AggregatedDataset> {
        self.dataset.as_ref()
    }

    /// Page counts, token usage and durations of the last run.
    pub fn stats(&self) -> Option<&ExtractionStats> {
        self.stats.as_ref()
    }

    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    /// Clear everything. Calling it on an empty session does nothing.
    pub fn reset(&mut self) {
        if self.has_results() || self.dataset.is_some() {
            debug!("Session reset: dropping {} results", self.results.len());
        }
        self.results.clear();
        self.dataset = None;
        self.stats = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_is_idempotent() {
        let mut session = ExtractionSession::new();
        session.reset();
        assert!(!session.has_results());
        assert!(session.dataset().is_none());
        session.reset();
        assert!(session.stats().is_none());
    }
}
