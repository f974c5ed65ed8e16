//! Pipeline orchestration: render once, then extract page by page.
//!
//! Pages are processed strictly in index order, one request at a time. Each
//! extraction call is a blocking round trip to the service and page counts
//! are small, so there is no fan-out. Every page ends up with exactly one
//! [`ExtractionResult`], whether it succeeded, failed or was skipped by
//! cancellation.

use crate::aggregate::aggregate;
use crate::config::{ExtractionConfig, ServiceSettings};
use crate::error::{ExtractError, PageError};
use crate::output::{ExtractionOutput, ExtractionResult, ExtractionStats};
use crate::pipeline::extract::ExtractionClient;
use crate::pipeline::llm::{ExtractionService, LlmExtractionService};
use crate::pipeline::render::{PageRenderer, PdfiumRenderer};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Cooperative cancellation flag, checked between pages.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a [`PageRenderer`] and an [`ExtractionClient`] over one document.
pub struct PipelineOrchestrator {
    renderer: Arc<dyn PageRenderer>,
    client: ExtractionClient,
    progress: ProgressCallback,
    cancel: CancelFlag,
}

impl PipelineOrchestrator {
    pub fn new(renderer: Arc<dyn PageRenderer>, client: ExtractionClient) -> Self {
        Self {
            renderer,
            client,
            progress: Arc::new(NoopProgressCallback),
            cancel: CancelFlag::new(),
        }
    }

    /// Wire the pdfium renderer and an LLM-backed service from configuration.
    pub fn from_config(
        config: &ExtractionConfig,
        settings: &ServiceSettings,
    ) -> Result<Self, ExtractError> {
        let service: Arc<dyn ExtractionService> =
            Arc::new(LlmExtractionService::from_settings(settings, config)?);
        Ok(Self::new(
            Arc::new(PdfiumRenderer::new(config)),
            ExtractionClient::new(service, config),
        ))
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for cancelling a run from another task.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Render `document` and extract every page in order.
    ///
    /// Returns one result per page. Page failures are recorded in their
    /// result and never abort the run.
    ///
    /// # Errors
    /// Only rendering errors: [`ExtractError::DocumentFormat`],
    /// [`ExtractError::EmptyDocument`], [`ExtractError::PdfiumBindingFailed`].
    /// No progress signal is emitted and no service call is made in that case.
    pub async fn run(&self, document: &[u8]) -> Result<Vec<ExtractionResult>, ExtractError> {
        self.run_timed(document).await.map(|(results, _)| results)
    }

    /// Run the pipeline, aggregate the results and compute run statistics.
    ///
    /// # Errors
    /// Rendering errors as for [`PipelineOrchestrator::run`], and
    /// [`ExtractError::NoDataExtracted`] once every page has been attempted
    /// without success.
    pub async fn extract(&self, document: &[u8]) -> Result<ExtractionOutput, ExtractError> {
        let (results, stats) = self.run_with_stats(document).await?;
        let dataset = aggregate(&results)?;

        info!(
            "Extraction complete: {}/{} pages, {} rows, {}ms total",
            stats.succeeded_pages,
            stats.total_pages,
            dataset.len(),
            stats.total_duration_ms
        );

        Ok(ExtractionOutput {
            results,
            dataset,
            stats,
        })
    }

    /// Run the pipeline and compute statistics, including durations, without
    /// aggregating.
    pub(crate) async fn run_with_stats(
        &self,
        document: &[u8],
    ) -> Result<(Vec<ExtractionResult>, ExtractionStats), ExtractError> {
        let total_start = Instant::now();
        let (results, render_duration_ms) = self.run_timed(document).await?;

        let stats = ExtractionStats {
            render_duration_ms,
            extraction_duration_ms: results.iter().map(|r| r.duration_ms).sum(),
            total_duration_ms: total_start.elapsed().as_millis() as u64,
            ..ExtractionStats::from_results(&results)
        };
        Ok((results, stats))
    }

    async fn run_timed(
        &self,
        document: &[u8],
    ) -> Result<(Vec<ExtractionResult>, u64), ExtractError> {
        // ── Step 1: Rasterise pages ──────────────────────────────────────────
        let render_start = Instant::now();
        let renderer = Arc::clone(&self.renderer);
        let bytes = document.to_vec();
        let pages = tokio::task::spawn_blocking(move || renderer.render(&bytes))
            .await
            .map_err(|e| ExtractError::Internal(format!("Render task panicked: {}", e)))??;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;

        if pages.is_empty() {
            return Err(ExtractError::EmptyDocument);
        }
        let total_pages = pages.len();
        info!("Rendered {} pages in {}ms", total_pages, render_duration_ms);

        // ── Step 2: Extract pages in order ───────────────────────────────────
        self.progress.on_run_start(total_pages);
        let mut results = Vec::with_capacity(total_pages);

        for (done, page) in pages.into_iter().enumerate() {
            let page_num = page.page_num();

            if self.cancel.is_cancelled() {
                warn!("Run cancelled; page {} skipped", page_num);
                results.push(ExtractionResult::failure(
                    page.index,
                    PageError::Cancelled { page: page_num },
                ));
                continue;
            }

            self.progress.on_page_start(page_num, total_pages);
            let result = self.client.extract(page).await;

            match &result.error {
                None => self
                    .progress
                    .on_page_complete(page_num, total_pages, &result.content),
                Some(e) => self
                    .progress
                    .on_page_error(page_num, total_pages, e.to_string()),
            }
            results.push(result);
            self.progress.on_progress(done + 1, total_pages);
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        self.progress.on_run_complete(total_pages, succeeded);

        Ok((results, render_duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::output::Page;
    use crate::pipeline::llm::ServiceReply;
    use async_trait::async_trait;
    use edgequake_llm::ImageData;
    use image::{DynamicImage, RgbImage};
    use std::sync::atomic::AtomicUsize;

    struct BlankPages(usize);

    impl PageRenderer for BlankPages {
        fn render(&self, _document: &[u8]) -> Result<Vec<Page>, ExtractError> {
            Ok((0..self.0)
                .map(|i| Page::new(i, DynamicImage::ImageRgb8(RgbImage::new(2, 2))))
                .collect())
        }
    }

    /// Echoes the call number; cancels the run after the first call.
    struct CancelAfterFirst {
        calls: AtomicUsize,
        cancel: CancelFlag,
    }

    #[async_trait]
    impl ExtractionService for CancelAfterFirst {
        async fn extract(&self, _: &str, _: ImageData) -> Result<ServiceReply, ServiceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.cancel.cancel();
            Ok(ServiceReply::text(format!("call {n}")))
        }
    }

    #[tokio::test]
    async fn cancellation_skips_remaining_pages() {
        let cancel = CancelFlag::new();
        let service = Arc::new(CancelAfterFirst {
            calls: AtomicUsize::new(0),
            cancel: cancel.clone(),
        });
        let client = ExtractionClient::new(service.clone(), &ExtractionConfig::default());
        let orchestrator = PipelineOrchestrator::new(Arc::new(BlankPages(3)), client)
            .with_cancel_flag(cancel);

        let results = orchestrator.run(b"%PDF").await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert_eq!(results[1].error, Some(PageError::Cancelled { page: 2 }));
        assert_eq!(results[2].error, Some(PageError::Cancelled { page: 3 }));
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_render_is_empty_document() {
        let service = Arc::new(CancelAfterFirst {
            calls: AtomicUsize::new(0),
            cancel: CancelFlag::new(),
        });
        let client = ExtractionClient::new(service.clone(), &ExtractionConfig::default());
        let orchestrator = PipelineOrchestrator::new(Arc::new(BlankPages(0)), client);

        let err = orchestrator.run(b"%PDF").await.unwrap_err();
        assert!(matches!(err, ExtractError::EmptyDocument));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_flag_clones_share_state() {
        let a = CancelFlag::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }
}
