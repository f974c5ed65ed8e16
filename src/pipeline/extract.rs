//! Per-page extraction: one rendered page in, one [`ExtractionResult`] out.
//!
//! The client never returns an error. Encoding failures, service errors,
//! timeouts and blank replies all become a failed result so the orchestrator
//! can move on to the next page. There are no retries: a failed page stays
//! failed.

use crate::config::ExtractionConfig;
use crate::error::PageError;
use crate::output::{ExtractionResult, Page};
use crate::pipeline::encode::encode_page;
use crate::pipeline::llm::ExtractionService;
use crate::pipeline::postprocess::clean_response;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Sends pages to an [`ExtractionService`] with a fixed instruction.
#[derive(Clone)]
pub struct ExtractionClient {
    service: Arc<dyn ExtractionService>,
    instruction: String,
    timeout: Duration,
}

impl ExtractionClient {
    pub fn new(service: Arc<dyn ExtractionService>, config: &ExtractionConfig) -> Self {
        Self {
            service,
            instruction: config.instruction().to_string(),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Extract one page. Consumes the page; its image is dropped once encoded.
    pub async fn extract(&self, page: Page) -> ExtractionResult {
        let start = Instant::now();
        let page_index = page.index;
        let page_num = page.page_num();

        let image = match encode_page(&page) {
            Ok(image) => image,
            Err(e) => return self.failed(page_index, e, start),
        };
        drop(page);

        let call = self.service.extract(&self.instruction, image);
        let reply = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                let err = PageError::ServiceFailed {
                    page: page_num,
                    detail: e.to_string(),
                };
                return self.failed(page_index, err, start);
            }
            Err(_) => {
                let err = PageError::Timeout {
                    page: page_num,
                    secs: self.timeout.as_secs(),
                };
                return self.failed(page_index, err, start);
            }
        };

        let content = clean_response(&reply.text);
        if content.is_empty() {
            return self.failed(page_index, PageError::EmptyResponse { page: page_num }, start);
        }

        let duration = start.elapsed();
        debug!(
            "Page {}: {} chars, {} input tokens, {} output tokens, {:?}",
            page_num,
            content.len(),
            reply.input_tokens,
            reply.output_tokens,
            duration
        );

        ExtractionResult {
            page_index,
            content,
            input_tokens: reply.input_tokens,
            output_tokens: reply.output_tokens,
            duration_ms: duration.as_millis() as u64,
            error: None,
        }
    }

    fn failed(&self, page_index: usize, error: PageError, start: Instant) -> ExtractionResult {
        warn!("{}", error);
        let mut result = ExtractionResult::failure(page_index, error);
        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }
}
