//! Data model shared by the pipeline stages.

use crate::aggregate::AggregatedDataset;
use crate::error::PageError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// One rendered page of a document.
///
/// Produced by a [`crate::pipeline::render::PageRenderer`] and handed by value
/// to [`crate::pipeline::extract::ExtractionClient::extract`].
#[derive(Debug, Clone)]
pub struct Page {
    /// 0-based position in the document.
    pub index: usize,
    pub image: DynamicImage,
}

impl Page {
    pub fn new(index: usize, image: DynamicImage) -> Self {
        Self { index, image }
    }

    /// 1-based page number, as shown to users.
    pub fn page_num(&self) -> usize {
        self.index + 1
    }
}

/// The outcome of extracting one page.
///
/// `error` is `None` on success, in which case `content` holds the cleaned
/// service response. On failure `content` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// 0-based page index.
    pub page_index: usize,
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub error: Option<PageError>,
}

impl ExtractionResult {
    pub fn success(page_index: usize, content: impl Into<String>) -> Self {
        Self {
            page_index,
            content: content.into(),
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            error: None,
        }
    }

    pub fn failure(page_index: usize, error: PageError) -> Self {
        Self {
            page_index,
            content: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// 1-based page number.
    pub fn page_num(&self) -> usize {
        self.page_index + 1
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_pages: usize,
    pub succeeded_pages: usize,
    pub failed_pages: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub render_duration_ms: u64,
    pub extraction_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl ExtractionStats {
    /// Tally page outcomes and token usage. Durations are left at zero.
    pub fn from_results(results: &[ExtractionResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        Self {
            total_pages: results.len(),
            succeeded_pages: succeeded,
            failed_pages: results.len() - succeeded,
            total_input_tokens: results.iter().map(|r| r.input_tokens as u64).sum(),
            total_output_tokens: results.iter().map(|r| r.output_tokens as u64).sum(),
            ..Default::default()
        }
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    /// One entry per page, in page order.
    pub results: Vec<ExtractionResult>,
    pub dataset: AggregatedDataset,
    pub stats: ExtractionStats,
}
