//! Error types for the pdf-data-extractor library.
//!
//! Two error types cover two kinds of failure:
//!
//! * [`ExtractError`] is **fatal** for the current run: the document could
//!   not be opened, it has no pages, the extraction service is not
//!   configured, or no page produced any data. Returned as
//!   `Err(ExtractError)` from the orchestrator and the aggregator.
//!
//! * [`PageError`] is **page-local**: one page failed (service error,
//!   timeout, unusable response) while the other pages carry on. It is
//!   stored inside [`crate::output::ExtractionResult`] so the run always
//!   yields one result per page.
//!
//! Every `Display` message is written for a human reader; the CLI prints
//! them as-is.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-data-extractor library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Document errors ───────────────────────────────────────────────────
    /// The uploaded bytes are not a readable PDF.
    #[error("The uploaded file is not a readable PDF: {detail}")]
    DocumentFormat { detail: String },

    /// The PDF opened but contains no pages.
    #[error("The PDF contains no pages; nothing to extract.")]
    EmptyDocument,

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Every page was attempted and none produced usable content.
    #[error("No data was extracted from the PDF: all {total} pages failed.\nFirst error: {first_error}")]
    NoDataExtracted { total: usize, first_error: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Credentials for the extraction service are missing or the provider
    /// could not be created.
    #[error("Extraction service '{provider}' is not configured.\n{hint}")]
    Configuration { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Rendering needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Export errors ─────────────────────────────────────────────────────
    /// CSV serialisation or parsing failed.
    #[error("CSV export failed: {0}")]
    CsvFailed(String),

    /// Could not create or write the exported file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// True for errors raised before any page reached the extraction service.
    ///
    /// A session keeps its previous results when a run fails this way.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            ExtractError::DocumentFormat { .. }
                | ExtractError::EmptyDocument
                | ExtractError::PdfiumBindingFailed(_)
        )
    }
}

impl From<csv::Error> for ExtractError {
    fn from(e: csv::Error) -> Self {
        ExtractError::CsvFailed(e.to_string())
    }
}

/// A non-fatal error for a single page. Page numbers are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The extraction service returned an error (transport, quota, API).
    #[error("Page {page}: extraction service error: {detail}")]
    ServiceFailed { page: usize, detail: String },

    /// The extraction call did not answer in time.
    #[error("Page {page}: extraction service timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },

    /// The rendered page could not be encoded for upload.
    #[error("Page {page}: image encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The service answered with nothing but whitespace.
    #[error("Page {page}: extraction service returned an empty response")]
    EmptyResponse { page: usize },

    /// The run was cancelled before this page was attempted.
    #[error("Page {page}: skipped, run was cancelled")]
    Cancelled { page: usize },
}

/// Error value returned by [`crate::pipeline::llm::ExtractionService`]
/// implementations.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_display() {
        let e = ExtractError::NoDataExtracted {
            total: 3,
            first_error: "Page 1: extraction service error: quota".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("all 3 pages"), "got: {msg}");
        assert!(msg.contains("quota"), "got: {msg}");
    }

    #[test]
    fn configuration_display() {
        let e = ExtractError::Configuration {
            provider: "gemini".into(),
            hint: "Set GEMINI_API_KEY".into(),
        };
        assert!(e.to_string().contains("gemini"));
        assert!(e.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn document_errors_are_classified() {
        assert!(ExtractError::EmptyDocument.is_document_error());
        assert!(ExtractError::DocumentFormat {
            detail: "bad xref".into()
        }
        .is_document_error());
        assert!(!ExtractError::NoDataExtracted {
            total: 1,
            first_error: String::new()
        }
        .is_document_error());
    }

    #[test]
    fn page_error_display() {
        let e = PageError::Timeout { page: 2, secs: 60 };
        assert_eq!(e.to_string(), "Page 2: extraction service timed out after 60s");
        let e = PageError::ServiceFailed {
            page: 3,
            detail: "HTTP 429".into(),
        };
        assert!(e.to_string().contains("HTTP 429"));
    }

    #[test]
    fn page_error_serialises() {
        let e = PageError::Cancelled { page: 4 };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("Cancelled"));
    }
}
