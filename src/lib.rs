//! # pdf-data-extractor
//!
//! Extract structured text from every page of a PDF with a Vision Language
//! Model and collect the results into one CSV-exportable dataset.
//!
//! Each page is rasterised and sent, together with a fixed "transcribe
//! everything into English, verbatim" instruction, to an external multimodal
//! service. Pages that fail are recorded and skipped; the rest become rows
//! of the dataset in page order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Render     rasterise pages via pdfium (spawn_blocking)
//!  ├─ 2. Extract    one service call per page, in order, no retries
//!  │                progress signal (pages_done, pages_total) after each
//!  ├─ 3. Aggregate  successful pages → rows (page, content)
//!  └─ 4. Export     CSV, `extracted_data.csv`, `text/csv`
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_data_extractor::{ExtractionConfig, PipelineOrchestrator, ServiceSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Fails here, before any work, if no credentials are configured.
//!     let settings = ServiceSettings::from_env(None, None)?;
//!     let config = ExtractionConfig::default();
//!     let orchestrator = PipelineOrchestrator::from_config(&config, &settings)?;
//!
//!     let bytes = std::fs::read("invoice.pdf")?;
//!     let output = orchestrator.extract(&bytes).await?;
//!     println!("{}", output.dataset.to_csv()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-extract` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod aggregate;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use aggregate::{
    aggregate, AggregatedDataset, CsvExport, CONTENT_COLUMN, CSV_CONTENT_TYPE, EXPORT_FILENAME,
    PAGE_COLUMN,
};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, ServiceSettings};
pub use error::{ExtractError, PageError, ServiceError};
pub use orchestrator::{CancelFlag, PipelineOrchestrator};
pub use output::{ExtractionOutput, ExtractionResult, ExtractionStats, Page};
pub use pipeline::extract::ExtractionClient;
pub use pipeline::llm::{ExtractionService, LlmExtractionService, ServiceReply};
pub use pipeline::render::{PageRenderer, PdfiumRenderer};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::ExtractionSession;
