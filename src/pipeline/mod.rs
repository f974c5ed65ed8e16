//! Pipeline stages for page extraction.
//!
//! Each submodule implements one transformation step, so each can be tested
//! alone and swapped (a different renderer, a fake service) without touching
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! render ──▶ encode ──▶ llm ──▶ postprocess
//! (pdfium)   (base64)   (VLM)   (cleanup)
//!        └────────── extract ──────────┘
//! ```
//!
//! 1. [`render`]      — rasterise every page of the uploaded bytes
//! 2. [`encode`]      — PNG-encode and base64-wrap a page image
//! 3. [`llm`]         — the [`llm::ExtractionService`] seam and its
//!    provider-backed implementation; the only stage with network I/O
//! 4. [`postprocess`] — deterministic cleanup of service responses
//! 5. [`extract`]     — ties 2–4 together for one page and turns every
//!    failure into a page-local result

pub mod encode;
pub mod extract;
pub mod llm;
pub mod postprocess;
pub mod render;
