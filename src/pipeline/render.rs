//! PDF rasterisation: turn document bytes into one `DynamicImage` per page.
//!
//! pdfium needs a file-system path, so the uploaded bytes are written to a
//! [`tempfile::NamedTempFile`] that is removed when rendering returns, fails,
//! or panics. Rendering is CPU-bound and blocking; the orchestrator runs it on
//! `tokio::task::spawn_blocking`.
//!
//! The default scale is 72 DPI (one pixel per PDF point). `max_rendered_pixels`
//! caps the longest edge so a poster-sized page cannot exhaust memory.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::Page;
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable pointing at a pdfium library file or its directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// PDF header marker.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// The header may be preceded by junk (BOM, whitespace, mail headers) as long
/// as it starts within this many bytes.
const PDF_MAGIC_WINDOW: usize = 1024;

/// Prefix of the scratch files pdfium reads from.
const TEMP_FILE_PREFIX: &str = "pdf-extract-";

/// Produces one rendered [`Page`] per PDF page, in document order.
pub trait PageRenderer: Send + Sync {
    /// Render every page of `document`.
    ///
    /// # Errors
    /// * [`ExtractError::DocumentFormat`] — bytes are not a readable PDF
    /// * [`ExtractError::EmptyDocument`] — the PDF has zero pages
    fn render(&self, document: &[u8]) -> Result<Vec<Page>, ExtractError>;
}

/// [`PageRenderer`] backed by the pdfium library.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    dpi: u32,
    max_rendered_pixels: u32,
    password: Option<String>,
    temp_dir: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_rendered_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
            temp_dir: None,
        }
    }

    /// Write scratch copies of the document under `dir` instead of the
    /// system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    fn render_config(&self) -> PdfRenderConfig {
        let max = self.max_rendered_pixels as i32;
        PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(max)
            .set_maximum_height(max)
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render(&self, document: &[u8]) -> Result<Vec<Page>, ExtractError> {
        check_magic(document)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_FILE_PREFIX).suffix(".pdf");
        let mut tmp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
        tmp.write_all(document)
            .and_then(|_| tmp.flush())
            .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;

        // `tmp` is dropped (and the file deleted) when this function returns.
        let pdfium = bind_pdfium()?;
        self.render_file(&pdfium, tmp.path())
    }
}

impl PdfiumRenderer {
    fn render_file(&self, pdfium: &Pdfium, path: &Path) -> Result<Vec<Page>, ExtractError> {
        let password = self.password.as_deref();
        let document = pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| open_error(format!("{:?}", e), password.is_some()))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);
        if total_pages == 0 {
            return Err(ExtractError::EmptyDocument);
        }

        let render_config = self.render_config();
        let mut rendered = Vec::with_capacity(total_pages);

        for (index, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                ExtractError::DocumentFormat {
                    detail: format!("page {} could not be rasterised: {:?}", index + 1, e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                index + 1,
                image.width(),
                image.height()
            );
            rendered.push(Page::new(index, image));
        }

        Ok(rendered)
    }
}

fn check_magic(document: &[u8]) -> Result<(), ExtractError> {
    if document.is_empty() {
        return Err(ExtractError::DocumentFormat {
            detail: "the file is empty".to_string(),
        });
    }
    let has_header = document
        .windows(PDF_MAGIC.len())
        .take(PDF_MAGIC_WINDOW)
        .any(|w| w == PDF_MAGIC);
    if !has_header {
        let head: Vec<u8> = document.iter().take(4).copied().collect();
        return Err(ExtractError::DocumentFormat {
            detail: format!(
                "missing %PDF header in the first {PDF_MAGIC_WINDOW} bytes (first bytes: {head:?})"
            ),
        });
    }
    Ok(())
}

fn open_error(err_str: String, had_password: bool) -> ExtractError {
    let detail = if err_str.contains("Password") || err_str.contains("password") {
        if had_password {
            "wrong password".to_string()
        } else {
            "the PDF is encrypted and requires a password".to_string()
        }
    } else {
        err_str
    };
    ExtractError::DocumentFormat { detail }
}

/// Bind to a pdfium library.
///
/// Tried in order: [`PDFIUM_LIB_PATH_ENV`] (file or directory), the working
/// directory, then the system library search path.
pub fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let from_env = std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from);

    let bindings = match from_env {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&path))
        }
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_pdf_bytes() {
        let renderer = PdfiumRenderer::new(&ExtractionConfig::default());
        let err = renderer.render(b"PK\x03\x04zipfile").unwrap_err();
        match err {
            ExtractError::DocumentFormat { detail } => assert!(detail.contains("%PDF")),
            other => panic!("expected DocumentFormat, got {other:?}"),
        }
    }

    #[test]
    fn accepts_header_after_leading_bytes() {
        assert!(check_magic(b"\r\n%PDF-1.4\n1 0 obj").is_ok());
        assert!(check_magic(b"\xEF\xBB\xBF%PDF-1.7\n").is_ok());

        let mut late = vec![b' '; PDF_MAGIC_WINDOW];
        late.extend_from_slice(b"%PDF-1.4\n");
        assert!(matches!(
            check_magic(&late),
            Err(ExtractError::DocumentFormat { .. })
        ));
    }

    fn scratch_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(TEMP_FILE_PREFIX))
            .count()
    }

    #[test]
    fn scratch_file_is_removed_after_failed_render() {
        let dir = tempfile::tempdir().unwrap();
        let renderer =
            PdfiumRenderer::new(&ExtractionConfig::default()).with_temp_dir(dir.path());

        // Passes the header check, then fails either binding pdfium or
        // opening the document; both happen after the scratch file exists.
        let err = renderer.render(b"\n%PDF-1.4\nnot really a pdf").unwrap_err();
        assert!(
            matches!(
                err,
                ExtractError::PdfiumBindingFailed(_) | ExtractError::DocumentFormat { .. }
            ),
            "got {err:?}"
        );
        assert_eq!(scratch_files(dir.path()), 0);
    }

    #[test]
    fn missing_temp_dir_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PdfiumRenderer::new(&ExtractionConfig::default())
            .with_temp_dir(dir.path().join("does-not-exist"));
        let err = renderer.render(b"%PDF-1.4\n").unwrap_err();
        assert!(matches!(err, ExtractError::Internal(_)), "got {err:?}");
    }

    #[test]
    fn rejects_empty_upload() {
        let renderer = PdfiumRenderer::new(&ExtractionConfig::default());
        let err = renderer.render(&[]).unwrap_err();
        assert!(matches!(err, ExtractError::DocumentFormat { .. }));
    }

    #[test]
    fn open_error_mentions_password() {
        let e = open_error("PdfiumLibraryInternalError(PasswordError)".into(), false);
        assert!(e.to_string().contains("requires a password"), "got: {e}");
        let e = open_error("PdfiumLibraryInternalError(PasswordError)".into(), true);
        assert!(e.to_string().contains("wrong password"), "got: {e}");
    }

    #[test]
    fn open_error_keeps_other_details() {
        let e = open_error("PdfiumLibraryInternalError(FormatError)".into(), false);
        assert!(e.to_string().contains("FormatError"), "got: {e}");
    }
}
