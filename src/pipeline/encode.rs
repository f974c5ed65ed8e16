//! Image encoding: rendered page → base64 PNG wrapped in `ImageData`.
//!
//! Multimodal APIs take images as base64 payloads inside the JSON request.
//! PNG keeps rendered glyph edges lossless, which matters more for
//! transcription accuracy than upload size.

use crate::error::PageError;
use crate::output::Page;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::io::Cursor;
use tracing::debug;

pub const PAGE_MIME_TYPE: &str = "image/png";

/// Encode a rendered page as a base64 PNG ready for the extraction service.
///
/// `detail: "high"` asks tiling models to read the image at full resolution
/// rather than a single downscaled overview tile.
pub fn encode_page(page: &Page) -> Result<ImageData, PageError> {
    let mut buf = Vec::new();
    page.image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PageError::EncodeFailed {
            page: page.page_num(),
            detail: e.to_string(),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Page {}: encoded {} PNG bytes → {} base64 bytes",
        page.page_num(),
        buf.len(),
        b64.len()
    );

    Ok(ImageData::new(b64, PAGE_MIME_TYPE).with_detail("high"))
}
