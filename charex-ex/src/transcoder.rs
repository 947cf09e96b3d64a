//! Avatar transcoding
//!
//! Fetched avatars arrive in whatever format the site serves. WebP and JPEG
//! are decoded and re-encoded as PNG; anything else is passed through and
//! left for the embedder to reject if it is not a PNG.

use image::ImageFormat;
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

/// Transcoding error
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to decode {format}: {source}")]
    Decode {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode png: {0}")]
    Encode(#[source] image::ImageError),
}

/// Formats that get re-encoded
fn transcodable(mime: &str) -> Option<(ImageFormat, &'static str)> {
    match mime {
        "image/webp" => Some((ImageFormat::WebP, "webp")),
        "image/jpeg" => Some((ImageFormat::Jpeg, "jpeg")),
        _ => None,
    }
}

/// Normalize image bytes to PNG where the format is recognized
pub fn normalize_to_png(bytes: Vec<u8>) -> Result<Vec<u8>, TranscodeError> {
    let mime = infer::get(&bytes).map(|kind| kind.mime_type());
    debug!(mime = ?mime, len = bytes.len(), "Sniffed avatar content type");

    let Some((format, name)) = mime.and_then(transcodable) else {
        return Ok(bytes);
    };

    let img = image::load_from_memory_with_format(&bytes, format)
        .map_err(|source| TranscodeError::Decode { format: name, source })?;

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(TranscodeError::Encode)?;
    Ok(out.into_inner())
}
