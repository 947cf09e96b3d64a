//! Card embedding into PNG containers
//!
//! Rewrites a PNG so that a `tEXt` chunk carrying `chara\0<base64 JSON>`
//! sits directly after `IHDR`. All other chunks are copied in order, byte for
//! byte. Only one chunk is held in memory at a time.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::png_chunks::{ChunkReader, ChunkWriter, IHDR, TEXT};

/// tEXt keyword under which character cards are stored
pub const CARD_KEYWORD: &str = "chara";

/// Embedding error
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Source is not a usable PNG chunk stream
    #[error("{0}")]
    Format(String),

    /// Destination write failed
    #[error("failed to write PNG: {0}")]
    Io(#[from] io::Error),
}

/// Build the `tEXt` payload: keyword, NUL, base64 of the card JSON
pub fn card_text_payload(card_json: &[u8]) -> Vec<u8> {
    let encoded = STANDARD.encode(card_json);
    let mut payload = Vec::with_capacity(CARD_KEYWORD.len() + 1 + encoded.len());
    payload.extend_from_slice(CARD_KEYWORD.as_bytes());
    payload.push(0);
    payload.extend_from_slice(encoded.as_bytes());
    payload
}

/// Stream `source` to `dest`, inserting the card chunk after `IHDR`
///
/// Errors reading the source are `Format` errors; errors writing the
/// destination are `Io` errors.
pub fn embed_card<R: Read, W: Write>(source: R, dest: W, card_json: &[u8]) -> Result<W, EmbedError> {
    let mut reader = ChunkReader::new(source)
        .map_err(|e| EmbedError::Format(format!("failed to read PNG signature: {}", e)))?;

    let header = reader
        .next_chunk()
        .map_err(|e| EmbedError::Format(format!("failed to read IHDR chunk: {}", e)))?
        .ok_or_else(|| EmbedError::Format("PNG has no chunks".to_string()))?;
    if header.kind != IHDR {
        return Err(EmbedError::Format(format!(
            "first chunk is {}, expected IHDR",
            header.kind_str()
        )));
    }

    let mut writer = ChunkWriter::new(dest)?;
    writer.copy_chunk(&header)?;
    writer.write_chunk(TEXT, &card_text_payload(card_json))?;

    let mut copied = 0usize;
    loop {
        let chunk = reader
            .next_chunk()
            .map_err(|e| EmbedError::Format(format!("failed to read chunk: {}", e)))?;
        let Some(chunk) = chunk else { break };
        writer.copy_chunk(&chunk)?;
        copied += 1;
    }
    debug!(chunks = copied + 1, "Copied source PNG chunks around card metadata");

    Ok(writer.finish()?)
}

/// Embed into a file at `dest`, never leaving a partial file behind
///
/// Writes a temporary sibling and renames it into place on success.
pub fn embed_card_to_file(source: &[u8], dest: &Path, card_json: &[u8]) -> Result<(), EmbedError> {
    let tmp = temp_sibling(dest);
    let result = File::create(&tmp)
        .map_err(EmbedError::Io)
        .and_then(|file| embed_card(BufReader::new(source), BufWriter::new(file), card_json))
        .and_then(|writer| {
            writer
                .into_inner()
                .map_err(|e| EmbedError::Io(e.into_error()))?
                .sync_all()
                .map_err(EmbedError::Io)
        })
        .and_then(|()| fs::rename(&tmp, dest).map_err(EmbedError::Io));

    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp) {
            if e.kind() != ErrorKind::NotFound {
                debug!(path = %tmp.display(), error = %e, "Could not remove temporary PNG");
            }
        }
    }
    result
}

fn temp_sibling(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png_chunks::{Chunk, IEND};
    use std::io::Cursor;

    fn minimal_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn read_all_chunks(bytes: &[u8]) -> Vec<Chunk> {
        let mut reader = ChunkReader::new(Cursor::new(bytes)).unwrap();
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    #[test]
    fn test_payload_layout() {
        let payload = card_text_payload(b"{}");
        assert_eq!(&payload[..6], b"chara\0");
        assert_eq!(&payload[6..], b"e30=");
    }

    #[test]
    fn test_card_chunk_inserted_after_ihdr() {
        let source = minimal_png();
        let json = br#"{"spec":"chara_card_v2"}"#;

        let output = embed_card(Cursor::new(&source), Vec::new(), json).unwrap();

        let original = read_all_chunks(&source);
        let rewritten = read_all_chunks(&output);
        assert_eq!(rewritten.len(), original.len() + 1);
        assert_eq!(rewritten[0], original[0]);
        assert_eq!(rewritten[1].kind, TEXT);
        assert_eq!(rewritten[2..], original[1..]);
        assert_eq!(rewritten.last().map(|c| c.kind), Some(IEND));
    }

    #[test]
    fn test_output_still_decodes() {
        let output = embed_card(Cursor::new(minimal_png()), Vec::new(), b"{}").unwrap();
        let img = image::load_from_memory_with_format(&output, image::ImageFormat::Png).unwrap();
        assert_eq!(img.width(), 2);
    }

    #[test]
    fn test_non_png_source_is_format_error() {
        let result = embed_card(Cursor::new(b"\xff\xd8\xff\xe0 jpeg".to_vec()), Vec::new(), b"{}");
        assert!(matches!(result, Err(EmbedError::Format(_))));
    }

    #[test]
    fn test_first_chunk_must_be_ihdr() {
        let mut writer = ChunkWriter::new(Vec::new()).unwrap();
        writer.write_chunk(IEND, &[]).unwrap();
        let bytes = writer.finish().unwrap();

        let result = embed_card(Cursor::new(bytes), Vec::new(), b"{}");
        assert!(matches!(result, Err(EmbedError::Format(msg)) if msg.contains("IEND")));
    }

    #[test]
    fn test_failed_file_embed_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("card.png");

        let result = embed_card_to_file(b"not a png at all", &dest, b"{}");

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dir.path().join("card.png.tmp").exists());
    }

    #[test]
    fn test_file_embed_writes_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("card.png");

        embed_card_to_file(&minimal_png(), &dest, b"{}").unwrap();

        let chunks = read_all_chunks(&fs::read(&dest).unwrap());
        assert_eq!(chunks[1].kind, TEXT);
    }
}
