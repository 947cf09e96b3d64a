//! Card persistence
//!
//! Each card is written under `<root>/<source label>/` as:
//! - `<name>.raw.json` - source bytes, verbatim
//! - `<name>.v2.json` - canonical card JSON
//! - `<name>.png` - avatar with the card embedded (only when an avatar exists)
//!
//! Jobs that derive the same name overwrite each other's files; the last
//! writer wins.

use charex_common::Card;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::embedder::embed_card_to_file;
use crate::error::{ExtractionError, Result};

/// Base name used when sanitization leaves nothing
pub const FALLBACK_BASE_NAME: &str = "unnamed_character";

/// Characters never allowed in output filenames
const UNSAFE_CHARS: &[char] = &['\\', '/', '?', '%', '*', ':', '|', '"', '<', '>'];

/// Derive a filesystem-safe base name
///
/// Unsafe characters and whitespace become underscores, underscore runs
/// collapse to one, and leading/trailing underscores are trimmed.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_whitespace() || c.is_control() || UNSAFE_CHARS.contains(&c) {
            '_'
        } else {
            c
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Paths written for one card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedCard {
    pub base_name: String,
    pub raw_path: PathBuf,
    pub json_path: PathBuf,
    pub image_path: Option<PathBuf>,
}

/// Writes cards beneath an output root
#[derive(Debug, Clone)]
pub struct CardPersister {
    root: PathBuf,
}

impl CardPersister {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write all artifacts for a card
    ///
    /// Every write is attempted even if an earlier one failed; the first
    /// failure is returned. Files that were written stay in place.
    pub async fn persist(
        &self,
        card: &Card,
        raw: &[u8],
        avatar: Option<&[u8]>,
        source: &str,
    ) -> Result<PersistedCard> {
        let source_dir = self.root.join(source);
        tokio::fs::create_dir_all(&source_dir).await.map_err(|e| {
            ExtractionError::Persistence(format!("failed to create source directory: {}", e))
        })?;

        let base_name = sanitize_filename(card.output_name());
        info!(source = %source, base_name = %base_name, "Saving card");

        let card_json = card.to_canonical_json()?;
        let raw_path = source_dir.join(format!("{}.raw.json", base_name));
        let json_path = source_dir.join(format!("{}.v2.json", base_name));

        let mut first_error: Option<ExtractionError> = None;

        if let Err(e) = tokio::fs::write(&raw_path, raw).await {
            warn!(path = %raw_path.display(), error = %e, "Failed to save raw data");
            first_error.get_or_insert(ExtractionError::Persistence(format!(
                "failed to save raw data: {}",
                e
            )));
        }

        if let Err(e) = tokio::fs::write(&json_path, &card_json).await {
            warn!(path = %json_path.display(), error = %e, "Failed to save card JSON");
            first_error.get_or_insert(ExtractionError::Persistence(format!(
                "failed to save v2 json: {}",
                e
            )));
        }

        let image_path = match avatar {
            Some(image) => {
                let png_path = source_dir.join(format!("{}.png", base_name));
                match write_png(image.to_vec(), png_path.clone(), card_json).await {
                    Ok(()) => Some(png_path),
                    Err(e) => {
                        warn!(path = %png_path.display(), error = %e, "Failed to save PNG card");
                        first_error.get_or_insert(e);
                        None
                    }
                }
            }
            None => None,
        };

        if let Some(e) = first_error {
            return Err(e);
        }

        debug!(
            raw = %raw_path.display(),
            json = %json_path.display(),
            image = ?image_path,
            "Card artifacts written"
        );
        Ok(PersistedCard {
            base_name,
            raw_path,
            json_path,
            image_path,
        })
    }
}

async fn write_png(image: Vec<u8>, dest: PathBuf, card_json: Vec<u8>) -> Result<()> {
    tokio::task::spawn_blocking(move || embed_card_to_file(&image, &dest, &card_json))
        .await
        .map_err(|e| ExtractionError::Persistence(format!("PNG writer task failed: {}", e)))?
        .map_err(ExtractionError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use charex_common::CardData;

    #[test]
    fn test_sanitize_replaces_unsafe_and_whitespace() {
        assert_eq!(sanitize_filename("Captain  Bob: the <Bold>?"), "Captain_Bob_the_Bold");
    }

    #[test]
    fn test_sanitize_collapses_and_trims_underscores() {
        assert_eq!(sanitize_filename("__a___b__"), "a_b");
        assert_eq!(sanitize_filename(" \t a\nb "), "a_b");
    }

    #[test]
    fn test_sanitize_blocks_path_separators() {
        let name = sanitize_filename("../../etc/passwd");
        assert!(!name.contains('/'));
        assert_eq!(name, ".._.._etc_passwd");
    }

    #[test]
    fn test_sanitize_fallback() {
        assert_eq!(sanitize_filename(""), FALLBACK_BASE_NAME);
        assert_eq!(sanitize_filename("?*:|"), FALLBACK_BASE_NAME);
    }

    #[test]
    fn test_sanitize_keeps_unicode() {
        assert_eq!(sanitize_filename("Ämélie 桜"), "Ämélie_桜");
    }

    #[test]
    fn test_sanitize_properties_hold_for_awkward_inputs() {
        let inputs = ["", " ", "_", "a", "a b", "\\\\//", "x_ _y", "%%%name%%%", " _ _ "];
        for input in inputs {
            let out = sanitize_filename(input);
            assert!(!out.is_empty(), "{:?}", input);
            assert!(!out.contains("__"), "{:?} -> {:?}", input, out);
            assert!(!out.starts_with('_') && !out.ends_with('_'), "{:?} -> {:?}", input, out);
            assert!(!out.chars().any(|c| UNSAFE_CHARS.contains(&c) || c.is_whitespace()));
        }
    }

    #[tokio::test]
    async fn test_persist_without_avatar_writes_two_files() {
        let dir = tempfile::tempdir().unwrap();
        let persister = CardPersister::new(dir.path());
        let card = Card::new(CardData {
            name: "Bob".to_string(),
            ..Default::default()
        });

        let written = persister
            .persist(&card, b"[raw]", None, "JanitorAI")
            .await
            .unwrap();

        assert_eq!(written.base_name, "Bob");
        assert!(written.image_path.is_none());

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("JanitorAI"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(std::fs::read(&written.raw_path).unwrap(), b"[raw]");
    }

    #[tokio::test]
    async fn test_bad_avatar_keeps_raw_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let persister = CardPersister::new(dir.path());
        let card = Card::new(CardData {
            name: "Bob".to_string(),
            ..Default::default()
        });

        let result = persister
            .persist(&card, b"raw", Some(b"not a png"), "SakuraFM")
            .await;

        assert!(matches!(result, Err(ExtractionError::ContainerFormat(_))));
        let source_dir = dir.path().join("SakuraFM");
        assert!(source_dir.join("Bob.raw.json").exists());
        assert!(source_dir.join("Bob.v2.json").exists());
        assert!(!source_dir.join("Bob.png").exists());
    }
}
