//! Core types and the source normalizer trait
//!
//! One normalizer exists per origin site. New sources add an implementation
//! and register it; the dispatch contract never changes.

use async_trait::async_trait;
use charex_common::Card;

use crate::error::Result;

/// Output of one normalizer invocation
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Canonical card
    pub card: Card,
    /// Source bytes persisted verbatim (`.raw.json`)
    pub raw: Vec<u8>,
    /// Avatar image, already normalized to PNG when present
    pub avatar: Option<Vec<u8>>,
}

/// Source normalizer trait
///
/// Implementations must not mutate their input and must populate the same
/// card shape; downstream code only distinguishes sources by [`label`].
///
/// # Example
/// ```rust,ignore
/// use charex_ex::types::{Extraction, SourceNormalizer};
///
/// let normalizer = TranscriptNormalizer::new();
/// let Extraction { card, raw, avatar } = normalizer.extract(input).await?;
/// persister.persist(&card, &raw, avatar.as_deref(), normalizer.label()).await?;
/// ```
///
/// [`label`]: SourceNormalizer::label
#[async_trait]
pub trait SourceNormalizer: Send + Sync {
    /// Source label used for tagging and the output subdirectory (e.g. "SakuraFM")
    fn label(&self) -> &'static str;

    /// Live channel `type` tag that selects this source (e.g. "extract_sakura")
    fn job_type(&self) -> &'static str;

    /// Short name used on the command line (e.g. "sakura")
    fn short_name(&self) -> &'static str;

    /// Convert raw input (URL text or transcript JSON) into a card
    ///
    /// # Errors
    /// Returns `ExtractionError` when the input is malformed or the primary
    /// document cannot be fetched.
    async fn extract(&self, input: &[u8]) -> Result<Extraction>;
}
