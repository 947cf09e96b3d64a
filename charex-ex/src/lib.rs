//! charex-ex library - character card extraction pipeline
//!
//! Source normalizers turn third-party roleplay content into a canonical
//! [`Card`](charex_common::Card); the persister writes each card as raw
//! bytes, canonical JSON, and a PNG with the card embedded in a `tEXt` chunk.

pub mod anonymizer;
pub mod embedder;
pub mod error;
pub mod normalizers;
pub mod persister;
pub mod png_chunks;
pub mod transcoder;
pub mod types;

pub use error::{ExtractionError, Result};
pub use normalizers::NormalizerRegistry;
pub use persister::CardPersister;
pub use types::{Extraction, SourceNormalizer};
