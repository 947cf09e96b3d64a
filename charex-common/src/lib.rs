//! # charex common library
//!
//! Shared code for the charex extractor and web service:
//! - Character card model (chara_card_v2)
//! - Live channel message envelopes
//! - Configuration loading
//! - Common error type

pub mod card;
pub mod config;
pub mod error;
pub mod messages;

pub use card::{BookEntry, Card, CardData, Lorebook};
pub use error::{Error, Result};
