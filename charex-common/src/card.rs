//! Character card model (chara_card_v2)
//!
//! Canonical in-memory representation of a character and its optional
//! lorebook. Every normalizer produces a [`Card`] through [`Card::new`], so
//! the format identifier and version are always the fixed constants below.
//!
//! Absent text is an empty string, never `null`; only the lorebook is
//! optional. All fields default on deserialization so that cards written by
//! other tools still load.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Format identifier stamped on every card
pub const CARD_SPEC: &str = "chara_card_v2";

/// Format version stamped on every card
pub const CARD_SPEC_VERSION: &str = "2.0";

/// Open-ended extension mapping for forward-compatible metadata
pub type Extensions = Map<String, Value>;

/// Root card record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub spec: String,
    pub spec_version: String,
    pub data: CardData,

    /// Output naming hint; not part of the persisted schema
    #[serde(skip)]
    pub display_name: String,
}

impl Card {
    /// Wrap card data, stamping the fixed format constants
    ///
    /// The display-name hint starts out as the character name.
    pub fn new(data: CardData) -> Self {
        let display_name = data.name.clone();
        Self {
            spec: CARD_SPEC.to_string(),
            spec_version: CARD_SPEC_VERSION.to_string(),
            data,
            display_name,
        }
    }

    /// Replace the display-name hint
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Name used to derive output filenames
    ///
    /// Falls back to the character name when no hint was set.
    pub fn output_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.data.name
        } else {
            &self.display_name
        }
    }

    /// Canonical JSON serialization (two-space indentation)
    ///
    /// The same bytes are written to `.v2.json` and embedded in the PNG.
    pub fn to_canonical_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

impl Default for Card {
    fn default() -> Self {
        Self::new(CardData::default())
    }
}

/// Card field payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardData {
    pub name: String,
    pub description: String,
    pub personality: String,
    pub scenario: String,
    /// Opening message
    pub first_mes: String,
    /// Example dialogue
    pub mes_example: String,
    pub creator_notes: String,
    pub system_prompt: String,
    pub post_history_instructions: String,
    pub alternate_greetings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_book: Option<Lorebook>,
    pub tags: Vec<String>,
    pub creator: String,
    pub character_version: String,
    pub extensions: Extensions,
}

impl CardData {
    /// Add a tag, keeping the tag list free of duplicates
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tags.iter().any(|t| *t == tag) {
            self.tags.push(tag);
        }
    }
}

/// Character-specific lorebook
///
/// Entry iteration follows sequence position, not `insertion_order`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lorebook {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub scan_depth: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub token_budget: i64,
    #[serde(skip_serializing_if = "is_false")]
    pub recursive_scanning: bool,
    pub extensions: Extensions,
    pub entries: Vec<BookEntry>,
}

/// Keyed-trigger lorebook entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookEntry {
    pub keys: Vec<String>,
    pub content: String,
    pub extensions: Extensions,
    pub enabled: bool,
    pub insertion_order: i64,
    #[serde(skip_serializing_if = "is_false")]
    pub case_sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub selective: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secondary_keys: Vec<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub constant: bool,
    /// Insertion position tag (e.g. "before_char")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}
