//! JanitorAI transcript normalizer
//!
//! Input is the JSON body of a chat-completion request: an array of
//! `{role, content}` messages. The character definition lives in the
//! `system` messages, optionally split into `<scenario>` and
//! `<example_dialogs>` blocks.

use async_trait::async_trait;
use charex_common::{Card, CardData};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use tracing::debug;

use crate::anonymizer::anonymize;
use crate::error::{ExtractionError, Result};
use crate::types::{Extraction, SourceNormalizer};

pub const LABEL: &str = "JanitorAI";
pub const JOB_TYPE: &str = "extract_janitor";
pub const SHORT_NAME: &str = "janitor";

/// Creator recorded on transcript-derived cards
pub const CREATOR: &str = "charex";

static SCENARIO_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<scenario>(.*?)</scenario>").expect("scenario pattern is valid"));
static EXAMPLE_DIALOGS_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<example_dialogs>(.*?)</example_dialogs>")
        .expect("example dialogs pattern is valid")
});
static NAME_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Name:\s*([^\n\r]+)").expect("name label pattern is valid"));

#[derive(Debug, Deserialize)]
struct Message {
    role: String,
    #[serde(default)]
    content: String,
}

/// Character details recovered from the system prompt
#[derive(Debug, Default, PartialEq)]
struct PromptDetails {
    name: String,
    description: String,
    scenario: String,
    mes_example: String,
}

/// Normalizer for JanitorAI request transcripts
#[derive(Debug, Default, Clone)]
pub struct TranscriptNormalizer;

impl TranscriptNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Build a card from an already-read transcript
    pub fn normalize(&self, input: &[u8]) -> Result<Card> {
        let messages: Vec<Message> = serde_json::from_slice(input).map_err(|e| {
            ExtractionError::Input(format!("failed to parse JanitorAI transcript: {}", e))
        })?;

        let system_prompt = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let details = split_system_prompt(system_prompt.trim());

        let first_mes = messages
            .iter()
            .find(|m| m.role == "assistant")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let user_name = detect_user_name(&messages).unwrap_or_default();

        debug!(
            name = %details.name,
            user_name = %user_name,
            messages = messages.len(),
            "Parsed JanitorAI transcript"
        );

        let anon = |text: &str| anonymize(text, &details.name, &user_name);
        let mut data = CardData {
            description: anon(&details.description),
            scenario: anon(&details.scenario),
            first_mes: anon(&first_mes),
            mes_example: anon(&details.mes_example),
            creator: CREATOR.to_string(),
            character_version: "1.0".to_string(),
            name: details.name,
            ..Default::default()
        };
        data.add_tag(LABEL);
        Ok(Card::new(data))
    }
}

#[async_trait]
impl SourceNormalizer for TranscriptNormalizer {
    fn label(&self) -> &'static str {
        LABEL
    }

    fn job_type(&self) -> &'static str {
        JOB_TYPE
    }

    fn short_name(&self) -> &'static str {
        SHORT_NAME
    }

    async fn extract(&self, input: &[u8]) -> Result<Extraction> {
        let card = self.normalize(input)?;
        Ok(Extraction {
            card,
            raw: input.to_vec(),
            avatar: None,
        })
    }
}

fn split_system_prompt(prompt: &str) -> PromptDetails {
    let block = |re: &Regex| {
        re.captures(prompt)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };
    let scenario = block(&SCENARIO_BLOCK);
    let mes_example = block(&EXAMPLE_DIALOGS_BLOCK);

    let residual = SCENARIO_BLOCK.replace_all(prompt, "");
    let description = EXAMPLE_DIALOGS_BLOCK
        .replace_all(&residual, "")
        .trim()
        .to_string();

    let name = NAME_LABEL
        .captures(&description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback_name(&description));

    PromptDetails {
        name,
        description,
        scenario,
        mes_example,
    }
}

/// Deterministic name for definitions without a `Name:` label
///
/// `char_` followed by 32 hex digits of the description's SHA-256.
fn fallback_name(description: &str) -> String {
    let digest = Sha256::digest(description.as_bytes());
    let mut name = String::with_capacity(5 + 32);
    name.push_str("char_");
    for byte in &digest[..16] {
        let _ = write!(name, "{:02x}", byte);
    }
    name
}

/// First `user` message shaped like `Name: text`, skipping generic labels
fn detect_user_name(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .filter(|m| m.role == "user")
        .filter_map(|m| m.content.split_once(':'))
        .map(|(prefix, _)| prefix.trim())
        .find(|prefix| {
            let lower = prefix.to_lowercase();
            lower != "user" && lower != "you"
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(system: &str) -> Vec<u8> {
        serde_json::json!([
            {"role": "system", "content": system},
            {"role": "assistant", "content": "Arr!"}
        ])
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_scenario_a_fallback_name() {
        let card = TranscriptNormalizer::new()
            .normalize(&transcript("Bob is a pirate.\n<scenario>On a ship.</scenario>"))
            .unwrap();

        assert!(card.data.name.starts_with("char_"));
        assert_eq!(card.data.name.len(), 5 + 32);
        assert_eq!(card.data.name, fallback_name("Bob is a pirate."));
        assert_eq!(card.data.scenario, "On a ship.");
        assert_eq!(card.data.first_mes, "Arr!");
        assert_eq!(card.data.description, "Bob is a pirate.");
        assert!(!card.data.description.contains("On a ship."));
    }

    #[test]
    fn test_scenario_b_named_character_is_anonymized() {
        let card = TranscriptNormalizer::new()
            .normalize(&transcript(
                "Name: Bob\nBob is a pirate.\n<scenario>Bob sails with Bobby.</scenario>",
            ))
            .unwrap();

        assert_eq!(card.data.name, "Bob");
        assert_eq!(card.display_name, "Bob");
        assert_eq!(card.data.description, "Name: {{char}}\n{{char}} is a pirate.");
        assert_eq!(card.data.scenario, "{{char}} sails with Bobby.");
    }

    #[test]
    fn test_card_constants() {
        let card = TranscriptNormalizer::new()
            .normalize(&transcript("Name: Bob"))
            .unwrap();

        assert_eq!(card.spec, "chara_card_v2");
        assert_eq!(card.spec_version, "2.0");
        assert_eq!(card.data.tags, vec!["JanitorAI"]);
        assert_eq!(card.data.creator, "charex");
        assert_eq!(card.data.character_version, "1.0");
        assert!(card.data.personality.is_empty());
        assert!(card.data.creator_notes.is_empty());
        assert!(card.data.alternate_greetings.is_empty());
        assert!(card.data.extensions.is_empty());
    }

    #[test]
    fn test_example_dialogs_extracted_and_removed() {
        let prompt = "Name: Ria\nA mage.\n<example_dialogs>\nRia: Hello!\n</example_dialogs>";
        let details = split_system_prompt(prompt);

        assert_eq!(details.mes_example, "Ria: Hello!");
        assert_eq!(details.description, "Name: Ria\nA mage.");
    }

    #[test]
    fn test_system_messages_are_joined() {
        let input = serde_json::json!([
            {"role": "system", "content": "  Name: Ria  "},
            {"role": "user", "content": "hello"},
            {"role": "system", "content": "<scenario>A tower.</scenario>"}
        ])
        .to_string();

        let card = TranscriptNormalizer::new().normalize(input.as_bytes()).unwrap();
        assert_eq!(card.data.name, "Ria");
        assert_eq!(card.data.scenario, "A tower.");
        assert!(card.data.first_mes.is_empty());
    }

    #[test]
    fn test_name_label_is_case_insensitive() {
        let details = split_system_prompt("NAME:   Captain Morgan  \nlikes rum");
        assert_eq!(details.name, "Captain Morgan");
    }

    #[test]
    fn test_fallback_name_is_deterministic() {
        assert_eq!(fallback_name("same text"), fallback_name("same text"));
        assert_ne!(fallback_name("same text"), fallback_name("other text"));
    }

    #[test]
    fn test_user_name_detection_skips_generic_labels() {
        let messages = vec![
            Message { role: "user".into(), content: "no colon here".into() },
            Message { role: "user".into(), content: "You: hi".into() },
            Message { role: "assistant".into(), content: "Bob: hi".into() },
            Message { role: "user".into(), content: "Alice: hello there".into() },
        ];
        assert_eq!(detect_user_name(&messages), Some("Alice".to_string()));
    }

    #[test]
    fn test_user_name_is_anonymized() {
        let input = serde_json::json!([
            {"role": "system", "content": "Name: Bob\nBob loves Alice."},
            {"role": "user", "content": "Alice: ahoy"},
            {"role": "assistant", "content": "Ahoy, Alice!"}
        ])
        .to_string();

        let card = TranscriptNormalizer::new().normalize(input.as_bytes()).unwrap();
        assert_eq!(card.data.description, "Name: {{char}}\n{{char}} loves {{user}}.");
        assert_eq!(card.data.first_mes, "Ahoy, {{user}}!");
    }

    #[test]
    fn test_malformed_input_is_input_error() {
        let result = TranscriptNormalizer::new().normalize(b"{\"role\": \"system\"}");
        assert!(matches!(result, Err(ExtractionError::Input(_))));
    }

    #[tokio::test]
    async fn test_extract_keeps_raw_input_and_no_avatar() {
        let input = transcript("Name: Bob");
        let extraction = TranscriptNormalizer::new().extract(&input).await.unwrap();
        assert_eq!(extraction.raw, input);
        assert!(extraction.avatar.is_none());
    }
}
