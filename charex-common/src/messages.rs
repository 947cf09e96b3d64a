//! Live channel message envelopes
//!
//! Both directions use `{type, payload}`. Inbound payloads stay raw until the
//! job dispatcher knows which source the `type` tag names.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::card::Card;

/// Outbound `type` for job status updates
pub const STATUS_MESSAGE_TYPE: &str = "status";

/// Outbound `type` for newly created cards
pub const NEW_CARD_MESSAGE_TYPE: &str = "new_card";

/// Inbound envelope; payload is decoded later by type
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// Locator naming what to extract
///
/// Page sources send `{url}`; transcript sources may send `{url}` carrying the
/// transcript text, or `{transcript}` with the message array inline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExtractPayload {
    Url { url: String },
    Transcript { transcript: Value },
}

impl ExtractPayload {
    /// Human-readable locator for status messages and logs
    pub fn describe(&self) -> String {
        match self {
            Self::Url { url } => url.clone(),
            Self::Transcript { .. } => "inline transcript".to_string(),
        }
    }

    /// Raw bytes handed to a normalizer
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Url { url } => url.into_bytes(),
            Self::Transcript { transcript: Value::String(text) } => text.into_bytes(),
            Self::Transcript { transcript } => transcript.to_string().into_bytes(),
        }
    }
}

/// Job status reported to the originating agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Started,
    Completed,
    Error,
}

/// Payload of a `status` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub status: JobStatus,
    pub message: String,
}

/// Payload of a `new_card` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCardPayload {
    pub source: String,
    pub card: Card,
}

/// Server-to-client message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum OutgoingMessage {
    Status(StatusPayload),
    NewCard(NewCardPayload),
}

impl OutgoingMessage {
    /// Create a status message
    pub fn status(status: JobStatus, message: impl Into<String>) -> Self {
        Self::Status(StatusPayload {
            status,
            message: message.into(),
        })
    }

    /// Create a new-card message
    pub fn new_card(source: impl Into<String>, card: Card) -> Self {
        Self::NewCard(NewCardPayload {
            source: source.into(),
            card,
        })
    }

    /// Serialize to the JSON text sent over the wire
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
