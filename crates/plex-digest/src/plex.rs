//! Plex webhook payload decoding.

use std::borrow::Cow;

use digest_core::{EventRecord, RecordError};
use serde::Deserialize;
use serde_json::Value;

use crate::error::WebhookError;

/// Event name Plex sends when an item is added to a library.
pub const NEW_ITEM_EVENT: &str = "library.new";

/// Title used when the notification carries none.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// The subset of a Plex webhook payload the digest needs.
#[derive(Debug, Deserialize)]
pub struct PlexEvent {
    pub event: String,
    #[serde(rename = "Metadata", default)]
    pub metadata: Option<PlexMetadata>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlexMetadata {
    #[serde(default)]
    pub title: Option<String>,
    /// Usually a number, occasionally a string.
    #[serde(default)]
    pub year: Option<Value>,
}

impl PlexEvent {
    pub fn is_new_item(&self) -> bool {
        self.event == NEW_ITEM_EVENT
    }

    pub fn title(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.title.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_TITLE)
    }

    /// Release year, or the unknown-year sentinel.
    pub fn year(&self) -> i32 {
        let year = match self.metadata.as_ref().and_then(|m| m.year.as_ref()) {
            Some(Value::Number(n)) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        year.unwrap_or(EventRecord::UNKNOWN_YEAR)
    }

    pub fn to_record(&self, attachment_ref: Option<String>) -> Result<EventRecord, RecordError> {
        EventRecord::new(self.title(), self.year(), attachment_ref)
    }
}

/// Parse a webhook payload body.
pub fn parse_event(body: &[u8]) -> Result<PlexEvent, WebhookError> {
    let text = decode_text(body);
    if text.trim().is_empty() {
        return Err(WebhookError::Malformed("Empty payload received".to_string()));
    }

    serde_json::from_str(&text).map_err(|e| WebhookError::Malformed(format!("Invalid JSON payload: {}", e)))
}

/// Decode as UTF-8 (dropping a BOM), falling back to Latin-1.
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}
