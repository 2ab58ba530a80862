//! Digest payload built from one drain.

use crate::record::EventRecord;

/// The records of one flush cycle, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestPayload {
    entries: Vec<EventRecord>,
}

impl DigestPayload {
    /// Heading line of the plain text rendering.
    pub const HEADING: &'static str = "New movies added today:";

    pub fn new(entries: Vec<EventRecord>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[EventRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain text body: a heading followed by one `Title (Year)` line per entry.
    pub fn render_text(&self) -> String {
        let mut body = String::from(Self::HEADING);
        for entry in &self.entries {
            body.push('\n');
            body.push_str(&entry.to_string());
        }
        body
    }
}
