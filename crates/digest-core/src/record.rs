//! The normalized "new item added" record.

use std::fmt;

use crate::error::RecordError;

const FIELD_SEPARATOR: char = ';';

/// One accepted notification.
///
/// Records are immutable once built and are never deduplicated: two identical
/// notifications produce two records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    title: String,
    year: i32,
    attachment_ref: Option<String>,
}

impl EventRecord {
    /// Sentinel for an unknown release year.
    pub const UNKNOWN_YEAR: i32 = 0;

    /// Build a record. Fails if `title` is blank.
    pub fn new(
        title: impl Into<String>,
        year: i32,
        attachment_ref: Option<String>,
    ) -> Result<Self, RecordError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(RecordError::EmptyTitle);
        }

        Ok(Self {
            title,
            year,
            attachment_ref: attachment_ref.filter(|r| !r.is_empty()),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Release year, or `None` for the unknown-year sentinel.
    pub fn known_year(&self) -> Option<i32> {
        (self.year != Self::UNKNOWN_YEAR).then_some(self.year)
    }

    /// Reference to a persisted thumbnail, if one was supplied.
    pub fn attachment_ref(&self) -> Option<&str> {
        self.attachment_ref.as_deref()
    }

    /// Encode as one log line (without the trailing newline).
    ///
    /// Layout is `title;year;attachment_ref`. Backslash, `;`, `\n` and `\r`
    /// inside fields are backslash-escaped.
    pub fn to_log_line(&self) -> String {
        let mut line = escape(&self.title);
        line.push(FIELD_SEPARATOR);
        line.push_str(&self.year.to_string());
        line.push(FIELD_SEPARATOR);
        if let Some(attachment) = &self.attachment_ref {
            line.push_str(&escape(attachment));
        }
        line
    }

    /// Decode a line written by [`to_log_line`](Self::to_log_line).
    pub fn from_log_line(line: &str) -> Result<Self, RecordError> {
        let fields = split_fields(line)?;
        let [title, year, attachment] = <[String; 3]>::try_from(fields)
            .map_err(|fields| RecordError::Malformed(format!("expected 3 fields, got {}", fields.len())))?;

        let year = year
            .parse::<i32>()
            .map_err(|e| RecordError::Malformed(format!("invalid year '{}': {}", year, e)))?;

        let attachment = (!attachment.is_empty()).then_some(attachment);
        Self::new(title, year, attachment)
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.known_year() {
            Some(year) => write!(f, "{} ({})", self.title, year),
            None => write!(f, "{} (Unknown)", self.title),
        }
    }
}

fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn split_fields(line: &str) -> Result<Vec<String>, RecordError> {
    let mut fields = Vec::with_capacity(3);
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\\') => current.push('\\'),
                Some(';') => current.push(';'),
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some(other) => {
                    return Err(RecordError::Malformed(format!("unknown escape '\\{}'", other)));
                }
                None => return Err(RecordError::Malformed("dangling escape".to_string())),
            },
            FIELD_SEPARATOR => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);

    Ok(fields)
}
