use std::path::Path;

use crate::MailerError;

/// An email message to send.
#[derive(Debug, Clone)]
pub struct Email {
    /// Recipients
    pub to: Vec<String>,
    /// Email subject
    pub subject: String,
    /// Plain text body
    pub body: String,
    /// Optional HTML body
    pub html_body: Option<String>,
    /// File attachments, inline or regular
    pub attachments: Vec<Attachment>,
}

impl Email {
    /// Create a new email with a single recipient.
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new_multi([to], subject, body)
    }

    /// Create a new email with multiple recipients.
    pub fn new_multi(
        to: impl IntoIterator<Item = impl Into<String>>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into_iter().map(Into::into).collect(),
            subject: subject.into(),
            body: body.into(),
            html_body: None,
            attachments: Vec::new(),
        }
    }

    /// Set the HTML body (creates multipart alternative with text fallback).
    pub fn with_html(&mut self, html: impl Into<String>) -> &mut Self {
        self.html_body = Some(html.into());
        self
    }

    /// Add an attachment.
    pub fn attach(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }
}

/// A file attachment for an email.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Filename to display
    pub filename: String,
    /// MIME content type (e.g., "image/jpeg")
    pub content_type: String,
    /// Raw file data
    pub data: Vec<u8>,
    /// Content-ID for inline parts referenced from HTML as `cid:<id>`
    pub content_id: Option<String>,
}

impl Attachment {
    /// Create an attachment from raw data.
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
            content_id: None,
        }
    }

    /// Create an attachment from a file path.
    ///
    /// MIME type is auto-detected from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MailerError> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MailerError::Attachment("Invalid filename".to_string()))?
            .to_string();

        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        Ok(Self::new(filename, content_type, data))
    }

    /// Mark this attachment as inline, referenced from HTML by `cid:<content_id>`.
    pub fn inline(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    pub fn is_inline(&self) -> bool {
        self.content_id.is_some()
    }
}
