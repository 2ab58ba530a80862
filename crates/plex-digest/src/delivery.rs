//! Email delivery of the digest.

use std::path::Path;

use askama::Template;
use digest_core::{async_trait, Delivery, DeliveryError, DigestPayload};
use mailer::{Attachment, Email, MailerClient};
use tracing::warn;

use crate::images::remove_image;

/// HTML body of the digest email.
#[derive(Template)]
#[template(path = "digest.html")]
struct DigestTemplate<'a> {
    subject: &'a str,
    heading: &'a str,
    entries: Vec<DigestEntry<'a>>,
}

struct DigestEntry<'a> {
    title: &'a str,
    year: String,
    image_cid: Option<String>,
}

/// Sends each digest as one email to every configured recipient.
pub struct EmailDelivery {
    client: MailerClient,
    recipients: Vec<String>,
    subject: String,
}

impl EmailDelivery {
    pub fn new(client: MailerClient, recipients: Vec<String>, subject: impl Into<String>) -> Self {
        Self {
            client,
            recipients,
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl Delivery for EmailDelivery {
    async fn deliver(&self, payload: &DigestPayload) -> Result<(), DeliveryError> {
        // Composing reads every thumbnail from disk.
        let composed = {
            let payload = payload.clone();
            let recipients = self.recipients.clone();
            let subject = self.subject.clone();
            tokio::task::spawn_blocking(move || compose_email(&payload, &recipients, &subject)).await
        };

        let result = match composed {
            Ok(Ok(email)) => self
                .client
                .send(&email)
                .await
                .map_err(|e| DeliveryError::Failed(e.to_string())),
            Ok(Err(e)) => Err(DeliveryError::Failed(format!("Failed to render digest: {}", e))),
            Err(e) => Err(DeliveryError::Failed(format!("Compose task failed: {}", e))),
        };

        remove_attachments(payload).await;
        result
    }

    fn name(&self) -> &str {
        "EmailDelivery"
    }
}

/// Delete every thumbnail referenced by `payload`.
///
/// Thumbnails only live until their digest has been attempted, whatever the
/// outcome. Files already gone are ignored.
pub async fn remove_attachments(payload: &DigestPayload) {
    for path in payload.entries().iter().filter_map(|r| r.attachment_ref()) {
        remove_image(Path::new(path)).await;
    }
}

/// Build the digest email: plain text body, HTML body, thumbnails inlined.
///
/// Thumbnails that can no longer be read are skipped.
pub fn compose_email(
    payload: &DigestPayload,
    recipients: &[String],
    subject: &str,
) -> Result<Email, askama::Error> {
    let mut attachments = Vec::new();
    let mut entries = Vec::with_capacity(payload.len());

    for (index, record) in payload.entries().iter().enumerate() {
        let image_cid = record.attachment_ref().and_then(|path| {
            match Attachment::from_file(path) {
                Ok(attachment) => {
                    let cid = format!("thumb{}", index);
                    attachments.push(attachment.inline(cid.clone()));
                    Some(cid)
                }
                Err(e) => {
                    warn!(path, title = %record.title(), error = %e, "Skipping unreadable thumbnail");
                    None
                }
            }
        });

        entries.push(DigestEntry {
            title: record.title(),
            year: record
                .known_year()
                .map_or_else(|| "Unknown".to_string(), |y| y.to_string()),
            image_cid,
        });
    }

    let html = DigestTemplate {
        subject,
        heading: DigestPayload::HEADING,
        entries,
    }
    .render()?;

    let mut email = Email::new_multi(recipients.iter().cloned(), subject, payload.render_text());
    email.with_html(html);
    for attachment in attachments {
        email.attach(attachment);
    }

    Ok(email)
}

#[cfg(test)]
mod tests {
    use digest_core::EventRecord;
    use mailer::{MailerConfig, SmtpSecurity};

    use super::*;

    fn thumbnail(dir: &Path, name: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_compose_text_and_html() {
        let payload = DigestPayload::new(vec![
            EventRecord::new("Inception", 2010, None).unwrap(),
            EventRecord::new("Tom & Jerry", EventRecord::UNKNOWN_YEAR, None).unwrap(),
        ]);
        let recipients = vec!["a@example.com".to_string(), "b@example.com".to_string()];

        let email = compose_email(&payload, &recipients, "New movies").unwrap();
        assert_eq!(email.to, recipients);
        assert_eq!(email.subject, "New movies");
        assert_eq!(
            email.body,
            "New movies added today:\nInception (2010)\nTom & Jerry (Unknown)"
        );

        let html = email.html_body.unwrap();
        assert!(html.contains("<strong>Inception</strong> (2010)"));
        assert!(html.contains("Tom &amp; Jerry"));
        assert!(!html.contains("cid:"));
        assert!(email.attachments.is_empty());
    }

    #[test]
    fn test_compose_inlines_thumbnails_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let thumb = dir.path().join("dune.jpg");
        std::fs::write(&thumb, [0xff, 0xd8, 0xff]).unwrap();

        let payload = DigestPayload::new(vec![
            EventRecord::new("Gone", 1939, Some(dir.path().join("gone.jpg").display().to_string())).unwrap(),
            EventRecord::new("Dune", 2021, Some(thumb.display().to_string())).unwrap(),
        ]);

        let email = compose_email(&payload, &["a@example.com".to_string()], "Digest").unwrap();
        assert_eq!(email.attachments.len(), 1);
        assert_eq!(email.attachments[0].content_id.as_deref(), Some("thumb1"));
        assert_eq!(email.attachments[0].content_type, "image/jpeg");
        assert!(email.html_body.unwrap().contains("cid:thumb1"));
    }

    #[tokio::test]
    async fn test_remove_attachments_deletes_thumbnails() {
        let dir = tempfile::tempdir().unwrap();
        let dune = thumbnail(dir.path(), "dune.jpg");
        let alien = thumbnail(dir.path(), "alien.png");
        let keep = thumbnail(dir.path(), "unrelated.jpg");

        let payload = DigestPayload::new(vec![
            EventRecord::new("Dune", 2021, Some(dune.clone())).unwrap(),
            EventRecord::new("Inception", 2010, None).unwrap(),
            EventRecord::new("Gone", 1939, Some(dir.path().join("gone.jpg").display().to_string())).unwrap(),
            EventRecord::new("Alien", 1979, Some(alien.clone())).unwrap(),
        ]);

        remove_attachments(&payload).await;

        assert!(!Path::new(&dune).exists());
        assert!(!Path::new(&alien).exists());
        assert!(Path::new(&keep).exists());
    }

    #[tokio::test]
    async fn test_failed_send_still_removes_thumbnails() {
        let dir = tempfile::tempdir().unwrap();
        let dune = thumbnail(dir.path(), "dune.jpg");

        // Nothing listens on port 1, so the send fails.
        let config = MailerConfig::new("127.0.0.1", 1, "bot@example.com", "secret").with_security(SmtpSecurity::None);
        let delivery = EmailDelivery::new(
            MailerClient::new(config).unwrap(),
            vec!["a@example.com".to_string()],
            "Digest",
        );
        let payload = DigestPayload::new(vec![EventRecord::new("Dune", 2021, Some(dune.clone())).unwrap()]);

        let err = delivery.deliver(&payload).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Failed(_)));
        assert!(!Path::new(&dune).exists());
    }
}
