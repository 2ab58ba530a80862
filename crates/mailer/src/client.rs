use lettre::{
    message::{header::ContentType, Attachment as LettreAttachment, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info, instrument};

use crate::{Attachment, Email, MailerConfig, MailerError, SmtpSecurity};

/// Client for sending emails over SMTP.
///
/// Uses connection pooling; cheap to share behind an `Arc`.
pub struct MailerClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl MailerClient {
    /// Create a new client with the given configuration.
    pub fn new(config: MailerConfig) -> Result<Self, MailerError> {
        let creds = Credentials::new(config.username.clone(), config.password().to_string());

        let builder = match config.security {
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| MailerError::Transport(e.to_string()))?,
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| MailerError::Transport(e.to_string()))?,
            SmtpSecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host),
        };

        let transport = builder.port(config.smtp_port).credentials(creds).build();

        info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            security = ?config.security,
            username = %config.username,
            "Created SMTP client"
        );

        Ok(Self {
            transport,
            from_address: config.from_address,
        })
    }

    /// Send an email.
    #[instrument(skip(self, email), fields(to = ?email.to, subject = %email.subject))]
    pub async fn send(&self, email: &Email) -> Result<(), MailerError> {
        let message = build_message(&self.from_address, email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailerError::Send(e.to_string()))?;

        info!(to = ?email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

/// Build a lettre Message from our Email type.
///
/// Inline attachments go in a `multipart/related` next to the body, regular
/// ones in an outer `multipart/mixed`.
pub(crate) fn build_message(from_address: &str, email: &Email) -> Result<Message, MailerError> {
    if email.to.is_empty() {
        return Err(MailerError::InvalidAddress("No recipients".to_string()));
    }

    let from = from_address
        .parse()
        .map_err(|e| MailerError::InvalidAddress(format!("From: {}", e)))?;

    let mut builder = Message::builder().from(from).subject(&email.subject);

    for to in &email.to {
        let addr = to
            .parse()
            .map_err(|e| MailerError::InvalidAddress(format!("To '{}': {}", to, e)))?;
        builder = builder.to(addr);
    }

    // Plain text only
    if email.html_body.is_none() && email.attachments.is_empty() {
        return builder
            .body(email.body.clone())
            .map_err(|e| MailerError::BuildEmail(e.to_string()));
    }

    let mut body = match &email.html_body {
        Some(html) => MultiPart::alternative()
            .singlepart(SinglePart::plain(email.body.clone()))
            .singlepart(SinglePart::html(html.clone())),
        None => MultiPart::alternative().singlepart(SinglePart::plain(email.body.clone())),
    };

    let (inline, regular): (Vec<&Attachment>, Vec<&Attachment>) =
        email.attachments.iter().partition(|a| a.is_inline());

    if !inline.is_empty() {
        let mut related = MultiPart::related().multipart(body);
        for attachment in inline {
            related = related.singlepart(to_part(attachment)?);
        }
        body = related;
    }

    if !regular.is_empty() {
        let mut mixed = MultiPart::mixed().multipart(body);
        for attachment in regular {
            mixed = mixed.singlepart(to_part(attachment)?);
        }
        body = mixed;
    }

    builder
        .multipart(body)
        .map_err(|e| MailerError::BuildEmail(e.to_string()))
}

fn to_part(attachment: &Attachment) -> Result<SinglePart, MailerError> {
    debug!(
        filename = %attachment.filename,
        content_type = %attachment.content_type,
        inline = attachment.is_inline(),
        "Adding attachment"
    );

    let content_type: ContentType = attachment
        .content_type
        .parse()
        .map_err(|e| MailerError::Attachment(format!("Invalid content type: {}", e)))?;

    let part = match &attachment.content_id {
        Some(cid) => LettreAttachment::new_inline(cid.clone()),
        None => LettreAttachment::new(attachment.filename.clone()),
    };

    Ok(part.body(attachment.data.clone(), content_type))
}
