use thiserror::Error;

/// Errors raised while configuring the SMTP client or sending a digest.
#[derive(Debug, Error)]
pub enum MailerError {
    /// The relay transport could not be set up
    #[error("SMTP transport error: {0}")]
    Transport(String),

    /// The relay refused the message or the connection dropped
    #[error("SMTP relay did not accept the message: {0}")]
    Send(String),

    /// The MIME message could not be assembled
    #[error("Failed to assemble message: {0}")]
    BuildEmail(String),

    /// A sender or recipient address did not parse
    #[error("Invalid mail address: {0}")]
    InvalidAddress(String),

    /// An SMTP setting had an unusable value
    #[error("Invalid SMTP setting: {0}")]
    Config(String),

    /// A required SMTP setting was not provided
    #[error("Missing SMTP setting: {0}")]
    MissingEnvVar(String),

    /// Reading an image from disk failed
    #[error("Failed to read attachment: {0}")]
    Io(#[from] std::io::Error),

    /// An image could not be attached
    #[error("Invalid attachment: {0}")]
    Attachment(String),
}
