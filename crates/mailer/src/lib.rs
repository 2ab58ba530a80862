//! # mailer
//!
//! SMTP client for sending digest email, with support for images inlined
//! into the HTML body.
//!
//! ```no_run
//! use mailer::{Attachment, Email, MailerClient, MailerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mailer::MailerError> {
//!     let config = MailerConfig::from_env()?;
//!     let client = MailerClient::new(config)?;
//!
//!     let mut email = Email::new("recipient@example.com", "New movies", "Dune (2021)");
//!     email
//!         .with_html("<p>Dune (2021)</p><img src=\"cid:thumb0\">")
//!         .attach(Attachment::from_file("images/dune.jpg")?.inline("thumb0"));
//!     client.send(&email).await?;
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod types;

pub use client::MailerClient;
pub use config::{MailerConfig, SmtpSecurity};
pub use error::MailerError;
pub use types::{Attachment, Email};
