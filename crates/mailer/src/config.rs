use std::env;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

use crate::MailerError;

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS (usually port 587).
    #[default]
    StartTls,
    /// Implicit TLS from the first byte (usually port 465).
    Tls,
    /// No encryption. Only for local relays and test servers.
    None,
}

impl FromStr for SmtpSecurity {
    type Err = MailerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "tls" | "ssl" => Ok(Self::Tls),
            "none" | "plain" => Ok(Self::None),
            other => Err(MailerError::Config(format!("SMTP_SECURITY '{}'", other))),
        }
    }
}

/// Configuration for connecting to an SMTP relay.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// SMTP host (default: smtp.gmail.com)
    pub smtp_host: String,
    /// SMTP port (default: 587)
    pub smtp_port: u16,
    /// Connection security (default: STARTTLS)
    pub security: SmtpSecurity,
    /// Login name, also used as sender unless `from_address` is set
    pub username: String,
    /// Sender address
    pub from_address: String,
    password: SecretString,
}

impl MailerConfig {
    /// Create a new configuration with explicit values.
    pub fn new(
        smtp_host: impl Into<String>,
        smtp_port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let username = username.into();
        Self {
            smtp_host: smtp_host.into(),
            smtp_port,
            security: SmtpSecurity::default(),
            from_address: username.clone(),
            username,
            password: SecretString::from(password.into()),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required:
    /// - `SMTP_USERNAME` - Login (and default sender)
    /// - `SMTP_PASSWORD` - Password or app password
    ///
    /// Optional (with defaults):
    /// - `SMTP_HOST` - Default: smtp.gmail.com
    /// - `SMTP_PORT` - Default: 587
    /// - `SMTP_SECURITY` - `starttls`, `tls` or `none`. Default: starttls
    /// - `SMTP_FROM` - Default: `SMTP_USERNAME`
    pub fn from_env() -> Result<Self, MailerError> {
        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());

        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|e| MailerError::Config(format!("SMTP_PORT: {}", e)))?;

        let security = match env::var("SMTP_SECURITY") {
            Ok(value) => value.parse()?,
            Err(_) => SmtpSecurity::default(),
        };

        let username =
            env::var("SMTP_USERNAME").map_err(|_| MailerError::MissingEnvVar("SMTP_USERNAME".to_string()))?;

        let password =
            env::var("SMTP_PASSWORD").map_err(|_| MailerError::MissingEnvVar("SMTP_PASSWORD".to_string()))?;

        let from_address = env::var("SMTP_FROM").unwrap_or_else(|_| username.clone());

        Ok(Self {
            smtp_host,
            smtp_port,
            security,
            username,
            from_address,
            password: SecretString::from(password),
        })
    }

    /// Get the password (exposes the secret).
    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Builder method to set connection security.
    pub fn with_security(mut self, security: SmtpSecurity) -> Self {
        self.security = security;
        self
    }

    /// Builder method to set the sender address.
    pub fn with_from_address(mut self, from: impl Into<String>) -> Self {
        self.from_address = from.into();
        self
    }
}
