//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use digest_core::{parse_trigger_times, ScheduleError, TriggerTime};

/// Digest server configuration. SMTP settings are read separately by
/// [`mailer::MailerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// Path the media server posts webhooks to.
    pub webhook_path: String,
    /// Times of day at which the digest is sent.
    pub digest_times: Vec<TriggerTime>,
    /// Append-only buffer log; `None` keeps the buffer in memory.
    pub buffer_log_path: Option<PathBuf>,
    /// Where received thumbnails are stored until the digest goes out.
    pub images_dir: PathBuf,
    /// Upper bound on one email delivery.
    pub delivery_timeout: Duration,
    /// Digest recipients.
    pub recipients: Vec<String>,
    /// Digest subject line.
    pub subject: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `DIGEST_ADDR` | Server bind address | `0.0.0.0:5000` |
    /// | `WEBHOOK_PATH` | Webhook route | `/plex/webhook` |
    /// | `DIGEST_TIMES` | Comma-separated `HH:MM` times | `23:59` |
    /// | `BUFFER_LOG_PATH` | Durable buffer log | (in memory) |
    /// | `IMAGES_DIR` | Thumbnail directory | `images` |
    /// | `DELIVERY_TIMEOUT_SECS` | Delivery timeout | `60` |
    /// | `EMAIL_RECIPIENTS` | Comma-separated recipients | (required) |
    /// | `EMAIL_SUBJECT` | Subject line | `New movies added to Plex` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = get("DIGEST_ADDR")
            .unwrap_or_else(|| "0.0.0.0:5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let webhook_path = get("WEBHOOK_PATH").unwrap_or_else(|| "/plex/webhook".to_string());
        if !webhook_path.starts_with('/') {
            return Err(ConfigError::InvalidWebhookPath(webhook_path));
        }

        let digest_times = parse_trigger_times(&get("DIGEST_TIMES").unwrap_or_else(|| "23:59".to_string()))?;

        let buffer_log_path = get("BUFFER_LOG_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let images_dir = PathBuf::from(get("IMAGES_DIR").unwrap_or_else(|| "images".to_string()));

        let delivery_timeout = get("DELIVERY_TIMEOUT_SECS")
            .unwrap_or_else(|| "60".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidTimeout)?;

        let recipients: Vec<String> = get("EMAIL_RECIPIENTS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        if recipients.is_empty() {
            return Err(ConfigError::MissingRecipients);
        }

        let subject = get("EMAIL_SUBJECT").unwrap_or_else(|| "New movies added to Plex".to_string());

        Ok(Self {
            addr,
            webhook_path,
            digest_times,
            buffer_log_path,
            images_dir,
            delivery_timeout,
            recipients,
            subject,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid DIGEST_ADDR format")]
    InvalidAddr,

    #[error("WEBHOOK_PATH must start with '/', got '{0}'")]
    InvalidWebhookPath(String),

    #[error("Invalid DIGEST_TIMES: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("DELIVERY_TIMEOUT_SECS must be a positive integer")]
    InvalidTimeout,

    #[error("EMAIL_RECIPIENTS environment variable is required")]
    MissingRecipients,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("EMAIL_RECIPIENTS", "a@example.com")]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.webhook_path, "/plex/webhook");
        assert_eq!(config.digest_times, parse_trigger_times("23:59").unwrap());
        assert!(config.buffer_log_path.is_none());
        assert_eq!(config.images_dir, PathBuf::from("images"));
        assert_eq!(config.delivery_timeout, Duration::from_secs(60));
        assert_eq!(config.recipients, vec!["a@example.com"]);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("EMAIL_RECIPIENTS", "a@example.com, b@example.com,"),
            ("DIGEST_TIMES", "08:00,20:30"),
            ("BUFFER_LOG_PATH", "/var/lib/plex-digest/buffer.log"),
            ("DELIVERY_TIMEOUT_SECS", "15"),
            ("WEBHOOK_PATH", "/hooks/plex"),
        ])
        .unwrap();
        assert_eq!(config.recipients, vec!["a@example.com", "b@example.com"]);
        assert_eq!(config.digest_times.len(), 2);
        assert_eq!(
            config.buffer_log_path,
            Some(PathBuf::from("/var/lib/plex-digest/buffer.log"))
        );
        assert_eq!(config.delivery_timeout, Duration::from_secs(15));
        assert_eq!(config.webhook_path, "/hooks/plex");
    }

    #[test]
    fn test_blank_log_path_means_memory() {
        let config = load(&[("EMAIL_RECIPIENTS", "a@example.com"), ("BUFFER_LOG_PATH", " ")]).unwrap();
        assert!(config.buffer_log_path.is_none());
    }

    #[test]
    fn test_errors() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingRecipients)));
        assert!(matches!(
            load(&[("EMAIL_RECIPIENTS", "a@example.com"), ("DIGEST_TIMES", "25:00")]),
            Err(ConfigError::Schedule(_))
        ));
        assert!(matches!(
            load(&[("EMAIL_RECIPIENTS", "a@example.com"), ("DELIVERY_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidTimeout)
        ));
        assert!(matches!(
            load(&[("EMAIL_RECIPIENTS", "a@example.com"), ("WEBHOOK_PATH", "plex")]),
            Err(ConfigError::InvalidWebhookPath(_))
        ));
        assert!(matches!(
            load(&[("EMAIL_RECIPIENTS", "a@example.com"), ("DIGEST_ADDR", "nope")]),
            Err(ConfigError::InvalidAddr)
        ));
    }
}
