//! SMTP notifier backed by lettre's async transport.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crew_core::{Error, Notifier, Result};

/// SMTP connection settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// From address on every outbound message.
    pub from: String,
}

impl SmtpConfig {
    /// Read settings from `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASS`,
    /// and `MAIL_FROM`. Credentials are required; host and port default to
    /// the Mailtrap sandbox relay.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // Settings lookup is injected so tests never touch process-wide env.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = get("SMTP_HOST").unwrap_or_else(|| "sandbox.smtp.mailtrap.io".to_string());
        let port = get("SMTP_PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(587);
        let username =
            get("SMTP_USER").ok_or_else(|| Error::Config("SMTP_USER is not set".to_string()))?;
        let password =
            get("SMTP_PASS").ok_or_else(|| Error::Config("SMTP_PASS is not set".to_string()))?;
        let from =
            get("MAIL_FROM").unwrap_or_else(|| "dispatch@crewdispatch.invalid".to_string());

        Ok(Self {
            host,
            port,
            username,
            password,
            from,
        })
    }
}

/// Email notifier over SMTP with STARTTLS.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpNotifier {
    /// Build the transport from the given configuration.
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| Error::Config(format!("invalid SMTP relay '{}': {}", config.host, e)))?
            .port(config.port)
            .credentials(Credentials::new(config.username, config.password))
            .build();

        Ok(Self {
            transport,
            from: config.from,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| Error::Notification(format!("bad from address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| Error::Notification(format!("bad recipient '{}': {}", to, e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| Error::Notification(format!("failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| Error::Notification(format!("smtp send failed: {}", e)))?;

        debug!(
            subsystem = "notify",
            component = "smtp",
            recipient = to,
            "Delivered notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_requires_credentials() {
        match SmtpConfig::from_lookup(lookup(&[])) {
            Err(Error::Config(msg)) => assert!(msg.contains("SMTP_USER")),
            other => panic!("Expected Config error, got {:?}", other.map(|c| c.host)),
        }
        match SmtpConfig::from_lookup(lookup(&[("SMTP_USER", "u")])) {
            Err(Error::Config(msg)) => assert!(msg.contains("SMTP_PASS")),
            other => panic!("Expected Config error, got {:?}", other.map(|c| c.host)),
        }
    }

    #[test]
    fn test_config_defaults_to_mailtrap_sandbox() {
        let config =
            SmtpConfig::from_lookup(lookup(&[("SMTP_USER", "u"), ("SMTP_PASS", "p")])).unwrap();
        assert_eq!(config.host, "sandbox.smtp.mailtrap.io");
        assert_eq!(config.port, 587);
        assert_eq!(config.from, "dispatch@crewdispatch.invalid");
    }

    #[test]
    fn test_config_overrides_win() {
        let config = SmtpConfig::from_lookup(lookup(&[
            ("SMTP_HOST", "mail.example.com"),
            ("SMTP_PORT", "2525"),
            ("SMTP_USER", "u"),
            ("SMTP_PASS", "p"),
            ("MAIL_FROM", "ops@example.com"),
        ]))
        .unwrap();
        assert_eq!(config.host, "mail.example.com");
        assert_eq!(config.port, 2525);
        assert_eq!(config.from, "ops@example.com");
    }

    // lettre does not resolve or validate the relay host at build time;
    // connection problems surface when a message is sent.
    #[test]
    fn test_transport_builds_without_connecting() {
        for host in ["smtp.example.com", "not a hostname"] {
            let config = SmtpConfig {
                host: host.to_string(),
                port: 587,
                username: "u".to_string(),
                password: "p".to_string(),
                from: "from@example.com".to_string(),
            };
            assert!(SmtpNotifier::new(config).is_ok(), "host {:?}", host);
        }
    }
}
