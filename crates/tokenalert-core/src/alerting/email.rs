//! SMTP email delivery

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use super::router::{MessageSender, NotificationError};
use crate::config::EmailConfig;
use crate::error::{Error, Result};

/// Sends plain-text mail through an authenticated STARTTLS relay
pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    /// Create a sender; no connection is made until the first message
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| Error::config(format!("FROM_EMAIL is not a valid address: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| Error::config(format!("Invalid SMTP relay {}: {e}", config.smtp_host)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.from.clone(), config.password.clone()))
            .timeout(Some(Duration::from_secs(30)))
            .build();

        Ok(Self { transport, from })
    }

    fn build_message(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> std::result::Result<Message, NotificationError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| NotificationError::Address(format!("{to}: {e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotificationError::Message(e.to_string()))
    }
}

#[async_trait]
impl MessageSender for EmailSender {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), NotificationError> {
        let message = self.build_message(to, subject, body)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::Smtp(e.to_string()))?;

        debug!(to, subject, "Email accepted by relay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(from: &str) -> EmailConfig {
        EmailConfig {
            from: from.to_string(),
            password: "app-password".to_string(),
            ..EmailConfig::default()
        }
    }

    #[test]
    fn test_invalid_sender_is_config_error() {
        let result = EmailSender::new(&config("not-an-address"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_invalid_recipient_fails_before_connecting() {
        let sender = EmailSender::new(&config("bob@gmail.com")).unwrap();

        let err = sender.send("bad@@example", "WoW Token: 1", "body").await.unwrap_err();
        assert!(matches!(err, NotificationError::Address(_)));
    }

    #[tokio::test]
    async fn test_message_is_plain_text() {
        let sender = EmailSender::new(&config("bob@gmail.com")).unwrap();
        let message = sender
            .build_message(
                "x@y.com",
                "WoW Token: 235,000 [+5,000]",
                "WoW token price is currently 235,000 [+5,000]",
            )
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: WoW Token: 235,000 [+5,000]"));
        assert!(raw.contains("Content-Type: text/plain"));
        assert!(raw.contains("To: x@y.com"));
    }
}
