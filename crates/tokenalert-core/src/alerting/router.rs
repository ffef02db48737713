//! Recipient classification and dispatch

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info};

use super::email::EmailSender;
use super::sms::SmsSender;
use crate::config::Config;
use crate::error::Result;
use crate::models::{Channel, DeliveryResult, NotificationEvent};

/// Delivers a message over one channel
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send one message to one recipient
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), NotificationError>;
}

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Recipient or sender address could not be parsed
    #[error("Invalid address: {0}")]
    Address(String),

    /// Message could not be built
    #[error("Message error: {0}")]
    Message(String),

    /// SMTP transport failure
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// SMS gateway request failed or rejected the recipient
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Channel is misconfigured
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Routes each recipient to the email or SMS sender
#[derive(Clone)]
pub struct NotificationRouter {
    email: Arc<dyn MessageSender>,
    sms: Arc<dyn MessageSender>,
}

impl NotificationRouter {
    /// Create a router over explicit senders
    pub fn new(email: Arc<dyn MessageSender>, sms: Arc<dyn MessageSender>) -> Self {
        Self { email, sms }
    }

    /// Build the router with the SMTP and SMS senders from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let email = EmailSender::new(&config.email)?;
        let sms = SmsSender::new(&config.sms)?;
        Ok(Self::new(Arc::new(email), Arc::new(sms)))
    }

    /// Anything with an `@` is an email address, everything else a phone number.
    pub fn route(address: &str) -> Channel {
        if address.contains('@') {
            Channel::Email
        } else {
            Channel::Sms
        }
    }

    /// Send one event, recording rather than propagating failure
    pub async fn dispatch(&self, event: &NotificationEvent) -> DeliveryResult {
        let channel = Self::route(&event.recipient);
        let sender = match channel {
            Channel::Email => &self.email,
            Channel::Sms => &self.sms,
        };

        let sent_at = Utc::now();
        let result = sender
            .send(&event.recipient, &event.subject, &event.body)
            .await;

        match &result {
            Ok(()) => info!(recipient = %event.recipient, %channel, "Notification sent"),
            Err(e) => error!(
                recipient = %event.recipient,
                %channel,
                error = %e,
                "Notification failed"
            ),
        }

        DeliveryResult {
            recipient: event.recipient.clone(),
            channel,
            sent_at,
            success: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
        }
    }

    /// Send the same message to each recipient in order
    pub async fn dispatch_all(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Vec<DeliveryResult> {
        let mut results = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            let event = NotificationEvent::new(recipient.as_str(), subject, body);
            results.push(self.dispatch(&event).await);
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::testing::RecordingSender;
    use rstest::rstest;

    #[rstest]
    #[case("a@b.com", Channel::Email)]
    #[case("bob@iCloud.com", Channel::Email)]
    #[case("+15551234567", Channel::Sms)]
    #[case("5551234567", Channel::Sms)]
    #[case("not an address", Channel::Sms)]
    fn test_route(#[case] address: &str, #[case] expected: Channel) {
        assert_eq!(NotificationRouter::route(address), expected);
    }

    #[tokio::test]
    async fn test_dispatch_uses_matching_sender() {
        let email = RecordingSender::new();
        let sms = RecordingSender::new();
        let router = NotificationRouter::new(Arc::new(email.clone()), Arc::new(sms.clone()));

        let recipients = vec!["x@y.com".to_string(), "+15551234567".to_string()];
        let results = router.dispatch_all(&recipients, "WoW Token: 1", "body").await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(email.recipients(), vec!["x@y.com"]);
        assert_eq!(sms.recipients(), vec!["+15551234567"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_remaining_recipients() {
        let email = RecordingSender::failing_for("bad@y.com");
        let sms = RecordingSender::new();
        let router = NotificationRouter::new(Arc::new(email.clone()), Arc::new(sms));

        let recipients = vec![
            "bad@y.com".to_string(),
            "good@y.com".to_string(),
        ];
        let results = router.dispatch_all(&recipients, "s", "b").await;

        assert!(!results[0].success);
        assert!(results[0].error.is_some());
        assert!(results[1].success);
        assert_eq!(email.recipients(), vec!["bad@y.com", "good@y.com"]);
    }
}
