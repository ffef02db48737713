//! Alert data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::price::Price;

/// Delivery channel for a recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// SMTP email
    Email,
    /// Text message
    Sms,
}

impl Channel {
    /// Short lowercase name used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which threshold a price crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdHit {
    /// At or below the low threshold
    Low,
    /// At or above the high threshold
    High,
}

/// Low/high price thresholds; `None` disables a side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Alert when the price falls to or below this value
    pub low: Option<Price>,

    /// Alert when the price rises to or above this value
    pub high: Option<Price>,
}

impl Thresholds {
    /// Check if a price triggers the threshold alert. Both bounds are inclusive.
    pub fn check(&self, price: Price) -> Option<ThresholdHit> {
        if self.low.is_some_and(|low| price <= low) {
            return Some(ThresholdHit::Low);
        }
        if self.high.is_some_and(|high| price >= high) {
            return Some(ThresholdHit::High);
        }
        None
    }
}

/// A message addressed to one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    /// Email address or phone number
    pub recipient: String,
    /// Subject line (also the SMS text)
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

impl NotificationEvent {
    /// Build an event for one recipient
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Record of a delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Who the message was for
    pub recipient: String,

    /// Channel it was routed to
    pub channel: Channel,

    /// When it was sent
    pub sent_at: DateTime<Utc>,

    /// Whether it succeeded
    pub success: bool,

    /// Error message if failed
    pub error: Option<String>,
}
