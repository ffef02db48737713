//! Alerting for TokenAlert
//!
//! Provides the per-tick alert loop, recipient routing and email/SMS delivery.

mod email;
mod orchestrator;
mod router;
mod sms;

#[cfg(test)]
pub(crate) mod testing;

pub use email::EmailSender;
pub use orchestrator::{AlertOrchestrator, TickOutcome, TickReport};
pub use router::{MessageSender, NotificationError, NotificationRouter};
pub use sms::SmsSender;
