//! # TokenAlert
//!
//! Watches the WoW token price and notifies recipients when it moves.
//!
//! Every tick fetches the current price from the token page, compares it with
//! the last persisted price and, when it changed, emails or texts the
//! configured recipients. A separate recipient list is alerted when the price
//! reaches the low or high threshold.
//!
//! ## Architecture
//!
//! - **Fetcher**: scrapes the price with bounded, fixed-delay retries
//! - **Storage**: single-value store for the last price (file or Redis)
//! - **Alerting**: the tick orchestrator, recipient routing, SMTP and SMS senders
//!
//! ## Quick Start
//!
//! ```bash
//! # Run a single tick (from cron or another scheduler)
//! tokenalert tick
//!
//! # Or keep polling every five minutes
//! tokenalert watch
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerting;
pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod models;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{AlertOrchestrator, NotificationRouter, TickOutcome};
    pub use crate::config::Config;
    pub use crate::db::StateStore;
    pub use crate::error::{Error, Result};
    pub use crate::fetcher::{PriceFetcher, PriceSource};
    pub use crate::models::*;
}
