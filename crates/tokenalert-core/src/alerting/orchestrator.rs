//! The poll-compare-notify loop
//!
//! One call to [`AlertOrchestrator::run_tick`] fetches the price, compares it
//! with the persisted one, saves the new value and sends notifications. Ticks
//! must not overlap; [`AlertOrchestrator::watch`] awaits each tick before
//! scheduling the next, external schedulers have to serialize invocations
//! themselves.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::router::NotificationRouter;
use crate::config::{Config, RecipientsConfig};
use crate::db::{self, StateStore};
use crate::error::Result;
use crate::fetcher::{PriceFetcher, PriceSource};
use crate::models::{
    diff_annotation, format_grouped, DeliveryResult, Price, ThresholdHit, Thresholds,
};

/// What a single tick did
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// No price could be fetched; nothing else happened
    NoPrice,
    /// The price matched the stored one
    Unchanged {
        /// Fetched price
        price: Price,
    },
    /// The price changed and notifications were attempted
    Changed(TickReport),
    /// The tick aborted unexpectedly
    Failed(String),
}

/// Details of a tick that saw a new price
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Fetched price
    pub price: Price,
    /// Price loaded from the store, `None` when absent or unreadable
    pub previous: Option<Price>,
    /// Whether the new price was written to the store
    pub saved: bool,
    /// Threshold the price reached, if any
    pub threshold: Option<ThresholdHit>,
    /// One entry per attempted notification, in send order
    pub deliveries: Vec<DeliveryResult>,
}

/// Runs the alert loop over a price source, an optional store and a router
pub struct AlertOrchestrator {
    source: Box<dyn PriceSource>,
    /// `None` when persistence is disabled
    store: Option<Box<dyn StateStore>>,
    router: NotificationRouter,
    thresholds: Thresholds,
    recipients: RecipientsConfig,
}

impl AlertOrchestrator {
    /// Assemble an orchestrator from explicit parts; `store` is `None` when
    /// persistence is disabled
    pub fn new(
        config: &Config,
        source: Box<dyn PriceSource>,
        store: Option<Box<dyn StateStore>>,
        router: NotificationRouter,
    ) -> Self {
        Self {
            source,
            store,
            router,
            thresholds: config.thresholds,
            recipients: config.recipients.clone(),
        }
    }

    /// Wire up the HTTP fetcher, configured store and channel senders
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = PriceFetcher::new(&config.source)?;
        let store = if config.state.persist {
            Some(db::open(&config.state)?)
        } else {
            info!("State persistence disabled, every fetched price counts as a change");
            None
        };
        let router = NotificationRouter::from_config(config)?;

        Ok(Self::new(config, Box::new(source), store, router))
    }

    /// Run one tick. Never fails; problems are logged and reported in the outcome.
    pub async fn run_tick(&self) -> TickOutcome {
        match AssertUnwindSafe(self.tick()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(error = %reason, "Run error");
                TickOutcome::Failed(reason)
            }
        }
    }

    async fn tick(&self) -> TickOutcome {
        let price = match self.source.fetch().await {
            Ok(price) => price,
            Err(e) => {
                warn!(error = %e, "No token price this tick");
                return TickOutcome::NoPrice;
            }
        };

        let previous = self.load_previous().await;
        if previous == Some(price) {
            debug!(price, "Token price unchanged");
            return TickOutcome::Unchanged { price };
        }

        let saved = self.persist(price).await;

        let diff = diff_annotation(price, previous);
        let shown = format!("{}{diff}", format_grouped(price));
        let subject = format!("WoW Token: {shown}");
        let body = format!("WoW token price is currently {shown}");

        let mut deliveries = Vec::new();

        if !self.recipients.always.is_empty() {
            info!(
                recipients = ?self.recipients.always,
                price = %shown,
                "Sending change notifications"
            );
            deliveries.extend(
                self.router
                    .dispatch_all(&self.recipients.always, &subject, &body)
                    .await,
            );
        }

        let threshold = self.thresholds.check(price);
        match threshold {
            Some(hit) => {
                info!(
                    recipients = ?self.recipients.on_alert,
                    price = %shown,
                    threshold = ?hit,
                    "Sending threshold alerts"
                );
                deliveries.extend(
                    self.router
                        .dispatch_all(&self.recipients.on_alert, &subject, &body)
                        .await,
                );
            }
            None => {
                info!(
                    price = %shown,
                    low = %describe_threshold(self.thresholds.low),
                    high = %describe_threshold(self.thresholds.high),
                    "Current token price within thresholds"
                );
            }
        }

        let failed = deliveries.iter().filter(|d| !d.success).count();
        if failed > 0 {
            warn!(failed, total = deliveries.len(), "Some notifications failed");
        }

        TickOutcome::Changed(TickReport {
            price,
            previous,
            saved,
            threshold,
            deliveries,
        })
    }

    async fn load_previous(&self) -> Option<Price> {
        let store = self.store.as_ref()?;
        match store.load().await {
            Ok(previous) => previous,
            Err(e) => {
                error!(error = %e, "Could not load last token price");
                None
            }
        }
    }

    async fn persist(&self, price: Price) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.save(price).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, price, "Could not save token price");
                false
            }
        }
    }

    /// Run ticks on a fixed cadence until `shutdown` resolves.
    ///
    /// The first tick fires after `offset`; a tick in progress is always
    /// allowed to finish.
    pub async fn watch<F>(&self, every: Duration, offset: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            interval = %humantime::format_duration(every),
            offset = %humantime::format_duration(offset),
            "Starting token price watch"
        );

        let mut ticker = interval_at(Instant::now() + offset, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = &mut shutdown => {
                    info!("Stopping token price watch");
                    return;
                }
            }

            let outcome = self.run_tick().await;
            debug!(?outcome, "Tick complete");
        }
    }
}

fn describe_threshold(value: Option<Price>) -> String {
    value.map_or_else(|| "disabled".to_string(), format_grouped)
}
