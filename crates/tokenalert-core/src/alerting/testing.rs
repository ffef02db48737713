//! Test doubles for the alerting pipeline

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::router::{MessageSender, NotificationError};
use crate::db::{MemoryStateStore, StateStore};
use crate::error::{Error, Result};
use crate::fetcher::{FetchError, PriceSource};
use crate::models::{NotificationEvent, Price};

/// Records every message; optionally fails for one recipient
#[derive(Clone, Default)]
pub struct RecordingSender {
    sent: Arc<Mutex<Vec<NotificationEvent>>>,
    fail_for: Option<String>,
    observed: Option<MemoryStateStore>,
    stored_at_send: Arc<Mutex<Vec<Option<Price>>>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(recipient: &str) -> Self {
        Self {
            fail_for: Some(recipient.to_string()),
            ..Self::default()
        }
    }

    /// Also note the value held by `store` at the moment of each send
    pub fn observing(store: &MemoryStateStore) -> Self {
        Self {
            observed: Some(store.clone()),
            ..Self::default()
        }
    }

    pub fn stored_at_send(&self) -> Vec<Option<Price>> {
        self.stored_at_send.lock().clone()
    }

    pub fn sent(&self) -> Vec<NotificationEvent> {
        self.sent.lock().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent.lock().iter().map(|e| e.recipient.clone()).collect()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), NotificationError> {
        if let Some(store) = &self.observed {
            self.stored_at_send.lock().push(store.get());
        }
        self.sent.lock().push(NotificationEvent::new(to, subject, body));
        if self.fail_for.as_deref() == Some(to) {
            return Err(NotificationError::Smtp(format!("mailbox unavailable: {to}")));
        }
        Ok(())
    }
}

/// Price source that replays a fixed script of results
#[derive(Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<VecDeque<std::result::Result<Price, String>>>>,
    calls: Arc<Mutex<usize>>,
}

impl ScriptedSource {
    pub fn prices(prices: &[Price]) -> Self {
        let source = Self::default();
        source.script.lock().extend(prices.iter().map(|p| Ok(*p)));
        source
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn fetch(&self) -> std::result::Result<Price, FetchError> {
        *self.calls.lock() += 1;
        match self.script.lock().pop_front() {
            Some(Ok(price)) => Ok(price),
            Some(Err(reason)) => Err(FetchError::Http(reason)),
            None => Err(FetchError::Exhausted {
                attempts: 1,
                last: Box::new(FetchError::MarkerNotFound),
            }),
        }
    }
}

/// Store whose reads and writes always fail
#[derive(Clone, Default)]
pub struct UnavailableStore;

#[async_trait]
impl StateStore for UnavailableStore {
    async fn load(&self) -> Result<Option<Price>> {
        Err(Error::state_read("connection refused"))
    }

    async fn save(&self, _price: Price) -> Result<()> {
        Err(Error::state_write("connection refused"))
    }
}

/// Source that panics mid-fetch
pub struct PanickingSource;

#[async_trait]
impl PriceSource for PanickingSource {
    async fn fetch(&self) -> std::result::Result<Price, FetchError> {
        panic!("page layout changed unexpectedly")
    }
}
