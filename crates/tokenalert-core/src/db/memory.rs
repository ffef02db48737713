//! In-memory state store

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::StateStore;
use crate::error::Result;
use crate::models::Price;

/// Process-local store; clones share the same value
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    value: Arc<Mutex<Option<Price>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStateStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a previous price
    pub fn with_value(price: Price) -> Self {
        let store = Self::new();
        *store.value.lock() = Some(price);
        store
    }

    /// Current value without going through the trait
    pub fn get(&self) -> Option<Price> {
        *self.value.lock()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<Price>> {
        Ok(*self.value.lock())
    }

    async fn save(&self, price: Price) -> Result<()> {
        *self.value.lock() = Some(price);
        *self.saves.lock() += 1;
        Ok(())
    }
}
