//! Redis-backed state store

use async_trait::async_trait;
use deadpool_redis::{Config as RedisConfig, Pool, Runtime};
use redis::AsyncCommands;

use super::{parse_stored, StateStore};
use crate::error::{Error, Result};
use crate::models::Price;

/// Keeps the last price under a single Redis key
#[derive(Clone)]
pub struct RedisStateStore {
    pool: Pool,
    key: String,
}

impl RedisStateStore {
    /// Create a pooled store; connections are opened lazily
    pub fn new(url: &str, key: &str) -> Result<Self> {
        let cfg = RedisConfig::from_url(url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::Redis(e.to_string()))?;

        Ok(Self {
            pool,
            key: key.to_string(),
        })
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn load(&self) -> Result<Option<Price>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| Error::state_read(e.to_string()))?;
        let value: Option<String> = conn
            .get(&self.key)
            .await
            .map_err(|e| Error::state_read(e.to_string()))?;

        value.as_deref().map(parse_stored).transpose()
    }

    async fn save(&self, price: Price) -> Result<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| Error::state_write(e.to_string()))?;
        let _: () = conn
            .set(&self.key, price.to_string())
            .await
            .map_err(|e| Error::state_write(e.to_string()))?;
        Ok(())
    }
}
