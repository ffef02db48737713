//! Persistence of the last observed price
//!
//! A single value is stored as its decimal string. Backends are chosen by
//! the scheme of the connection string:
//!
//! - `file://<path>` or a bare path: a text file on disk
//! - `redis://` / `rediss://`: one Redis key
//! - `memory://`: process-local, lost on exit

mod file;
mod memory;
mod redis;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;
pub use self::redis::RedisStateStore;

use async_trait::async_trait;

use crate::config::StateConfig;
use crate::error::{Error, Result};
use crate::models::Price;

/// Durable single-value store for the last seen price
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Previously saved price, `None` if nothing was ever saved
    async fn load(&self) -> Result<Option<Price>>;

    /// Overwrite the saved price
    async fn save(&self, price: Price) -> Result<()>;
}

/// Open the store described by the state configuration
pub fn open(config: &StateConfig) -> Result<Box<dyn StateStore>> {
    let conn = config.connection_string.trim();

    if conn.starts_with("redis://") || conn.starts_with("rediss://") {
        let store = RedisStateStore::new(conn, &config.key)?;
        return Ok(Box::new(store));
    }
    if conn == "memory://" {
        return Ok(Box::new(MemoryStateStore::new()));
    }
    if let Some(path) = conn.strip_prefix("file://") {
        return Ok(Box::new(FileStateStore::new(path)));
    }
    if conn.contains("://") {
        return Err(Error::config(format!(
            "Unsupported state connection string scheme: {conn}"
        )));
    }
    if conn.is_empty() {
        return Err(Error::config("STATE_CONNECTION_STRING is empty"));
    }

    Ok(Box::new(FileStateStore::new(conn)))
}

/// Parse a stored value
pub(crate) fn parse_stored(raw: &str) -> Result<Price> {
    raw.trim()
        .parse()
        .map_err(|_| Error::state_read(format!("Stored price is not an integer: '{}'", raw.trim())))
}
