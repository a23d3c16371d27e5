//! Counter storage.
//!
//! Every mutation goes through a single atomic store primitive
//! (`SET`, `INCR`, `SETNX`); nothing here reads a counter, changes it
//! locally and writes it back.

use std::collections::HashMap;
use std::sync::Mutex;

use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client, RedisError,
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),
    #[error("Value at {0} is not an integer")]
    NotAnInteger(String),
    #[error("Increment of {0} would overflow")]
    Overflow(String),
    #[error("Failed to acquire store lock")]
    LockFailed,
}

#[rocket::async_trait]
pub trait CounterStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: i64) -> Result<(), StoreError>;

    /// Returns the value after the increment.
    async fn incr(&self, key: &str, by: i64) -> Result<i64, StoreError>;

    /// Returns `true` when the key was absent and has been created.
    async fn set_if_absent(&self, key: &str, value: i64) -> Result<bool, StoreError>;
}

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let config = ConnectionManagerConfig::new().set_number_of_retries(1);

        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;
        info!("Connected to Redis");

        Ok(Self { connection })
    }
}

#[rocket::async_trait]
impl CounterStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn incr(&self, key: &str, by: i64) -> Result<i64, StoreError> {
        let mut conn = self.connection.clone();
        Ok(conn.incr::<_, _, i64>(key, by).await?)
    }

    async fn set_if_absent(&self, key: &str, value: i64) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        Ok(conn.set_nx::<_, _, bool>(key, value).await?)
    }
}

/// In-process store with the same semantics as Redis for the four
/// commands used here. Values are kept as decimal text.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a raw value, bypassing the integer encoding.
    pub fn insert_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::LockFailed)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::LockFailed)?;
        Ok(values.contains_key(key))
    }
}

#[rocket::async_trait]
impl CounterStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::LockFailed)?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::LockFailed)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn incr(&self, key: &str, by: i64) -> Result<i64, StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::LockFailed)?;
        let current = match values.get(key) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| StoreError::NotAnInteger(key.to_string()))?,
            None => 0,
        };
        let next = current
            .checked_add(by)
            .ok_or_else(|| StoreError::Overflow(key.to_string()))?;
        values.insert(key.to_string(), next.to_string());
        debug!("Incremented {} to {}", key, next);
        Ok(next)
    }

    async fn set_if_absent(&self, key: &str, value: i64) -> Result<bool, StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::LockFailed)?;
        if values.contains_key(key) {
            return Ok(false);
        }
        values.insert(key.to_string(), value.to_string());
        Ok(true)
    }
}
