//! Key-value configuration backends.
//!
//! Every persisted entity of the sitemap filter is one named option holding a JSON value.
//! Writes replace the whole value of an option; there is no locking, the last write wins.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::db::{DbPool, PoolError};
use crate::schema::xsf_options;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DbError(#[from] diesel::result::Error),

    #[error("Database pool error: {0}")]
    DbPoolError(#[from] PoolError),

    #[error("Stored option '{name}' is not valid JSON: {source}")]
    InvalidJson {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Interface to the persisted site configuration.
#[async_trait]
pub trait OptionStore: Send + Sync {
    /// The stored value of the option, or `None` if it was never written.
    async fn get_option(&self, name: &str) -> Result<Option<Value>, StoreError>;

    /// Replaces the stored value of the option, creating it if needed.
    async fn update_option(&self, name: &str, value: Value) -> Result<(), StoreError>;
}

/// In-process option store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    options: RwLock<HashMap<String, Value>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given options.
    pub fn with_options<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Self {
            options: RwLock::new(options.into_iter().map(|(name, value)| (name.into(), value)).collect()),
        }
    }

    /// Copy of every stored option.
    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.options.read().await.clone()
    }
}

#[async_trait]
impl OptionStore for MemoryOptionStore {
    async fn get_option(&self, name: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.options.read().await.get(name).cloned())
    }

    async fn update_option(&self, name: &str, value: Value) -> Result<(), StoreError> {
        self.options.write().await.insert(name.to_string(), value);
        Ok(())
    }
}

// xsf_options table model (database representation)
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::xsf_options)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OptionRow {
    pub option_name: String,
    pub option_value: String,
}

/// Postgres option store. Values are stored as JSON text, one row per option.
#[derive(Clone)]
pub struct PgOptionStore {
    pool: DbPool,
}

impl PgOptionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OptionStore for PgOptionStore {
    async fn get_option(&self, name: &str) -> Result<Option<Value>, StoreError> {
        let mut conn = self.pool.get().await?;

        let raw = xsf_options::table
            .filter(xsf_options::option_name.eq(name))
            .select(xsf_options::option_value)
            .first::<String>(&mut conn)
            .await
            .optional()?;

        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|source| StoreError::InvalidJson {
                name: name.to_string(),
                source,
            })
        })
        .transpose()
    }

    async fn update_option(&self, name: &str, value: Value) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;

        let row = OptionRow {
            option_name: name.to_string(),
            option_value: value.to_string(),
        };

        diesel::insert_into(xsf_options::table)
            .values(&row)
            .on_conflict(xsf_options::option_name)
            .do_update()
            .set(xsf_options::option_value.eq(excluded(xsf_options::option_value)))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}
