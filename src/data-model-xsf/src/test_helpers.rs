//! Test utilities for option store operations
//!
//! Postgres-backed tests connect through `TEST_DATABASE_URL`. When it is unset they are skipped,
//! so the in-memory suites still run on machines without a database.

use diesel_async::RunQueryDsl;
use serde_json::Value;

use crate::db::{DbPool, establish_connection_pool};
use crate::models::{DISABLED_OPTION, EXCLUDED_OPTION, LAST_UPDATE_OPTION};
use crate::option_store::{MemoryOptionStore, OptionStore};
use crate::schema;

/// Get a connection pool for the test database, or `None` if `TEST_DATABASE_URL` is not set.
pub async fn test_db_pool() -> Option<DbPool> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("[test_db_pool] TEST_DATABASE_URL not set, skipping database test.");
        return None;
    };

    let pool = establish_connection_pool(&database_url, 2)
        .await
        .expect("Failed to create test database pool - is the test database running?");
    Some(pool)
}

/// Removes every stored option so each test starts from "never configured".
pub async fn clean_test_db(pool: &DbPool) {
    let mut conn = pool.get().await.expect("Failed to get database connection");

    diesel::delete(schema::xsf_options::table)
        .execute(&mut conn)
        .await
        .expect("Failed to clean xsf_options table");
}

/// In-memory store holding the three persisted options with the given raw JSON values.
/// `None` leaves the option unset.
pub fn seeded_memory_store(
    excluded: Option<Value>,
    disabled: Option<Value>,
    last_update: Option<Value>,
) -> MemoryOptionStore {
    let options = [
        (EXCLUDED_OPTION, excluded),
        (DISABLED_OPTION, disabled),
        (LAST_UPDATE_OPTION, last_update),
    ];
    MemoryOptionStore::with_options(
        options
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (name, value))),
    )
}

/// Raw values of the three persisted options, for before/after comparisons.
pub async fn persisted_state(store: &dyn OptionStore) -> (Option<Value>, Option<Value>, Option<Value>) {
    let excluded = store.get_option(EXCLUDED_OPTION).await.expect("read excluded option");
    let disabled = store.get_option(DISABLED_OPTION).await.expect("read disabled option");
    let last_update = store.get_option(LAST_UPDATE_OPTION).await.expect("read last update option");
    (excluded, disabled, last_update)
}
