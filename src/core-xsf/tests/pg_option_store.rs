//! Integration tests for the Postgres option store
//!
//! Requires a database with the `xsf_options` migration applied, reachable via TEST_DATABASE_URL.

use data_model_xsf::{
    option_store::{OptionStore, PgOptionStore, StoreError},
    schema,
    test_helpers::{clean_test_db, test_db_pool},
};
use diesel_async::RunQueryDsl;
use serde_json::json;
use tokio::sync::Mutex;

/// The tests share one table, run them one at a time.
static TEST_MUTEX: Mutex<()> = Mutex::const_new(());

#[tokio::test]
async fn test_pg_get_missing_option() {
    let _guard = TEST_MUTEX.lock().await;
    let Some(pool) = test_db_pool().await else { return };
    clean_test_db(&pool).await;

    let store = PgOptionStore::new(pool);
    assert_eq!(store.get_option("wp_xsf_excluded_items").await.unwrap(), None);
}

#[tokio::test]
async fn test_pg_update_then_get() {
    let _guard = TEST_MUTEX.lock().await;
    let Some(pool) = test_db_pool().await else { return };
    clean_test_db(&pool).await;

    let store = PgOptionStore::new(pool);
    let value = json!({"posts": {"page": [5, 9]}});
    store.update_option("wp_xsf_excluded_items", value.clone()).await.unwrap();

    assert_eq!(store.get_option("wp_xsf_excluded_items").await.unwrap(), Some(value));
}

#[tokio::test]
async fn test_pg_update_overwrites_existing_row() {
    let _guard = TEST_MUTEX.lock().await;
    let Some(pool) = test_db_pool().await else { return };
    clean_test_db(&pool).await;

    let store = PgOptionStore::new(pool);
    store.update_option("wp_xsf_disabled_providers", json!(["users"])).await.unwrap();
    store.update_option("wp_xsf_disabled_providers", json!([])).await.unwrap();

    assert_eq!(
        store.get_option("wp_xsf_disabled_providers").await.unwrap(),
        Some(json!([]))
    );
}

#[tokio::test]
async fn test_pg_invalid_json_is_reported() {
    let _guard = TEST_MUTEX.lock().await;
    let Some(pool) = test_db_pool().await else { return };
    clean_test_db(&pool).await;

    {
        let mut conn = pool.get().await.unwrap();
        diesel::insert_into(schema::xsf_options::table)
            .values(&data_model_xsf::option_store::OptionRow {
                option_name: "wp_xsf_excluded_items".to_string(),
                option_value: "a:1:{s:5:\"posts\";}".to_string(),
            })
            .execute(&mut conn)
            .await
            .unwrap();
    }

    let store = PgOptionStore::new(pool);
    let result = store.get_option("wp_xsf_excluded_items").await;
    assert!(matches!(result, Err(StoreError::InvalidJson { .. })));
}
