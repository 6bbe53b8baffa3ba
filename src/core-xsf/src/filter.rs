//! Hooks consulted by the sitemap engine while it builds the sitemap.
//!
//! None of the hooks fail: whenever the settings cannot be read they behave as if nothing was
//! excluded or disabled, so the sitemap degrades to showing everything rather than breaking.

use std::sync::Arc;

use data_model_xsf::models::{DisabledProviders, ExclusionKey, ExclusionSet};
use data_model_xsf::option_store::OptionStore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::exclusion_store::ExclusionStore;

/// Query arguments the sitemap engine uses to select the items of one sitemap page.
///
/// Only the exclusion constraint is typed. Everything else belongs to the engine and passes
/// through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryArgs {
    /// IDs that must not appear in the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<u64>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an engine argument.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.other.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.other.get(key)
    }
}

#[derive(Clone)]
pub struct SitemapFilter {
    store: ExclusionStore,
}

impl SitemapFilter {
    pub fn new(options: Arc<dyn OptionStore>) -> Self {
        Self {
            store: ExclusionStore::new(options),
        }
    }

    /// Keeps the provider unless its name is disabled. `None` tells the engine to drop the provider.
    pub async fn on_provider_registration<P: Send>(&self, provider: P, name: &str) -> Option<P> {
        let disabled = self.disabled_providers().await;
        if disabled.contains(name) {
            tracing::debug!(provider = name, "Sitemap provider disabled");
            None
        } else {
            Some(provider)
        }
    }

    /// Excludes the configured IDs of the post type from a posts sitemap query.
    pub async fn on_posts_query(&self, args: QueryArgs, post_type: &str) -> QueryArgs {
        self.apply(args, &ExclusionKey::posts(post_type)).await
    }

    /// Excludes the configured term IDs of the taxonomy from a taxonomy sitemap query.
    pub async fn on_taxonomy_query(&self, args: QueryArgs, taxonomy: &str) -> QueryArgs {
        self.apply(args, &ExclusionKey::taxonomy(taxonomy)).await
    }

    /// Excludes the configured user IDs from the users sitemap query.
    pub async fn on_users_query(&self, args: QueryArgs) -> QueryArgs {
        self.apply(args, &ExclusionKey::users()).await
    }

    async fn apply(&self, mut args: QueryArgs, key: &ExclusionKey) -> QueryArgs {
        let exclusions = self.exclusions().await;
        match exclusions.get(key) {
            Some(ids) if !ids.is_empty() => {
                tracing::debug!(key = %key, count = ids.len(), "Excluding items from sitemap query");
                args.exclude = Some(ids.iter().copied().collect());
                args
            }
            _ => args,
        }
    }

    async fn exclusions(&self) -> ExclusionSet {
        self.store.load_exclusions().await.unwrap_or_else(|error| {
            tracing::warn!("Cannot read sitemap exclusions, excluding nothing: {}", error);
            ExclusionSet::default()
        })
    }

    async fn disabled_providers(&self) -> DisabledProviders {
        self.store.load_disabled_providers().await.unwrap_or_else(|error| {
            tracing::warn!("Cannot read disabled sitemap providers, keeping all: {}", error);
            DisabledProviders::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use data_model_xsf::models::{DISABLED_OPTION, EXCLUDED_OPTION};
    use data_model_xsf::option_store::{MemoryOptionStore, StoreError};
    use serde_json::json;

    struct BrokenStore;

    #[async_trait]
    impl OptionStore for BrokenStore {
        async fn get_option(&self, _name: &str) -> Result<Option<Value>, StoreError> {
            Err(StoreError::DbError(diesel::result::Error::BrokenTransactionManager))
        }

        async fn update_option(&self, _name: &str, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::DbError(diesel::result::Error::BrokenTransactionManager))
        }
    }

    fn filter_with(options: MemoryOptionStore) -> SitemapFilter {
        SitemapFilter::new(Arc::new(options))
    }

    #[test]
    fn test_query_args_serialization() {
        let args = QueryArgs::new().with("posts_per_page", 2000);
        assert_eq!(serde_json::to_value(&args).unwrap(), json!({"posts_per_page": 2000}));

        let args: QueryArgs = serde_json::from_value(json!({"exclude": [4], "orderby": "ID"})).unwrap();
        assert_eq!(args.exclude, Some(vec![4]));
        assert_eq!(args.get("orderby"), Some(&json!("ID")));
    }

    #[tokio::test]
    async fn test_posts_query_without_exclusions_unchanged() {
        let filter = filter_with(MemoryOptionStore::new());
        assert_eq!(filter.on_posts_query(QueryArgs::new(), "post").await, QueryArgs::new());

        let filter = filter_with(MemoryOptionStore::with_options([(
            EXCLUDED_OPTION,
            json!({"posts": {"post": []}}),
        )]));
        assert_eq!(filter.on_posts_query(QueryArgs::new(), "post").await, QueryArgs::new());
    }

    #[tokio::test]
    async fn test_posts_query_sets_exclude() {
        let filter = filter_with(MemoryOptionStore::with_options([(
            EXCLUDED_OPTION,
            json!({"posts": {"post": [3, 1, 2]}}),
        )]));

        let args = filter.on_posts_query(QueryArgs::new(), "post").await;
        assert_eq!(serde_json::to_value(&args).unwrap(), json!({"exclude": [1, 2, 3]}));
    }

    #[tokio::test]
    async fn test_posts_query_overwrites_existing_exclude_and_keeps_other_args() {
        let filter = filter_with(MemoryOptionStore::with_options([(
            EXCLUDED_OPTION,
            json!({"posts": {"page": [5, 9]}}),
        )]));
        let mut args = QueryArgs::new().with("post_type", "page");
        args.exclude = Some(vec![100]);

        let args = filter.on_posts_query(args, "page").await;
        assert_eq!(args.exclude, Some(vec![5, 9]));
        assert_eq!(args.get("post_type"), Some(&json!("page")));
    }

    #[tokio::test]
    async fn test_posts_query_is_per_post_type() {
        let filter = filter_with(MemoryOptionStore::with_options([(
            EXCLUDED_OPTION,
            json!({"posts": {"page": [5]}}),
        )]));
        assert_eq!(filter.on_posts_query(QueryArgs::new(), "post").await.exclude, None);
    }

    #[tokio::test]
    async fn test_taxonomy_and_users_queries() {
        let filter = filter_with(MemoryOptionStore::with_options([(
            EXCLUDED_OPTION,
            json!({"taxonomies": {"post_tag": [12]}, "users": {"users": [2]}}),
        )]));

        assert_eq!(
            filter.on_taxonomy_query(QueryArgs::new(), "post_tag").await.exclude,
            Some(vec![12])
        );
        assert_eq!(filter.on_taxonomy_query(QueryArgs::new(), "category").await.exclude, None);
        assert_eq!(filter.on_users_query(QueryArgs::new()).await.exclude, Some(vec![2]));
    }

    #[tokio::test]
    async fn test_provider_registration() {
        let filter = filter_with(MemoryOptionStore::with_options([(DISABLED_OPTION, json!(["users"]))]));

        assert_eq!(filter.on_provider_registration("provider", "users").await, None);
        assert_eq!(filter.on_provider_registration("provider", "posts").await, Some("provider"));
    }

    #[tokio::test]
    async fn test_provider_registration_nothing_disabled() {
        let filter = filter_with(MemoryOptionStore::new());
        for name in ["posts", "taxonomies", "users"] {
            assert_eq!(filter.on_provider_registration(7, name).await, Some(7));
        }
    }

    #[tokio::test]
    async fn test_broken_store_degrades_to_permissive() {
        let filter = SitemapFilter::new(Arc::new(BrokenStore));
        assert_eq!(filter.on_provider_registration((), "users").await, Some(()));
        assert_eq!(filter.on_users_query(QueryArgs::new()).await, QueryArgs::new());
    }
}
