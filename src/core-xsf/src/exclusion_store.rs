//! Persistence of the sitemap filter settings on top of an [`OptionStore`].
//!
//! Three options are managed: the excluded IDs per (group, subtype), the disabled providers and
//! the timestamp of the last accepted admin submission. Every call reads the backend afresh.

use std::sync::Arc;

use data_model_xsf::models::{
    DISABLED_OPTION, DisabledProviders, EXCLUDED_OPTION, ExclusionSet, LAST_UPDATE_OPTION, LastUpdate,
};
use data_model_xsf::option_store::{OptionStore, StoreError};
use serde_json::Value;

use crate::Error;
use crate::sanitize::sanitize_text_field;

#[derive(Clone)]
pub struct ExclusionStore {
    options: Arc<dyn OptionStore>,
}

impl ExclusionStore {
    pub fn new(options: Arc<dyn OptionStore>) -> Self {
        Self { options }
    }

    /// The persisted exclusions, or an empty set if none were ever saved.
    pub async fn load_exclusions(&self) -> Result<ExclusionSet, Error> {
        Ok(self
            .read_option(EXCLUDED_OPTION)
            .await?
            .map(|value| ExclusionSet::from_json_value(&value))
            .unwrap_or_default())
    }

    /// Merges `update` into the persisted exclusions and returns the stored result.
    ///
    /// Each (group, subtype) present in `update` replaces the stored IDs for that pair, including
    /// with an empty set. Pairs absent from `update` keep their stored IDs.
    pub async fn save_exclusions(&self, update: ExclusionSet) -> Result<ExclusionSet, Error> {
        let mut stored = self.load_exclusions().await?;
        let updated_keys = update.len();
        stored.merge(update);

        self.options.update_option(EXCLUDED_OPTION, stored.to_json_value()).await?;
        tracing::debug!(updated_keys, total_keys = stored.len(), "Saved sitemap exclusions");

        Ok(stored)
    }

    pub async fn load_disabled_providers(&self) -> Result<DisabledProviders, Error> {
        Ok(self
            .read_option(DISABLED_OPTION)
            .await?
            .map(|value| DisabledProviders::from_json_value(&value))
            .unwrap_or_default())
    }

    /// Replaces the disabled providers. Names are sanitized, names that sanitize to nothing are dropped.
    pub async fn save_disabled_providers(&self, names: DisabledProviders) -> Result<DisabledProviders, Error> {
        let sanitized: DisabledProviders = names
            .iter()
            .map(sanitize_text_field)
            .filter(|name| !name.is_empty())
            .collect();

        self.options.update_option(DISABLED_OPTION, sanitized.to_json_value()).await?;
        tracing::debug!(disabled = %sanitized, "Saved disabled sitemap providers");

        Ok(sanitized)
    }

    /// Records the current local time as the last update.
    pub async fn touch_last_update(&self) -> Result<LastUpdate, Error> {
        let now = LastUpdate::now();
        self.options.update_option(LAST_UPDATE_OPTION, now.to_json_value()).await?;
        Ok(now)
    }

    /// `None` when no submission was ever accepted or the stored value is unreadable.
    pub async fn load_last_update(&self) -> Result<Option<LastUpdate>, Error> {
        Ok(self
            .read_option(LAST_UPDATE_OPTION)
            .await?
            .and_then(|value| LastUpdate::from_json_value(&value)))
    }

    /// Reads an option, treating a value that is not JSON as never written.
    async fn read_option(&self, name: &str) -> Result<Option<Value>, Error> {
        match self.options.get_option(name).await {
            Ok(value) => Ok(value),
            Err(StoreError::InvalidJson { name, source }) => {
                tracing::warn!("Ignoring unreadable option '{}': {}", name, source);
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}
