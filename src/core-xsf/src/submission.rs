//! Handling of the admin settings form.
//!
//! The form posts checkbox values as bracketed field names, e.g.
//! `excluded[posts][page][]=5&excluded[posts][page][]=9&wp_xsf_nonce=...`. Parsing is forgiving:
//! malformed fields are skipped and the rest of the submission still applies.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use data_model_xsf::models::{DisabledProviders, ExclusionKey, ExclusionSet, IdSet, LastUpdate, sanitize_id};
use data_model_xsf::option_store::OptionStore;
use regex::Regex;

use crate::Error;
use crate::admin::Tab;
use crate::exclusion_store::ExclusionStore;
use crate::nonce::{NONCE_FIELD, NonceVerifier, SAVE_ACTION};

const EXCLUDED_FIELD: &str = "excluded";
const DISABLED_PROVIDERS_FIELD: &str = "disabled_providers";

static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^\[\]]+)((?:\[[^\[\]]*\])*)$").expect("field name pattern is valid"));
static FIELD_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]*)\]").expect("field segment pattern is valid"));

/// Splits `excluded[posts][page][]` into `("excluded", ["posts", "page", ""])`.
fn split_field_name(name: &str) -> Option<(&str, Vec<&str>)> {
    let captures = FIELD_NAME.captures(name)?;
    let base = captures.get(1)?.as_str();
    let segments = captures
        .get(2)
        .map(|brackets| {
            FIELD_SEGMENT
                .captures_iter(brackets.as_str())
                .filter_map(|segment| segment.get(1).map(|m| m.as_str()))
                .collect()
        })
        .unwrap_or_default();
    Some((base, segments))
}

/// A list element is addressed as `[]` or by a numeric index like `[3]`.
fn is_list_index(segment: &str) -> bool {
    segment.chars().all(|c| c.is_ascii_digit())
}

/// The decoded admin settings form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminForm {
    pub nonce: Option<String>,
    /// Every (group, subtype) that had at least one list entry, with its sanitized IDs
    pub excluded: ExclusionSet,
    /// Raw submitted provider names
    pub disabled_providers: Vec<String>,
    /// Number of fields dropped because their shape was not the expected one
    pub skipped_fields: usize,
    /// Exclusion lists that had at least one dropped field
    pub malformed_keys: BTreeSet<ExclusionKey>,
    /// The active tab was shown with no items, so none of its boxes could be unchecked
    pub active_tab_empty: bool,
}

impl AdminForm {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut form = Self::default();
        for (name, value) in pairs {
            form.add_field(name.as_ref(), value.as_ref());
        }
        form
    }

    /// Decodes an `application/x-www-form-urlencoded` body.
    pub fn from_urlencoded(body: &[u8]) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(body))
    }

    /// Marks the active tab as rendered without items. Its stored list is then kept as is.
    pub fn with_empty_active_tab(mut self) -> Self {
        self.active_tab_empty = true;
        self
    }

    fn add_field(&mut self, name: &str, value: &str) {
        let Some((base, segments)) = split_field_name(name) else {
            return;
        };

        match (base, segments.as_slice()) {
            (NONCE_FIELD, []) => self.nonce = Some(value.to_string()),

            (EXCLUDED_FIELD, [group, subtype, index])
                if !group.is_empty() && !subtype.is_empty() && is_list_index(index) =>
            {
                let key = ExclusionKey::new(*group, *subtype);
                let mut ids = self.excluded.get(&key).cloned().unwrap_or_default();
                match sanitize_id(value) {
                    Some(id) => {
                        ids.insert(id);
                    }
                    None => tracing::debug!(field = name, value, "Dropping ID that is not a non-negative integer"),
                }
                self.excluded.insert(key, ids);
            }
            (EXCLUDED_FIELD, rest) => {
                tracing::debug!(field = name, "Skipping malformed exclusion field");
                self.skipped_fields += 1;
                if let [group, subtype, ..] = rest
                    && !group.is_empty()
                    && !subtype.is_empty()
                {
                    self.malformed_keys.insert(ExclusionKey::new(*group, *subtype));
                }
            }

            // A single value is accepted as a one-element list
            (DISABLED_PROVIDERS_FIELD, []) => self.disabled_providers.push(value.to_string()),
            (DISABLED_PROVIDERS_FIELD, [index]) if is_list_index(index) => {
                self.disabled_providers.push(value.to_string())
            }
            (DISABLED_PROVIDERS_FIELD, _) => {
                tracing::debug!(field = name, "Skipping malformed provider field");
                self.skipped_fields += 1;
            }

            _ => {}
        }
    }
}

/// Why a submission changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    MissingNonce,
    InvalidNonce,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was written.
    Ignored(IgnoreReason),
    Applied {
        /// Exclusion lists that were overwritten
        updated: Vec<ExclusionKey>,
        /// New disabled providers, when the providers tab was submitted
        disabled_providers: Option<DisabledProviders>,
        last_update: LastUpdate,
    },
}

/// Applies admin form submissions to the stored settings.
#[derive(Clone)]
pub struct SubmissionHandler {
    store: ExclusionStore,
    nonces: Arc<dyn NonceVerifier>,
}

impl SubmissionHandler {
    pub fn new(options: Arc<dyn OptionStore>, nonces: Arc<dyn NonceVerifier>) -> Self {
        Self {
            store: ExclusionStore::new(options),
            nonces,
        }
    }

    /// Verifies the nonce, then merges the submitted exclusions, replaces the disabled providers
    /// when the providers tab is active and records the update time.
    ///
    /// The exclusion list shown on the active tab counts as submitted even when no box was
    /// checked, so unchecking every item clears it. It is kept when one of its fields was
    /// malformed or when the tab was shown without items. Lists of other tabs are left untouched.
    pub async fn handle(&self, form: AdminForm, active: Option<Tab>) -> Result<SubmitOutcome, Error> {
        let Some(nonce) = form.nonce.as_deref() else {
            tracing::warn!("Ignoring settings submission without a nonce");
            return Ok(SubmitOutcome::Ignored(IgnoreReason::MissingNonce));
        };
        if !self.nonces.verify(nonce, SAVE_ACTION) {
            tracing::warn!("Ignoring settings submission with an invalid nonce");
            return Ok(SubmitOutcome::Ignored(IgnoreReason::InvalidNonce));
        }

        let mut update = form.excluded;
        if let Some(key) = active.and_then(|tab| tab.exclusion_key())
            && update.get(&key).is_none()
            && !form.malformed_keys.contains(&key)
            && !form.active_tab_empty
        {
            update.insert(key, IdSet::new());
        }

        let updated: Vec<ExclusionKey> = update.keys().cloned().collect();
        if !update.is_empty() {
            self.store.save_exclusions(update).await?;
        }

        let disabled_providers = match active {
            Some(Tab::Providers) => Some(
                self.store
                    .save_disabled_providers(form.disabled_providers.into_iter().collect())
                    .await?,
            ),
            _ => None,
        };

        let last_update = self.store.touch_last_update().await?;

        tracing::info!(
            tab = active.map(|tab| tab.slug()).unwrap_or("unknown"),
            exclusion_lists = updated.len(),
            skipped_fields = form.skipped_fields,
            "Applied sitemap filter settings"
        );

        Ok(SubmitOutcome::Applied {
            updated,
            disabled_providers,
            last_update,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_field_name() {
        assert_eq!(
            split_field_name("excluded[posts][page][]"),
            Some(("excluded", vec!["posts", "page", ""]))
        );
        assert_eq!(split_field_name("wp_xsf_nonce"), Some(("wp_xsf_nonce", vec![])));
        assert_eq!(split_field_name("excluded[posts"), None);
        assert_eq!(split_field_name("[posts]"), None);
    }

    #[test]
    fn test_form_collects_exclusions() {
        let form = AdminForm::from_pairs([
            ("excluded[posts][page][]", "5"),
            ("excluded[posts][page][]", "9"),
            ("excluded[taxonomies][category][0]", "12"),
            ("wp_xsf_nonce", "token"),
        ]);

        assert_eq!(form.nonce.as_deref(), Some("token"));
        assert_eq!(form.excluded.get(&ExclusionKey::posts("page")), Some(&IdSet::from([5, 9])));
        assert_eq!(
            form.excluded.get(&ExclusionKey::taxonomy("category")),
            Some(&IdSet::from([12]))
        );
        assert_eq!(form.skipped_fields, 0);
    }

    #[test]
    fn test_form_skips_malformed_exclusions() {
        let form = AdminForm::from_pairs([
            ("excluded[posts][page]", "5"),
            ("excluded[posts]", "5"),
            ("excluded", "5"),
            ("excluded[][page][]", "5"),
            ("excluded[posts][post][]", "3"),
        ]);

        assert_eq!(form.skipped_fields, 4);
        assert_eq!(form.malformed_keys, BTreeSet::from([ExclusionKey::posts("page")]));
        assert_eq!(form.excluded.len(), 1);
        assert_eq!(form.excluded.get(&ExclusionKey::posts("post")), Some(&IdSet::from([3])));
    }

    #[test]
    fn test_form_sanitizes_ids() {
        let form = AdminForm::from_pairs([
            ("excluded[users][users][]", "7abc"),
            ("excluded[users][users][]", "-2"),
            ("excluded[users][users][]", "nope"),
        ]);
        assert_eq!(form.excluded.get(&ExclusionKey::users()), Some(&IdSet::from([7])));
    }

    #[test]
    fn test_form_disabled_providers() {
        let form = AdminForm::from_pairs([
            ("disabled_providers[]", "taxonomies"),
            ("disabled_providers[]", "users"),
        ]);
        assert_eq!(form.disabled_providers, vec!["taxonomies", "users"]);

        let form = AdminForm::from_pairs([("disabled_providers", "posts")]);
        assert_eq!(form.disabled_providers, vec!["posts"]);

        let form = AdminForm::from_pairs([("disabled_providers[a][b]", "posts")]);
        assert!(form.disabled_providers.is_empty());
        assert_eq!(form.skipped_fields, 1);
    }

    #[test]
    fn test_form_from_urlencoded() {
        let form = AdminForm::from_urlencoded(
            b"wp_xsf_nonce=abc%3A1&excluded%5Bposts%5D%5Bpage%5D%5B%5D=5&excluded[posts][page][]=9&other=1",
        );
        assert_eq!(form.nonce.as_deref(), Some("abc:1"));
        assert_eq!(form.excluded.get(&ExclusionKey::posts("page")), Some(&IdSet::from([5, 9])));
    }
}
