use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

// Persisted option names. These are shared with existing installations, do not rename.
pub const EXCLUDED_OPTION: &str = "wp_xsf_excluded_items";
pub const DISABLED_OPTION: &str = "wp_xsf_disabled_providers";
pub const LAST_UPDATE_OPTION: &str = "wp_xsf_last_update";

/// Sortable date-time format of the persisted last-update timestamp.
pub const LAST_UPDATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Set of excluded content IDs for one (group, subtype) pair.
pub type IdSet = BTreeSet<u64>;

// Group
/// Top-level classification of sitemap content.
/// Unknown group names are kept verbatim so that arbitrary submitted groups round-trip.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    /// Posts, pages and custom post types
    Posts,
    /// Categories, tags and custom taxonomies
    Taxonomies,
    /// Site users
    Users,
    /// Any other group name
    Other(OtherGroup),
}

/// Name of a group outside the known ones. Only built by [`Group::parse`], so a known name never
/// ends up here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OtherGroup(String);

impl OtherGroup {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Group {
    pub fn parse(name: &str) -> Self {
        match name {
            "posts" => Self::Posts,
            "taxonomies" => Self::Taxonomies,
            "users" => Self::Users,
            other => Self::Other(OtherGroup(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Posts => "posts",
            Self::Taxonomies => "taxonomies",
            Self::Users => "users",
            Self::Other(other) => other.as_str(),
        }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Group {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

// Subtype
/// Second-level classification: a post type, a taxonomy, or the fixed `users` key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Subtype(String);

impl Subtype {
    /// The only subtype used by the users group.
    pub const USERS: &'static str = "users";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn users() -> Self {
        Self(Self::USERS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Subtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Subtype {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Subtype {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ExclusionKey
/// Two-level key addressing one exclusion list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExclusionKey {
    pub group: Group,
    pub subtype: Subtype,
}

impl ExclusionKey {
    pub fn new(group: impl Into<Group>, subtype: impl Into<Subtype>) -> Self {
        Self {
            group: group.into(),
            subtype: subtype.into(),
        }
    }

    /// Key for a post type, e.g. `post` or `page`.
    pub fn posts(post_type: &str) -> Self {
        Self::new(Group::Posts, post_type)
    }

    /// Key for a taxonomy, e.g. `category` or `post_tag`.
    pub fn taxonomy(taxonomy: &str) -> Self {
        Self::new(Group::Taxonomies, taxonomy)
    }

    pub fn users() -> Self {
        Self::new(Group::Users, Subtype::users())
    }
}

impl std::fmt::Display for ExclusionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group, self.subtype)
    }
}

/// Sanitizes a submitted or stored ID into a non-negative integer.
///
/// Parses the leading run of ASCII digits after optional whitespace and an optional `+` sign,
/// so `"12abc"` becomes `12`. Values without leading digits, negative values and values that
/// overflow `u64` produce `None`.
pub fn sanitize_id(raw: &str) -> Option<u64> {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits_end = unsigned
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(unsigned.len());
    if digits_end == 0 {
        return None;
    }
    unsigned[..digits_end].parse::<u64>().ok()
}

/// Reads one stored ID leniently: integers and numeric strings are accepted, anything else is skipped.
fn id_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => sanitize_id(s),
        _ => None,
    }
}

// ExclusionSet
/// All excluded content IDs, keyed by (group, subtype).
///
/// Persisted as nested JSON objects: `{"posts": {"page": [5, 9]}, "users": {"users": [3]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet(BTreeMap<ExclusionKey, IdSet>);

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The IDs stored for the key, if the key was ever saved.
    pub fn get(&self, key: &ExclusionKey) -> Option<&IdSet> {
        self.0.get(key)
    }

    /// True if at least one ID is excluded for the key.
    pub fn has_exclusions(&self, key: &ExclusionKey) -> bool {
        self.0.get(key).is_some_and(|ids| !ids.is_empty())
    }

    /// True if the key is excluded and contains the ID.
    pub fn is_excluded(&self, key: &ExclusionKey, id: u64) -> bool {
        self.0.get(key).is_some_and(|ids| ids.contains(&id))
    }

    /// Replaces the IDs for the key, returning the previous IDs.
    pub fn insert(&mut self, key: ExclusionKey, ids: IdSet) -> Option<IdSet> {
        self.0.insert(key, ids)
    }

    /// Overwrites every entry present in `update`. Entries only present in `self` are kept.
    pub fn merge(&mut self, update: ExclusionSet) {
        for (key, ids) in update.0 {
            self.0.insert(key, ids);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &ExclusionKey> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ExclusionKey, &IdSet)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Nested JSON representation used for persistence.
    pub fn to_json_value(&self) -> Value {
        let mut groups = Map::new();
        for (key, ids) in &self.0 {
            let subtypes = groups
                .entry(key.group.as_str().to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(subtypes) = subtypes {
                subtypes.insert(
                    key.subtype.as_str().to_string(),
                    Value::Array(ids.iter().map(|id| Value::from(*id)).collect()),
                );
            }
        }
        Value::Object(groups)
    }

    /// Reads the nested JSON representation leniently.
    ///
    /// A value that is not an object yields an empty set. Groups whose value is not an object and
    /// subtypes whose value is not a list are skipped. IDs that do not sanitize are dropped.
    pub fn from_json_value(value: &Value) -> Self {
        let mut set = Self::new();
        let Value::Object(groups) = value else {
            return set;
        };
        for (group, subtypes) in groups {
            let Value::Object(subtypes) = subtypes else {
                continue;
            };
            for (subtype, ids) in subtypes {
                let Value::Array(ids) = ids else {
                    continue;
                };
                let ids = ids.iter().filter_map(id_from_value).collect();
                set.insert(ExclusionKey::new(group.as_str(), subtype.as_str()), ids);
            }
        }
        set
    }
}

impl FromIterator<(ExclusionKey, IdSet)> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = (ExclusionKey, IdSet)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ExclusionSet {
    type Item = (ExclusionKey, IdSet);
    type IntoIter = std::collections::btree_map::IntoIter<ExclusionKey, IdSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// Provider
/// The sitemap providers that can be disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Provider {
    Posts,
    Taxonomies,
    Users,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Posts, Provider::Taxonomies, Provider::Users];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Taxonomies => "taxonomies",
            Self::Users => "users",
        }
    }

    /// Human readable description shown next to the provider checkbox.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Posts => "Posts provider (posts, pages, custom post types)",
            Self::Taxonomies => "Taxonomies provider (categories, tags, custom taxonomies)",
            Self::Users => "Users provider",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// DisabledProviders
/// Names of sitemap providers that contribute nothing to the sitemap.
///
/// Stored as plain strings: the admin form may submit names outside of [`Provider`] and they are
/// persisted as-is after text sanitization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisabledProviders(BTreeSet<String>);

impl DisabledProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json_value(&self) -> Value {
        Value::Array(self.0.iter().cloned().map(Value::String).collect())
    }

    /// Reads the persisted list leniently. A bare string counts as a one-element list.
    pub fn from_json_value(value: &Value) -> Self {
        match value {
            Value::Array(names) => names
                .iter()
                .filter_map(|name| name.as_str().map(str::to_string))
                .collect(),
            Value::String(name) => [name.clone()].into_iter().collect(),
            _ => Self::new(),
        }
    }
}

impl std::fmt::Display for DisabledProviders {
    /// Comma separated list of the disabled provider names.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{}", names.join(", "))
    }
}

impl FromIterator<String> for DisabledProviders {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for DisabledProviders {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

impl FromIterator<Provider> for DisabledProviders {
    fn from_iter<I: IntoIterator<Item = Provider>>(iter: I) -> Self {
        Self(iter.into_iter().map(|p| p.as_str().to_string()).collect())
    }
}

// LastUpdate
/// Local wall-clock time of the last accepted admin submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LastUpdate(NaiveDateTime);

impl LastUpdate {
    pub fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }

    pub fn now() -> Self {
        Self(chrono::Local::now().naive_local())
    }

    pub fn at(&self) -> NaiveDateTime {
        self.0
    }

    pub fn to_json_value(&self) -> Value {
        Value::String(self.to_string())
    }

    /// `None` if the stored value is not a string in [`LAST_UPDATE_FORMAT`].
    pub fn from_json_value(value: &Value) -> Option<Self> {
        value
            .as_str()
            .and_then(|s| NaiveDateTime::parse_from_str(s, LAST_UPDATE_FORMAT).ok())
            .map(Self)
    }
}

impl std::fmt::Display for LastUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(LAST_UPDATE_FORMAT))
    }
}
