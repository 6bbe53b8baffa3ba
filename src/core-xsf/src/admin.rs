//! View models for the admin settings screen.
//!
//! Rendering belongs to the admin UI. This module decides what each tab shows: which items can be
//! excluded and whether they currently are, which providers are disabled, and the status summary.

use std::sync::Arc;

use async_trait::async_trait;
use data_model_xsf::models::{DisabledProviders, ExclusionKey, ExclusionSet, LastUpdate, Provider};
use data_model_xsf::option_store::OptionStore;
use url::Url;

use crate::Error;
use crate::exclusion_store::ExclusionStore;
use crate::sanitize::sanitize_text_field;

/// Only this many posts are listed on the posts tab.
pub const POSTS_TAB_LIMIT: usize = 200;

/// Message shown in place of an empty item table.
pub const NO_ENTRIES: &str = "No entries found.";

// Tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Pages,
    Posts,
    Categories,
    Tags,
    Users,
    Providers,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Pages,
        Tab::Posts,
        Tab::Categories,
        Tab::Tags,
        Tab::Users,
        Tab::Providers,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Pages => "pages",
            Self::Posts => "posts",
            Self::Categories => "categories",
            Self::Tags => "tags",
            Self::Users => "users",
            Self::Providers => "providers",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pages => "Pages",
            Self::Posts => "Posts",
            Self::Categories => "Categories",
            Self::Tags => "Tags",
            Self::Users => "Users",
            Self::Providers => "Providers",
        }
    }

    pub fn parse(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tab| tab.slug() == slug)
    }

    /// Active tab from the `tab` query parameter. Absent means the pages tab; an unknown
    /// value selects no tab at all.
    pub fn from_query(tab: Option<&str>) -> Option<Self> {
        match tab {
            None => Some(Self::Pages),
            Some(raw) => Self::parse(&sanitize_text_field(raw)),
        }
    }

    /// The exclusion list edited on this tab. The providers tab edits none.
    pub fn exclusion_key(&self) -> Option<ExclusionKey> {
        match self {
            Self::Pages => Some(ExclusionKey::posts("page")),
            Self::Posts => Some(ExclusionKey::posts("post")),
            Self::Categories => Some(ExclusionKey::taxonomy("category")),
            Self::Tags => Some(ExclusionKey::taxonomy("post_tag")),
            Self::Users => Some(ExclusionKey::users()),
            Self::Providers => None,
        }
    }
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

// Content listing
/// One published item that can be excluded from the sitemap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentItem {
    pub id: u64,
    /// Post title, term name or user login
    pub title: String,
    pub date: Option<String>,
    pub slug: Option<String>,
    pub email: Option<String>,
}

/// Read access to the site's content, provided by the host application.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn published_pages(&self) -> Result<Vec<ContentItem>, Error>;

    async fn published_posts(&self, limit: usize) -> Result<Vec<ContentItem>, Error>;

    /// All terms of the taxonomy, including terms without posts.
    async fn terms(&self, taxonomy: &str) -> Result<Vec<ContentItem>, Error>;

    async fn users(&self) -> Result<Vec<ContentItem>, Error>;
}

// Tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Title,
    Name,
    Login,
    Id,
    Date,
    Slug,
    Email,
    Type,
}

impl Column {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Name => "Name",
            Self::Login => "Login",
            Self::Id => "ID",
            Self::Date => "Date",
            Self::Slug => "Slug",
            Self::Email => "Email",
            Self::Type => "Type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u64,
    /// Whether the exclusion checkbox is checked
    pub excluded: bool,
    /// One cell per column of the table, in column order
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionTable {
    pub heading: &'static str,
    pub key: ExclusionKey,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl ExclusionTable {
    /// Form field name of the row checkboxes, e.g. `excluded[posts][page][]`.
    pub fn checkbox_name(&self) -> String {
        format!("excluded[{}][{}][]", self.key.group, self.key.subtype)
    }

    pub fn empty_message(&self) -> Option<&'static str> {
        self.rows.is_empty().then_some(NO_ENTRIES)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderToggle {
    pub provider: Provider,
    pub disabled: bool,
}

impl ProviderToggle {
    pub fn label(&self) -> &'static str {
        self.provider.label()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabContent {
    Exclusions(ExclusionTable),
    Providers(Vec<ProviderToggle>),
    /// The requested tab does not exist; nothing is shown besides the status and tab bar.
    Nothing,
}

// Status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapStatus {
    pub last_update: Option<LastUpdate>,
    pub sitemap_url: Url,
    pub disabled: DisabledProviders,
}

impl SitemapStatus {
    pub async fn load(store: &ExclusionStore, sitemap_url: Url) -> Result<Self, Error> {
        Ok(Self {
            last_update: store.load_last_update().await?,
            sitemap_url,
            disabled: store.load_disabled_providers().await?,
        })
    }

    pub fn last_update_label(&self) -> String {
        self.last_update
            .map(|at| at.to_string())
            .unwrap_or_else(|| "Never".to_string())
    }

    pub fn providers_summary(&self) -> String {
        if self.disabled.is_empty() {
            "All providers active.".to_string()
        } else {
            format!("Disabled providers: {}", self.disabled)
        }
    }
}

impl std::fmt::Display for SitemapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Last update: {}", self.last_update_label())?;
        writeln!(f, "Sitemap URL: {}", self.sitemap_url)?;
        write!(f, "{}", self.providers_summary())
    }
}

// Page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabLink {
    pub tab: Tab,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPage {
    pub status: SitemapStatus,
    pub tabs: Vec<TabLink>,
    pub content: TabContent,
}

/// Builds the admin page for a tab from the stored settings and the site's content.
#[derive(Clone)]
pub struct AdminScreen {
    store: ExclusionStore,
    content: Arc<dyn ContentSource>,
    sitemap_url: Url,
}

impl AdminScreen {
    pub fn new(options: Arc<dyn OptionStore>, content: Arc<dyn ContentSource>, sitemap_url: Url) -> Self {
        Self {
            store: ExclusionStore::new(options),
            content,
            sitemap_url,
        }
    }

    pub async fn page(&self, active: Option<Tab>) -> Result<AdminPage, Error> {
        let status = SitemapStatus::load(&self.store, self.sitemap_url.clone()).await?;
        let tabs = Tab::ALL
            .into_iter()
            .map(|tab| TabLink {
                tab,
                active: Some(tab) == active,
            })
            .collect();

        let content = match active {
            None => TabContent::Nothing,
            Some(tab) => match (tab.exclusion_key(), table_layout(tab)) {
                (Some(key), Some(layout)) => {
                    let exclusions = self.store.load_exclusions().await?;
                    TabContent::Exclusions(self.exclusion_table(tab, key, layout, &exclusions).await)
                }
                _ => TabContent::Providers(
                    Provider::ALL
                        .into_iter()
                        .map(|provider| ProviderToggle {
                            provider,
                            disabled: status.disabled.contains(provider.as_str()),
                        })
                        .collect(),
                ),
            },
        };

        Ok(AdminPage { status, tabs, content })
    }

    async fn exclusion_table(
        &self,
        tab: Tab,
        key: ExclusionKey,
        layout: TableLayout,
        exclusions: &ExclusionSet,
    ) -> ExclusionTable {
        let TableLayout {
            heading,
            columns,
            type_label,
        } = layout;

        let items = match self.list_items(tab).await {
            Ok(items) => items,
            Err(error) => {
                tracing::warn!(tab = %tab, "Listing content failed, showing no entries: {}", error);
                Vec::new()
            }
        };

        let rows = items
            .into_iter()
            .map(|item| Row {
                id: item.id,
                excluded: exclusions.is_excluded(&key, item.id),
                cells: columns.iter().map(|column| cell(&item, *column, type_label)).collect(),
            })
            .collect();

        ExclusionTable {
            heading,
            key,
            columns,
            rows,
        }
    }

    async fn list_items(&self, tab: Tab) -> Result<Vec<ContentItem>, Error> {
        match tab {
            Tab::Pages => self.content.published_pages().await,
            Tab::Posts => self.content.published_posts(POSTS_TAB_LIMIT).await,
            Tab::Categories => self.content.terms("category").await,
            Tab::Tags => self.content.terms("post_tag").await,
            Tab::Users => self.content.users().await,
            Tab::Providers => Ok(Vec::new()),
        }
    }
}

struct TableLayout {
    heading: &'static str,
    columns: Vec<Column>,
    /// Value of the Type column
    type_label: &'static str,
}

fn table_layout(tab: Tab) -> Option<TableLayout> {
    use Column::*;
    let (heading, columns, type_label) = match tab {
        Tab::Pages => ("Exclude pages from sitemap", vec![Title, Id, Date, Type], "page"),
        Tab::Posts => ("Exclude posts from sitemap", vec![Title, Id, Date, Type], "post"),
        Tab::Categories => ("Exclude categories from sitemap", vec![Name, Id, Slug, Type], "category"),
        Tab::Tags => ("Exclude tags from sitemap", vec![Name, Id, Slug, Type], "post_tag"),
        Tab::Users => ("Exclude users from sitemap", vec![Login, Id, Email, Type], "user"),
        Tab::Providers => return None,
    };
    Some(TableLayout {
        heading,
        columns,
        type_label,
    })
}

fn cell(item: &ContentItem, column: Column, type_label: &str) -> String {
    match column {
        Column::Title | Column::Name | Column::Login => item.title.clone(),
        Column::Id => item.id.to_string(),
        Column::Date => item.date.clone().unwrap_or_default(),
        Column::Slug => item.slug.clone().unwrap_or_default(),
        Column::Email => item.email.clone().unwrap_or_default(),
        Column::Type => type_label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_model_xsf::models::{DISABLED_OPTION, EXCLUDED_OPTION};
    use data_model_xsf::option_store::MemoryOptionStore;
    use serde_json::json;

    struct FakeContent;

    fn item(id: u64, title: &str) -> ContentItem {
        ContentItem {
            id,
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[async_trait]
    impl ContentSource for FakeContent {
        async fn published_pages(&self) -> Result<Vec<ContentItem>, Error> {
            Ok(vec![
                ContentItem {
                    date: Some("2024-01-02 03:04:05".to_string()),
                    ..item(5, "About")
                },
                item(9, "Contact"),
            ])
        }

        async fn published_posts(&self, limit: usize) -> Result<Vec<ContentItem>, Error> {
            Ok((1..=250).take(limit).map(|id| item(id, "Post")).collect())
        }

        async fn terms(&self, taxonomy: &str) -> Result<Vec<ContentItem>, Error> {
            Err(Error::ContentError(format!("taxonomy '{}' unavailable", taxonomy)))
        }

        async fn users(&self) -> Result<Vec<ContentItem>, Error> {
            Ok(vec![ContentItem {
                email: Some("admin@example.com".to_string()),
                ..item(1, "admin")
            }])
        }
    }

    fn screen(options: MemoryOptionStore) -> AdminScreen {
        AdminScreen::new(
            Arc::new(options),
            Arc::new(FakeContent),
            Url::parse("https://example.com/wp-sitemap.xml").unwrap(),
        )
    }

    #[test]
    fn test_tab_from_query() {
        assert_eq!(Tab::from_query(None), Some(Tab::Pages));
        assert_eq!(Tab::from_query(Some("providers")), Some(Tab::Providers));
        assert_eq!(Tab::from_query(Some(" tags ")), Some(Tab::Tags));
        assert_eq!(Tab::from_query(Some("media")), None);
    }

    #[test]
    fn test_tab_exclusion_keys() {
        assert_eq!(Tab::Pages.exclusion_key(), Some(ExclusionKey::posts("page")));
        assert_eq!(Tab::Tags.exclusion_key(), Some(ExclusionKey::taxonomy("post_tag")));
        assert_eq!(Tab::Users.exclusion_key(), Some(ExclusionKey::users()));
        assert_eq!(Tab::Providers.exclusion_key(), None);
    }

    #[tokio::test]
    async fn test_pages_tab_marks_excluded_rows() {
        let screen = screen(MemoryOptionStore::with_options([(
            EXCLUDED_OPTION,
            json!({"posts": {"page": [9]}}),
        )]));
        let page = screen.page(Some(Tab::Pages)).await.unwrap();

        let TabContent::Exclusions(table) = page.content else {
            panic!("pages tab should show an exclusion table");
        };
        assert_eq!(table.checkbox_name(), "excluded[posts][page][]");
        assert_eq!(table.columns, vec![Column::Title, Column::Id, Column::Date, Column::Type]);
        assert_eq!(
            table.rows[0].cells,
            vec!["About", "5", "2024-01-02 03:04:05", "page"]
        );
        assert!(!table.rows[0].excluded);
        assert!(table.rows[1].excluded);
        assert_eq!(table.empty_message(), None);
        assert!(page.tabs.iter().any(|link| link.tab == Tab::Pages && link.active));
    }

    #[tokio::test]
    async fn test_posts_tab_is_limited() {
        let page = screen(MemoryOptionStore::new()).page(Some(Tab::Posts)).await.unwrap();
        let TabContent::Exclusions(table) = page.content else {
            panic!("posts tab should show an exclusion table");
        };
        assert_eq!(table.rows.len(), POSTS_TAB_LIMIT);
    }

    #[tokio::test]
    async fn test_failed_term_lookup_shows_no_entries() {
        let page = screen(MemoryOptionStore::new()).page(Some(Tab::Categories)).await.unwrap();
        let TabContent::Exclusions(table) = page.content else {
            panic!("categories tab should show an exclusion table");
        };
        assert!(table.rows.is_empty());
        assert_eq!(table.empty_message(), Some(NO_ENTRIES));
        assert_eq!(table.checkbox_name(), "excluded[taxonomies][category][]");
    }

    #[tokio::test]
    async fn test_users_tab_columns() {
        let page = screen(MemoryOptionStore::new()).page(Some(Tab::Users)).await.unwrap();
        let TabContent::Exclusions(table) = page.content else {
            panic!("users tab should show an exclusion table");
        };
        assert_eq!(table.rows[0].cells, vec!["admin", "1", "admin@example.com", "user"]);
        assert_eq!(table.checkbox_name(), "excluded[users][users][]");
    }

    #[tokio::test]
    async fn test_providers_tab() {
        let screen = screen(MemoryOptionStore::with_options([(DISABLED_OPTION, json!(["users"]))]));
        let page = screen.page(Some(Tab::Providers)).await.unwrap();

        let TabContent::Providers(toggles) = page.content else {
            panic!("providers tab should show provider toggles");
        };
        assert_eq!(toggles.len(), 3);
        assert!(toggles.iter().all(|t| t.disabled == (t.provider == Provider::Users)));
        assert_eq!(toggles[0].label(), "Posts provider (posts, pages, custom post types)");
        assert_eq!(page.status.providers_summary(), "Disabled providers: users");
    }

    #[tokio::test]
    async fn test_unknown_tab_shows_nothing() {
        let page = screen(MemoryOptionStore::new()).page(None).await.unwrap();
        assert_eq!(page.content, TabContent::Nothing);
        assert!(page.tabs.iter().all(|link| !link.active));
    }

    #[tokio::test]
    async fn test_status_never_updated() {
        let page = screen(MemoryOptionStore::new()).page(Some(Tab::Pages)).await.unwrap();
        assert_eq!(
            page.status.to_string(),
            "Last update: Never\nSitemap URL: https://example.com/wp-sitemap.xml\nAll providers active."
        );
    }
}
