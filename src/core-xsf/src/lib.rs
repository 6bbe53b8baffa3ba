pub mod admin;
pub mod common;
pub mod errors;
pub mod exclusion_store;
pub mod filter;
pub mod nonce;
pub mod sanitize;
pub mod submission;

pub use admin::{AdminPage, AdminScreen, ContentItem, ContentSource, SitemapStatus, Tab, TabContent};
pub use common::db_env::{get_database_url, get_db_pool};
pub use common::logging::setup_logging;
pub use common::nonce_config::{NonceConfig, get_nonce_config};
pub use common::site::{get_site_url, sitemap_url};
pub use errors::Error;
pub use exclusion_store::ExclusionStore;
pub use filter::{QueryArgs, SitemapFilter};
pub use nonce::{HmacNonces, NonceVerifier};
pub use submission::{AdminForm, IgnoreReason, SubmissionHandler, SubmitOutcome};
