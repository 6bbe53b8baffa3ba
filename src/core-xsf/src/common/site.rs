use url::Url;

/// Path of the core XML sitemap index, relative to the site home URL.
pub const SITEMAP_PATH: &str = "wp-sitemap.xml";

pub const DEFAULT_SITE_URL: &str = "http://localhost";

/// Site home URL from SITE_URL, falling back to `http://localhost`.
pub fn get_site_url() -> Result<Url, url::ParseError> {
    let raw = std::env::var("SITE_URL").unwrap_or_else(|_| DEFAULT_SITE_URL.to_string());
    Url::parse(raw.trim())
}

/// URL of the sitemap index for the given home URL. Sites installed under a sub-path keep it.
pub fn sitemap_url(home: &Url) -> Result<Url, url::ParseError> {
    let mut base = home.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(SITEMAP_PATH)
}
