use std::sync::LazyLock;

use regex::Regex;

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>?").expect("tag pattern is valid"));
static OCTETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%[a-fA-F0-9]{2}").expect("octet pattern is valid"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Cleans a single-line text value submitted through the admin form.
///
/// Strips markup tags and percent-encoded octets, collapses runs of whitespace (including line
/// breaks and tabs) into one space and trims both ends.
pub fn sanitize_text_field(raw: &str) -> String {
    let without_tags = TAGS.replace_all(raw, "");
    let without_octets = OCTETS.replace_all(&without_tags, "");
    WHITESPACE.replace_all(&without_octets, " ").trim().to_string()
}
