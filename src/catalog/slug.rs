use deunicode::deunicode;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Runs of anything that is not a lowercase ASCII letter or digit
    static ref SEPARATOR_RUN: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Derive a URL-safe slug from a display name.
///
/// Non-ASCII text is transliterated, everything is lowercased, and each run of
/// whitespace or punctuation becomes a single hyphen. Leading and trailing
/// hyphens are dropped.
pub fn slugify(name: &str) -> String {
    let ascii = deunicode(name).to_lowercase();
    SEPARATOR_RUN
        .replace_all(&ascii, "-")
        .trim_matches('-')
        .to_string()
}
