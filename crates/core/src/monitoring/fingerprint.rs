//! Query fingerprinting
//!
//! A fingerprint is the statement text with literal values replaced by `?`,
//! whitespace collapsed, and the result truncated. It groups samples of the
//! same statement shape without keeping parameter data.

use lorekeep_domain::constants::FINGERPRINT_MAX_LEN;
use once_cell::sync::Lazy;
use regex::Regex;

static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'(?:[^']|'')*'").expect("STRING_LITERAL should compile - this is a bug")
});
static NUMERIC_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d+(?:\.\d+)?(?:[eE][+-]?\d+)?\b")
        .expect("NUMERIC_LITERAL should compile - this is a bug")
});
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("WHITESPACE should compile - this is a bug"));

/// Mask literals in `sql` and truncate to [`FINGERPRINT_MAX_LEN`] characters.
///
/// ```rust
/// use lorekeep_core::monitoring::fingerprint;
///
/// assert_eq!(
///     fingerprint("SELECT * FROM users WHERE id = 42 AND name = 'o''brien'"),
///     "SELECT * FROM users WHERE id = ? AND name = ?"
/// );
/// ```
pub fn fingerprint(sql: &str) -> String {
    let masked = STRING_LITERAL.replace_all(sql, "?");
    let masked = NUMERIC_LITERAL.replace_all(&masked, "?");
    let collapsed = WHITESPACE.replace_all(masked.trim(), " ");
    truncate_chars(&collapsed, FINGERPRINT_MAX_LEN)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_numbers_but_not_identifiers() {
        assert_eq!(
            fingerprint("select name from campaign_2 where id = 17 limit 10 offset 3.5"),
            "select name from campaign_2 where id = ? limit ? offset ?"
        );
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(fingerprint("  SELECT\n\t1  \n"), "SELECT ?");
    }

    #[test]
    fn truncates_long_statements_on_char_boundary() {
        let sql = format!("SELECT '{}' FROM {}", "x".repeat(10), "é".repeat(200));
        let fp = fingerprint(&sql);
        assert_eq!(fp.chars().count(), FINGERPRINT_MAX_LEN);
        assert!(fp.starts_with("SELECT ? FROM é"));
    }
}
