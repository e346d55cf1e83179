//! Advisory query-pattern checks over recorded fingerprints.
//!
//! Heuristic string checks only. Nothing here is enforced.

use std::collections::HashMap;

use lorekeep_domain::{QuerySample, QuerySuggestion};

#[derive(Default)]
struct Group {
    occurrences: usize,
    total_ms: f64,
}

/// Group `samples` by fingerprint and report every fingerprint with at
/// least one issue, slowest first.
pub fn suggest(samples: &[QuerySample], slow_threshold_ms: f64) -> Vec<QuerySuggestion> {
    let mut groups: HashMap<&str, Group> = HashMap::new();
    for sample in samples {
        let group = groups.entry(sample.fingerprint.as_str()).or_default();
        group.occurrences += 1;
        group.total_ms += sample.duration_ms;
    }

    let mut suggestions: Vec<QuerySuggestion> = groups
        .into_iter()
        .filter_map(|(fingerprint, group)| {
            let average = group.total_ms / group.occurrences as f64;
            let issues = inspect(fingerprint, average, slow_threshold_ms);
            (!issues.is_empty()).then(|| QuerySuggestion {
                fingerprint: fingerprint.to_string(),
                occurrences: group.occurrences,
                average_duration_ms: average,
                issues,
            })
        })
        .collect();

    suggestions.sort_by(|a, b| {
        b.average_duration_ms
            .total_cmp(&a.average_duration_ms)
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });
    suggestions
}

/// Issues found in one fingerprint.
pub fn inspect(fingerprint: &str, average_ms: f64, slow_threshold_ms: f64) -> Vec<String> {
    let sql = format!(" {} ", fingerprint.to_uppercase());
    let has = |needle: &str| sql.contains(needle);
    let mut issues = Vec::new();

    let is_select = sql.trim_start().starts_with("SELECT ");
    let reads_table = is_select && has(" FROM ");

    if is_select && has(" SELECT * ") {
        issues.push("SELECT * fetches every column; list the columns you need".to_string());
    }
    if reads_table && !has(" WHERE ") {
        issues.push("SELECT without WHERE scans the whole table; add a filter".to_string());
    }
    if reads_table && !has(" LIMIT ") {
        issues.push("SELECT without LIMIT can return an unbounded result set".to_string());
    }
    if has(" ORDER BY ") && !has(" LIMIT ") {
        issues.push("ORDER BY without LIMIT sorts the full result set".to_string());
    }
    let trimmed = sql.trim_start();
    if (trimmed.starts_with("UPDATE ") || trimmed.starts_with("DELETE ")) && !has(" WHERE ") {
        issues.push("UPDATE/DELETE without WHERE touches every row".to_string());
    }
    if has(" OFFSET ") {
        issues.push("OFFSET pagination slows down with depth; prefer keyset pagination".to_string());
    }
    if average_ms > slow_threshold_ms {
        issues.push(format!(
            "average duration {average_ms:.2}ms exceeds slow threshold {slow_threshold_ms}ms"
        ));
    }
    issues
}
