//! View filtering for the merged status rows
//!
//! Free-text search and status-equality filtering, both optional, ANDed
//! together. Search matches string-typed fields only; numeric and absent
//! fields never match, which is how the view has always behaved.

use serde_json::Value;

use crate::models::StatusRow;
use crate::stage::derive_status;

/// Apply search and status filters over derived rows.
///
/// An empty `search` or `status` disables that filter. Status filtering is
/// exact equality with the derived status label; search is a
/// case-insensitive substring match across every string-typed field.
pub fn filter_rows(rows: &[StatusRow], search: &str, status: &str) -> Vec<StatusRow> {
    let needle = search.to_lowercase();
    rows.iter()
        .filter(|row| {
            let matches_status = status.is_empty() || derive_status(row) == status;
            let matches_search = needle.is_empty() || row_matches(row, &needle);
            matches_status && matches_search
        })
        .cloned()
        .collect()
}

/// Distinct derived statuses currently present, in first-seen order.
/// The status filter dropdown is built from this, so it only ever offers
/// values that actually occur.
pub fn status_options(rows: &[StatusRow]) -> Vec<String> {
    let mut seen = Vec::new();
    for row in rows {
        let status = derive_status(row);
        if !seen.contains(&status) {
            seen.push(status);
        }
    }
    seen
}

fn row_matches(row: &StatusRow, needle: &str) -> bool {
    // Serialize once and scan string values; numeric fields never match.
    let Ok(Value::Object(fields)) = serde_json::to_value(row) else {
        return false;
    };
    fields
        .values()
        .filter_map(Value::as_str)
        .any(|s| s.to_lowercase().contains(needle))
}
