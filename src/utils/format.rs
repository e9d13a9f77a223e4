/// Text helpers shared by the table writers
use std::collections::BTreeSet;

/// Placeholder written for an empty set
pub const EMPTY_SET: &str = "None";

/// Sorted, comma-joined rendering of a set; `None` when empty
pub fn format_set<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let sorted: BTreeSet<String> = items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect();
    if sorted.is_empty() {
        EMPTY_SET.to_string()
    } else {
        sorted.into_iter().collect::<Vec<_>>().join(",")
    }
}

/// Inverse of [`format_set`]
pub fn parse_set(text: &str) -> BTreeSet<String> {
    let text = text.trim();
    if text.is_empty() || text == EMPTY_SET {
        return BTreeSet::new();
    }
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Class names are written without quotes and with `_` for spaces
pub fn sanitize_name(name: &str) -> String {
    name.replace(['"', '\''], "").replace(' ', "_")
}

/// Percentage rounded to two decimals
pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 10000.0).round() / 100.0
}

/// Shortest round-tripping rendering that keeps a fractional part, so
/// whole numbers read `100.0` rather than `100`
pub fn format_float(value: f64) -> String {
    format!("{:?}", value)
}
