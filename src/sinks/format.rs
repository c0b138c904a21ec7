use chrono::{DateTime, Utc};

/// Longest suite-id fragment kept in an artifact name.
const MAX_SUITE_FRAGMENT: usize = 64;

/// `<UTC yyyymmddThhmmssmmmZ>-<suite id>-<run id>`, safe as a file name.
#[must_use]
pub fn artifact_name(started_at_ms: u64, suite_id: &str, run_id: &str) -> String {
    let stamp = i64::try_from(started_at_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(
            || started_at_ms.to_string(),
            |time| time.format("%Y%m%dT%H%M%S%3fZ").to_string(),
        );
    format!("{}-{}-{}", stamp, sanitize(suite_id), sanitize(run_id))
}

fn sanitize(fragment: &str) -> String {
    let cleaned: String = fragment
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .take(MAX_SUITE_FRAGMENT)
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "suite".to_owned()
    } else {
        trimmed.to_owned()
    }
}
