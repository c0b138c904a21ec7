use serde_json::Value;

use super::result::AttemptRecord;
use super::retry::is_retriable;

/// The resource identifier a response carries: `id`, else `data.id`.
#[must_use]
pub fn extract_identifier(body: &Value) -> Option<&Value> {
    let present = |id: &&Value| !id.is_null();
    body.get("id")
        .filter(present)
        .or_else(|| body.get("data")?.get("id").filter(present))
}

pub(super) fn check_status(
    expected: u16,
    attempt: &AttemptRecord,
    repeat_index: u32,
) -> Option<String> {
    (attempt.status != expected).then(|| {
        format!(
            "repeat {}: status expected {}, got {}",
            repeat_index, expected, attempt.status
        )
    })
}

/// Tracks the identifier every repeat must reproduce under `single_resource`.
#[derive(Debug, Default)]
pub(super) struct UniquenessTracker {
    reference: Option<Value>,
}

impl UniquenessTracker {
    pub(super) fn check(&mut self, attempt: &AttemptRecord, repeat_index: u32) -> Option<String> {
        let Some(id) = extract_identifier(&attempt.body) else {
            return Some(format!(
                "repeat {}: uniqueness expected a resource identifier (id or data.id) in the response",
                repeat_index
            ));
        };
        match self.reference.as_ref() {
            None => {
                self.reference = Some(id.clone());
                None
            }
            Some(reference) if reference == id => None,
            Some(reference) => Some(format!(
                "repeat {}: uniqueness expected identifier {}, got {}",
                repeat_index, reference, id
            )),
        }
    }
}

/// Every retriable attempt must be followed by a pause of at least
/// `base_delay_ms`, measured from its end to the next attempt's start, and at
/// least one such retry must have happened.
pub(super) fn check_backoff(
    attempts: &[AttemptRecord],
    base_delay_ms: u64,
    repeat_index: u32,
) -> Vec<String> {
    let mut errors = Vec::new();
    let mut retries = 0usize;

    for pair in attempts.windows(2) {
        let [previous, next] = pair else {
            continue;
        };
        if !is_retriable(previous.status) {
            continue;
        }
        retries = retries.saturating_add(1);
        let gap = next.timestamp.saturating_sub(previous.finished_at_ms());
        if gap < base_delay_ms {
            errors.push(format!(
                "repeat {}: client backoff expected >= {}ms after status {}, waited {}ms",
                repeat_index, base_delay_ms, previous.status, gap
            ));
        }
    }

    if retries == 0 {
        errors.push(format!(
            "repeat {}: client backoff expected at least one retry after a 429/5xx response",
            repeat_index
        ));
    }

    errors
}
