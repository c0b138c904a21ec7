use std::collections::BTreeMap;

use serde_json::Value;

/// Response bodies captured from completed cases, keyed by case id.
///
/// Written by the runner after a case finishes and read by later cases'
/// `{{from:<caseId>}}` tokens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifacts {
    captured: BTreeMap<String, Value>,
}

impl Artifacts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&mut self, case_id: impl Into<String>, value: Value) {
        self.captured.insert(case_id.into(), value);
    }

    /// The value a back-reference resolves to: the captured body's top-level
    /// `id`, else the whole captured body.
    #[must_use]
    pub fn reference(&self, case_id: &str) -> Option<&Value> {
        let captured = self.captured.get(case_id)?;
        Some(captured.get("id").unwrap_or(captured))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.captured.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.captured.is_empty()
    }
}
