//! Placeholder resolution for request definitions.
//!
//! Strings inside a request (url, header values, and anywhere in the body)
//! may carry `{{uuid}}`, `{{timestamp}}`, or `{{from:<caseId>}}` tokens. A
//! string that is exactly one token takes the resolved value's JSON type; a
//! token embedded in surrounding text is rendered as text.
mod artifacts;


use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::TemplateError;

pub use artifacts::Artifacts;

const TOKEN_OPEN: &str = "{{";
const TOKEN_CLOSE: &str = "}}";
const FROM_PREFIX: &str = "from:";

/// What to do with `{{from:<caseId>}}` when no artifact exists for the case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnresolvedPolicy {
    /// Leave the token in place verbatim.
    #[default]
    Preserve,
    /// Fail the case with [`TemplateError::UnresolvedReference`].
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'key> {
    Uuid,
    Timestamp,
    From(&'key str),
    Unknown,
}

impl<'key> Token<'key> {
    fn classify(key: &'key str) -> Self {
        match key {
            "uuid" => Token::Uuid,
            "timestamp" => Token::Timestamp,
            _ => match key.strip_prefix(FROM_PREFIX).map(str::trim) {
                Some(case_id) if !case_id.is_empty() => Token::From(case_id),
                _ => Token::Unknown,
            },
        }
    }
}

#[derive(Clone)]
pub struct TemplateResolver {
    clock: Arc<dyn Clock>,
    policy: UnresolvedPolicy,
}

impl std::fmt::Debug for TemplateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateResolver")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl TemplateResolver {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, policy: UnresolvedPolicy) -> Self {
        Self { clock, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> UnresolvedPolicy {
        self.policy
    }

    /// Resolves every token in `value`, recursing through arrays and objects.
    ///
    /// Object keys are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnresolvedReference`] for a missing
    /// back-reference under [`UnresolvedPolicy::Strict`].
    pub fn resolve(&self, value: &Value, artifacts: &Artifacts) -> Result<Value, TemplateError> {
        match value {
            Value::String(text) => self.resolve_str(text, artifacts),
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve(item, artifacts))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut resolved = Map::with_capacity(map.len());
                for (key, item) in map {
                    resolved.insert(key.clone(), self.resolve(item, artifacts)?);
                }
                Ok(Value::Object(resolved))
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => Ok(value.clone()),
        }
    }

    /// Resolves a string value; a lone token keeps the resolved value's type.
    ///
    /// # Errors
    ///
    /// See [`TemplateResolver::resolve`].
    pub fn resolve_str(&self, input: &str, artifacts: &Artifacts) -> Result<Value, TemplateError> {
        if let Some(key) = single_token(input) {
            return Ok(self
                .token_value(Token::classify(key), artifacts)?
                .unwrap_or_else(|| Value::String(input.to_owned())));
        }
        self.render(input, artifacts).map(Value::String)
    }

    /// Renders every token inside `input` as text.
    ///
    /// # Errors
    ///
    /// See [`TemplateResolver::resolve`].
    pub fn render(&self, input: &str, artifacts: &Artifacts) -> Result<String, TemplateError> {
        let mut rest = input;
        let mut output = String::with_capacity(input.len());

        loop {
            let Some(start) = rest.find(TOKEN_OPEN) else {
                output.push_str(rest);
                break;
            };
            let (before, after_start) = rest.split_at(start);
            output.push_str(before);
            let Some(after) = after_start.strip_prefix(TOKEN_OPEN) else {
                output.push_str(after_start);
                break;
            };
            let Some(end) = after.find(TOKEN_CLOSE) else {
                output.push_str(after_start);
                break;
            };
            let (key_part, after_end) = after.split_at(end);
            match self.token_value(Token::classify(key_part.trim()), artifacts)? {
                Some(value) => output.push_str(&value_as_text(&value)),
                None => {
                    output.push_str(TOKEN_OPEN);
                    output.push_str(key_part);
                    output.push_str(TOKEN_CLOSE);
                }
            }
            let Some(remaining) = after_end.strip_prefix(TOKEN_CLOSE) else {
                output.push_str(after_end);
                break;
            };
            rest = remaining;
        }

        Ok(output)
    }

    fn token_value(
        &self,
        token: Token<'_>,
        artifacts: &Artifacts,
    ) -> Result<Option<Value>, TemplateError> {
        match token {
            Token::Uuid => Ok(Some(Value::String(Uuid::new_v4().to_string()))),
            Token::Timestamp => Ok(Some(Value::from(self.clock.now_ms()))),
            Token::From(case_id) => match artifacts.reference(case_id) {
                Some(value) => Ok(Some(value.clone())),
                None => match self.policy {
                    UnresolvedPolicy::Preserve => {
                        warn!("No artifact captured for case '{}'; leaving token as-is", case_id);
                        Ok(None)
                    }
                    UnresolvedPolicy::Strict => Err(TemplateError::UnresolvedReference {
                        case_id: case_id.to_owned(),
                    }),
                },
            },
            Token::Unknown => Ok(None),
        }
    }
}

fn single_token(input: &str) -> Option<&str> {
    let inner = input.strip_prefix(TOKEN_OPEN)?.strip_suffix(TOKEN_CLOSE)?;
    if inner.contains(TOKEN_OPEN) || inner.contains(TOKEN_CLOSE) {
        return None;
    }
    Some(inner.trim())
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            value.to_string()
        }
    }
}
