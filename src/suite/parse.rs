use std::collections::BTreeSet;
use std::num::NonZeroU32;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SuiteError;
use crate::http::header_problem;

use super::types::{
    DEFAULT_BASE_DELAY_MS, RetryPolicy, SimulateFlags, TestCase, TestExpectations, TestRequest,
    TestSuite, Uniqueness,
};

/// Case type recorded when a case omits `type`.
const DEFAULT_CASE_KIND: &str = "http";

const REQUEST_KEYS: [&str; 8] = [
    "method",
    "url",
    "headers",
    "body",
    "repeat",
    "thinkTimeMs",
    "policy",
    "simulate",
];
const EXPECT_KEYS: [&str; 3] = ["status", "uniqueness", "clientBackoff"];

/// Collects every schema violation so a malformed suite is reported in one go.
#[derive(Debug, Default)]
struct Problems(Vec<String>);

impl Problems {
    fn push(&mut self, path: &str, message: &str) {
        self.0.push(format!("{}: {}", path, message));
    }

    fn missing(&mut self, path: &str) {
        self.push(path, "is required");
    }
}

/// Validates a decoded suite document against the suite schema.
///
/// # Errors
///
/// Returns [`SuiteError::Malformed`] listing every missing or invalid field.
pub fn parse_suite(id: &str, document: &Value) -> Result<TestSuite, SuiteError> {
    let mut problems = Problems::default();

    let Some(root) = document.as_object() else {
        return Err(SuiteError::Malformed {
            id: id.to_owned(),
            problems: vec!["$: suite must be an object".to_owned()],
        });
    };

    let name = required_string(root, "name", "name", &mut problems);
    let version = match root.get("version") {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(_) => {
            problems.push("version", "must be a non-empty string or number");
            None
        }
        None => {
            problems.missing("version");
            None
        }
    };

    let mut cases = Vec::new();
    match root.get("cases") {
        Some(Value::Array(items)) => {
            let mut seen = BTreeSet::new();
            for (index, item) in items.iter().enumerate() {
                let path = format!("cases[{}]", index);
                if let Some(case) = parse_case(&path, item, &mut problems) {
                    if !seen.insert(case.id.clone()) {
                        problems.push(&format!("{}.id", path), "duplicates an earlier case id");
                    }
                    cases.push(case);
                }
            }
        }
        Some(_) => problems.push("cases", "must be an array"),
        None => problems.missing("cases"),
    }

    match (name, version) {
        (Some(name), Some(version)) if problems.0.is_empty() => Ok(TestSuite {
            name,
            version,
            cases,
        }),
        _ => Err(SuiteError::Malformed {
            id: id.to_owned(),
            problems: problems.0,
        }),
    }
}

fn parse_case(path: &str, value: &Value, problems: &mut Problems) -> Option<TestCase> {
    let Some(object) = value.as_object() else {
        problems.push(path, "case must be an object");
        return None;
    };

    let id = required_string(object, "id", &format!("{}.id", path), problems);
    let name = required_string(object, "name", &format!("{}.name", path), problems);
    let kind = match object.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        Some(_) => {
            problems.push(&format!("{}.type", path), "must be a string");
            DEFAULT_CASE_KIND.to_owned()
        }
        None => DEFAULT_CASE_KIND.to_owned(),
    };

    let request = match object.get("request") {
        Some(Value::Null) | None => None,
        Some(Value::Object(request)) => {
            parse_request(&format!("{}.request", path), request, problems)
        }
        Some(_) => {
            problems.push(&format!("{}.request", path), "must be an object");
            None
        }
    };

    let expect = match object.get("expect") {
        Some(Value::Null) | None => None,
        Some(Value::Object(expect)) => Some(parse_expect(
            &format!("{}.expect", path),
            expect,
            problems,
        )),
        Some(_) => {
            problems.push(&format!("{}.expect", path), "must be an object");
            None
        }
    };

    Some(TestCase {
        id: id?,
        name: name?,
        kind,
        request,
        expect,
    })
}

fn parse_request(
    path: &str,
    object: &Map<String, Value>,
    problems: &mut Problems,
) -> Option<TestRequest> {
    for key in object.keys() {
        if !REQUEST_KEYS.contains(&key.as_str()) {
            debug!("Ignoring unknown request field {}.{}", path, key);
        }
    }

    let method_path = format!("{}.method", path);
    let method = required_string(object, "method", &method_path, problems);
    if let Some(method) = method.as_deref()
        && !is_method_token(method)
    {
        problems.push(&method_path, "must be an HTTP method token");
    }

    let url = required_string(object, "url", &format!("{}.url", path), problems);

    let mut headers = Vec::new();
    match object.get("headers") {
        Some(Value::Object(map)) => {
            for (key, value) in map {
                let header_path = format!("{}.headers.{}", path, key);
                let text = match value {
                    Value::String(text) => text.clone(),
                    Value::Number(number) => number.to_string(),
                    Value::Bool(flag) => flag.to_string(),
                    Value::Null | Value::Array(_) | Value::Object(_) => {
                        problems.push(&header_path, "must be a string, number, or boolean");
                        continue;
                    }
                };
                if let Some(problem) = header_problem(key, &text) {
                    problems.push(&header_path, problem);
                }
                headers.push((key.clone(), text));
            }
        }
        Some(Value::Null) | None => {}
        Some(_) => problems.push(&format!("{}.headers", path), "must be an object"),
    }

    let body = match object.get("body") {
        Some(Value::Null) | None => None,
        Some(value) => Some(value.clone()),
    };

    let repeat = positive_u32(object, "repeat", &format!("{}.repeat", path), problems)
        .unwrap_or(NonZeroU32::MIN);
    let think_time_ms =
        non_negative_u64(object, "thinkTimeMs", &format!("{}.thinkTimeMs", path), problems)
            .unwrap_or(0);

    let policy = match object.get("policy") {
        Some(Value::Object(policy)) => {
            let policy_path = format!("{}.policy", path);
            RetryPolicy {
                max_attempts: positive_u32(
                    policy,
                    "maxAttempts",
                    &format!("{}.maxAttempts", policy_path),
                    problems,
                )
                .unwrap_or(NonZeroU32::MIN),
                base_delay_ms: non_negative_u64(
                    policy,
                    "baseDelayMs",
                    &format!("{}.baseDelayMs", policy_path),
                    problems,
                )
                .unwrap_or(DEFAULT_BASE_DELAY_MS),
            }
        }
        Some(Value::Null) | None => RetryPolicy::default(),
        Some(_) => {
            problems.push(&format!("{}.policy", path), "must be an object");
            RetryPolicy::default()
        }
    };

    let simulate = match object.get("simulate") {
        Some(Value::Object(simulate)) => SimulateFlags {
            rate_limit: optional_bool(
                simulate,
                "rateLimit",
                &format!("{}.simulate.rateLimit", path),
                problems,
            ),
        },
        Some(Value::Null) | None => SimulateFlags::default(),
        Some(_) => {
            problems.push(&format!("{}.simulate", path), "must be an object");
            SimulateFlags::default()
        }
    };

    Some(TestRequest {
        method: method?.to_ascii_uppercase(),
        url: url?,
        headers,
        body,
        repeat,
        think_time_ms,
        policy,
        simulate,
    })
}

fn parse_expect(
    path: &str,
    object: &Map<String, Value>,
    problems: &mut Problems,
) -> TestExpectations {
    let status_path = format!("{}.status", path);
    let status = match object.get("status") {
        Some(Value::Null) | None => None,
        Some(value) => match value.as_u64().and_then(|code| u16::try_from(code).ok()) {
            Some(code) if (100..=599).contains(&code) => Some(code),
            _ => {
                problems.push(&status_path, "must be an HTTP status code (100-599)");
                None
            }
        },
    };

    let uniqueness = match object.get("uniqueness") {
        Some(Value::Null) | None => None,
        Some(Value::String(contract)) if contract == Uniqueness::SINGLE_RESOURCE => {
            Some(Uniqueness::SingleResource)
        }
        Some(_) => {
            problems.push(
                &format!("{}.uniqueness", path),
                "must be \"single_resource\"",
            );
            None
        }
    };

    let client_backoff = optional_bool(
        object,
        "clientBackoff",
        &format!("{}.clientBackoff", path),
        problems,
    );

    let extensions = object
        .iter()
        .filter(|(key, _)| !EXPECT_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    TestExpectations {
        status,
        uniqueness,
        client_backoff,
        extensions,
    }
}

fn required_string(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
    problems: &mut Problems,
) -> Option<String> {
    match object.get(key) {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
        Some(Value::String(_)) => {
            problems.push(path, "must not be empty");
            None
        }
        Some(_) => {
            problems.push(path, "must be a string");
            None
        }
        None => {
            problems.missing(path);
            None
        }
    }
}

fn positive_u32(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
    problems: &mut Problems,
) -> Option<NonZeroU32> {
    let value = object.get(key)?;
    let parsed = value
        .as_u64()
        .and_then(|number| u32::try_from(number).ok())
        .and_then(NonZeroU32::new);
    if parsed.is_none() && !value.is_null() {
        problems.push(path, "must be an integer >= 1");
    }
    parsed
}

fn non_negative_u64(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
    problems: &mut Problems,
) -> Option<u64> {
    let value = object.get(key)?;
    let parsed = value.as_u64();
    if parsed.is_none() && !value.is_null() {
        problems.push(path, "must be an integer >= 0");
    }
    parsed
}

fn optional_bool(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
    problems: &mut Problems,
) -> bool {
    match object.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Null) | None => false,
        Some(_) => {
            problems.push(path, "must be a boolean");
            false
        }
    }
}

fn is_method_token(method: &str) -> bool {
    method.bytes().all(|byte| byte.is_ascii_alphabetic())
}
