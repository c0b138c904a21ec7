use super::*;
use crate::error::SuiteError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

fn payments_document() -> Value {
    json!({
        "name": "payments",
        "version": "1.2.0",
        "cases": [
            {
                "id": "create",
                "name": "Create charge",
                "request": {
                    "method": "post",
                    "url": "/v1/charges",
                    "headers": { "Idempotency-Key": "{{uuid}}", "X-Retry": 3 },
                    "body": { "amount": 100 },
                    "repeat": 3,
                    "thinkTimeMs": 50,
                    "policy": { "maxAttempts": 4, "baseDelayMs": 100 },
                    "simulate": { "rateLimit": true }
                },
                "expect": {
                    "status": 201,
                    "uniqueness": "single_resource",
                    "clientBackoff": true,
                    "latencyMs": 300
                }
            },
            { "id": "note", "name": "Documentation only" }
        ]
    })
}

struct CountingSource {
    document: Value,
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl SuiteSource for CountingSource {
    async fn fetch(&self, id: &str) -> Result<Option<Value>, SuiteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok((id == "payments").then(|| self.document.clone()))
    }

    fn describe(&self) -> String {
        "counting source".to_owned()
    }
}

fn counting_loader(ttl: Option<Duration>) -> (SuiteLoader, Arc<AtomicUsize>) {
    let fetches = Arc::new(AtomicUsize::new(0));
    let loader = SuiteLoader::new(SuiteCache::new(ttl)).with_source(CountingSource {
        document: payments_document(),
        fetches: Arc::clone(&fetches),
    });
    (loader, fetches)
}

fn problems_of(result: Result<TestSuite, SuiteError>) -> Result<Vec<String>, String> {
    match result {
        Err(SuiteError::Malformed { problems, .. }) => Ok(problems),
        Err(err) => Err(format!("Expected Malformed, got {}", err)),
        Ok(suite) => Err(format!("Expected Malformed, got suite {}", suite.reference())),
    }
}

#[test]
fn parses_full_suite_document() -> Result<(), String> {
    let suite = parse_suite("payments", &payments_document()).map_err(|err| err.to_string())?;
    if suite.reference() != "payments@1.2.0" {
        return Err(format!("Unexpected reference: {}", suite.reference()));
    }
    if suite.cases.len() != 2 {
        return Err(format!("Expected 2 cases, got {}", suite.cases.len()));
    }

    let create = suite.cases.first().ok_or("Missing first case")?;
    let request = create.request.as_ref().ok_or("Missing request")?;
    if request.method != "POST" || request.url != "/v1/charges" {
        return Err(format!("Unexpected request line: {} {}", request.method, request.url));
    }
    if request.headers
        != vec![
            ("Idempotency-Key".to_owned(), "{{uuid}}".to_owned()),
            ("X-Retry".to_owned(), "3".to_owned()),
        ]
    {
        return Err(format!("Unexpected headers: {:?}", request.headers));
    }
    if request.repeat.get() != 3 || request.think_time_ms != 50 {
        return Err("Unexpected repeat settings".to_owned());
    }
    if request.policy.max_attempts.get() != 4 || request.policy.base_delay_ms != 100 {
        return Err(format!("Unexpected policy: {:?}", request.policy));
    }
    if !request.simulate.rate_limit {
        return Err("Expected rate limit simulation".to_owned());
    }
    if create.kind != "http" {
        return Err(format!("Expected default kind http, got {}", create.kind));
    }

    let expect = create.expect.as_ref().ok_or("Missing expectations")?;
    if expect.status != Some(201)
        || expect.uniqueness != Some(Uniqueness::SingleResource)
        || !expect.client_backoff
    {
        return Err(format!("Unexpected expectations: {:?}", expect));
    }
    if expect.extensions.get("latencyMs") != Some(&json!(300)) {
        return Err("Expected unknown expectation to be kept".to_owned());
    }

    let note = suite.cases.get(1).ok_or("Missing second case")?;
    if note.request.is_some() || note.expect.is_some() {
        return Err("Expected documentation case to have no request".to_owned());
    }
    Ok(())
}

#[test]
fn applies_request_defaults() -> Result<(), String> {
    let document = json!({
        "name": "smoke",
        "version": 3,
        "cases": [{ "id": "ping", "name": "Ping", "request": { "method": "GET", "url": "/ping" } }]
    });
    let suite = parse_suite("smoke", &document).map_err(|err| err.to_string())?;
    if suite.version != "3" {
        return Err(format!("Expected numeric version to be kept, got {}", suite.version));
    }
    let request = suite
        .cases
        .first()
        .and_then(|case| case.request.as_ref())
        .ok_or("Missing request")?;
    if request.repeat.get() != 1
        || request.think_time_ms != 0
        || request.policy != RetryPolicy::default()
        || request.policy.base_delay_ms != DEFAULT_BASE_DELAY_MS
        || request.simulate.rate_limit
        || request.body.is_some()
    {
        return Err(format!("Unexpected defaults: {:?}", request));
    }
    Ok(())
}

#[test]
fn reports_every_problem_with_its_path() -> Result<(), String> {
    let document = json!({
        "version": "1",
        "cases": [
            { "id": "a", "request": { "url": "", "repeat": 0 } },
            { "id": "a", "name": "Again", "expect": { "status": 42, "uniqueness": "many" } }
        ]
    });
    let problems = problems_of(parse_suite("broken", &document))?;
    let expected = [
        "name: is required",
        "cases[0].name: is required",
        "cases[0].request.method: is required",
        "cases[0].request.url: must not be empty",
        "cases[0].request.repeat: must be an integer >= 1",
        "cases[1].expect.status: must be an HTTP status code (100-599)",
        "cases[1].expect.uniqueness: must be \"single_resource\"",
    ];
    for problem in expected {
        if !problems.iter().any(|reported| reported == problem) {
            return Err(format!("Missing problem '{}' in {:?}", problem, problems));
        }
    }
    Ok(())
}

#[test]
fn rejects_invalid_header_tokens() -> Result<(), String> {
    let document = json!({
        "name": "headers",
        "version": "1",
        "cases": [{
            "id": "bad",
            "name": "Bad headers",
            "request": {
                "method": "GET",
                "url": "/v1/ping",
                "headers": {
                    "Bad Header": "v",
                    "X-Split": "line\nbreak",
                    "X-Trace": "{{uuid}}"
                }
            }
        }]
    });
    let problems = problems_of(parse_suite("headers", &document))?;
    let expected = vec![
        "cases[0].request.headers.Bad Header: invalid header name".to_owned(),
        "cases[0].request.headers.X-Split: invalid header value".to_owned(),
    ];
    if problems != expected {
        return Err(format!("Unexpected problems: {:?}", problems));
    }
    Ok(())
}

#[test]
fn rejects_duplicate_case_ids() -> Result<(), String> {
    let document = json!({
        "name": "dupes",
        "version": "1",
        "cases": [
            { "id": "same", "name": "First" },
            { "id": "same", "name": "Second" }
        ]
    });
    let problems = problems_of(parse_suite("dupes", &document))?;
    if problems != vec!["cases[1].id: duplicates an earlier case id".to_owned()] {
        return Err(format!("Unexpected problems: {:?}", problems));
    }
    Ok(())
}

#[test]
fn rejects_non_object_documents() -> Result<(), String> {
    let problems = problems_of(parse_suite("list", &json!([1, 2])))?;
    if problems.len() != 1 {
        return Err(format!("Unexpected problems: {:?}", problems));
    }
    Ok(())
}

#[test]
fn malformed_message_joins_problems() -> Result<(), String> {
    let err = SuiteError::Malformed {
        id: "x".to_owned(),
        problems: vec!["name: is required".to_owned(), "cases: is required".to_owned()],
    };
    let message = err.to_string();
    if !message.contains("name: is required; cases: is required") {
        return Err(format!("Unexpected message: {}", message));
    }
    Ok(())
}

#[test]
fn loader_caches_suites() -> Result<(), String> {
    run_async_test(async {
        let (loader, fetches) = counting_loader(None);
        let first = loader.load("payments").await.map_err(|err| err.to_string())?;
        let second = loader.load("payments").await.map_err(|err| err.to_string())?;
        if !Arc::ptr_eq(&first, &second) {
            return Err("Expected the cached suite to be shared".to_owned());
        }
        if fetches.load(Ordering::SeqCst) != 1 {
            return Err(format!(
                "Expected one fetch, got {}",
                fetches.load(Ordering::SeqCst)
            ));
        }

        if !loader.cache().invalidate("payments") {
            return Err("Expected invalidate to drop the entry".to_owned());
        }
        loader.load("payments").await.map_err(|err| err.to_string())?;
        if fetches.load(Ordering::SeqCst) != 2 {
            return Err("Expected a refetch after invalidation".to_owned());
        }
        Ok(())
    })
}

#[test]
fn expired_entries_are_refetched() -> Result<(), String> {
    run_async_test(async {
        let (loader, fetches) = counting_loader(Some(Duration::ZERO));
        loader.load("payments").await.map_err(|err| err.to_string())?;
        loader.load("payments").await.map_err(|err| err.to_string())?;
        if fetches.load(Ordering::SeqCst) != 2 {
            return Err("Expected expired entry to be refetched".to_owned());
        }
        Ok(())
    })
}

#[test]
fn separate_loaders_do_not_share_cache() -> Result<(), String> {
    run_async_test(async {
        let (first, _) = counting_loader(None);
        let (second, _) = counting_loader(None);
        first.load("payments").await.map_err(|err| err.to_string())?;
        if !second.cache().is_empty() {
            return Err("Expected the second loader's cache to stay empty".to_owned());
        }
        if first.cache().len() != 1 {
            return Err("Expected the first loader to cache one suite".to_owned());
        }
        Ok(())
    })
}

#[test]
fn unknown_suite_is_not_found() -> Result<(), String> {
    run_async_test(async {
        let (loader, _) = counting_loader(None);
        match loader.load("missing").await {
            Err(SuiteError::NotFound { id }) if id == "missing" => Ok(()),
            Err(err) => Err(format!("Expected NotFound, got {}", err)),
            Ok(_) => Err("Expected NotFound".to_owned()),
        }
    })
}

#[test]
fn malformed_suite_is_not_cached() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
        std::fs::write(dir.path().join("bad.json"), r#"{"name":"bad"}"#)
            .map_err(|err| err.to_string())?;
        let loader = SuiteLoader::new(SuiteCache::default())
            .with_source(DirectorySource::new(dir.path()));
        match loader.load("bad").await {
            Err(SuiteError::Malformed { .. }) => {}
            other => return Err(format!("Expected Malformed, got {:?}", other.map(|_| ()))),
        }
        if !loader.cache().is_empty() {
            return Err("Expected malformed suite to stay out of the cache".to_owned());
        }
        Ok(())
    })
}

#[test]
fn directory_source_reads_json_and_toml() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
        std::fs::write(
            dir.path().join("payments.json"),
            payments_document().to_string(),
        )
        .map_err(|err| err.to_string())?;
        std::fs::write(
            dir.path().join("smoke.toml"),
            r#"
name = "smoke"
version = "1"

[[cases]]
id = "ping"
name = "Ping"

[cases.request]
method = "GET"
url = "/ping"

[cases.expect]
status = 200
"#,
        )
        .map_err(|err| err.to_string())?;

        let loader = SuiteLoader::new(SuiteCache::default())
            .with_source(DirectorySource::new(dir.path()));
        let payments = loader.load("payments").await.map_err(|err| err.to_string())?;
        if payments.cases.len() != 2 {
            return Err("Expected JSON suite to load".to_owned());
        }
        let smoke = loader.load("smoke").await.map_err(|err| err.to_string())?;
        let status = smoke
            .cases
            .first()
            .and_then(|case| case.expect.as_ref())
            .and_then(|expect| expect.status);
        if status != Some(200) {
            return Err(format!("Expected TOML suite status 200, got {:?}", status));
        }
        Ok(())
    })
}

#[test]
fn directory_source_ignores_path_like_ids() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
        let source = DirectorySource::new(dir.path());
        for id in ["../secret", "a/b", ".."] {
            let fetched = source.fetch(id).await.map_err(|err| err.to_string())?;
            if fetched.is_some() {
                return Err(format!("Expected {} to be ignored", id));
            }
        }
        Ok(())
    })
}

#[test]
fn loader_falls_through_sources_in_order() -> Result<(), String> {
    run_async_test(async {
        let empty = tempfile::tempdir().map_err(|err| err.to_string())?;
        let fetches = Arc::new(AtomicUsize::new(0));
        let loader = SuiteLoader::new(SuiteCache::default())
            .with_source(DirectorySource::new(empty.path()))
            .with_source(CountingSource {
                document: payments_document(),
                fetches: Arc::clone(&fetches),
            });
        loader.load("payments").await.map_err(|err| err.to_string())?;
        if fetches.load(Ordering::SeqCst) != 1 {
            return Err("Expected the second source to be consulted".to_owned());
        }
        Ok(())
    })
}

#[test]
fn split_suite_path_uses_stem_and_parent() -> Result<(), String> {
    let (dir, id) =
        split_suite_path(Path::new("suites/payments.json")).map_err(|err| err.to_string())?;
    if dir != Path::new("suites") || id != "payments" {
        return Err(format!("Unexpected split: {} {}", dir.display(), id));
    }
    let (bare_dir, _) =
        split_suite_path(Path::new("smoke.toml")).map_err(|err| err.to_string())?;
    if bare_dir != Path::new(".") {
        return Err(format!("Expected current dir, got {}", bare_dir.display()));
    }
    match split_suite_path(Path::new("suite.yaml")) {
        Err(SuiteError::UnsupportedExtension { ext }) if ext == "yaml" => Ok(()),
        other => Err(format!("Expected UnsupportedExtension, got {:?}", other.map(|_| ()))),
    }
}

#[test]
fn decode_rejects_invalid_json() -> Result<(), String> {
    match decode_suite_document(Path::new("bad.json"), "{ nope") {
        Err(SuiteError::ParseJson { .. }) => Ok(()),
        other => Err(format!("Expected ParseJson, got {:?}", other.map(|_| ()))),
    }
}
