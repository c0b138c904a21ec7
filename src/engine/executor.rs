use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::clock::Clock;
use crate::error::{GuardError, TemplateError};
use crate::http::{OutboundRequest, RequestBody, Transport, build_safe_url, check_headers};
use crate::shutdown::{CancelReason, RunControl};
use crate::suite::{TestCase, TestRequest, Uniqueness};
use crate::template::{Artifacts, TemplateResolver};

use super::expect::{UniquenessTracker, check_backoff, check_status};
use super::result::{AttemptRecord, CaseResult, CaseStatus, RepeatRecord};
use super::retry::{NETWORK_FAILURE_STATUS, RATE_LIMITED_STATUS, RetryMachine, RetryState};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Trusted origin every relative request path is joined onto.
    pub origin: String,
    pub allow_insecure: bool,
    /// Send transport failures (recorded as 599) through the retry path.
    pub retry_network_errors: bool,
}

impl ExecutorConfig {
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            allow_insecure: false,
            retry_network_errors: true,
        }
    }
}

/// A request with every template token resolved, ready to send.
#[derive(Debug, Clone)]
struct ResolvedRequest {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: RequestBody,
}

enum AttemptOutcome {
    Completed(AttemptRecord),
    Rejected(GuardError),
    Cancelled(CancelReason),
}

/// Runs one case's repeat × attempt matrix.
///
/// Request-level problems (HTTP errors, transport failures, unsafe targets,
/// unresolved templates, expectation mismatches) end up as errors on the
/// returned [`CaseResult`]; nothing here fails the surrounding run.
pub struct CaseExecutor {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    resolver: TemplateResolver,
    config: ExecutorConfig,
}

impl CaseExecutor {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        resolver: TemplateResolver,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            transport,
            clock,
            resolver,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub async fn execute(
        &self,
        case: &TestCase,
        artifacts: &Artifacts,
        control: &mut RunControl,
    ) -> CaseResult {
        let Some(request) = case.request.as_ref() else {
            debug!("Case '{}' has no request; skipping", case.id);
            return CaseResult::skipped(&case.id, &case.name);
        };

        info!("Running case '{}' ({})", case.id, case.name);
        let expect = case.expect.as_ref();
        let mut errors = Vec::new();
        let mut repeats = Vec::new();
        let mut uniqueness = UniquenessTracker::default();
        let repeat_count = request.repeat.get();

        for repeat_index in 0..repeat_count {
            if let Err(reason) = control.check() {
                errors.push(format!("{} before repeat {}", reason, repeat_index));
                break;
            }

            let resolved = match self.resolve_request(request, artifacts) {
                Ok(resolved) => resolved,
                Err(err) => {
                    errors.push(format!("repeat {}: {}", repeat_index, err));
                    break;
                }
            };
            if let Err(err) = check_headers(&resolved.headers) {
                errors.push(format!("repeat {}: {}", repeat_index, err));
                break;
            }

            let (attempts, stop) = self
                .run_attempts(request, &resolved, repeat_index, control, &mut errors)
                .await;

            if let Some(final_attempt) = attempts.last()
                && let Some(expect) = expect
            {
                if let Some(status) = expect.status
                    && let Some(error) = check_status(status, final_attempt, repeat_index)
                {
                    errors.push(error);
                }
                if expect.uniqueness == Some(Uniqueness::SingleResource)
                    && let Some(error) = uniqueness.check(final_attempt, repeat_index)
                {
                    errors.push(error);
                }
                if expect.client_backoff {
                    errors.extend(check_backoff(
                        &attempts,
                        request.policy.base_delay_ms,
                        repeat_index,
                    ));
                }
            }

            repeats.push(RepeatRecord {
                repeat_index,
                attempts,
            });
            if stop {
                break;
            }

            let is_last = repeat_index.saturating_add(1) == repeat_count;
            if !is_last
                && request.think_time_ms > 0
                && let Err(reason) = control
                    .pause(Duration::from_millis(request.think_time_ms))
                    .await
            {
                errors.push(format!("{} after repeat {}", reason, repeat_index));
                break;
            }
        }

        let status = if errors.is_empty() {
            CaseStatus::Passed
        } else {
            CaseStatus::Failed
        };
        match status {
            CaseStatus::Passed => info!("Case '{}' passed", case.id),
            CaseStatus::Failed | CaseStatus::Skipped => {
                warn!("Case '{}' failed: {}", case.id, errors.join("; "));
            }
        }

        CaseResult {
            id: case.id.clone(),
            name: case.name.clone(),
            status,
            errors,
            repeats,
        }
    }

    /// Drives the retry machine for one repeat. The flag is set when the case
    /// cannot continue with further repeats.
    async fn run_attempts(
        &self,
        request: &TestRequest,
        resolved: &ResolvedRequest,
        repeat_index: u32,
        control: &mut RunControl,
        errors: &mut Vec<String>,
    ) -> (Vec<AttemptRecord>, bool) {
        let mut machine = RetryMachine::new(request.policy, self.config.retry_network_errors);
        let mut attempts = Vec::new();
        let target = build_safe_url(&resolved.url, &self.config.origin, self.config.allow_insecure);

        loop {
            match machine.state() {
                RetryState::Attempting { attempt } => {
                    let simulated =
                        request.simulate.rate_limit && repeat_index == 0 && attempt == 0;
                    let outcome = if simulated {
                        AttemptOutcome::Completed(self.simulated_rate_limit())
                    } else {
                        match target.as_ref() {
                            Ok(url) => self.attempt(resolved, url, control).await,
                            Err(err) => AttemptOutcome::Rejected(err.clone()),
                        }
                    };

                    match outcome {
                        AttemptOutcome::Completed(record) => {
                            debug!(
                                "Repeat {} attempt {} answered {} in {}ms",
                                repeat_index, attempt, record.status, record.duration_ms
                            );
                            machine.record(record.status);
                            attempts.push(record);
                        }
                        AttemptOutcome::Rejected(err) => {
                            errors.push(format!("repeat {}: {}", repeat_index, err));
                            return (attempts, true);
                        }
                        AttemptOutcome::Cancelled(reason) => {
                            errors.push(format!(
                                "{} during repeat {} attempt {}",
                                reason, repeat_index, attempt
                            ));
                            return (attempts, true);
                        }
                    }
                }
                RetryState::Waiting {
                    next_attempt,
                    delay,
                } => {
                    warn!(
                        "Retriable response on repeat {}; retrying (attempt {}) in {}ms",
                        repeat_index,
                        next_attempt,
                        delay.as_millis()
                    );
                    if let Err(reason) = control.pause(delay).await {
                        errors.push(format!(
                            "{} while backing off on repeat {}",
                            reason, repeat_index
                        ));
                        machine.finish();
                        return (attempts, true);
                    }
                    machine.resume();
                }
                RetryState::Done => return (attempts, false),
            }
        }
    }

    async fn attempt(
        &self,
        resolved: &ResolvedRequest,
        url: &Url,
        control: &mut RunControl,
    ) -> AttemptOutcome {
        let outbound = OutboundRequest {
            method: resolved.method.clone(),
            url: url.clone(),
            headers: resolved.headers.clone(),
            body: resolved.body.clone(),
        };

        let started = self.clock.now_ms();
        let sent = match control.guard(self.transport.send(outbound)).await {
            Ok(sent) => sent,
            Err(reason) => return AttemptOutcome::Cancelled(reason),
        };
        let (status, body) = match sent {
            Ok(response) => (response.status, response.body),
            Err(err) => {
                warn!("{} {} failed: {}", resolved.method, url, err);
                (NETWORK_FAILURE_STATUS, json!({ "error": err.to_string() }))
            }
        };

        AttemptOutcome::Completed(AttemptRecord {
            status,
            body,
            duration_ms: self.clock.now_ms().saturating_sub(started),
            timestamp: started,
        })
    }

    fn simulated_rate_limit(&self) -> AttemptRecord {
        AttemptRecord {
            status: RATE_LIMITED_STATUS,
            body: json!({ "error": "rate_limited", "simulated": true }),
            duration_ms: 0,
            timestamp: self.clock.now_ms(),
        }
    }

    fn resolve_request(
        &self,
        request: &TestRequest,
        artifacts: &Artifacts,
    ) -> Result<ResolvedRequest, TemplateError> {
        let url = self.resolver.render(&request.url, artifacts)?;
        let mut headers = Vec::with_capacity(request.headers.len());
        for (key, value) in &request.headers {
            headers.push((key.clone(), self.resolver.render(value, artifacts)?));
        }
        let body = match request.body.as_ref() {
            Some(body) => Some(self.resolver.resolve(body, artifacts)?),
            None => None,
        };

        Ok(ResolvedRequest {
            method: request.method.clone(),
            url,
            body: encode_body(body, &headers),
            headers,
        })
    }
}

/// String bodies go out as text unless the request declares a JSON content
/// type; everything else is JSON.
fn encode_body(body: Option<Value>, headers: &[(String, String)]) -> RequestBody {
    match body {
        None => RequestBody::Empty,
        Some(Value::String(text)) if !declares_json(headers) => RequestBody::Text(text),
        Some(value) => RequestBody::Json(value),
    }
}

fn declares_json(headers: &[(String, String)]) -> bool {
    headers.iter().any(|(key, value)| {
        key.eq_ignore_ascii_case("content-type") && value.to_ascii_lowercase().contains("json")
    })
}
