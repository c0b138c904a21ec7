use clap::Parser;
use std::time::Duration;

use super::defaults::{DEFAULT_ARTIFACTS_DIR, DEFAULT_SUITES_DIR, DEFAULT_TIMEOUT};
use super::parsers::{parse_bool_env, parse_duration_arg};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Golden-test runner for HTTP APIs - declarative suites, retry/backoff policy, idempotency checks, SSRF-safe targets and JSON run artifacts."
)]
pub struct RunArgs {
    /// Suite id, or a path to a .json/.toml suite file
    pub suite: String,

    /// Trusted origin every request path is joined onto (e.g., https://api.example.com)
    #[arg(long = "base-url", short = 'b', env = "GOLDRUN_BASE_URL")]
    pub base_url: Option<String>,

    /// Directory searched for <id>.json / <id>.toml suites
    #[arg(
        long = "suites-dir",
        env = "GOLDRUN_SUITES_DIR",
        default_value = DEFAULT_SUITES_DIR,
        conflicts_with = "suite_endpoint"
    )]
    pub suites_dir: String,

    /// Fetch suites from GET <endpoint>/<id> instead of a directory
    #[arg(long = "suite-endpoint", env = "GOLDRUN_SUITE_ENDPOINT")]
    pub suite_endpoint: Option<String>,

    /// Directory run artifacts are written to
    #[arg(
        long = "artifacts-dir",
        env = "GOLDRUN_ARTIFACTS_DIR",
        default_value = DEFAULT_ARTIFACTS_DIR
    )]
    pub artifacts_dir: String,

    /// Do not write a run artifact
    #[arg(long = "no-artifacts", env = "GOLDRUN_NO_ARTIFACTS", value_parser = parse_bool_env)]
    pub no_artifacts: bool,

    /// Allow http origins and private/loopback hosts (local and dev targets)
    #[arg(
        long = "allow-insecure",
        env = "GOLDRUN_ALLOW_INSECURE",
        value_parser = parse_bool_env
    )]
    pub allow_insecure: bool,

    /// Fail a case when a {{from:<caseId>}} reference has no captured artifact
    #[arg(long = "strict-templates")]
    pub strict_templates: bool,

    /// Do not retry transport failures; only 429 and 5xx responses are retried
    #[arg(long = "no-retry-network-errors")]
    pub no_retry_network_errors: bool,

    /// Per-request timeout (supports ms/s/m/h)
    #[arg(
        long = "timeout",
        default_value = DEFAULT_TIMEOUT,
        value_parser = parse_duration_arg
    )]
    pub request_timeout: Duration,

    /// Upper bound for the whole run (supports ms/s/m/h)
    #[arg(long = "deadline", value_parser = parse_duration_arg)]
    pub deadline: Option<Duration>,

    /// Path to config file (TOML/JSON). Defaults to ./goldrun.toml or ./goldrun.json
    #[arg(long, short)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable color output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,
}
