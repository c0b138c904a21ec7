use super::*;
use crate::args::parsers::{parse_bool_env, parse_duration};
use crate::error::{AppError, AppResult, ValidationError};
use clap::Parser;
use std::time::Duration;

fn parse_test_args<I, T>(args: I) -> AppResult<RunArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    RunArgs::try_parse_from(args).map_err(AppError::from)
}

#[test]
fn parse_args_defaults() -> Result<(), String> {
    let args = parse_test_args(["goldrun", "payments", "--base-url", "https://api.example.com"])
        .map_err(|err| err.to_string())?;

    let expected_no_color = std::env::var("NO_COLOR")
        .ok()
        .and_then(|value| parse_bool_env(&value).ok())
        .unwrap_or(false);
    let env_set = |name: &str| std::env::var_os(name).is_some();

    let checks = [
        (args.suite == "payments", "Unexpected suite"),
        (
            args.base_url.as_deref() == Some("https://api.example.com"),
            "Unexpected base url",
        ),
        (
            env_set("GOLDRUN_SUITES_DIR") || args.suites_dir == DEFAULT_SUITES_DIR,
            "Unexpected suites dir",
        ),
        (
            env_set("GOLDRUN_ARTIFACTS_DIR") || args.artifacts_dir == DEFAULT_ARTIFACTS_DIR,
            "Unexpected artifacts dir",
        ),
        (
            env_set("GOLDRUN_NO_ARTIFACTS") || !args.no_artifacts,
            "Expected artifacts enabled",
        ),
        (
            env_set("GOLDRUN_ALLOW_INSECURE") || !args.allow_insecure,
            "Expected allow_insecure to be false",
        ),
        (!args.strict_templates, "Expected strict_templates to be false"),
        (
            !args.no_retry_network_errors,
            "Expected network errors to be retried",
        ),
        (
            args.request_timeout == Duration::from_secs(30),
            "Unexpected request timeout",
        ),
        (args.deadline.is_none(), "Expected no deadline"),
        (args.config.is_none(), "Expected no config"),
        (!args.verbose, "Expected verbose to be false"),
        (args.no_color == expected_no_color, "Unexpected no_color"),
    ];
    for (ok, message) in checks {
        if !ok {
            return Err(message.to_owned());
        }
    }
    Ok(())
}

#[test]
fn parse_args_run_options() -> Result<(), String> {
    let args = parse_test_args([
        "goldrun",
        "suites/payments.toml",
        "-b",
        "http://localhost:3000",
        "--allow-insecure",
        "--no-artifacts",
        "--strict-templates",
        "--no-retry-network-errors",
        "--timeout",
        "750ms",
        "--deadline",
        "2m",
        "-v",
    ])
    .map_err(|err| err.to_string())?;

    if !args.allow_insecure || !args.no_artifacts {
        return Err("Expected boolean flags to be set".to_owned());
    }
    if !args.strict_templates || !args.no_retry_network_errors || !args.verbose {
        return Err("Expected behavior flags to be set".to_owned());
    }
    if args.request_timeout != Duration::from_millis(750) {
        return Err(format!("Unexpected timeout: {:?}", args.request_timeout));
    }
    if args.deadline != Some(Duration::from_secs(120)) {
        return Err(format!("Unexpected deadline: {:?}", args.deadline));
    }
    Ok(())
}

#[test]
fn parse_args_requires_suite() -> Result<(), String> {
    if parse_test_args(["goldrun", "--base-url", "https://api.example.com"]).is_ok() {
        return Err("Expected missing suite to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn suites_dir_conflicts_with_endpoint() -> Result<(), String> {
    let result = parse_test_args([
        "goldrun",
        "payments",
        "--suites-dir",
        "./suites",
        "--suite-endpoint",
        "https://suites.example.com/v1",
    ]);
    if result.is_ok() {
        return Err("Expected conflicting suite sources to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn parse_bool_env_accepts_common_spellings() -> Result<(), String> {
    for value in ["1", "true", "YES", " on "] {
        if !parse_bool_env(value).map_err(|err| err.to_string())? {
            return Err(format!("Expected {} to be true", value));
        }
    }
    for value in ["0", "false", "No", "off"] {
        if parse_bool_env(value).map_err(|err| err.to_string())? {
            return Err(format!("Expected {} to be false", value));
        }
    }
    if parse_bool_env("maybe").is_ok() {
        return Err("Expected invalid boolean to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn parse_duration_units() -> Result<(), String> {
    let cases = [
        ("250ms", Duration::from_millis(250)),
        ("5", Duration::from_secs(5)),
        ("5s", Duration::from_secs(5)),
        ("2m", Duration::from_secs(120)),
        ("1h", Duration::from_secs(3600)),
    ];
    for (input, expected) in cases {
        let parsed = parse_duration(input).map_err(|err| err.to_string())?;
        if parsed != expected {
            return Err(format!("{} parsed as {:?}", input, parsed));
        }
    }
    Ok(())
}

#[test]
fn parse_duration_rejects_bad_input() -> Result<(), String> {
    let checks = [
        ("", "empty"),
        ("ms", "format"),
        ("0s", "zero"),
        ("5d", "unit"),
        ("99999999999999999999", "number"),
    ];
    for (input, label) in checks {
        let ok = matches!(
            (parse_duration(input), label),
            (Err(ValidationError::DurationEmpty), "empty")
                | (Err(ValidationError::InvalidDurationFormat { .. }), "format")
                | (Err(ValidationError::DurationZero), "zero")
                | (Err(ValidationError::InvalidDurationUnit { .. }), "unit")
                | (Err(ValidationError::InvalidDurationNumber { .. }), "number")
        );
        if !ok {
            return Err(format!("Expected {} error for '{}'", label, input));
        }
    }
    Ok(())
}
