use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::RunArgs;
use crate::error::ConfigError;

use super::types::{ConfigFile, DurationValue};

/// Applies configuration values to CLI arguments.
///
/// Values given on the command line or through the environment win over the
/// config file.
///
/// # Errors
///
/// Returns an error when config values are invalid or conflict with each other.
pub fn apply_config(
    args: &mut RunArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> Result<(), ConfigError> {
    if config.suites_dir.is_some() && config.suite_endpoint.is_some() {
        return Err(ConfigError::Conflict {
            left: "suites_dir",
            right: "suite_endpoint",
        });
    }

    if !is_explicit(matches, "base_url")
        && let Some(base_url) = config.base_url.clone()
    {
        args.base_url = Some(base_url);
    }

    let source_explicit =
        is_explicit(matches, "suites_dir") || is_explicit(matches, "suite_endpoint");
    if !source_explicit {
        if let Some(endpoint) = config.suite_endpoint.clone() {
            args.suite_endpoint = Some(endpoint);
        }
        if let Some(dir) = config.suites_dir.clone() {
            args.suites_dir = dir;
        }
    }

    if !is_explicit(matches, "artifacts_dir")
        && let Some(dir) = config.artifacts_dir.clone()
    {
        args.artifacts_dir = dir;
    }

    if !is_explicit(matches, "no_artifacts")
        && let Some(no_artifacts) = config.no_artifacts
    {
        args.no_artifacts = no_artifacts;
    }

    if !is_explicit(matches, "allow_insecure")
        && let Some(allow_insecure) = config.allow_insecure
    {
        args.allow_insecure = allow_insecure;
    }

    if !is_explicit(matches, "strict_templates")
        && let Some(strict) = config.strict_templates
    {
        args.strict_templates = strict;
    }

    if !is_explicit(matches, "no_retry_network_errors")
        && let Some(retry) = config.retry_network_errors
    {
        args.no_retry_network_errors = !retry;
    }

    if !is_explicit(matches, "request_timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.request_timeout = config_duration(timeout, "timeout")?;
    }

    if !is_explicit(matches, "deadline")
        && let Some(deadline) = config.deadline.as_ref()
    {
        args.deadline = Some(config_duration(deadline, "deadline")?);
    }

    if !is_explicit(matches, "verbose")
        && let Some(verbose) = config.verbose
    {
        args.verbose = verbose;
    }

    Ok(())
}

fn is_explicit(matches: &ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}

fn config_duration(
    value: &DurationValue,
    field: &'static str,
) -> Result<std::time::Duration, ConfigError> {
    value
        .to_duration()
        .map_err(|err| ConfigError::InvalidField { field, source: err })
}
