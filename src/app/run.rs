use std::path::Path;
use std::sync::Arc;

use reqwest::Client;
use tracing::info;
use url::Url;

use crate::args::RunArgs;
use crate::clock::{Clock, SystemClock};
use crate::engine::{CaseExecutor, ExecutorConfig, SuiteRef, SuiteRunner};
use crate::error::{AppError, AppResult, RunError, ValidationError};
use crate::http::ReqwestTransport;
use crate::shutdown::RunControl;
use crate::shutdown_handlers::{setup_signal_shutdown_handler, shutdown_channel};
use crate::sinks::DirectorySink;
use crate::suite::{DirectorySource, HttpSource, SuiteCache, SuiteLoader, split_suite_path};
use crate::template::{TemplateResolver, UnresolvedPolicy};

use super::summary::{print_artifact, print_summary};

/// Suite files are recognised by extension; anything else is a suite id.
fn is_suite_file(suite: &str) -> bool {
    Path::new(suite)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("toml"))
}

fn build_loader(args: &RunArgs) -> AppResult<(SuiteLoader, String)> {
    let cache = SuiteCache::new(None);

    if is_suite_file(&args.suite) {
        let (dir, id) = split_suite_path(Path::new(&args.suite))?;
        info!("Loading suite file {}", args.suite);
        return Ok((
            SuiteLoader::new(cache).with_source(DirectorySource::new(dir)),
            id,
        ));
    }

    if let Some(endpoint) = args.suite_endpoint.as_deref() {
        let url = Url::parse(endpoint).map_err(|err| ValidationError::InvalidSuiteEndpoint {
            url: endpoint.to_owned(),
            source: err,
        })?;
        let client = Client::builder()
            .timeout(args.request_timeout)
            .build()
            .map_err(|err| ValidationError::BuildClientFailed { source: err })?;
        return Ok((
            SuiteLoader::new(cache).with_source(HttpSource::new(url, client)),
            args.suite.clone(),
        ));
    }

    Ok((
        SuiteLoader::new(cache).with_source(DirectorySource::new(&args.suites_dir)),
        args.suite.clone(),
    ))
}

fn build_executor(args: &RunArgs, clock: &Arc<dyn Clock>) -> AppResult<CaseExecutor> {
    let origin = args
        .base_url
        .clone()
        .ok_or(ValidationError::MissingBaseUrl)?;
    let transport = Arc::new(ReqwestTransport::new(args.request_timeout)?);

    let policy = if args.strict_templates {
        UnresolvedPolicy::Strict
    } else {
        UnresolvedPolicy::Preserve
    };
    let resolver = TemplateResolver::new(Arc::clone(clock), policy);

    let mut config = ExecutorConfig::new(origin);
    config.allow_insecure = args.allow_insecure;
    config.retry_network_errors = !args.no_retry_network_errors;

    Ok(CaseExecutor::new(
        transport,
        Arc::clone(clock),
        resolver,
        config,
    ))
}

pub(crate) async fn run(args: RunArgs) -> AppResult<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let executor = build_executor(&args, &clock)?;
    let (loader, suite_id) = build_loader(&args)?;

    let mut runner = SuiteRunner::new(loader, executor, Arc::clone(&clock));
    if args.no_artifacts {
        info!("Artifact writing disabled");
    } else {
        runner = runner.with_sink(Arc::new(DirectorySink::new(&args.artifacts_dir)));
    }

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let mut control = RunControl::new(Arc::clone(&clock)).with_shutdown(shutdown_rx);
    if let Some(deadline) = args.deadline {
        control = control.with_deadline(deadline);
    }

    let outcome = runner.run(SuiteRef::Id(suite_id), &mut control).await;

    drop(shutdown_tx.send(()));
    if let Err(err) = signal_handle.await {
        tracing::debug!("Signal handler task ended abnormally: {}", err);
    }

    let report = outcome?;
    print_summary(&report.result);
    if let Some(artifact) = report.artifact.as_ref() {
        print_artifact(artifact);
    }

    let summary = report.result.summary;
    if summary.failed > 0 {
        return Err(AppError::run(RunError::CasesFailed {
            failed: summary.failed,
            total: summary.total,
        }));
    }
    Ok(())
}
