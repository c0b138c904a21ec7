use crate::engine::{CaseStatus, SuiteRunResult};
use crate::error::SinkError;

pub(crate) fn print_summary(result: &SuiteRunResult) {
    let summary = &result.summary;
    println!("Suite: {}", result.suite_id);
    println!(
        "Total: {}  Passed: {}  Failed: {}  Skipped: {}",
        summary.total, summary.passed, summary.failed, summary.skipped
    );
    println!("Duration: {}ms", summary.duration_ms);

    for case in result.cases.iter().filter(|case| case.status == CaseStatus::Failed) {
        if case.errors.is_empty() {
            println!("- {}: failed", case.id);
        }
        for error in &case.errors {
            println!("- {}: {}", case.id, error);
        }
    }
}

pub(crate) fn print_artifact(artifact: &Result<String, SinkError>) {
    match artifact {
        Ok(path) => println!("Artifact: {}", path),
        Err(err) => eprintln!("Warning: run artifact was not written: {}", err),
    }
}
