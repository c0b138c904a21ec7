use super::*;

#[test]
fn run_failures_display_without_prefix() -> Result<(), String> {
    let err = AppError::run(RunError::CasesFailed {
        failed: 2,
        total: 5,
    });
    if err.to_string() != "2 of 5 case(s) failed." {
        return Err(format!("Unexpected message: {}", err));
    }
    Ok(())
}

#[test]
fn fatal_errors_convert_into_app_error() -> Result<(), String> {
    let from_suite = AppError::from(SuiteError::NotFound {
        id: "payments".to_owned(),
    });
    if !matches!(from_suite, AppError::Suite(SuiteError::NotFound { .. })) {
        return Err(format!("Unexpected conversion: {:?}", from_suite));
    }
    let from_config = AppError::from(ConfigError::MissingExtension);
    if !matches!(from_config, AppError::Config(ConfigError::MissingExtension)) {
        return Err(format!("Unexpected conversion: {:?}", from_config));
    }
    let from_validation = AppError::validation(ValidationError::MissingBaseUrl);
    if from_validation.to_string()
        != "Validation error: Missing base URL (set --base-url, GOLDRUN_BASE_URL, or base_url in config)."
    {
        return Err(format!("Unexpected message: {}", from_validation));
    }
    Ok(())
}
