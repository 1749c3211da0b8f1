// Error handling utilities for consistent error messages and exit codes

use crate::error::PipelineError;
use crate::models::Priority;

/// Invalid command-line input (exit code 1)
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Wrap a message as a user-facing usage error
pub fn usage(message: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(UsageError(message.into()))
}

/// Exit code for an error returned by `run`.
///
/// 1 for user errors (bad input, missing ids, blocked deletions), 2 for everything else.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(pipeline_err) = cause.downcast_ref::<PipelineError>() {
            return if pipeline_err.is_user_error() { 1 } else { 2 };
        }
        if cause.is::<UsageError>() {
            return 1;
        }
    }
    2
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Parse a priority label (low, medium, high)
pub fn validate_priority(value: &str) -> Result<Priority, String> {
    Priority::from_str(value).ok_or_else(|| {
        format!("Invalid priority: '{}'. Priority must be low, medium, or high.", value)
    })
}

/// Validate a budget amount (finite, non-negative)
pub fn validate_budget(value: f64) -> Result<f64, String> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("Invalid budget: {}. Budget must be a non-negative amount.", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_empty() {
        assert!(validate_non_empty("test", "field").is_ok());
        assert!(validate_non_empty("", "field").is_err());
        assert!(validate_non_empty("   ", "field").is_err());
    }

    #[test]
    fn test_validate_priority() {
        assert_eq!(validate_priority("High"), Ok(Priority::High));
        assert!(validate_priority("urgent").is_err());
    }

    #[test]
    fn test_validate_budget() {
        assert_eq!(validate_budget(250.0), Ok(250.0));
        assert!(validate_budget(-1.0).is_err());
        assert!(validate_budget(f64::NAN).is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&usage("bad flag")), 1);
        assert_eq!(exit_code(&anyhow::Error::new(PipelineError::record_not_found(3))), 1);
        assert_eq!(exit_code(&anyhow::Error::new(PipelineError::Conflict("x".into()))), 1);

        let db = anyhow::Error::new(PipelineError::Database(rusqlite::Error::InvalidQuery))
            .context("Failed to list records");
        assert_eq!(exit_code(&db), 2);
        assert_eq!(exit_code(&anyhow::anyhow!("disk on fire")), 2);
    }

    #[test]
    fn test_context_keeps_user_error_code() {
        let err = anyhow::Error::new(PipelineError::stage_not_found(9)).context("Failed to move record");
        assert_eq!(exit_code(&err), 1);
    }
}
