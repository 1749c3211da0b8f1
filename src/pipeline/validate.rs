// Input normalisation shared by the controller operations

use chrono::NaiveDate;
use crate::error::{PipelineError, Result};
use crate::models::NewRecord;

/// Trim a required text field, rejecting blanks
pub(crate) fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank becomes absent
pub(crate) fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Highest position a stage may be given; leaves room for shifting and appending
pub(crate) const MAX_POSITION: i64 = i32::MAX as i64;

pub(crate) fn check_position(position: i64) -> Result<()> {
    if !(1..=MAX_POSITION).contains(&position) {
        return Err(PipelineError::validation(format!(
            "Position must be between 1 and {}, got {}",
            MAX_POSITION, position
        )));
    }
    Ok(())
}

pub(crate) fn check_budget(budget: Option<f64>) -> Result<()> {
    match budget {
        Some(b) if !b.is_finite() || b < 0.0 => Err(PipelineError::validation(format!(
            "Budget must be a non-negative amount, got {}",
            b
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn check_dates(start: Option<NaiveDate>, due: Option<NaiveDate>) -> Result<()> {
    if let (Some(start), Some(due)) = (start, due) {
        if due < start {
            return Err(PipelineError::validation(format!(
                "Due date {} is before start date {}",
                due, start
            )));
        }
    }
    Ok(())
}

/// Validate a create request and return the target stage with cleaned fields
pub(crate) fn new_record(data: &NewRecord) -> Result<(i64, NewRecord)> {
    let stage_id = data
        .stage_id
        .ok_or_else(|| PipelineError::validation("stageId is required"))?;
    check_budget(data.budget)?;
    check_dates(data.start_date, data.due_date)?;

    let cleaned = NewRecord {
        stage_id: Some(stage_id),
        project_name: required(&data.project_name, "projectName")?,
        customer_name: required(&data.customer_name, "customerName")?,
        email: optional(data.email.as_deref()),
        phone: optional(data.phone.as_deref()),
        address: optional(data.address.as_deref()),
        priority: data.priority,
        budget: data.budget,
        start_date: data.start_date,
        due_date: data.due_date,
        description: optional(data.description.as_deref()),
        notes: optional(data.notes.as_deref()),
    };
    Ok((stage_id, cleaned))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  Roof ", "projectName").unwrap(), "Roof");
        assert!(matches!(required("   ", "projectName"), Err(PipelineError::Validation(_))));
    }

    #[test]
    fn test_optional_blank_is_none() {
        assert_eq!(optional(Some("  ")), None);
        assert_eq!(optional(Some(" a@b.c ")), Some("a@b.c".to_string()));
        assert_eq!(optional(None), None);
    }

    #[test]
    fn test_budget_rules() {
        assert!(check_budget(None).is_ok());
        assert!(check_budget(Some(0.0)).is_ok());
        assert!(check_budget(Some(-1.0)).is_err());
        assert!(check_budget(Some(f64::NAN)).is_err());
        assert!(check_budget(Some(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_due_before_start_rejected() {
        let start = NaiveDate::from_ymd_opt(2026, 5, 10);
        let due = NaiveDate::from_ymd_opt(2026, 5, 1);
        assert!(check_dates(start, due).is_err());
        assert!(check_dates(due, start).is_ok());
        assert!(check_dates(None, due).is_ok());
    }

    #[test]
    fn test_new_record_requires_stage() {
        let mut data = NewRecord::new(1, "Roof", "Mike");
        data.stage_id = None;
        assert!(new_record(&data).is_err());
    }
}
