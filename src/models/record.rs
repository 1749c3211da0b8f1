use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Record priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// A unit of work (customer project) occupying exactly one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    pub stage_id: i64,
    pub project_name: String,
    pub customer_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub priority: Priority,
    pub budget: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    pub stage_id: Option<i64>,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub customer_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub priority: Option<Priority>,
    pub budget: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl NewRecord {
    pub fn new(stage_id: i64, project_name: impl Into<String>, customer_name: impl Into<String>) -> Self {
        Self {
            stage_id: Some(stage_id),
            project_name: project_name.into(),
            customer_name: customer_name.into(),
            ..Self::default()
        }
    }
}

/// Field-level patch for a record.
///
/// Optional attributes use `Option<Option<T>>`: absent leaves the field alone,
/// `null` clears it. A `stage_id` different from the current one runs the move protocol.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    pub stage_id: Option<i64>,
    pub project_name: Option<String>,
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub address: Option<Option<String>>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub budget: Option<Option<f64>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub notes: Option<Option<String>>,
}

/// Compact view of a record shown inside a board column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub id: i64,
    pub project_name: String,
    pub customer_name: String,
    pub priority: Priority,
    pub budget: Option<f64>,
    pub due_date: Option<NaiveDate>,
}

impl From<&Record> for RecordSummary {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id,
            project_name: record.project_name.clone(),
            customer_name: record.customer_name.clone(),
            priority: record.priority,
            budget: record.budget,
            due_date: record.due_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_conversion() {
        assert_eq!(Priority::High.as_str(), "high");
        assert_eq!(Priority::from_str("LOW"), Some(Priority::Low));
        assert_eq!(Priority::from_str(" medium "), Some(Priority::Medium));
        assert_eq!(Priority::from_str("urgent"), None);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_new_record_from_json() {
        let json = r#"{"stageId":2,"projectName":"Roof","customerName":"Mike","priority":"high","budget":1200.5,"dueDate":"2026-03-01"}"#;
        let record: NewRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.stage_id, Some(2));
        assert_eq!(record.priority, Some(Priority::High));
        assert_eq!(record.due_date, NaiveDate::from_ymd_opt(2026, 3, 1));
    }

    #[test]
    fn test_patch_distinguishes_null_and_absent() {
        let patch: RecordPatch = serde_json::from_str(r#"{"email":null,"notes":"call back"}"#).unwrap();
        assert_eq!(patch.email, Some(None));
        assert_eq!(patch.notes, Some(Some("call back".to_string())));
        assert_eq!(patch.phone, None);
        assert_eq!(patch.stage_id, None);
    }

    #[test]
    fn test_unknown_priority_rejected() {
        let result: Result<NewRecord, _> = serde_json::from_str(r#"{"priority":"urgent"}"#);
        assert!(result.is_err());
    }
}
