use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable audit entry for a record's stage transition.
///
/// `project_name` and the stage names are snapshots taken when the move happened,
/// so the entry stays readable after the record or stages are renamed or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: i64,
    pub record_id: i64,
    pub project_name: String,
    pub from_stage_id: Option<i64>,
    pub from_stage_name: Option<String>,
    pub to_stage_id: i64,
    pub to_stage_name: String,
    pub moved_by: String,
    pub moved_at: DateTime<Utc>,
}

/// Movement submitted for appending. Names left out are resolved from the stores.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementEntry {
    pub record_id: Option<i64>,
    pub project_name: Option<String>,
    pub from_stage_id: Option<i64>,
    pub from_stage_name: Option<String>,
    pub to_stage_id: Option<i64>,
    pub to_stage_name: Option<String>,
    pub moved_by: Option<String>,
}

/// Query for the movement log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementFilter {
    pub record_id: Option<i64>,
    pub limit: Option<usize>,
}

impl MovementFilter {
    pub fn for_record(record_id: i64) -> Self {
        Self {
            record_id: Some(record_id),
            limit: None,
        }
    }
}
