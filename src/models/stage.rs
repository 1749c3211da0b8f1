use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, ordered column of the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: i64,
    pub name: String,
    pub position: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a stage. Position is appended after the last stage when omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStage {
    #[serde(default)]
    pub name: String,
    pub position: Option<i64>,
    pub description: Option<String>,
}

impl NewStage {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Field-level patch for a stage. `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePatch {
    pub name: Option<String>,
    pub position: Option<i64>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
}

/// What to do with records still assigned to a stage being deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageDeletion {
    /// Fail with a conflict if any record remains
    #[default]
    Refuse,
    /// Move every record to the given stage first, logging each move
    ReassignTo(i64),
    /// Delete the records along with the stage; their movements are kept
    Cascade,
}

/// Outcome of a stage deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDeletionReport {
    pub stage_id: i64,
    pub moved_records: usize,
    pub deleted_records: usize,
}
