//! Board projection
//!
//! Pure function of the stage and record lists; holds no state of its own.

use serde::Serialize;

use crate::models::{Record, RecordSummary, Stage};

/// One stage with the records it currently holds
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub stage: Stage,
    /// Records in the stage before truncation
    pub count: usize,
    pub records: Vec<RecordSummary>,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub columns: Vec<BoardColumn>,
    pub total_stages: usize,
    pub total_records: usize,
}

impl Board {
    /// Group `records` into one column per stage, in position order.
    ///
    /// Within a column records are newest first. Records pointing at a stage not
    /// in `stages` are left out.
    pub fn project(stages: &[Stage], records: &[Record], per_column_limit: Option<usize>) -> Self {
        let mut stages: Vec<&Stage> = stages.iter().collect();
        stages.sort_by_key(|s| (s.position, s.id));

        let mut records: Vec<&Record> = records.iter().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let columns: Vec<BoardColumn> = stages
            .into_iter()
            .map(|stage| {
                let in_stage: Vec<&Record> = records
                    .iter()
                    .copied()
                    .filter(|r| r.stage_id == stage.id)
                    .collect();
                let count = in_stage.len();
                let shown = per_column_limit.unwrap_or(count).min(count);
                BoardColumn {
                    stage: stage.clone(),
                    count,
                    records: in_stage[..shown].iter().map(|r| RecordSummary::from(*r)).collect(),
                    truncated: shown < count,
                }
            })
            .collect();

        Board {
            total_stages: columns.len(),
            total_records: columns.iter().map(|c| c.count).sum(),
            columns,
        }
    }
}
