//! Pipeline controller
//!
//! [`Pipeline`] owns the SQLite connection and is the only writer of the three
//! stores. Every mutating operation runs in a single transaction: a record's
//! stage never changes without its movement entry, and a failed operation
//! leaves every store untouched.

mod validate;

use std::collections::HashSet;

use rusqlite::Connection;
use serde::Serialize;

use crate::board::Board;
use crate::db::DbConnection;
use crate::error::{PipelineError, Result};
use crate::models::{
    Movement, MovementEntry, MovementFilter, NewRecord, NewStage, Record, RecordPatch, Stage,
    StageDeletion, StageDeletionReport, StagePatch,
};
use crate::repo::{MovementRepo, RecordRepo, StageRepo};
use crate::utils::date::{from_millis, now_millis};
use validate::{check_budget, check_dates, check_position, optional, required, MAX_POSITION};

/// Record count for one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCount {
    pub stage_id: i64,
    pub name: String,
    pub position: i64,
    pub record_count: usize,
}

/// Pipeline-wide totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub total_stages: usize,
    pub total_records: usize,
    pub total_movements: usize,
    pub stages: Vec<StageCount>,
}

/// Rows removed by [`Pipeline::reset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetReport {
    pub stages: usize,
    pub records: usize,
    pub movements: usize,
}

pub struct Pipeline {
    conn: Connection,
    default_actor: String,
}

impl Pipeline {
    pub fn new(conn: Connection, default_actor: impl Into<String>) -> Self {
        Self {
            conn,
            default_actor: default_actor.into(),
        }
    }

    /// Fresh pipeline on an in-memory database (tests, demos)
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(DbConnection::connect_in_memory()?, crate::config::DEFAULT_ACTOR))
    }

    /// Actor to record: the caller's label when non-blank, else the configured default
    fn actor(&self, actor: Option<&str>) -> String {
        optional(actor).unwrap_or_else(|| self.default_actor.clone())
    }

    // ---- stages ----

    pub fn list_stages(&self) -> Result<Vec<Stage>> {
        StageRepo::list_all(&self.conn)
    }

    pub fn get_stage(&self, id: i64) -> Result<Stage> {
        StageRepo::get_by_id(&self.conn, id)?.ok_or_else(|| PipelineError::stage_not_found(id))
    }

    /// Create a stage. An occupied position shifts that stage and its successors up by one.
    pub fn create_stage(&self, data: &NewStage) -> Result<Stage> {
        let name = required(&data.name, "Stage name")?;
        if let Some(position) = data.position {
            check_position(position)?;
        }
        let description = optional(data.description.as_deref());

        let tx = self.conn.unchecked_transaction()?;
        let position = match data.position {
            Some(position) => {
                if StageRepo::id_at_position(&tx, position)?.is_some() {
                    StageRepo::shift_from(&tx, position)?;
                }
                position
            }
            None => StageRepo::max_position(&tx)?
                .checked_add(1)
                .filter(|p| *p <= MAX_POSITION)
                .ok_or_else(|| PipelineError::validation("No position left after the last stage"))?,
        };
        let stage = StageRepo::insert(&tx, &name, position, description.as_deref())?;
        tx.commit()?;

        log::info!("Created stage {} '{}' at position {}", stage.id, stage.name, stage.position);
        Ok(stage)
    }

    pub fn update_stage(&self, id: i64, patch: &StagePatch) -> Result<Stage> {
        let name = patch
            .name
            .as_deref()
            .map(|n| required(n, "Stage name"))
            .transpose()?;
        if let Some(position) = patch.position {
            check_position(position)?;
        }
        let description = patch
            .description
            .as_ref()
            .map(|d| optional(d.as_deref()));

        let tx = self.conn.unchecked_transaction()?;
        if StageRepo::get_by_id(&tx, id)?.is_none() {
            return Err(PipelineError::stage_not_found(id));
        }
        StageRepo::update(
            &tx,
            id,
            name.as_deref(),
            patch.position,
            description.as_ref().map(|d| d.as_deref()),
        )?;
        let stage = StageRepo::get_by_id(&tx, id)?.ok_or_else(|| PipelineError::stage_not_found(id))?;
        tx.commit()?;

        log::info!("Updated stage {} '{}'", stage.id, stage.name);
        Ok(stage)
    }

    /// Delete a stage, handling its records according to `mode`.
    ///
    /// A stage without records is removed under any mode.
    pub fn delete_stage(
        &self,
        id: i64,
        mode: StageDeletion,
        actor: Option<&str>,
    ) -> Result<StageDeletionReport> {
        let tx = self.conn.unchecked_transaction()?;
        let stage = StageRepo::get_by_id(&tx, id)?.ok_or_else(|| PipelineError::stage_not_found(id))?;
        let records = RecordRepo::list(&tx, Some(id))?;

        let mut report = StageDeletionReport {
            stage_id: id,
            moved_records: 0,
            deleted_records: 0,
        };

        if !records.is_empty() {
            match mode {
                StageDeletion::Refuse => {
                    log::warn!(
                        "Refused to delete stage {} '{}': {} record(s) assigned",
                        stage.id, stage.name, records.len()
                    );
                    return Err(PipelineError::Conflict(format!(
                        "Stage '{}' still holds {} record(s); reassign them or delete with cascade",
                        stage.name,
                        records.len()
                    )));
                }
                StageDeletion::ReassignTo(target_id) => {
                    if target_id == id {
                        return Err(PipelineError::validation(
                            "Cannot reassign records to the stage being deleted",
                        ));
                    }
                    let target = StageRepo::get_by_id(&tx, target_id)?
                        .ok_or_else(|| PipelineError::stage_not_found(target_id))?;
                    let actor = self.actor(actor);
                    let now = now_millis();
                    for record in &records {
                        apply_move(&tx, record, &stage, &target, &actor, now)?;
                    }
                    report.moved_records = records.len();
                }
                StageDeletion::Cascade => {
                    report.deleted_records = RecordRepo::delete_by_stage(&tx, id)?;
                }
            }
        }

        StageRepo::delete(&tx, id)?;
        tx.commit()?;

        log::info!(
            "Deleted stage {} '{}' (moved {}, deleted {})",
            stage.id, stage.name, report.moved_records, report.deleted_records
        );
        Ok(report)
    }

    /// Renumber stages 1..n following `ordered_ids`, which must name every stage once
    pub fn reorder_stages(&self, ordered_ids: &[i64]) -> Result<Vec<Stage>> {
        let mut seen = HashSet::new();
        for id in ordered_ids {
            if !seen.insert(*id) {
                return Err(PipelineError::validation(format!(
                    "Stage {} appears more than once in the new order",
                    id
                )));
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        let existing: HashSet<i64> = StageRepo::list_all(&tx)?.iter().map(|s| s.id).collect();
        if let Some(unknown) = ordered_ids.iter().find(|id| !existing.contains(*id)) {
            return Err(PipelineError::stage_not_found(*unknown));
        }
        let mut missing: Vec<i64> = existing.difference(&seen).copied().collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            let ids: Vec<String> = missing.iter().map(|id| id.to_string()).collect();
            return Err(PipelineError::validation(format!(
                "New order is missing stage(s) {}",
                ids.join(", ")
            )));
        }

        StageRepo::set_order(&tx, ordered_ids)?;
        let stages = StageRepo::list_all(&tx)?;
        tx.commit()?;

        log::info!("Reordered {} stage(s)", stages.len());
        Ok(stages)
    }

    // ---- records ----

    pub fn list_records(&self, stage_id: Option<i64>) -> Result<Vec<Record>> {
        log::debug!("Listing records (stage filter: {:?})", stage_id);
        RecordRepo::list(&self.conn, stage_id)
    }

    pub fn get_record(&self, id: i64) -> Result<Record> {
        RecordRepo::get_by_id(&self.conn, id)?.ok_or_else(|| PipelineError::record_not_found(id))
    }

    /// Create a record and log its entry into the initial stage
    pub fn create_record(&self, data: &NewRecord, actor: Option<&str>) -> Result<Record> {
        let (stage_id, data) = validate::new_record(data)?;

        let tx = self.conn.unchecked_transaction()?;
        let stage = StageRepo::get_by_id(&tx, stage_id)?.ok_or_else(|| {
            PipelineError::validation(format!("Stage {} does not exist", stage_id))
        })?;
        let record = RecordRepo::insert(&tx, stage.id, &data)?;
        MovementRepo::append_at(
            &tx,
            record.id,
            &record.project_name,
            None,
            (stage.id, &stage.name),
            &self.actor(actor),
            record.created_at.timestamp_millis(),
        )?;
        tx.commit()?;

        log::info!("Created record {} '{}' in stage '{}'", record.id, record.project_name, stage.name);
        Ok(record)
    }

    /// Merge `patch` into a record; a different `stage_id` also moves it
    pub fn update_record(&self, id: i64, patch: &RecordPatch, actor: Option<&str>) -> Result<Record> {
        let tx = self.conn.unchecked_transaction()?;
        let current = RecordRepo::get_by_id(&tx, id)?.ok_or_else(|| PipelineError::record_not_found(id))?;

        let mut updated = current.clone();
        if let Some(name) = &patch.project_name {
            updated.project_name = required(name, "projectName")?;
        }
        if let Some(name) = &patch.customer_name {
            updated.customer_name = required(name, "customerName")?;
        }
        if let Some(email) = &patch.email {
            updated.email = optional(email.as_deref());
        }
        if let Some(phone) = &patch.phone {
            updated.phone = optional(phone.as_deref());
        }
        if let Some(address) = &patch.address {
            updated.address = optional(address.as_deref());
        }
        if let Some(priority) = patch.priority {
            updated.priority = priority;
        }
        if let Some(budget) = patch.budget {
            updated.budget = budget;
        }
        if let Some(start_date) = patch.start_date {
            updated.start_date = start_date;
        }
        if let Some(due_date) = patch.due_date {
            updated.due_date = due_date;
        }
        if let Some(description) = &patch.description {
            updated.description = optional(description.as_deref());
        }
        if let Some(notes) = &patch.notes {
            updated.notes = optional(notes.as_deref());
        }
        check_budget(updated.budget)?;
        check_dates(updated.start_date, updated.due_date)?;

        let target = match patch.stage_id {
            Some(stage_id) if stage_id != current.stage_id => Some(
                StageRepo::get_by_id(&tx, stage_id)?.ok_or_else(|| PipelineError::stage_not_found(stage_id))?,
            ),
            _ => None,
        };

        let now = now_millis();
        updated.updated_at = from_millis(now);
        RecordRepo::save_attributes(&tx, &updated)?;

        if let Some(target) = &target {
            let from = current_stage(&tx, &current)?;
            apply_move(&tx, &updated, &from, target, &self.actor(actor), now)?;
        }

        let record = RecordRepo::get_by_id(&tx, id)?.ok_or_else(|| PipelineError::record_not_found(id))?;
        tx.commit()?;

        log::info!("Updated record {} '{}'", record.id, record.project_name);
        Ok(record)
    }

    /// Move a record to another stage.
    ///
    /// Moving to the current stage is a no-op: nothing is logged and `updated_at` is kept.
    pub fn move_record(&self, id: i64, to_stage_id: i64, actor: Option<&str>) -> Result<Record> {
        let tx = self.conn.unchecked_transaction()?;
        let record = RecordRepo::get_by_id(&tx, id)?.ok_or_else(|| PipelineError::record_not_found(id))?;
        let target = StageRepo::get_by_id(&tx, to_stage_id)?
            .ok_or_else(|| PipelineError::stage_not_found(to_stage_id))?;

        if record.stage_id == target.id {
            log::debug!("Record {} already in stage {}", record.id, target.id);
            return Ok(record);
        }

        let from = current_stage(&tx, &record)?;
        let movement = apply_move(&tx, &record, &from, &target, &self.actor(actor), now_millis())?;
        let moved = RecordRepo::get_by_id(&tx, id)?.ok_or_else(|| PipelineError::record_not_found(id))?;
        tx.commit()?;

        log::info!(
            "Moved record {} '{}' from '{}' to '{}' by {}",
            moved.id, moved.project_name, from.name, target.name, movement.moved_by
        );
        Ok(moved)
    }

    /// Delete a record. Its movements stay in the log.
    pub fn delete_record(&self, id: i64) -> Result<()> {
        if !RecordRepo::delete(&self.conn, id)? {
            return Err(PipelineError::record_not_found(id));
        }
        log::info!("Deleted record {}", id);
        Ok(())
    }

    // ---- movements ----

    /// Append an explicit movement entry, resolving missing names from the stores
    pub fn append_movement(&self, entry: &MovementEntry) -> Result<Movement> {
        let record_id = entry
            .record_id
            .ok_or_else(|| PipelineError::validation("recordId is required"))?;
        let to_stage_id = entry
            .to_stage_id
            .ok_or_else(|| PipelineError::validation("toStageId is required"))?;

        let project_name = match optional(entry.project_name.as_deref()) {
            Some(name) => name,
            None => RecordRepo::get_by_id(&self.conn, record_id)?
                .map(|r| r.project_name)
                .ok_or_else(|| {
                    PipelineError::validation(format!(
                        "projectName is required: record {} does not exist",
                        record_id
                    ))
                })?,
        };
        let to_stage_name = self.stage_name(to_stage_id, entry.to_stage_name.as_deref(), "toStageName")?;
        let from = match entry.from_stage_id {
            Some(from_id) => Some((
                from_id,
                self.stage_name(from_id, entry.from_stage_name.as_deref(), "fromStageName")?,
            )),
            None => {
                if optional(entry.from_stage_name.as_deref()).is_some() {
                    return Err(PipelineError::validation("fromStageName requires fromStageId"));
                }
                None
            }
        };

        let movement = MovementRepo::append(
            &self.conn,
            record_id,
            &project_name,
            from.as_ref().map(|(id, name)| (*id, name.as_str())),
            (to_stage_id, &to_stage_name),
            &self.actor(entry.moved_by.as_deref()),
        )?;
        log::info!("Appended movement {} for record {}", movement.id, record_id);
        Ok(movement)
    }

    fn stage_name(&self, id: i64, supplied: Option<&str>, field: &str) -> Result<String> {
        if let Some(name) = optional(supplied) {
            return Ok(name);
        }
        StageRepo::get_by_id(&self.conn, id)?
            .map(|s| s.name)
            .ok_or_else(|| {
                PipelineError::validation(format!("{} is required: stage {} does not exist", field, id))
            })
    }

    pub fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>> {
        log::debug!("Listing movements {:?}", filter);
        MovementRepo::list(&self.conn, filter)
    }

    // ---- projections ----

    pub fn board(&self, per_column_limit: Option<usize>) -> Result<Board> {
        let stages = StageRepo::list_all(&self.conn)?;
        let records = RecordRepo::list(&self.conn, None)?;
        Ok(Board::project(&stages, &records, per_column_limit))
    }

    pub fn stats(&self) -> Result<PipelineStats> {
        let stages = StageRepo::list_all(&self.conn)?;
        let mut counts = Vec::with_capacity(stages.len());
        for stage in &stages {
            counts.push(StageCount {
                stage_id: stage.id,
                name: stage.name.clone(),
                position: stage.position,
                record_count: StageRepo::count_records(&self.conn, stage.id)? as usize,
            });
        }
        Ok(PipelineStats {
            total_stages: stages.len(),
            total_records: RecordRepo::count(&self.conn)? as usize,
            total_movements: MovementRepo::count(&self.conn, None)? as usize,
            stages: counts,
        })
    }

    /// Remove every movement, record and stage
    pub fn reset(&self) -> Result<ResetReport> {
        let tx = self.conn.unchecked_transaction()?;
        let movements = MovementRepo::delete_all(&tx)?;
        let records = RecordRepo::delete_all(&tx)?;
        let stages = StageRepo::delete_all(&tx)?;
        tx.commit()?;

        log::warn!("Pipeline reset: removed {} stages, {} records, {} movements", stages, records, movements);
        Ok(ResetReport { stages, records, movements })
    }
}

fn current_stage(conn: &Connection, record: &Record) -> Result<Stage> {
    StageRepo::get_by_id(conn, record.stage_id)?
        .ok_or_else(|| PipelineError::stage_not_found(record.stage_id))
}

/// Point `record` at `to` and log the transition; the caller owns the transaction
fn apply_move(
    conn: &Connection,
    record: &Record,
    from: &Stage,
    to: &Stage,
    actor: &str,
    now: i64,
) -> Result<Movement> {
    RecordRepo::set_stage(conn, record.id, to.id, now)?;
    MovementRepo::append_at(
        conn,
        record.id,
        &record.project_name,
        Some((from.id, &from.name)),
        (to.id, &to.name),
        actor,
        now,
    )
}
