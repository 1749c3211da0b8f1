use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use crate::error::Result;
use crate::models::{NewRecord, Priority, Record};
use crate::utils::date::{from_millis, now_millis};

const RECORD_COLUMNS: &str = "id, stage_id, project_name, customer_name, email, phone, address, \
     priority, budget, start_date, due_date, description, notes, created_at, updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(value: Option<String>, column: usize) -> rusqlite::Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()
}

fn format_date(value: Option<NaiveDate>) -> Option<String> {
    value.map(|d| d.format(DATE_FORMAT).to_string())
}

fn row_to_record(row: &Row) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        stage_id: row.get(1)?,
        project_name: row.get(2)?,
        customer_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        address: row.get(6)?,
        priority: Priority::from_str(&row.get::<_, String>(7)?).unwrap_or_default(),
        budget: row.get(8)?,
        start_date: parse_date(row.get(9)?, 9)?,
        due_date: parse_date(row.get(10)?, 10)?,
        description: row.get(11)?,
        notes: row.get(12)?,
        created_at: from_millis(row.get(13)?),
        updated_at: from_millis(row.get(14)?),
    })
}

/// Pipeline record repository
///
/// Plain storage operations; validation and movement logging live in the
/// pipeline controller, which is the only caller that changes `stage_id`.
pub struct RecordRepo;

impl RecordRepo {
    /// List records, newest first, optionally limited to one stage
    pub fn list(conn: &Connection, stage_id: Option<i64>) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        match stage_id {
            Some(stage_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM pipeline_records WHERE stage_id = ?1
                     ORDER BY created_at DESC, id DESC",
                    RECORD_COLUMNS
                ))?;
                for row in stmt.query_map([stage_id], row_to_record)? {
                    records.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM pipeline_records ORDER BY created_at DESC, id DESC",
                    RECORD_COLUMNS
                ))?;
                for row in stmt.query_map([], row_to_record)? {
                    records.push(row?);
                }
            }
        }
        Ok(records)
    }

    /// Get record by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Record>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pipeline_records WHERE id = ?1",
            RECORD_COLUMNS
        ))?;
        Ok(stmt.query_row([id], row_to_record).optional()?)
    }

    /// Insert a validated record into `stage_id`
    pub fn insert(conn: &Connection, stage_id: i64, data: &NewRecord) -> Result<Record> {
        let now = now_millis();
        let priority = data.priority.unwrap_or_default();

        conn.execute(
            &format!(
                "INSERT INTO pipeline_records ({})
                 VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                RECORD_COLUMNS
            ),
            rusqlite::params![
                stage_id,
                data.project_name,
                data.customer_name,
                data.email,
                data.phone,
                data.address,
                priority.as_str(),
                data.budget,
                format_date(data.start_date),
                format_date(data.due_date),
                data.description,
                data.notes,
                now,
                now
            ],
        )?;

        Ok(Record {
            id: conn.last_insert_rowid(),
            stage_id,
            project_name: data.project_name.clone(),
            customer_name: data.customer_name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            address: data.address.clone(),
            priority,
            budget: data.budget,
            start_date: data.start_date,
            due_date: data.due_date,
            description: data.description.clone(),
            notes: data.notes.clone(),
            created_at: from_millis(now),
            updated_at: from_millis(now),
        })
    }

    /// Persist every mutable attribute of `record` (stage excluded)
    pub fn save_attributes(conn: &Connection, record: &Record) -> Result<bool> {
        let updated = conn.execute(
            "UPDATE pipeline_records SET
                project_name = ?1, customer_name = ?2, email = ?3, phone = ?4, address = ?5,
                priority = ?6, budget = ?7, start_date = ?8, due_date = ?9,
                description = ?10, notes = ?11, updated_at = ?12
             WHERE id = ?13",
            rusqlite::params![
                record.project_name,
                record.customer_name,
                record.email,
                record.phone,
                record.address,
                record.priority.as_str(),
                record.budget,
                format_date(record.start_date),
                format_date(record.due_date),
                record.description,
                record.notes,
                record.updated_at.timestamp_millis(),
                record.id
            ],
        )?;
        Ok(updated > 0)
    }

    /// Point a record at another stage and bump its modification time
    pub fn set_stage(conn: &Connection, id: i64, stage_id: i64, updated_at: i64) -> Result<bool> {
        let updated = conn.execute(
            "UPDATE pipeline_records SET stage_id = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![stage_id, updated_at, id],
        )?;
        Ok(updated > 0)
    }

    /// Delete a record. Returns false when no record has this id.
    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM pipeline_records WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Delete every record in a stage
    pub fn delete_by_stage(conn: &Connection, stage_id: i64) -> Result<usize> {
        Ok(conn.execute("DELETE FROM pipeline_records WHERE stage_id = ?1", [stage_id])?)
    }

    /// Delete all records
    pub fn delete_all(conn: &Connection) -> Result<usize> {
        Ok(conn.execute("DELETE FROM pipeline_records", [])?)
    }

    /// Total number of records
    pub fn count(conn: &Connection) -> Result<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM pipeline_records", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::repo::StageRepo;

    #[test]
    fn test_insert_and_get() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let stage = StageRepo::insert(&conn, "Intake", 1, None).unwrap();

        let mut data = NewRecord::new(stage.id, "Kitchen Renovation", "John Smith");
        data.priority = Some(Priority::High);
        data.budget = Some(15000.0);
        data.due_date = NaiveDate::from_ymd_opt(2026, 2, 1);
        let record = RecordRepo::insert(&conn, stage.id, &data).unwrap();

        let loaded = RecordRepo::get_by_id(&conn, record.id).unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.priority, Priority::High);
        assert_eq!(loaded.due_date, NaiveDate::from_ymd_opt(2026, 2, 1));
    }

    #[test]
    fn test_unreadable_stored_date_is_an_error() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let stage = StageRepo::insert(&conn, "Intake", 1, None).unwrap();
        let record = RecordRepo::insert(&conn, stage.id, &NewRecord::new(stage.id, "Deck", "Ann")).unwrap();
        conn.execute("UPDATE pipeline_records SET due_date = 'soon' WHERE id = ?1", [record.id])
            .unwrap();

        let err = RecordRepo::get_by_id(&conn, record.id).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PipelineError::Database(rusqlite::Error::FromSqlConversionFailure(10, _, _))
        ));
    }

    #[test]
    fn test_insert_requires_existing_stage() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let data = NewRecord::new(42, "Orphan", "Nobody");
        assert!(RecordRepo::insert(&conn, 42, &data).is_err());
    }

    #[test]
    fn test_list_newest_first_and_by_stage() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let a = StageRepo::insert(&conn, "A", 1, None).unwrap();
        let b = StageRepo::insert(&conn, "B", 2, None).unwrap();
        let first = RecordRepo::insert(&conn, a.id, &NewRecord::new(a.id, "First", "C1")).unwrap();
        let second = RecordRepo::insert(&conn, a.id, &NewRecord::new(a.id, "Second", "C2")).unwrap();
        let third = RecordRepo::insert(&conn, b.id, &NewRecord::new(b.id, "Third", "C3")).unwrap();

        let all: Vec<i64> = RecordRepo::list(&conn, None).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(all, vec![third.id, second.id, first.id]);

        let in_a: Vec<i64> = RecordRepo::list(&conn, Some(a.id)).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(in_a, vec![second.id, first.id]);
        assert!(RecordRepo::list(&conn, Some(999)).unwrap().is_empty());
    }

    #[test]
    fn test_set_stage_and_delete() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let a = StageRepo::insert(&conn, "A", 1, None).unwrap();
        let b = StageRepo::insert(&conn, "B", 2, None).unwrap();
        let record = RecordRepo::insert(&conn, a.id, &NewRecord::new(a.id, "Roof", "Mike")).unwrap();

        assert!(RecordRepo::set_stage(&conn, record.id, b.id, now_millis()).unwrap());
        assert_eq!(RecordRepo::get_by_id(&conn, record.id).unwrap().unwrap().stage_id, b.id);
        assert_eq!(StageRepo::count_records(&conn, b.id).unwrap(), 1);

        assert!(RecordRepo::delete(&conn, record.id).unwrap());
        assert!(RecordRepo::get_by_id(&conn, record.id).unwrap().is_none());
        assert_eq!(RecordRepo::count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_stage_with_records_cannot_be_dropped_directly() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let a = StageRepo::insert(&conn, "A", 1, None).unwrap();
        RecordRepo::insert(&conn, a.id, &NewRecord::new(a.id, "Roof", "Mike")).unwrap();

        // Foreign key keeps the record from pointing at a missing stage
        assert!(StageRepo::delete(&conn, a.id).is_err());
    }
}
