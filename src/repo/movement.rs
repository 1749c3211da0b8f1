use rusqlite::{Connection, Row};
use crate::error::Result;
use crate::models::{Movement, MovementFilter};
use crate::utils::date::{from_millis, now_millis};

const MOVEMENT_COLUMNS: &str = "id, record_id, project_name, from_stage_id, from_stage_name, \
     to_stage_id, to_stage_name, moved_by, moved_at";

fn row_to_movement(row: &Row) -> rusqlite::Result<Movement> {
    Ok(Movement {
        id: row.get(0)?,
        record_id: row.get(1)?,
        project_name: row.get(2)?,
        from_stage_id: row.get(3)?,
        from_stage_name: row.get(4)?,
        to_stage_id: row.get(5)?,
        to_stage_name: row.get(6)?,
        moved_by: row.get(7)?,
        moved_at: from_millis(row.get(8)?),
    })
}

/// Movement log repository (append-only)
///
/// There is deliberately no update or single-entry delete.
pub struct MovementRepo;

impl MovementRepo {
    /// Append a movement stamped with the current time
    pub fn append(
        conn: &Connection,
        record_id: i64,
        project_name: &str,
        from: Option<(i64, &str)>,
        to: (i64, &str),
        moved_by: &str,
    ) -> Result<Movement> {
        Self::append_at(conn, record_id, project_name, from, to, moved_by, now_millis())
    }

    /// Append a movement with an explicit timestamp (UTC millis)
    pub fn append_at(
        conn: &Connection,
        record_id: i64,
        project_name: &str,
        from: Option<(i64, &str)>,
        to: (i64, &str),
        moved_by: &str,
        moved_at: i64,
    ) -> Result<Movement> {
        let (from_stage_id, from_stage_name) = match from {
            Some((id, name)) => (Some(id), Some(name.to_string())),
            None => (None, None),
        };

        conn.execute(
            &format!(
                "INSERT INTO pipeline_movements ({})
                 VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                MOVEMENT_COLUMNS
            ),
            rusqlite::params![
                record_id,
                project_name,
                from_stage_id,
                from_stage_name,
                to.0,
                to.1,
                moved_by,
                moved_at
            ],
        )?;

        Ok(Movement {
            id: conn.last_insert_rowid(),
            record_id,
            project_name: project_name.to_string(),
            from_stage_id,
            from_stage_name,
            to_stage_id: to.0,
            to_stage_name: to.1.to_string(),
            moved_by: moved_by.to_string(),
            moved_at: from_millis(moved_at),
        })
    }

    /// List movements newest first, optionally for one record and/or capped
    pub fn list(conn: &Connection, filter: &MovementFilter) -> Result<Vec<Movement>> {
        // SQLite treats a negative LIMIT as "no limit"
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);

        let mut movements = Vec::new();
        match filter.record_id {
            Some(record_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM pipeline_movements WHERE record_id = ?1
                     ORDER BY moved_at DESC, id DESC LIMIT ?2",
                    MOVEMENT_COLUMNS
                ))?;
                for row in stmt.query_map(rusqlite::params![record_id, limit], row_to_movement)? {
                    movements.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM pipeline_movements ORDER BY moved_at DESC, id DESC LIMIT ?1",
                    MOVEMENT_COLUMNS
                ))?;
                for row in stmt.query_map([limit], row_to_movement)? {
                    movements.push(row?);
                }
            }
        }
        Ok(movements)
    }

    /// Number of movements, optionally for one record
    pub fn count(conn: &Connection, record_id: Option<i64>) -> Result<i64> {
        let count = match record_id {
            Some(id) => conn.query_row(
                "SELECT COUNT(*) FROM pipeline_movements WHERE record_id = ?1",
                [id],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM pipeline_movements", [], |row| row.get(0))?,
        };
        Ok(count)
    }

    /// Clear the whole log (pipeline reset only)
    pub fn delete_all(conn: &Connection) -> Result<usize> {
        Ok(conn.execute("DELETE FROM pipeline_movements", [])?)
    }
}
