use rusqlite::{Connection, OptionalExtension, Row};
use crate::error::Result;
use crate::models::Stage;
use crate::utils::date::{from_millis, now_millis};

const STAGE_COLUMNS: &str = "id, name, position, description, created_at, updated_at";

/// Parking slot used while a stage is moved onto an occupied position
const PARKED_POSITION: i64 = i64::MIN;

fn row_to_stage(row: &Row) -> rusqlite::Result<Stage> {
    Ok(Stage {
        id: row.get(0)?,
        name: row.get(1)?,
        position: row.get(2)?,
        description: row.get(3)?,
        created_at: from_millis(row.get(4)?),
        updated_at: from_millis(row.get(5)?),
    })
}

/// Stage repository
///
/// Owns position assignment. Positions are unique (enforced by the schema), so
/// every renumbering goes through negated positions first and flips them back
/// in one statement; no intermediate write can collide with a committed position.
///
/// Callers wanting all-or-nothing semantics pass a transaction as `conn`.
pub struct StageRepo;

impl StageRepo {
    /// List all stages ordered by position (id breaks ties)
    pub fn list_all(conn: &Connection) -> Result<Vec<Stage>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM stages ORDER BY position, id",
            STAGE_COLUMNS
        ))?;
        let rows = stmt.query_map([], row_to_stage)?;

        let mut stages = Vec::new();
        for row in rows {
            stages.push(row?);
        }
        Ok(stages)
    }

    /// Get stage by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Stage>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM stages WHERE id = ?1",
            STAGE_COLUMNS
        ))?;
        Ok(stmt.query_row([id], row_to_stage).optional()?)
    }

    /// Highest assigned position, 0 when there are no stages
    pub fn max_position(conn: &Connection) -> Result<i64> {
        Ok(conn.query_row(
            "SELECT COALESCE(MAX(position), 0) FROM stages",
            [],
            |row| row.get(0),
        )?)
    }

    /// ID of the stage currently holding `position`, if any
    pub fn id_at_position(conn: &Connection, position: i64) -> Result<Option<i64>> {
        Ok(conn.query_row(
            "SELECT id FROM stages WHERE position = ?1",
            [position],
            |row| row.get(0),
        ).optional()?)
    }

    /// Shift every stage at or after `position` up by one
    pub fn shift_from(conn: &Connection, position: i64) -> Result<()> {
        conn.execute(
            "UPDATE stages SET position = -(position + 1) WHERE position >= ?1",
            [position],
        )?;
        conn.execute(
            "UPDATE stages SET position = -position WHERE position < 0 AND position != ?1",
            [PARKED_POSITION],
        )?;
        Ok(())
    }

    /// Insert a stage at an explicit position (caller ensures the slot is free)
    pub fn insert(conn: &Connection, name: &str, position: i64, description: Option<&str>) -> Result<Stage> {
        let now = now_millis();
        conn.execute(
            "INSERT INTO stages (name, position, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![name, position, description, now, now],
        )?;

        Ok(Stage {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            position,
            description: description.map(|d| d.to_string()),
            created_at: from_millis(now),
            updated_at: from_millis(now),
        })
    }

    /// Update stage fields. Returns false when no stage has this id.
    ///
    /// A position already held by another stage pushes that stage and its
    /// successors down by one.
    pub fn update(
        conn: &Connection,
        id: i64,
        name: Option<&str>,
        position: Option<i64>,
        description: Option<Option<&str>>,
    ) -> Result<bool> {
        if let Some(position) = position {
            match Self::id_at_position(conn, position)? {
                Some(holder) if holder != id => {
                    conn.execute(
                        "UPDATE stages SET position = ?1 WHERE id = ?2",
                        rusqlite::params![PARKED_POSITION, id],
                    )?;
                    Self::shift_from(conn, position)?;
                }
                _ => {}
            }
        }

        // Build dynamic update
        let mut sets = vec!["updated_at = ?"];
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now_millis())];

        if let Some(n) = name {
            sets.push("name = ?");
            params.push(Box::new(n.to_string()));
        }
        if let Some(p) = position {
            sets.push("position = ?");
            params.push(Box::new(p));
        }
        if let Some(d) = description {
            sets.push("description = ?");
            params.push(Box::new(d.map(|s| s.to_string())));
        }

        // Number the parameters
        let numbered_sets: Vec<String> = sets
            .iter()
            .enumerate()
            .map(|(i, set)| set.replace('?', &format!("?{}", i + 1)))
            .collect();
        let sql = format!(
            "UPDATE stages SET {} WHERE id = ?{}",
            numbered_sets.join(", "),
            params.len() + 1
        );
        params.push(Box::new(id));

        let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let updated = conn.execute(&sql, param_refs.as_slice())?;
        Ok(updated > 0)
    }

    /// Assign position = index + 1 following `ordered_ids`.
    ///
    /// The caller supplies every stage id exactly once.
    pub fn set_order(conn: &Connection, ordered_ids: &[i64]) -> Result<()> {
        let now = now_millis();
        for (index, id) in ordered_ids.iter().enumerate() {
            conn.execute(
                "UPDATE stages SET position = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![-(index as i64 + 1), now, id],
            )?;
        }
        conn.execute("UPDATE stages SET position = -position WHERE position < 0", [])?;
        Ok(())
    }

    /// Number of records assigned to a stage
    pub fn count_records(conn: &Connection, stage_id: i64) -> Result<i64> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM pipeline_records WHERE stage_id = ?1",
            [stage_id],
            |row| row.get(0),
        )?)
    }

    /// Delete a stage row. Returns false when no stage has this id.
    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM stages WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Delete all stages (records must be gone first)
    pub fn delete_all(conn: &Connection) -> Result<usize> {
        Ok(conn.execute("DELETE FROM stages", [])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;

    fn positions(conn: &Connection) -> Vec<(String, i64)> {
        StageRepo::list_all(conn)
            .unwrap()
            .into_iter()
            .map(|s| (s.name, s.position))
            .collect()
    }

    #[test]
    fn test_insert_and_list_ordered() {
        let conn = DbConnection::connect_in_memory().unwrap();
        StageRepo::insert(&conn, "Second", 2, None).unwrap();
        StageRepo::insert(&conn, "First", 1, Some("intake")).unwrap();

        let stages = StageRepo::list_all(&conn).unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].name, "First");
        assert_eq!(stages[0].description.as_deref(), Some("intake"));
        assert_eq!(stages[1].name, "Second");
        assert_eq!(StageRepo::max_position(&conn).unwrap(), 2);
    }

    #[test]
    fn test_shift_from_keeps_positions_unique() {
        let conn = DbConnection::connect_in_memory().unwrap();
        StageRepo::insert(&conn, "A", 1, None).unwrap();
        StageRepo::insert(&conn, "B", 2, None).unwrap();
        StageRepo::insert(&conn, "C", 3, None).unwrap();

        StageRepo::shift_from(&conn, 2).unwrap();
        assert_eq!(positions(&conn), vec![("A".into(), 1), ("B".into(), 3), ("C".into(), 4)]);
    }

    #[test]
    fn test_update_onto_occupied_position() {
        let conn = DbConnection::connect_in_memory().unwrap();
        StageRepo::insert(&conn, "A", 1, None).unwrap();
        StageRepo::insert(&conn, "B", 2, None).unwrap();
        let c = StageRepo::insert(&conn, "C", 3, None).unwrap();

        assert!(StageRepo::update(&conn, c.id, None, Some(1), None).unwrap());
        assert_eq!(positions(&conn), vec![("C".into(), 1), ("A".into(), 2), ("B".into(), 3)]);
    }

    #[test]
    fn test_update_fields_and_clear_description() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let stage = StageRepo::insert(&conn, "Bidding", 1, Some("draft")).unwrap();

        StageRepo::update(&conn, stage.id, Some("Quoting"), None, Some(None)).unwrap();
        let updated = StageRepo::get_by_id(&conn, stage.id).unwrap().unwrap();
        assert_eq!(updated.name, "Quoting");
        assert_eq!(updated.description, None);
        assert_eq!(updated.position, 1);

        assert!(!StageRepo::update(&conn, 999, Some("x"), None, None).unwrap());
    }

    #[test]
    fn test_set_order() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let a = StageRepo::insert(&conn, "A", 1, None).unwrap();
        let b = StageRepo::insert(&conn, "B", 2, None).unwrap();
        let c = StageRepo::insert(&conn, "C", 3, None).unwrap();

        StageRepo::set_order(&conn, &[c.id, a.id, b.id]).unwrap();
        assert_eq!(positions(&conn), vec![("C".into(), 1), ("A".into(), 2), ("B".into(), 3)]);
    }

    #[test]
    fn test_delete() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let a = StageRepo::insert(&conn, "A", 1, None).unwrap();
        assert!(StageRepo::delete(&conn, a.id).unwrap());
        assert!(!StageRepo::delete(&conn, a.id).unwrap());
        assert!(StageRepo::list_all(&conn).unwrap().is_empty());
    }
}
