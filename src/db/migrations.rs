use rusqlite::{Connection, Result};
use std::collections::HashMap;

/// Current database schema version
const CURRENT_VERSION: u32 = 2;

/// Migration system for managing database schema versions
pub struct MigrationManager;

impl MigrationManager {
    /// Initialize the database with the current schema
    /// This creates the schema_version table and applies all pending migrations
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        let current_version = Self::get_version(conn)?;

        for version in (current_version + 1)..=CURRENT_VERSION {
            Self::apply_migration(conn, version)?;
            log::debug!("Applied schema migration v{}", version);
        }

        Ok(())
    }

    /// Apply a specific migration by version number
    fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
        let migrations = get_migrations();
        if let Some(migration) = migrations.get(&version) {
            // Execute migration in a transaction
            let tx = conn.unchecked_transaction()?;
            migration(&tx)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
            tx.commit()?;
            Ok(())
        } else {
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
                Some(format!("No migration found for version {}", version)),
            ))
        }
    }

    /// Get the current schema version
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

/// Get all migrations indexed by version
fn get_migrations() -> HashMap<u32, fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>> {
    let mut migrations: HashMap<u32, fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>> = HashMap::new();
    migrations.insert(1, migration_v1);
    migrations.insert(2, migration_v2);
    migrations
}

/// Migration v1: stages, records and the movement log
fn migration_v1(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "CREATE TABLE stages (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            position INTEGER NOT NULL UNIQUE CHECK(position != 0),
            description TEXT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;
    // Note: position is negated temporarily while renumbering; committed rows are always > 0.

    tx.execute(
        "CREATE TABLE pipeline_records (
            id INTEGER PRIMARY KEY,
            stage_id INTEGER NOT NULL REFERENCES stages(id),
            project_name TEXT NOT NULL,
            customer_name TEXT NOT NULL,
            email TEXT NULL,
            phone TEXT NULL,
            address TEXT NULL,
            priority TEXT NOT NULL DEFAULT 'medium' CHECK(priority IN ('low','medium','high')),
            budget REAL NULL,
            start_date TEXT NULL,
            due_date TEXT NULL,
            description TEXT NULL,
            notes TEXT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    // No foreign keys here: movements outlive the records and stages they mention.
    tx.execute(
        "CREATE TABLE pipeline_movements (
            id INTEGER PRIMARY KEY,
            record_id INTEGER NOT NULL,
            project_name TEXT NOT NULL,
            from_stage_id INTEGER NULL,
            from_stage_name TEXT NULL,
            to_stage_id INTEGER NOT NULL,
            to_stage_name TEXT NOT NULL,
            moved_by TEXT NOT NULL,
            moved_at INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Migration v2: lookup indexes
fn migration_v2(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "CREATE INDEX idx_pipeline_records_stage_id ON pipeline_records(stage_id)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_pipeline_records_created_at ON pipeline_records(created_at)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_pipeline_movements_record_id ON pipeline_movements(record_id)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_pipeline_movements_moved_at ON pipeline_movements(moved_at)",
        [],
    )?;
    Ok(())
}
