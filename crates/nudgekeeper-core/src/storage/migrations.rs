//! Database schema migrations for nudgekeeper.
//!
//! Migrations are versioned and applied automatically when opening the
//! database. The `schema_version` table tracks the current version.

use rusqlite::{Connection, Result as SqliteResult};

/// Apply all pending migrations.
///
/// # Errors
/// Returns an error if a migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Create the schema_version table if it doesn't exist.
fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version, 0 for a fresh database.
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or(0)
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: baseline schema.
///
/// The base tables are created by `Database::migrate()` directly, so this
/// only records the version.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    set_schema_version(conn, 1)?;
    Ok(())
}

/// Migration v2: recurrence chain linkage.
///
/// Adds `parent_id` to commitments so a spawned occurrence records which
/// instance spawned it.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let has_column: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info('commitments') WHERE name = 'parent_id'",
        [],
        |row| row.get(0),
    )?;
    if has_column == 0 {
        conn.execute("ALTER TABLE commitments ADD COLUMN parent_id TEXT", [])?;
    }
    set_schema_version(conn, 2)?;
    Ok(())
}
