// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema migration system.
//!
//! Each migration upgrades the database from one version to the next. The
//! registry chains them to reach [`LATEST_VERSION`]. Migrations must be
//! idempotent: re-applying one to an already-upgraded database is a no-op.

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use thiserror::Error;

/// Schema version stamped on fresh databases
pub const LATEST_VERSION: u32 = 5;

/// Errors that can occur during migration
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration v{from}→v{to} failed: {reason}")]
    Failed { from: u32, to: u32, reason: String },
    #[error("no migration path from v{0} to v{1}")]
    NoPath(u32, u32),
    #[error("schema version {0} is newer than supported ({1})")]
    TooNew(u32, u32),
}

/// A migration from one schema version to the next.
pub trait Migration: Send + Sync {
    fn source_version(&self) -> u32;
    fn target_version(&self) -> u32;
    fn description(&self) -> &'static str;
    fn migrate(&self, tx: &Transaction<'_>) -> rusqlite::Result<()>;
}

/// Column additions plus idempotent DDL.
///
/// `ALTER TABLE ... ADD COLUMN` is not idempotent in SQLite, so columns are
/// only added when `PRAGMA table_info` does not list them yet.
struct SchemaStep {
    from: u32,
    description: &'static str,
    /// (table, column, declaration)
    columns: &'static [(&'static str, &'static str, &'static str)],
    ddl: &'static str,
}

impl Migration for SchemaStep {
    fn source_version(&self) -> u32 {
        self.from
    }

    fn target_version(&self) -> u32 {
        self.from + 1
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn migrate(&self, tx: &Transaction<'_>) -> rusqlite::Result<()> {
        for (table, column, decl) in self.columns {
            if !column_exists(tx, table, column)? {
                tx.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl};"))?;
            }
        }
        if !self.ddl.is_empty() {
            tx.execute_batch(self.ddl)?;
        }
        Ok(())
    }
}

pub(crate) fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

/// Registry of migrations for upgrading databases.
pub struct MigrationRegistry {
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRegistry {
    /// Create a new registry with all known migrations.
    pub fn new() -> Self {
        Self {
            migrations: vec![
                Box::new(SchemaStep {
                    from: 1,
                    description: "session titles and file snapshots",
                    columns: &[("sessions", "title", "TEXT NOT NULL DEFAULT ''")],
                    ddl: "
                        CREATE TABLE IF NOT EXISTS file_snapshots (
                            id INTEGER PRIMARY KEY AUTOINCREMENT,
                            tool_id TEXT NOT NULL,
                            session_id TEXT NOT NULL,
                            file_path TEXT NOT NULL,
                            content TEXT NOT NULL,
                            created_at TEXT NOT NULL
                        );
                        CREATE INDEX IF NOT EXISTS idx_file_snapshots_session
                            ON file_snapshots(session_id);
                    ",
                }),
                Box::new(SchemaStep {
                    from: 2,
                    description: "dangerous permission elevation",
                    columns: &[
                        (
                            "sessions",
                            "dangerously_skip_permissions",
                            "INTEGER NOT NULL DEFAULT 0",
                        ),
                        ("sessions", "dangerously_skip_permissions_expires_at", "TEXT"),
                    ],
                    ddl: "
                        CREATE INDEX IF NOT EXISTS idx_sessions_dangerous
                            ON sessions(dangerously_skip_permissions,
                                        dangerously_skip_permissions_expires_at);
                    ",
                }),
                Box::new(SchemaStep {
                    from: 3,
                    description: "provider tag and http mcp servers",
                    columns: &[
                        ("sessions", "provider", "TEXT NOT NULL DEFAULT 'claude'"),
                        ("mcp_servers", "url", "TEXT"),
                        ("mcp_servers", "headers", "TEXT NOT NULL DEFAULT '{}'"),
                    ],
                    ddl: "",
                }),
                Box::new(SchemaStep {
                    from: 4,
                    description: "raw event log",
                    columns: &[],
                    ddl: "
                        CREATE TABLE IF NOT EXISTS raw_events (
                            id INTEGER PRIMARY KEY AUTOINCREMENT,
                            session_id TEXT NOT NULL,
                            event_json TEXT NOT NULL,
                            created_at TEXT NOT NULL
                        );
                        CREATE INDEX IF NOT EXISTS idx_raw_events_session
                            ON raw_events(session_id);
                    ",
                }),
            ],
        }
    }

    /// Upgrade the database from `current` to `target`, recording each
    /// applied version. Runs in a single transaction.
    pub fn migrate_to(
        &self,
        conn: &mut Connection,
        current: u32,
        target: u32,
        applied_at: &str,
    ) -> Result<u32, MigrationError> {
        if current == target {
            return Ok(current);
        }
        if current > target {
            return Err(MigrationError::TooNew(current, target));
        }

        let failed = |from: u32, to: u32| {
            move |e: rusqlite::Error| MigrationError::Failed {
                from,
                to,
                reason: e.to_string(),
            }
        };

        let tx = conn.transaction().map_err(failed(current, target))?;
        let mut version = current;
        while version < target {
            let migration = self
                .migrations
                .iter()
                .find(|m| m.source_version() == version)
                .ok_or(MigrationError::NoPath(version, target))?;

            let to = migration.target_version();
            migration.migrate(&tx).map_err(failed(version, to))?;
            tx.execute(
                "INSERT OR REPLACE INTO schema_version (version, description, applied_at)
                 VALUES (?1, ?2, ?3)",
                params![to, migration.description(), applied_at],
            )
            .map_err(failed(version, to))?;
            tracing::info!(from = version, to, "applied schema migration");
            version = to;
        }
        tx.commit().map_err(failed(current, target))?;
        Ok(version)
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
