// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed conversation store.
//!
//! One connection guarded by a mutex: the store is the single
//! linearization point for writes, which is what keeps conversation
//! sequence numbers dense under concurrent writers.

use crate::codec;
use crate::error::StoreError;
use crate::migration::{self, MigrationError, MigrationRegistry, LATEST_VERSION};
use crate::schema;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable store for sessions, conversation events, approvals and
/// per-session records. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at `path`, applying pending migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        // WAL lets readers proceed while the writer holds the lock
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "opened store");
        Self::bootstrap(conn)
    }

    /// Embedded in-memory store for tests and ephemeral runs
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(mut conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(schema::VERSION_TABLE)?;

        let applied_at = codec::ts(&Utc::now());
        let current = current_version(&conn)?;
        if current == 0 && !migration::table_exists(&conn, "sessions")? {
            // Fresh database: latest layout directly, no incremental steps
            let tx = conn.transaction()?;
            tx.execute_batch(schema::SCHEMA_LATEST)?;
            tx.execute(
                "INSERT INTO schema_version (version, description, applied_at) VALUES (?1, ?2, ?3)",
                params![LATEST_VERSION, "initial schema", applied_at],
            )?;
            tx.commit()?;
        } else {
            // Unversioned databases predate the version table: treat as v1
            let from = current.max(1);
            if from > LATEST_VERSION {
                return Err(MigrationError::TooNew(from, LATEST_VERSION).into());
            }
            MigrationRegistry::new().migrate_to(&mut conn, from, LATEST_VERSION, &applied_at)?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Highest applied schema version
    pub fn schema_version(&self) -> Result<u32, StoreError> {
        let conn = self.conn.lock();
        current_version(&conn)
    }

    /// Run `f` with exclusive access to the connection.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }
}

fn current_version(conn: &Connection) -> Result<u32, StoreError> {
    let version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
