// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All access goes through tokio-rusqlite's single background thread. Do NOT
//! create additional Connection instances for writes.

use std::path::Path;
use std::time::Duration;

use fairway_core::FairwayError;
use tracing::debug;

use crate::migrations;

/// Convert a tokio-rusqlite error into FairwayError::Storage.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> FairwayError {
    FairwayError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the SQLite database behind the request store.
///
/// Cheap to clone; all clones share the same background connection thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if necessary) the database at `path`, apply PRAGMAs,
    /// and run any pending migrations.
    pub async fn open(path: &str) -> Result<Self, FairwayError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| FairwayError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_tr_err)?;

        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            migrations::run_migrations(conn)
                .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// The shared tokio-rusqlite connection.
    pub fn connection(&self) -> tokio_rusqlite::Connection {
        self.conn.clone()
    }

    /// Close the database, flushing pending writes.
    pub async fn close(self) -> Result<(), FairwayError> {
        self.conn
            .close()
            .await
            .map_err(|e| FairwayError::Storage {
                source: Box::new(e),
            })
    }
}
