use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use rusqlite::Connection;

use crate::error::StoreResult;

/// Schema for the single `students` table. The CHECK constraints repeat the
/// validator's hard limits so a bad row cannot slip in through another path.
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS students (
        roll TEXT PRIMARY KEY NOT NULL CHECK (length(roll) BETWEEN 1 AND 12),
        name TEXT NOT NULL CHECK (length(trim(name)) > 0),
        course TEXT NOT NULL CHECK (length(trim(course)) > 0),
        marks INTEGER NOT NULL CHECK (marks BETWEEN 0 AND 100),
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_students_name ON students (name COLLATE NOCASE);
";

/// Owner of the student database. One instance holds the only connection to
/// the file for as long as the app runs; [`StudentStore::close`] releases it.
pub struct StudentStore {
    pub(super) conn: Connection,
    pub(super) path: Option<PathBuf>,
}

impl StudentStore {
    /// Open (creating if needed) the database file at `path` and make sure the
    /// schema exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self::init(conn, Some(path.to_path_buf()))?;
        info!("opened student database at {}", path.display());
        Ok(store)
    }

    /// A throwaway store that lives only as long as the value.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, path })
    }

    /// Location of the database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the connection, reporting anything SQLite could not flush.
    pub fn close(self) -> StoreResult<()> {
        let path = self.path;
        self.conn.close().map_err(|(_, err)| err)?;
        if let Some(path) = path {
            info!("closed student database at {}", path.display());
        }
        Ok(())
    }
}
