use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;
use rusqlite::{Connection, OpenFlags};

use crate::error::{StoreError, StoreResult};

use super::StudentStore;

const BACKUP_PREFIX: &str = "backup_";
const BACKUP_EXTENSION: &str = "db";

impl StudentStore {
    /// Write a consistent copy of the database into `dir` as
    /// `backup_YYYYMMDD_HHMMSS.db` and return its path.
    pub fn backup_to(&self, dir: impl AsRef<Path>) -> StoreResult<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut target = dir.join(format!("{BACKUP_PREFIX}{stamp}.{BACKUP_EXTENSION}"));
        let mut attempt = 1;
        // VACUUM INTO refuses to overwrite, so two backups in the same second
        // get a suffix.
        while target.exists() {
            target = dir.join(format!(
                "{BACKUP_PREFIX}{stamp}_{attempt:03}.{BACKUP_EXTENSION}"
            ));
            attempt += 1;
        }

        let target_str = target
            .to_str()
            .ok_or(StoreError::Unsupported("backup path is not valid UTF-8"))?;
        self.conn.execute("VACUUM INTO ?1", [target_str])?;

        info!("backed up student database to {}", target.display());
        Ok(target)
    }

    /// Replace the database file with `backup` and reopen it. The backup is
    /// checked first; if copying fails the original file is reopened and the
    /// error returned.
    pub fn restore_from(&mut self, backup: impl AsRef<Path>) -> StoreResult<()> {
        self.restore_with(backup.as_ref(), |from, to| fs::copy(from, to))
    }

    fn restore_with(
        &mut self,
        backup: &Path,
        copy: impl FnOnce(&Path, &Path) -> io::Result<u64>,
    ) -> StoreResult<()> {
        let target = self
            .path
            .clone()
            .ok_or(StoreError::Unsupported("an in-memory database cannot be restored"))?;

        verify_backup(backup)?;
        if fs::canonicalize(backup)? == fs::canonicalize(&target)? {
            return Err(StoreError::Unsupported(
                "cannot restore the database onto itself",
            ));
        }

        let current = mem::replace(&mut self.conn, Connection::open_in_memory()?);
        let copied = current
            .close()
            .map_err(|(_, err)| StoreError::from(err))
            .and_then(|()| copy(backup, &target).map_err(StoreError::from));

        // Either the restored copy or the untouched original.
        *self = Self::open(&target)?;
        copied?;

        info!("restored student database from {}", backup.display());
        Ok(())
    }
}

/// Most recent `backup_*.db` file in `dir`, if any. Backups are ordered by
/// their timestamp, then by the same-second suffix.
pub fn latest_backup(dir: impl AsRef<Path>) -> StoreResult<Option<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<((String, u32), PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != BACKUP_EXTENSION) {
            continue;
        }
        let Some(key) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(backup_order)
        else {
            continue;
        };
        if latest.as_ref().map_or(true, |(current, _)| key > *current) {
            latest = Some((key, path));
        }
    }
    Ok(latest.map(|(_, path)| path))
}

/// Sort key for a backup file stem: the timestamp and the numeric suffix
/// added when several backups land in the same second.
fn backup_order(stem: &str) -> Option<(String, u32)> {
    let rest = stem.strip_prefix(BACKUP_PREFIX)?;
    match rest.rsplit_once('_') {
        Some((stamp, suffix))
            if stamp.contains('_')
                && !suffix.is_empty()
                && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            Some((stamp.to_string(), suffix.parse().unwrap_or(u32::MAX)))
        }
        _ => Some((rest.to_string(), 0)),
    }
}

/// Make sure `path` is a readable SQLite file with a usable `students` table.
fn verify_backup(path: &Path) -> StoreResult<()> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.prepare("SELECT roll, name, course, marks, created_at FROM students LIMIT 1")?;
    Ok(())
}
