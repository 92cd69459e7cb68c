use std::path::PathBuf;

use anyhow::{anyhow, Result};
use directories::BaseDirs;

use crate::ui::Theme;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".student-records";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "students.sqlite";
const LOG_FILE_NAME: &str = "student-records.log";
const BACKUP_DIR_NAME: &str = "backups";
const EXPORT_FILE_NAME: &str = "students.json";
const CSV_FILE_NAME: &str = "students.csv";

/// Rows per page in the student list.
pub const DEFAULT_PAGE_SIZE: usize = 50;
/// Page sizes the student list cycles through at runtime.
pub const PAGE_SIZES: [usize; 4] = [10, 25, 50, 100];

/// Where everything lives on disk plus the initial UI settings. All values
/// are compiled-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub backup_dir: PathBuf,
    /// Target of JSON exports and source of JSON imports.
    pub export_path: PathBuf,
    /// Same for CSV.
    pub csv_path: PathBuf,
    pub page_size: usize,
    pub theme: Theme,
}

impl Config {
    /// Default layout rooted at `~/.student-records`.
    pub fn resolve() -> Result<Self> {
        let base_dirs =
            BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
        Ok(Self::in_dir(base_dirs.home_dir().join(DATA_DIR_NAME)))
    }

    /// Same layout rooted somewhere else.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            db_path: data_dir.join(DB_FILE_NAME),
            log_path: data_dir.join(LOG_FILE_NAME),
            backup_dir: data_dir.join(BACKUP_DIR_NAME),
            export_path: data_dir.join(EXPORT_FILE_NAME),
            csv_path: data_dir.join(CSV_FILE_NAME),
            page_size: DEFAULT_PAGE_SIZE,
            theme: Theme::default(),
            data_dir,
        }
    }
}
