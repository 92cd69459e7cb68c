//! Student records: input validation, SQLite-backed storage, undo history and
//! the terminal UI that drives them.
//!
//! The library half (`validate`, `db`, `history`) knows nothing about the
//! terminal and can be used on its own.
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod logging;
pub mod models;
pub mod ui;
pub mod validate;

pub use config::Config;
pub use db::{latest_backup, StudentStore};
pub use error::{StoreError, StoreResult};
pub use history::{Change, History};
pub use models::{ImportSummary, Page, Stats, Student, StudentChanges, StudentDraft};
pub use ui::{run_app, App};
pub use validate::{validate, Field, RawStudent, ValidationErrors};
