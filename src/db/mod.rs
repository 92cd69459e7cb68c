//! Persistence layer around the embedded SQLite database, split across
//! logical submodules that each add methods to [`StudentStore`].

mod backup;
mod connection;
mod stats;
mod students;
mod transfer;

pub use backup::latest_backup;
pub use connection::StudentStore;
