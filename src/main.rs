//! Binary entry point: resolve the data directory, start logging, open the
//! database and hand everything to the TUI.
use anyhow::Context;
use log::info;
use student_records::{logging, run_app, App, Config, StudentStore};

fn main() -> anyhow::Result<()> {
    let config = Config::resolve()?;
    logging::init(&config.log_path)?;
    info!("starting with data directory {}", config.data_dir.display());

    let store = StudentStore::open(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;

    let mut app = App::new(store, config)?;
    let result = run_app(&mut app);
    let closed = app
        .into_store()
        .close()
        .context("failed to close the database");

    result.and(closed)
}
