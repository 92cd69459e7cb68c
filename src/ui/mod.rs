//! Ratatui front-end: the student list plus dashboard and file screens.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;
mod theme;

pub use app::App;
pub use terminal::run_app;
pub use theme::Theme;
