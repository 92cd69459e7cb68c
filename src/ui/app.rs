use std::mem;
use std::path::Path;

use anyhow::{Context, Error, Result};
use crossterm::event::KeyCode;
use log::{error, info};
use open::that as open_path;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    BarChart, Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table,
    TableState, Wrap,
};
use ratatui::Frame;

use crate::config::Config;
use crate::db::{latest_backup, StudentStore};
use crate::error::{StoreError, StoreResult};
use crate::history::{Change, History};
use crate::models::{Student, StudentChanges, StudentDraft};
use crate::validate::Field;

use super::forms::{ConfirmDelete, ConfirmRestore, StudentForm};
use super::helpers::{
    centered_rect, course_bars, format_average, histogram_bars, surface_error,
};
use super::screens::{DashboardScreen, FileAction, FilesScreen, StudentListScreen};
use super::theme::{Palette, Theme};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// Top-level views. The student list is always loaded; the other two are
/// built when opened so they show fresh data.
enum Screen {
    Students,
    Dashboard(DashboardScreen),
    Files(FilesScreen),
}

/// Fine-grained modes scoped to the current screen.
enum Mode {
    Normal,
    Adding(StudentForm),
    Editing { original: Student, form: StudentForm },
    ConfirmDelete(ConfirmDelete),
    ConfirmRestore(ConfirmRestore),
    Searching(String),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self, palette: &Palette) -> Style {
        match self {
            StatusKind::Info => palette.success(),
            StatusKind::Error => palette.error(),
        }
    }
}

/// Result of feeding one key to an open form.
enum FormOutcome {
    Editing,
    Invalid,
    Cancelled,
    Submitted(StudentDraft),
}

/// Central application state shared across the TUI.
pub struct App {
    store: StudentStore,
    config: Config,
    history: History,
    theme: Theme,
    list: StudentListScreen,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(store: StudentStore, config: Config) -> Result<Self> {
        let list = StudentListScreen::load(&store, config.page_size)
            .context("failed to load students")?;
        Ok(Self {
            store,
            theme: config.theme,
            config,
            history: History::new(),
            list,
            screen: Screen::Students,
            mode: Mode::Normal,
            status: None,
        })
    }

    /// Give the store back so the caller can close it cleanly.
    pub fn into_store(self) -> StudentStore {
        self.store
    }

    /// Process one key press and report whether the app should exit. A
    /// failing handler drops back to normal mode with the error in the footer.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        let next = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::Adding(form) => self.handle_add(code, form),
            Mode::Editing { original, form } => self.handle_edit(code, original, form),
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm),
            Mode::ConfirmRestore(confirm) => self.handle_confirm_restore(code, confirm),
            Mode::Searching(query) => self.handle_search(code, query),
        };

        self.mode = match next {
            Ok(mode) => mode,
            Err(err) => {
                self.report_error(&err);
                Mode::Normal
            }
        };
        exit
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match self.screen {
            Screen::Students => self.handle_students_key(code, exit),
            Screen::Dashboard(_) => {
                match code {
                    KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('d') => {
                        self.screen = Screen::Students;
                    }
                    KeyCode::Char('r') => {
                        self.screen = Screen::Dashboard(DashboardScreen::load(&self.store)?);
                        self.set_status("Dashboard refreshed.", StatusKind::Info);
                    }
                    KeyCode::Char('t') => self.toggle_theme(),
                    _ => {}
                }
                Ok(Mode::Normal)
            }
            Screen::Files(ref mut files) => {
                match code {
                    KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('x') => {
                        self.screen = Screen::Students;
                    }
                    KeyCode::Up => files.move_selection(-1),
                    KeyCode::Down => files.move_selection(1),
                    KeyCode::Enter => {
                        let action = files.current_action();
                        return self.run_file_action(action);
                    }
                    KeyCode::Char('t') => self.toggle_theme(),
                    _ => {}
                }
                Ok(Mode::Normal)
            }
        }
    }

    fn handle_students_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc => {
                if self.list.query.is_empty() {
                    *exit = true;
                } else {
                    self.list.set_query(&self.store, String::new())?;
                    self.set_status("Search cleared.", StatusKind::Info);
                }
            }
            KeyCode::Up => self.list.move_selection(-1),
            KeyCode::Down => self.list.move_selection(1),
            KeyCode::PageUp => self.list.move_selection(-10),
            KeyCode::PageDown => self.list.move_selection(10),
            KeyCode::Home => self.list.select_first(),
            KeyCode::End => self.list.select_last(),
            KeyCode::Left => {
                if !self.list.change_page(&self.store, -1)? {
                    self.set_status("Already on the first page.", StatusKind::Info);
                }
            }
            KeyCode::Right => {
                if !self.list.change_page(&self.store, 1)? {
                    self.set_status("Already on the last page.", StatusKind::Info);
                }
            }
            KeyCode::Char('+') | KeyCode::Char('a') => {
                self.clear_status();
                return Ok(Mode::Adding(StudentForm::blank()));
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(student) = self.list.current_student().cloned() {
                    self.clear_status();
                    let form = StudentForm::from_student(&student);
                    return Ok(Mode::Editing {
                        original: student,
                        form,
                    });
                }
                self.set_status("No student selected to edit.", StatusKind::Error);
            }
            KeyCode::Char('-') | KeyCode::Delete => {
                if let Some(student) = self.list.current_student().cloned() {
                    self.clear_status();
                    return Ok(Mode::ConfirmDelete(ConfirmDelete { student }));
                }
                self.set_status("No student selected to delete.", StatusKind::Error);
            }
            KeyCode::Char('/') | KeyCode::Char('f') => {
                self.clear_status();
                return Ok(Mode::Searching(self.list.query.clone()));
            }
            KeyCode::Char('d') => {
                self.clear_status();
                self.screen = Screen::Dashboard(DashboardScreen::load(&self.store)?);
            }
            KeyCode::Char('x') => {
                self.clear_status();
                self.open_files_screen()?;
            }
            KeyCode::Char('p') => {
                let size = self.list.cycle_page_size(&self.store)?;
                self.set_status(format!("Showing {size} students per page."), StatusKind::Info);
            }
            KeyCode::Char('t') => self.toggle_theme(),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_add(&mut self, code: KeyCode, mut form: StudentForm) -> Result<Mode> {
        match drive_form(&mut form, code) {
            FormOutcome::Cancelled => {
                self.set_status("Add student cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            FormOutcome::Submitted(draft) => match self.save_new_student(&draft) {
                Ok(()) => return Ok(Mode::Normal),
                Err(err) => {
                    form.error = Some(surface_error(&err));
                    self.report_error(&err);
                }
            },
            FormOutcome::Invalid => {
                self.set_status("Please fix the highlighted fields.", StatusKind::Error);
            }
            FormOutcome::Editing => {}
        }
        Ok(Mode::Adding(form))
    }

    fn handle_edit(
        &mut self,
        code: KeyCode,
        original: Student,
        mut form: StudentForm,
    ) -> Result<Mode> {
        match drive_form(&mut form, code) {
            FormOutcome::Cancelled => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            FormOutcome::Submitted(draft) => match self.save_existing_student(&original, &draft) {
                Ok(()) => return Ok(Mode::Normal),
                Err(err) => {
                    form.error = Some(surface_error(&err));
                    self.report_error(&err);
                }
            },
            FormOutcome::Invalid => {
                self.set_status("Please fix the highlighted fields.", StatusKind::Error);
            }
            FormOutcome::Editing => {}
        }
        Ok(Mode::Editing { original, form })
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&confirm) {
                    Ok(()) => Ok(Mode::Normal),
                    Err(err) => {
                        self.report_error(&err);
                        Ok(Mode::Normal)
                    }
                }
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    fn handle_confirm_restore(&mut self, code: KeyCode, confirm: ConfirmRestore) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Restore cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Err(err) = self.perform_restore(&confirm) {
                    self.report_error(&err);
                }
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmRestore(confirm)),
        }
    }

    /// Live search: the list is re-filtered on every keystroke.
    fn handle_search(&mut self, code: KeyCode, mut query: String) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.list.set_query(&self.store, String::new())?;
                return Ok(Mode::Normal);
            }
            KeyCode::Enter => {
                let found = self.list.page.total;
                if !self.list.query.trim().is_empty() {
                    self.set_status(
                        format!("{found} student(s) match \"{}\".", self.list.query.trim()),
                        StatusKind::Info,
                    );
                }
                return Ok(Mode::Normal);
            }
            KeyCode::Up => self.list.move_selection(-1),
            KeyCode::Down => self.list.move_selection(1),
            KeyCode::Backspace => {
                query.pop();
                self.list.set_query(&self.store, query.clone())?;
            }
            KeyCode::Char(ch) => {
                query.push(ch);
                self.list.set_query(&self.store, query.clone())?;
            }
            _ => {}
        }
        Ok(Mode::Searching(query))
    }

    /// Undo the most recent change. Only active outside of forms and dialogs.
    pub(crate) fn handle_ctrl_z(&mut self) {
        if !matches!(self.mode, Mode::Normal) {
            return;
        }
        let outcome = self.history.undo(&self.store);
        self.finish_history_step(outcome, "Undid");
    }

    /// Reapply the most recently undone change.
    pub(crate) fn handle_ctrl_y(&mut self) {
        if !matches!(self.mode, Mode::Normal) {
            return;
        }
        let outcome = self.history.redo(&self.store);
        self.finish_history_step(outcome, "Redid");
    }

    fn finish_history_step(&mut self, outcome: StoreResult<Change>, verb: &str) {
        match outcome {
            Ok(change) => {
                self.set_status(format!("{verb}: {}.", change.describe()), StatusKind::Info);
                if let Err(err) = self.refresh_views(Some(change.roll())) {
                    self.report_error(&err);
                }
            }
            Err(err @ (StoreError::NothingToUndo | StoreError::NothingToRedo)) => {
                self.set_status(err.to_string(), StatusKind::Info);
            }
            Err(err) => {
                let err = Error::new(err).context(format!("{verb} failed"));
                self.report_error(&err);
            }
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let palette = self.theme.palette();
        let area = frame.area();
        frame.render_widget(Block::default().style(palette.base()), area);

        let footer_height = FOOTER_HEIGHT.min(area.height);
        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Students => self.draw_student_table(frame, content_area, &palette),
            Screen::Dashboard(dashboard) => {
                self.draw_dashboard(frame, content_area, dashboard, &palette)
            }
            Screen::Files(files) => self.draw_files(frame, content_area, files, &palette),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area, &palette);
        }

        match &self.mode {
            Mode::Adding(form) => self.draw_student_form(frame, area, "Add Student", form, &palette),
            Mode::Editing { form, .. } => {
                self.draw_student_form(frame, area, "Edit Student", form, &palette)
            }
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm, &palette),
            Mode::ConfirmRestore(confirm) => {
                self.draw_confirm_restore(frame, area, confirm, &palette)
            }
            Mode::Searching(query) => self.draw_search_bar(frame, area, query, &palette),
            Mode::Normal => {}
        }
    }

    fn draw_student_table(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let page = &self.list.page;
        let title = if self.list.query.trim().is_empty() {
            format!(
                "Students (page {} of {}, {} total)",
                page.page + 1,
                page.page_count,
                page.total
            )
        } else {
            format!(
                "Students matching \"{}\" (page {} of {}, {} found)",
                self.list.query.trim(),
                page.page + 1,
                page.page_count,
                page.total
            )
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .style(palette.base());

        if page.students.is_empty() {
            let message = if self.list.query.trim().is_empty() {
                "No students yet. Press '+' to add one."
            } else {
                "No students match this search. Press Esc to clear it."
            };
            let paragraph = Paragraph::new(Span::styled(message, palette.muted()))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let header_style = palette.accent().add_modifier(Modifier::BOLD);
        let header = Row::new(
            ["Roll", "Name", "Course", "Marks", "Added"]
                .into_iter()
                .map(|label| Cell::from(label).style(header_style)),
        );
        let rows = page.students.iter().map(|student| {
            Row::new(vec![
                Cell::from(student.roll.clone()),
                Cell::from(student.name.clone()),
                Cell::from(student.course.clone()),
                Cell::from(student.marks.to_string()),
                Cell::from(student.created_at.clone()),
            ])
            .style(palette.base())
        });
        let widths = [
            Constraint::Length(14),
            Constraint::Min(20),
            Constraint::Length(18),
            Constraint::Length(6),
            Constraint::Length(19),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(palette.selected())
            .highlight_symbol("> ");
        let mut state = TableState::default().with_selected(Some(self.list.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_dashboard(
        &self,
        frame: &mut Frame,
        area: Rect,
        dashboard: &DashboardScreen,
        palette: &Palette,
    ) {
        let stats = &dashboard.stats;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0)])
            .split(area);

        let summary = vec![
            Line::from(vec![
                Span::styled("Students: ", palette.muted()),
                Span::styled(stats.total.to_string(), palette.base()),
            ]),
            Line::from(vec![
                Span::styled("Average marks: ", palette.muted()),
                Span::styled(format_average(stats.average_marks), palette.base()),
            ]),
            Line::from(vec![
                Span::styled("Courses: ", palette.muted()),
                Span::styled(stats.per_course.len().to_string(), palette.base()),
            ]),
        ];
        let summary = Paragraph::new(summary).block(
            Block::default()
                .title("Dashboard")
                .borders(Borders::ALL)
                .style(palette.base()),
        );
        frame.render_widget(summary, chunks[0]);

        if stats.total == 0 {
            let message = Paragraph::new(Span::styled(
                "No students yet, so there is nothing to chart.",
                palette.muted(),
            ))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).style(palette.base()));
            frame.render_widget(message, chunks[1]);
            return;
        }

        let charts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        let courses = course_bars(stats);
        let course_data: Vec<(&str, u64)> = courses
            .iter()
            .map(|(label, value)| (label.as_str(), *value))
            .collect();
        let course_chart = BarChart::default()
            .block(
                Block::default()
                    .title("Students per course")
                    .borders(Borders::ALL)
                    .style(palette.base()),
            )
            .data(course_data.as_slice())
            .bar_width(10)
            .bar_gap(1)
            .bar_style(palette.accent())
            .value_style(palette.selected())
            .label_style(palette.muted());
        frame.render_widget(course_chart, charts[0]);

        let buckets = histogram_bars(stats);
        let bucket_data: Vec<(&str, u64)> = buckets
            .iter()
            .map(|(label, value)| (label.as_str(), *value))
            .collect();
        let histogram = BarChart::default()
            .block(
                Block::default()
                    .title("Marks distribution")
                    .borders(Borders::ALL)
                    .style(palette.base()),
            )
            .data(bucket_data.as_slice())
            .bar_width(6)
            .bar_gap(1)
            .bar_style(palette.accent())
            .value_style(palette.selected())
            .label_style(palette.muted());
        frame.render_widget(histogram, charts[1]);
    }

    fn draw_files(&self, frame: &mut Frame, area: Rect, files: &FilesScreen, palette: &Palette) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(34), Constraint::Min(0)])
            .split(area);

        let items: Vec<ListItem> = FileAction::ALL
            .iter()
            .map(|action| ListItem::new(action.label()))
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .title("Files")
                    .borders(Borders::ALL)
                    .style(palette.base()),
            )
            .highlight_style(palette.selected())
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(files.selected));
        frame.render_stateful_widget(list, chunks[0], &mut state);

        let latest = files
            .latest_backup
            .as_ref()
            .map_or_else(|| "none yet".to_string(), |path| path.display().to_string());
        let details = vec![
            Line::from(vec![
                Span::styled("Database: ", palette.muted()),
                Span::styled(self.config.db_path.display().to_string(), palette.base()),
            ]),
            Line::from(vec![
                Span::styled("JSON file: ", palette.muted()),
                Span::styled(files.export_path.display().to_string(), palette.base()),
            ]),
            Line::from(vec![
                Span::styled("CSV file: ", palette.muted()),
                Span::styled(files.csv_path.display().to_string(), palette.base()),
            ]),
            Line::from(vec![
                Span::styled("Backups: ", palette.muted()),
                Span::styled(files.backup_dir.display().to_string(), palette.base()),
            ]),
            Line::from(vec![
                Span::styled("Latest backup: ", palette.muted()),
                Span::styled(latest, palette.base()),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "Imports skip rows that are invalid or whose roll number already exists.",
                palette.muted(),
            )),
        ];
        let paragraph = Paragraph::new(details)
            .block(
                Block::default()
                    .title("Locations")
                    .borders(Borders::ALL)
                    .style(palette.base()),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, chunks[1]);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let block = Block::default().borders(Borders::TOP).style(palette.base());
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(
                status.text.clone(),
                status.kind.style(palette),
            )])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions(palette);

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, query: &str, palette: &Palette) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Search by name or roll number")
            .style(palette.base());
        let paragraph = Paragraph::new(Span::styled(format!("Search: {query}"), palette.base()))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Search: ".len() as u16 + query.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn footer_instructions(&self, palette: &Palette) -> Line<'static> {
        let hints: &[(&'static str, &'static str)] = match (&self.screen, &self.mode) {
            (_, Mode::Adding(_) | Mode::Editing { .. }) => &[
                ("[Tab]", " Next field   "),
                ("[↑↓]", " Field / course   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
            (_, Mode::ConfirmDelete(_) | Mode::ConfirmRestore(_)) => {
                &[("[Y]", " Confirm   "), ("[N/Esc]", " Cancel")]
            }
            (_, Mode::Searching(_)) => &[
                ("[Type]", " Filter   "),
                ("[↑↓]", " Select   "),
                ("[Enter]", " Keep   "),
                ("[Esc]", " Clear"),
            ],
            (Screen::Dashboard(_), _) => &[
                ("[R]", " Refresh   "),
                ("[T]", " Theme   "),
                ("[Esc]", " Back"),
            ],
            (Screen::Files(_), _) => &[
                ("[↑↓]", " Choose   "),
                ("[Enter]", " Run   "),
                ("[T]", " Theme   "),
                ("[Esc]", " Back"),
            ],
            (Screen::Students, _) => &[
                ("[+]", " Add   "),
                ("[E]", " Edit   "),
                ("[-]", " Delete   "),
                ("[/]", " Search   "),
                ("[←→]", " Page   "),
                ("[P]", " Page size   "),
                ("[Ctrl+Z/Y]", " Undo/Redo   "),
                ("[D]", " Dashboard   "),
                ("[X]", " Files   "),
                ("[T]", " Theme   "),
                ("[Q]", " Quit"),
            ],
        };

        let spans: Vec<Span<'static>> = hints
            .iter()
            .flat_map(|(key, action)| {
                [
                    Span::styled(*key, palette.key()),
                    Span::styled(*action, palette.base()),
                ]
            })
            .collect();
        Line::from(spans)
    }

    fn draw_student_form(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        form: &StudentForm,
        palette: &Palette,
    ) {
        let popup_area = centered_rect(60, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .style(palette.base());
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = Field::ALL
            .iter()
            .flat_map(|field| form.build_lines(*field, palette))
            .collect();

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(error.clone(), palette.error())));
        } else if form.is_valid() {
            lines.push(Line::from(Span::styled(
                "All fields look good. Enter to save • Esc to cancel",
                palette.success(),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • Esc to cancel",
                palette.muted(),
            )));
        }

        let paragraph = Paragraph::new(lines);
        frame.render_widget(paragraph, inner);

        let row = Field::ALL
            .iter()
            .position(|field| *field == form.active)
            .unwrap_or_default() as u16;
        let prefix = form.active.label().len() as u16 + 2;
        let cursor_x = inner.x + prefix + form.value_len(form.active) as u16;
        frame.set_cursor_position((cursor_x, inner.y + row * 2));
    }

    fn draw_confirm_delete(
        &self,
        frame: &mut Frame,
        area: Rect,
        confirm: &ConfirmDelete,
        palette: &Palette,
    ) {
        let student = &confirm.student;
        let lines = vec![
            Line::from(format!("Delete {student}?")),
            Line::from(format!("{}, {} marks.", student.course, student.marks)),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel. Ctrl+Z undoes it.",
                palette.muted(),
            )),
        ];
        self.draw_dialog(frame, area, "Confirm Deletion", lines, palette);
    }

    fn draw_confirm_restore(
        &self,
        frame: &mut Frame,
        area: Rect,
        confirm: &ConfirmRestore,
        palette: &Palette,
    ) {
        let name = confirm
            .backup
            .file_name()
            .map_or_else(|| confirm.backup.display().to_string(), |name| {
                name.to_string_lossy().into_owned()
            });
        let lines = vec![
            Line::from(format!("Restore {name}?")),
            Line::from(Span::styled(
                "Every current record is replaced and undo history is cleared.",
                palette.error(),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                palette.muted(),
            )),
        ];
        self.draw_dialog(frame, area, "Confirm Restore", lines, palette);
    }

    fn draw_dialog(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &'static str,
        lines: Vec<Line>,
        palette: &Palette,
    ) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .style(palette.base());
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    /// Log the full error chain and show its root cause in the footer.
    fn report_error(&mut self, err: &Error) {
        error!("{err:#}");
        self.set_status(surface_error(err), StatusKind::Error);
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        self.set_status(
            format!("Switched to the {} theme.", self.theme.name()),
            StatusKind::Info,
        );
    }

    fn save_new_student(&mut self, draft: &StudentDraft) -> Result<()> {
        let student = self
            .store
            .create(draft)
            .context("failed to add student")?;
        self.list.reload_focused(&self.store, &student.roll)?;
        self.set_status(format!("Added {student}."), StatusKind::Info);
        self.history.record(Change::Created(student));
        Ok(())
    }

    fn save_existing_student(&mut self, original: &Student, draft: &StudentDraft) -> Result<()> {
        let changes = StudentChanges::between(original, draft)?;
        if changes.is_empty() {
            self.set_status("Nothing changed.", StatusKind::Info);
            return Ok(());
        }

        let updated = self
            .store
            .update(&original.roll, &changes)
            .context("failed to update student")?;
        self.list.reload_focused(&self.store, &updated.roll)?;
        self.set_status(format!("Updated {updated}."), StatusKind::Info);
        self.history.record(Change::Updated {
            before: original.clone(),
            after: updated,
        });
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmDelete) -> Result<()> {
        let student = &confirm.student;
        self.store
            .delete(&student.roll)
            .context("failed to delete student")?;
        self.list.reload(&self.store)?;
        self.set_status(format!("Deleted {student}."), StatusKind::Info);
        self.history.record(Change::Deleted(student.clone()));
        Ok(())
    }

    fn perform_restore(&mut self, confirm: &ConfirmRestore) -> Result<()> {
        self.store
            .restore_from(&confirm.backup)
            .context("failed to restore backup")?;
        self.history.clear();
        self.list.set_query(&self.store, String::new())?;
        let count = self.store.count()?;
        self.set_status(
            format!(
                "Restored {count} student(s) from {}.",
                confirm.backup.display()
            ),
            StatusKind::Info,
        );
        Ok(())
    }

    fn open_files_screen(&mut self) -> Result<()> {
        let latest = latest_backup(&self.config.backup_dir).context("failed to list backups")?;
        self.screen = Screen::Files(FilesScreen {
            selected: 0,
            export_path: self.config.export_path.clone(),
            csv_path: self.config.csv_path.clone(),
            backup_dir: self.config.backup_dir.clone(),
            latest_backup: latest,
        });
        Ok(())
    }

    fn run_file_action(&mut self, action: FileAction) -> Result<Mode> {
        let outcome = match action {
            FileAction::ExportJson => self.export_students(FileFormat::Json),
            FileAction::ImportJson => self.import_students(FileFormat::Json),
            FileAction::ExportCsv => self.export_students(FileFormat::Csv),
            FileAction::ImportCsv => self.import_students(FileFormat::Csv),
            FileAction::Backup => self.back_up(),
            FileAction::RestoreLatest => return Ok(self.confirm_restore()),
            FileAction::OpenDataFolder => self.open_data_folder(),
        };
        if let Err(err) = outcome {
            self.report_error(&err);
        }
        Ok(Mode::Normal)
    }

    fn export_students(&mut self, format: FileFormat) -> Result<()> {
        let path = format.path(&self.config).to_path_buf();
        let count = match format {
            FileFormat::Json => self.store.export_json(&path),
            FileFormat::Csv => self.store.export_csv(&path),
        }
        .context("failed to export students")?;
        self.set_status(
            format!("Exported {count} student(s) to {}.", path.display()),
            StatusKind::Info,
        );
        Ok(())
    }

    fn import_students(&mut self, format: FileFormat) -> Result<()> {
        let path = format.path(&self.config).to_path_buf();
        let summary = match format {
            FileFormat::Json => self.store.import_json(&path),
            FileFormat::Csv => self.store.import_csv(&path),
        }
        .context("failed to import students")?;
        self.list.reload(&self.store)?;
        let text = if summary.skipped.is_empty() {
            format!("Imported {} student(s).", summary.inserted)
        } else {
            format!(
                "Imported {} student(s), skipped {} (see log).",
                summary.inserted,
                summary.skipped.len()
            )
        };
        self.set_status(text, StatusKind::Info);
        Ok(())
    }

    fn back_up(&mut self) -> Result<()> {
        let path = self
            .store
            .backup_to(&self.config.backup_dir)
            .context("failed to back up database")?;
        self.set_status(
            format!("Backed up to {}.", path.display()),
            StatusKind::Info,
        );
        if let Screen::Files(files) = &mut self.screen {
            files.latest_backup = Some(path);
        }
        Ok(())
    }

    fn confirm_restore(&mut self) -> Mode {
        let latest = match &self.screen {
            Screen::Files(files) => files.latest_backup.clone(),
            _ => None,
        };
        match latest {
            Some(backup) => Mode::ConfirmRestore(ConfirmRestore { backup }),
            None => {
                self.set_status("No backups found yet.", StatusKind::Error);
                Mode::Normal
            }
        }
    }

    fn open_data_folder(&mut self) -> Result<()> {
        open_path(&self.config.data_dir).with_context(|| {
            format!("failed to open {}", self.config.data_dir.display())
        })?;
        info!("opened data folder {}", self.config.data_dir.display());
        self.set_status("Opened the data folder.", StatusKind::Info);
        Ok(())
    }

    /// Re-query whatever is on screen after the data changed underneath it.
    fn refresh_views(&mut self, focus: Option<&str>) -> Result<()> {
        match focus {
            Some(roll) => self.list.reload_focused(&self.store, roll)?,
            None => self.list.reload(&self.store)?,
        }
        if let Screen::Dashboard(_) = self.screen {
            self.screen = Screen::Dashboard(DashboardScreen::load(&self.store)?);
        }
        Ok(())
    }
}

/// Feed one key to a form. Up and Down cycle course suggestions while the
/// course field is active and move between fields otherwise.
fn drive_form(form: &mut StudentForm, code: KeyCode) -> FormOutcome {
    match code {
        KeyCode::Esc => return FormOutcome::Cancelled,
        KeyCode::Enter => {
            return match form.submit() {
                Some(draft) => FormOutcome::Submitted(draft),
                None => FormOutcome::Invalid,
            };
        }
        KeyCode::Tab => form.toggle_field(true),
        KeyCode::BackTab => form.toggle_field(false),
        KeyCode::Up if form.active == Field::Course => form.cycle_course(false),
        KeyCode::Down if form.active == Field::Course => form.cycle_course(true),
        KeyCode::Up => form.toggle_field(false),
        KeyCode::Down => form.toggle_field(true),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(ch) => {
            form.push_char(ch);
        }
        _ => {}
    }
    FormOutcome::Editing
}

/// File formats the files screen can export to and import from.
#[derive(Copy, Clone, Debug)]
enum FileFormat {
    Json,
    Csv,
}

impl FileFormat {
    fn path(self, config: &Config) -> &Path {
        match self {
            FileFormat::Json => &config.export_path,
            FileFormat::Csv => &config.csv_path,
        }
    }
}
