use std::path::PathBuf;

use crate::config::PAGE_SIZES;
use crate::db::StudentStore;
use crate::error::StoreResult;
use crate::models::{Page, Stats, Student};

/// Paged, optionally filtered student list.
pub(crate) struct StudentListScreen {
    pub(crate) query: String,
    pub(crate) page: Page,
    pub(crate) page_size: usize,
    pub(crate) selected: usize,
}

impl StudentListScreen {
    pub(crate) fn load(store: &StudentStore, page_size: usize) -> StoreResult<Self> {
        let mut screen = Self {
            query: String::new(),
            page: Page::default(),
            page_size,
            selected: 0,
        };
        screen.reload(store)?;
        Ok(screen)
    }

    /// Re-query the current page, keeping the selection in bounds.
    pub(crate) fn reload(&mut self, store: &StudentStore) -> StoreResult<()> {
        self.page = store.page(&self.query, self.page.page, self.page_size)?;
        self.ensure_in_bounds();
        Ok(())
    }

    /// Re-query and move the selection onto `roll` if it is on any page.
    pub(crate) fn reload_focused(&mut self, store: &StudentStore, roll: &str) -> StoreResult<()> {
        let matches = store.search(&self.query)?;
        let page_size = self.page_size.max(1);
        let position = matches.iter().position(|student| student.roll == roll);
        let page_index = position.map_or(self.page.page, |idx| idx / page_size);
        self.page = Page::slice(matches, page_index, page_size);
        if let Some(idx) = position {
            self.selected = idx % page_size;
        }
        self.ensure_in_bounds();
        Ok(())
    }

    /// Switch to the next entry of [`PAGE_SIZES`], keeping the first row of
    /// the current page in view.
    pub(crate) fn cycle_page_size(&mut self, store: &StudentStore) -> StoreResult<usize> {
        let first_row = self.page.page * self.page_size.max(1);
        self.page_size = PAGE_SIZES
            .iter()
            .copied()
            .find(|size| *size > self.page_size)
            .unwrap_or(PAGE_SIZES[0]);
        self.page.page = first_row / self.page_size;
        self.selected = 0;
        self.reload(store)?;
        Ok(self.page_size)
    }

    /// Apply a new search query, starting again from the first page.
    pub(crate) fn set_query(&mut self, store: &StudentStore, query: String) -> StoreResult<()> {
        self.query = query;
        self.page.page = 0;
        self.selected = 0;
        self.reload(store)
    }

    pub(crate) fn change_page(&mut self, store: &StudentStore, offset: isize) -> StoreResult<bool> {
        let target = self.page.page as isize + offset;
        if target < 0 || target as usize >= self.page.page_count {
            return Ok(false);
        }
        self.page.page = target as usize;
        self.selected = 0;
        self.reload(store)?;
        Ok(true)
    }

    pub(crate) fn current_student(&self) -> Option<&Student> {
        self.page.students.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.page.students.is_empty() {
            return;
        }
        let len = self.page.students.len() as isize;
        self.selected = (self.selected as isize + offset).clamp(0, len - 1) as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.page.students.len().saturating_sub(1);
    }

    fn ensure_in_bounds(&mut self) {
        if self.page.students.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.page.students.len() {
            self.selected = self.page.students.len() - 1;
        }
    }
}

/// Snapshot of the aggregates shown on the dashboard.
pub(crate) struct DashboardScreen {
    pub(crate) stats: Stats,
}

impl DashboardScreen {
    pub(crate) fn load(store: &StudentStore) -> StoreResult<Self> {
        Ok(Self {
            stats: store.stats()?,
        })
    }
}

/// Actions offered on the files screen, in display order.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum FileAction {
    ExportJson,
    ImportJson,
    ExportCsv,
    ImportCsv,
    Backup,
    RestoreLatest,
    OpenDataFolder,
}

impl FileAction {
    pub(crate) const ALL: [FileAction; 7] = [
        FileAction::ExportJson,
        FileAction::ImportJson,
        FileAction::ExportCsv,
        FileAction::ImportCsv,
        FileAction::Backup,
        FileAction::RestoreLatest,
        FileAction::OpenDataFolder,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            FileAction::ExportJson => "Export students to JSON",
            FileAction::ImportJson => "Import students from JSON",
            FileAction::ExportCsv => "Export students to CSV",
            FileAction::ImportCsv => "Import students from CSV",
            FileAction::Backup => "Back up the database",
            FileAction::RestoreLatest => "Restore the latest backup",
            FileAction::OpenDataFolder => "Open the data folder",
        }
    }
}

/// File operations menu plus the paths it works with.
pub(crate) struct FilesScreen {
    pub(crate) selected: usize,
    pub(crate) export_path: PathBuf,
    pub(crate) csv_path: PathBuf,
    pub(crate) backup_dir: PathBuf,
    pub(crate) latest_backup: Option<PathBuf>,
}

impl FilesScreen {
    pub(crate) fn current_action(&self) -> FileAction {
        FileAction::ALL[self.selected.min(FileAction::ALL.len() - 1)]
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        let len = FileAction::ALL.len() as isize;
        self.selected = (self.selected as isize + offset).clamp(0, len - 1) as usize;
    }
}
