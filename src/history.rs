//! Undo/redo for single-record edits. Each [`Change`] remembers enough of the
//! row to replay itself in either direction through the [`StudentStore`].

use log::info;

use crate::db::StudentStore;
use crate::error::{StoreError, StoreResult};
use crate::models::{Student, StudentChanges};

/// Oldest entries are dropped past this many undo steps.
pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Created(Student),
    Updated { before: Student, after: Student },
    Deleted(Student),
}

impl Change {
    /// Roll number of the affected student.
    pub fn roll(&self) -> &str {
        match self {
            Change::Created(student) | Change::Deleted(student) => &student.roll,
            Change::Updated { after, .. } => &after.roll,
        }
    }

    /// Short past-tense summary for the status line.
    pub fn describe(&self) -> String {
        match self {
            Change::Created(student) => format!("added {student}"),
            Change::Updated { after, .. } => format!("edited {after}"),
            Change::Deleted(student) => format!("deleted {student}"),
        }
    }

    fn inverse(&self) -> Change {
        match self {
            Change::Created(student) => Change::Deleted(student.clone()),
            Change::Deleted(student) => Change::Created(student.clone()),
            Change::Updated { before, after } => Change::Updated {
                before: after.clone(),
                after: before.clone(),
            },
        }
    }

    /// Make the store reflect the state after this change.
    fn apply(&self, store: &StudentStore) -> StoreResult<()> {
        match self {
            Change::Created(student) => store.reinsert(student),
            Change::Deleted(student) => store.delete(&student.roll).map(|_| ()),
            Change::Updated { after, .. } => store
                .update(&after.roll, &StudentChanges::restoring(after))
                .map(|_| ()),
        }
    }
}

#[derive(Debug, Default)]
pub struct History {
    undo: Vec<Change>,
    redo: Vec<Change>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a change that was just applied. Any redo trail is discarded.
    pub fn record(&mut self, change: Change) {
        self.undo.push(change);
        if self.undo.len() > HISTORY_LIMIT {
            self.undo.remove(0);
        }
        self.redo.clear();
    }

    /// Revert the most recent change. On failure the change stays on the undo
    /// stack.
    pub fn undo(&mut self, store: &StudentStore) -> StoreResult<Change> {
        let change = self.undo.pop().ok_or(StoreError::NothingToUndo)?;
        if let Err(err) = change.inverse().apply(store) {
            self.undo.push(change);
            return Err(err);
        }
        info!("undid change to student {}", change.roll());
        self.redo.push(change.clone());
        Ok(change)
    }

    /// Re-apply the most recently undone change.
    pub fn redo(&mut self, store: &StudentStore) -> StoreResult<Change> {
        let change = self.redo.pop().ok_or(StoreError::NothingToRedo)?;
        if let Err(err) = change.apply(store) {
            self.redo.push(change);
            return Err(err);
        }
        info!("redid change to student {}", change.roll());
        self.undo.push(change.clone());
        Ok(change)
    }

    /// Whether [`History::undo`] has anything to revert.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether an undone change is waiting to be re-applied.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Forget everything, e.g. after the database was swapped by a restore.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{validate, RawStudent};

    fn add(store: &StudentStore, roll: &str, name: &str) -> Student {
        let draft = validate(&RawStudent::from_fields([
            ("roll", roll),
            ("name", name),
            ("course", "MCA"),
            ("marks", "60"),
        ]))
        .expect("valid");
        store.create(&draft).expect("create")
    }

    #[test]
    fn empty_history_reports_nothing_to_do() {
        let store = StudentStore::open_in_memory().expect("store");
        let mut history = History::new();
        assert!(matches!(history.undo(&store), Err(StoreError::NothingToUndo)));
        assert!(matches!(history.redo(&store), Err(StoreError::NothingToRedo)));
    }

    #[test]
    fn new_change_clears_redo() {
        let store = StudentStore::open_in_memory().expect("store");
        let mut history = History::new();
        let first = add(&store, "1", "Asha");
        history.record(Change::Created(first));
        history.undo(&store).expect("undo");
        assert!(history.can_redo());

        let second = add(&store, "2", "Ravi");
        history.record(Change::Created(second));
        assert!(!history.can_redo());
    }

    #[test]
    fn failed_undo_keeps_the_change() {
        let store = StudentStore::open_in_memory().expect("store");
        let mut history = History::new();
        let student = add(&store, "1", "Asha");
        history.record(Change::Created(student));
        store.delete("1").expect("delete behind history's back");

        assert!(matches!(history.undo(&store), Err(StoreError::NotFound(_))));
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn history_is_bounded() {
        let store = StudentStore::open_in_memory().expect("store");
        let mut history = History::new();
        let student = add(&store, "1", "Asha");
        for _ in 0..HISTORY_LIMIT + 5 {
            history.record(Change::Created(student.clone()));
        }
        assert_eq!(history.undo.len(), HISTORY_LIMIT);
    }
}
