//! Domain models that mirror the `students` table and get passed throughout
//! the TUI. `Student` is what the store hands back; `StudentDraft` and
//! `StudentChanges` are what it accepts, and both can only be produced from
//! validated input.

use std::fmt;

use serde::Serialize;

use crate::validate::{Field, ValidationErrors};

/// Number of buckets in the marks histogram (0-9, 10-19, ..., 90-100).
pub const HISTOGRAM_BUCKETS: usize = 10;

/// A stored student row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    /// Roll number, the primary key. Digits only and never changes once the
    /// row exists.
    pub roll: String,
    pub name: String,
    pub course: String,
    /// Marks out of 100.
    pub marks: u8,
    /// Creation timestamp written by SQLite (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub created_at: String,
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (roll {})", self.name, self.roll)
    }
}

/// A normalized student record that passed validation and is ready to be
/// written. The fields are private so the only way to build one is
/// [`crate::validate::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDraft {
    roll: String,
    name: String,
    course: String,
    marks: u8,
}

impl StudentDraft {
    pub(crate) fn new(roll: String, name: String, course: String, marks: u8) -> Self {
        Self {
            roll,
            name,
            course,
            marks,
        }
    }

    pub fn roll(&self) -> &str {
        &self.roll
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn course(&self) -> &str {
        &self.course
    }

    pub fn marks(&self) -> u8 {
        self.marks
    }
}

/// The subset of editable fields an update should write. `None` leaves the
/// stored value untouched. The roll number is not part of it because it is
/// immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentChanges {
    name: Option<String>,
    course: Option<String>,
    marks: Option<u8>,
}

impl StudentChanges {
    /// Take every editable field from `draft`. The draft must describe the
    /// record stored under `roll`.
    pub fn from_draft(roll: &str, draft: &StudentDraft) -> Result<Self, ValidationErrors> {
        ensure_same_roll(roll, draft)?;
        Ok(Self {
            name: Some(draft.name.clone()),
            course: Some(draft.course.clone()),
            marks: Some(draft.marks),
        })
    }

    /// Only the fields where `draft` differs from the stored `current` row.
    pub fn between(current: &Student, draft: &StudentDraft) -> Result<Self, ValidationErrors> {
        ensure_same_roll(&current.roll, draft)?;
        Ok(Self {
            name: (current.name != draft.name).then(|| draft.name.clone()),
            course: (current.course != draft.course).then(|| draft.course.clone()),
            marks: (current.marks != draft.marks).then_some(draft.marks),
        })
    }

    /// Every editable field of an already stored row. Used to put a record
    /// back the way it was when undoing or redoing an edit.
    pub(crate) fn restoring(student: &Student) -> Self {
        Self {
            name: Some(student.name.clone()),
            course: Some(student.course.clone()),
            marks: Some(student.marks),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.course.is_none() && self.marks.is_none()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn course(&self) -> Option<&str> {
        self.course.as_deref()
    }

    pub fn marks(&self) -> Option<u8> {
        self.marks
    }
}

fn ensure_same_roll(roll: &str, draft: &StudentDraft) -> Result<(), ValidationErrors> {
    if draft.roll == roll {
        Ok(())
    } else {
        Err(ValidationErrors::single(
            Field::Roll,
            "Roll number cannot be changed once created.",
        ))
    }
}

/// One page of a (possibly filtered) student listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub students: Vec<Student>,
    /// Zero-based index of this page.
    pub page: usize,
    /// Always at least 1, even when there are no matches.
    pub page_count: usize,
    /// Number of matching students across all pages.
    pub total: usize,
}

impl Page {
    /// Cut the `page`-th slice out of an ordered result set. Pages past the
    /// end clamp to the last page and a zero `page_size` behaves like 1.
    pub fn slice(students: Vec<Student>, page: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total = students.len();
        let page_count = total.div_ceil(page_size).max(1);
        let page = page.min(page_count - 1);
        let students = students
            .into_iter()
            .skip(page * page_size)
            .take(page_size)
            .collect();

        Self {
            students,
            page,
            page_count,
            total,
        }
    }
}

/// Number of students enrolled in one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseCount {
    pub course: String,
    pub students: usize,
}

/// Aggregates shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub total: usize,
    /// `None` when there are no students.
    pub average_marks: Option<f64>,
    pub per_course: Vec<CourseCount>,
    /// Students per ten-mark bucket; the last bucket also holds 100.
    pub marks_histogram: [usize; HISTOGRAM_BUCKETS],
}

impl Stats {
    /// Human label for a histogram bucket, e.g. `"30-39"` or `"90-100"`.
    pub fn bucket_label(bucket: usize) -> String {
        let low = bucket * 10;
        if bucket + 1 >= HISTOGRAM_BUCKETS {
            format!("{low}-100")
        } else {
            format!("{low}-{}", low + 9)
        }
    }
}

/// A row rejected during a JSON import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// Zero-based position of the row in the imported array.
    pub index: usize,
    pub roll: String,
    pub reason: String,
}

/// Outcome of [`crate::db::StudentStore::import_json`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: Vec<SkippedRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(roll: &str) -> Student {
        Student {
            roll: roll.to_string(),
            name: format!("Student {roll}"),
            course: "MCA".to_string(),
            marks: 50,
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    fn students(n: usize) -> Vec<Student> {
        (0..n).map(|i| student(&i.to_string())).collect()
    }

    #[test]
    fn page_slices_and_counts() {
        let page = Page::slice(students(7), 1, 3);
        assert_eq!(page.total, 7);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.page, 1);
        let rolls: Vec<_> = page.students.iter().map(|s| s.roll.as_str()).collect();
        assert_eq!(rolls, vec!["3", "4", "5"]);
    }

    #[test]
    fn page_past_the_end_clamps_to_last() {
        let page = Page::slice(students(7), 10, 3);
        assert_eq!(page.page, 2);
        assert_eq!(page.students.len(), 1);
    }

    #[test]
    fn empty_listing_still_has_one_page() {
        let page = Page::slice(Vec::new(), 3, 50);
        assert_eq!(page.page, 0);
        assert_eq!(page.page_count, 1);
        assert!(page.students.is_empty());
    }

    #[test]
    fn zero_page_size_acts_as_one() {
        let page = Page::slice(students(2), 1, 0);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.students[0].roll, "1");
    }

    #[test]
    fn bucket_labels() {
        assert_eq!(Stats::bucket_label(0), "0-9");
        assert_eq!(Stats::bucket_label(4), "40-49");
        assert_eq!(Stats::bucket_label(9), "90-100");
    }

    #[test]
    fn changes_between_only_keep_differences() {
        let current = student("7");
        let draft = StudentDraft::new("7".into(), current.name.clone(), "BBA".into(), 50);
        let changes = StudentChanges::between(&current, &draft).expect("same roll");
        assert_eq!(changes.name(), None);
        assert_eq!(changes.course(), Some("BBA"));
        assert_eq!(changes.marks(), None);
        assert!(!changes.is_empty());
    }

    #[test]
    fn changes_reject_a_different_roll() {
        let draft = StudentDraft::new("8".into(), "Asha".into(), "MCA".into(), 40);
        let err = StudentChanges::from_draft("7", &draft).expect_err("roll differs");
        assert!(err.for_field(Field::Roll).is_some());
    }
}
