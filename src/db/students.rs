use log::info;
use rusqlite::{ffi, params, Error as SqlError, OptionalExtension, Row};

use crate::error::{StoreError, StoreResult};
use crate::models::{Page, Student, StudentChanges, StudentDraft};

use super::StudentStore;

/// Column list shared by every query that hydrates a [`Student`].
const SELECT_STUDENT: &str = "SELECT roll, name, course, marks, created_at FROM students";

impl StudentStore {
    /// Insert a new student and hand back the stored row, timestamp
    /// included. Fails with [`StoreError::DuplicateKey`] when the roll number
    /// is taken, leaving the table untouched.
    pub fn create(&self, draft: &StudentDraft) -> StoreResult<Student> {
        self.conn
            .execute(
                "INSERT INTO students (roll, name, course, marks) VALUES (?1, ?2, ?3, ?4)",
                params![draft.roll(), draft.name(), draft.course(), draft.marks()],
            )
            .map_err(|err| map_unique_constraint(err, draft.roll()))?;

        info!("created student {}", draft.roll());
        self.read(draft.roll())
    }

    /// Look up one student by roll number.
    pub fn read(&self, roll: &str) -> StoreResult<Student> {
        self.conn
            .query_row(
                &format!("{SELECT_STUDENT} WHERE roll = ?1"),
                [roll],
                student_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(roll.to_string()))
    }

    /// Write the changed fields of an existing student and return the row as
    /// it now reads.
    pub fn update(&self, roll: &str, changes: &StudentChanges) -> StoreResult<Student> {
        let updated = self.conn.execute(
            "UPDATE students
             SET name = COALESCE(?1, name),
                 course = COALESCE(?2, course),
                 marks = COALESCE(?3, marks)
             WHERE roll = ?4",
            params![changes.name(), changes.course(), changes.marks(), roll],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound(roll.to_string()));
        }
        info!("updated student {roll}");
        self.read(roll)
    }

    /// Remove a student, returning how many rows went away (always 1 on
    /// success).
    pub fn delete(&self, roll: &str) -> StoreResult<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM students WHERE roll = ?1", [roll])?;

        if deleted == 0 {
            Err(StoreError::NotFound(roll.to_string()))
        } else {
            info!("deleted student {roll}");
            Ok(deleted)
        }
    }

    /// Every student, ordered by name (case-insensitively) and then roll
    /// number.
    pub fn all(&self) -> StoreResult<Vec<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_STUDENT} ORDER BY name COLLATE NOCASE, roll"))?;

        let students = stmt
            .query_map([], student_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(students)
    }

    /// Students whose name or roll number contains `query`, ignoring case.
    /// A blank query matches everybody. Results keep the [`Self::all`]
    /// ordering.
    ///
    /// Matching happens here instead of in SQL because SQLite's `LIKE` and
    /// `lower()` only fold ASCII.
    pub fn search(&self, query: &str) -> StoreResult<Vec<Student>> {
        let needle = query.trim().to_lowercase();
        let students = self.all()?;
        if needle.is_empty() {
            return Ok(students);
        }

        Ok(students
            .into_iter()
            .filter(|student| matches_query(student, &needle))
            .collect())
    }

    /// One page of [`Self::search`] results.
    pub fn page(&self, query: &str, page: usize, page_size: usize) -> StoreResult<Page> {
        Ok(Page::slice(self.search(query)?, page, page_size))
    }

    /// Number of stored students, ignoring any search filter.
    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Put back a previously stored row exactly as it was, creation time
    /// included.
    pub(crate) fn reinsert(&self, student: &Student) -> StoreResult<()> {
        self.conn
            .execute(
                "INSERT INTO students (roll, name, course, marks, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    student.roll,
                    student.name,
                    student.course,
                    student.marks,
                    student.created_at
                ],
            )
            .map_err(|err| map_unique_constraint(err, &student.roll))?;
        info!("restored student {}", student.roll);
        Ok(())
    }
}

/// `needle` must already be lowercase.
fn matches_query(student: &Student, needle: &str) -> bool {
    student.name.to_lowercase().contains(needle) || student.roll.to_lowercase().contains(needle)
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        roll: row.get(0)?,
        name: row.get(1)?,
        course: row.get(2)?,
        marks: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Turn a primary key collision into [`StoreError::DuplicateKey`]. Other
/// constraint failures (the CHECKs) stay storage errors.
fn map_unique_constraint(err: SqlError, roll: &str) -> StoreError {
    let duplicate = matches!(
        &err,
        SqlError::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    );

    if duplicate {
        StoreError::DuplicateKey(roll.to_string())
    } else {
        err.into()
    }
}
