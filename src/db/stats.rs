use crate::error::StoreResult;
use crate::models::{CourseCount, Stats, HISTOGRAM_BUCKETS};

use super::StudentStore;

impl StudentStore {
    /// Aggregates for the dashboard: totals, average marks, students per
    /// course and the marks histogram.
    pub fn stats(&self) -> StoreResult<Stats> {
        let total = self.count()?;
        let average_marks: Option<f64> =
            self.conn
                .query_row("SELECT AVG(marks) FROM students", [], |row| row.get(0))?;

        let mut stmt = self.conn.prepare(
            "SELECT course, COUNT(*) FROM students
             GROUP BY course
             ORDER BY course COLLATE NOCASE, course",
        )?;
        let per_course = stmt
            .query_map([], |row| {
                let students: i64 = row.get(1)?;
                Ok(CourseCount {
                    course: row.get(0)?,
                    students: students as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // Integer division puts 100 in an eleventh bucket; MIN folds it into
        // the last one.
        let mut stmt = self.conn.prepare(
            "SELECT MIN(marks / 10, ?1) AS bucket, COUNT(*) FROM students GROUP BY bucket",
        )?;
        let mut marks_histogram = [0usize; HISTOGRAM_BUCKETS];
        let buckets = stmt.query_map([HISTOGRAM_BUCKETS as i64 - 1], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        for bucket in buckets {
            let (bucket, students) = bucket?;
            if let Some(slot) = marks_histogram.get_mut(bucket as usize) {
                *slot = students as usize;
            }
        }

        Ok(Stats {
            total,
            average_marks,
            per_course,
            marks_histogram,
        })
    }
}
