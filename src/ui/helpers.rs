use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::models::{Stats, HISTOGRAM_BUCKETS};

/// Longest course label shown under a dashboard bar.
const COURSE_LABEL_CHARS: usize = 10;

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

/// `"72.5"` style average, or a dash when there is nothing to average.
pub(crate) fn format_average(average: Option<f64>) -> String {
    average.map_or_else(|| "-".to_string(), |avg| format!("{avg:.1}"))
}

/// Bars for the students-per-course chart, labels shortened to fit.
pub(crate) fn course_bars(stats: &Stats) -> Vec<(String, u64)> {
    stats
        .per_course
        .iter()
        .map(|entry| {
            let label: String = entry.course.chars().take(COURSE_LABEL_CHARS).collect();
            (label, entry.students as u64)
        })
        .collect()
}

/// Bars for the marks histogram, one per bucket.
pub(crate) fn histogram_bars(stats: &Stats) -> Vec<(String, u64)> {
    (0..HISTOGRAM_BUCKETS)
        .map(|bucket| {
            (
                Stats::bucket_label(bucket),
                stats.marks_histogram[bucket] as u64,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourseCount;

    #[test]
    fn average_formatting() {
        assert_eq!(format_average(None), "-");
        assert_eq!(format_average(Some(72.456)), "72.5");
    }

    #[test]
    fn course_labels_are_shortened() {
        let stats = Stats {
            total: 3,
            per_course: vec![CourseCount {
                course: "Bachelor of Computer Applications".to_string(),
                students: 3,
            }],
            ..Stats::default()
        };
        assert_eq!(course_bars(&stats), vec![("Bachelor o".to_string(), 3)]);
    }

    #[test]
    fn histogram_has_one_bar_per_bucket() {
        let mut stats = Stats::default();
        stats.marks_histogram[9] = 2;
        let bars = histogram_bars(&stats);
        assert_eq!(bars.len(), HISTOGRAM_BUCKETS);
        assert_eq!(bars[9], ("90-100".to_string(), 2));
    }

    #[test]
    fn surface_error_prefers_root_cause() {
        let err = anyhow::anyhow!("disk full").context("failed to save student");
        assert_eq!(surface_error(&err), "disk full");
    }
}
