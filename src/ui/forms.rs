use std::path::PathBuf;

use ratatui::text::{Line, Span};

use crate::models::{Student, StudentDraft};
use crate::validate::{check_field, validate, Field, RawStudent, SUGGESTED_COURSES};

use super::theme::Palette;

/// Add/edit form state. Values stay raw strings until submission, when they
/// go through the validator as a whole.
#[derive(Default, Clone)]
pub(crate) struct StudentForm {
    pub(crate) values: RawStudent,
    pub(crate) active: Field,
    /// Editing keeps the roll number fixed; it is the record's key.
    pub(crate) roll_locked: bool,
    /// Set after the first failed submit so every field shows its problem,
    /// including empty ones.
    pub(crate) submitted: bool,
    /// Store-level failure (duplicate roll, database error) from the last
    /// submit.
    pub(crate) error: Option<String>,
    course_hint: Option<usize>,
}

impl StudentForm {
    /// Empty form for adding a student.
    pub(crate) fn blank() -> Self {
        Self::default()
    }

    /// Populate the form from an existing student when editing.
    pub(crate) fn from_student(student: &Student) -> Self {
        Self {
            values: RawStudent {
                roll: student.roll.clone(),
                name: student.name.clone(),
                course: student.course.clone(),
                marks: student.marks.to_string(),
            },
            active: Field::Name,
            roll_locked: true,
            submitted: false,
            error: None,
            course_hint: SUGGESTED_COURSES
                .iter()
                .position(|course| *course == student.course),
        }
    }

    /// Move focus forward or backward, skipping a locked roll field.
    pub(crate) fn toggle_field(&mut self, forward: bool) {
        loop {
            self.active = if forward {
                self.active.next()
            } else {
                self.active.previous()
            };
            if !(self.roll_locked && self.active == Field::Roll) {
                break;
            }
        }
    }

    /// Append a character to the active field. Numeric fields only take
    /// digits.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let accepted = match self.active {
            Field::Roll if self.roll_locked => false,
            Field::Roll | Field::Marks => ch.is_ascii_digit(),
            Field::Name | Field::Course => !ch.is_control(),
        };
        if accepted {
            self.values.value_mut(self.active).push(ch);
            self.error = None;
        }
        accepted
    }

    pub(crate) fn backspace(&mut self) {
        if self.roll_locked && self.active == Field::Roll {
            return;
        }
        self.values.value_mut(self.active).pop();
        self.error = None;
    }

    /// Replace the course with the next (or previous) suggested course.
    pub(crate) fn cycle_course(&mut self, forward: bool) {
        if self.active != Field::Course {
            return;
        }
        let len = SUGGESTED_COURSES.len();
        let next = match (self.course_hint, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(idx), true) => (idx + 1) % len,
            (Some(idx), false) => (idx + len - 1) % len,
        };
        self.course_hint = Some(next);
        self.values.course = SUGGESTED_COURSES[next].to_string();
        self.error = None;
    }

    /// Run the validator over the whole form. On failure the form switches to
    /// showing every field's problem.
    pub(crate) fn submit(&mut self) -> Option<StudentDraft> {
        match validate(&self.values) {
            Ok(draft) => Some(draft),
            Err(errors) => {
                self.submitted = true;
                if let Some(field) = errors.fields().next() {
                    if !(self.roll_locked && field == Field::Roll) {
                        self.active = field;
                    }
                }
                None
            }
        }
    }

    /// Problem with `field` as currently typed, if any. Untouched empty
    /// fields stay quiet until the first submit.
    pub(crate) fn field_message(&self, field: Field) -> Option<String> {
        let value = self.values.value(field);
        if value.trim().is_empty() && !self.submitted {
            return None;
        }
        check_field(field, value).err()
    }

    pub(crate) fn is_valid(&self) -> bool {
        validate(&self.values).is_ok()
    }

    /// Label line plus message line for one field.
    pub(crate) fn build_lines(&self, field: Field, palette: &Palette) -> [Line<'static>; 2] {
        let value = self.values.value(field);
        let is_active = self.active == field;
        let locked = self.roll_locked && field == Field::Roll;

        let display = if value.is_empty() {
            "<required>".to_string()
        } else {
            value.to_string()
        };

        let style = if locked {
            palette.muted()
        } else if is_active {
            palette.accent()
        } else if value.is_empty() {
            palette.muted()
        } else {
            palette.base()
        };

        let mut spans = vec![
            Span::styled(format!("{}: ", field.label()), palette.base()),
            Span::styled(display, style),
        ];
        if locked {
            spans.push(Span::styled("  (fixed)", palette.muted()));
        } else if field == Field::Course && is_active {
            spans.push(Span::styled("  [↑↓ suggestions]", palette.muted()));
        }

        let message = match self.field_message(field) {
            Some(message) => Line::from(Span::styled(format!("  {message}"), palette.error())),
            None => Line::from(""),
        };

        [Line::from(spans), message]
    }

    pub(crate) fn value_len(&self, field: Field) -> usize {
        self.values.value(field).chars().count()
    }
}

/// State for confirming a student deletion.
#[derive(Clone)]
pub(crate) struct ConfirmDelete {
    pub(crate) student: Student,
}

/// State for confirming a restore, which replaces every current record.
#[derive(Clone)]
pub(crate) struct ConfirmRestore {
    pub(crate) backup: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> Student {
        Student {
            roll: "12".to_string(),
            name: "Asha".to_string(),
            course: "MCA".to_string(),
            marks: 80,
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn numeric_fields_reject_letters() {
        let mut form = StudentForm::blank();
        assert!(!form.push_char('a'));
        assert!(form.push_char('7'));
        form.active = Field::Marks;
        assert!(!form.push_char('x'));
        assert_eq!(form.values.roll, "7");
    }

    #[test]
    fn edit_form_skips_and_protects_the_roll() {
        let mut form = StudentForm::from_student(&student());
        assert_eq!(form.active, Field::Name);
        form.toggle_field(false);
        assert_eq!(form.active, Field::Marks);
        form.toggle_field(true);
        assert_eq!(form.active, Field::Name);

        form.active = Field::Roll;
        assert!(!form.push_char('9'));
        form.backspace();
        assert_eq!(form.values.roll, "12");
    }

    #[test]
    fn course_suggestions_cycle_from_current_course() {
        let mut form = StudentForm::from_student(&student());
        form.active = Field::Course;
        form.cycle_course(true);
        assert_eq!(form.values.course, "M.Tech");
        form.cycle_course(false);
        form.cycle_course(false);
        assert_eq!(form.values.course, "B.Sc");
    }

    #[test]
    fn failed_submit_reveals_empty_field_errors() {
        let mut form = StudentForm::blank();
        assert!(form.field_message(Field::Name).is_none());
        assert!(form.submit().is_none());
        assert!(form.submitted);
        assert!(form.field_message(Field::Name).is_some());
        assert_eq!(form.active, Field::Roll);
    }

    #[test]
    fn valid_form_submits_a_draft() {
        let form = StudentForm::from_student(&student());
        assert!(form.is_valid());
        let draft = form.clone().submit().expect("valid");
        assert_eq!(draft.roll(), "12");
    }
}
