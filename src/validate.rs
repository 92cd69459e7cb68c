//! Input rules for student records. Everything here is pure: raw form
//! values go in, a typed [`StudentDraft`] or a list of per-field errors
//! comes out.

use std::error::Error;
use std::fmt;

use crate::models::StudentDraft;

/// Longest accepted roll number, in digits.
pub const MAX_ROLL_DIGITS: usize = 12;
/// Longest accepted name, in characters.
pub const MAX_NAME_CHARS: usize = 100;
/// Longest accepted course name, in characters.
pub const MAX_COURSE_CHARS: usize = 64;
/// Highest possible mark.
pub const MAX_MARKS: u8 = 100;

/// Courses offered as suggestions by the form. Any non-empty course is
/// accepted.
pub const SUGGESTED_COURSES: &[&str] = &[
    "B.Tech CSE",
    "B.Tech ECE",
    "B.Sc",
    "MCA",
    "M.Tech",
    "BBA",
    "Other",
];

/// Fields of a student record as they appear on the form.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Field {
    #[default]
    Roll,
    Name,
    Course,
    Marks,
}

impl Field {
    /// Form order.
    pub const ALL: [Field; 4] = [Field::Roll, Field::Name, Field::Course, Field::Marks];

    /// Key used in field maps and JSON files.
    pub fn key(self) -> &'static str {
        match self {
            Field::Roll => "roll",
            Field::Name => "name",
            Field::Course => "course",
            Field::Marks => "marks",
        }
    }

    /// Title-case name shown next to the input.
    pub fn label(self) -> &'static str {
        match self {
            Field::Roll => "Roll",
            Field::Name => "Name",
            Field::Course => "Course",
            Field::Marks => "Marks",
        }
    }

    /// Accepts the canonical key plus the longer `roll_number` spelling,
    /// ignoring case and surrounding whitespace.
    pub fn from_key(key: &str) -> Option<Field> {
        match key.trim().to_ascii_lowercase().as_str() {
            "roll" | "roll_number" => Some(Field::Roll),
            "name" => Some(Field::Name),
            "course" => Some(Field::Course),
            "marks" => Some(Field::Marks),
            _ => None,
        }
    }

    /// Field that Tab moves to, wrapping from marks back to roll.
    pub fn next(self) -> Field {
        match self {
            Field::Roll => Field::Name,
            Field::Name => Field::Course,
            Field::Course => Field::Marks,
            Field::Marks => Field::Roll,
        }
    }

    /// Inverse of [`Field::next`].
    pub fn previous(self) -> Field {
        match self {
            Field::Roll => Field::Marks,
            Field::Name => Field::Roll,
            Field::Course => Field::Name,
            Field::Marks => Field::Course,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw, untrimmed values straight from the form widgets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStudent {
    pub roll: String,
    pub name: String,
    pub course: String,
    pub marks: String,
}

impl RawStudent {
    /// Build from a field-name to value mapping. Unknown keys are ignored and
    /// missing keys stay empty, which validation then reports.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::default();
        for (key, value) in fields {
            if let Some(field) = Field::from_key(key.as_ref()) {
                *raw.value_mut(field) = value.into();
            }
        }
        raw
    }

    /// Raw value of one field.
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Roll => &self.roll,
            Field::Name => &self.name,
            Field::Course => &self.course,
            Field::Marks => &self.marks,
        }
    }

    pub fn value_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Roll => &mut self.roll,
            Field::Name => &mut self.name,
            Field::Course => &mut self.course,
            Field::Marks => &mut self.marks,
        }
    }
}

/// A single broken rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// Every rule a candidate record broke, in form order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// A lone failure on `field`.
    pub fn single(field: Field, message: impl Into<String>) -> Self {
        Self(vec![FieldError {
            field,
            message: message.into(),
        }])
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// `None` when `errors` is empty.
    pub(crate) fn from_errors(errors: Vec<FieldError>) -> Option<Self> {
        (!errors.is_empty()).then_some(Self(errors))
    }

    /// The message for `field`, if that field failed.
    pub fn for_field(&self, field: Field) -> Option<&str> {
        self.0
            .iter()
            .find(|err| err.field == field)
            .map(|err| err.message.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.iter().map(|err| err.field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for err in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            f.write_str(&err.message)?;
        }
        Ok(())
    }
}

impl Error for ValidationErrors {}

/// Check every field of `raw` and return the normalized record, or all the
/// problems found. A single failing field rejects the whole record.
pub fn validate(raw: &RawStudent) -> Result<StudentDraft, ValidationErrors> {
    let checked = (
        check_roll(&raw.roll),
        check_name(&raw.name),
        check_course(&raw.course),
        check_marks(&raw.marks),
    );

    match checked {
        (Ok(roll), Ok(name), Ok(course), Ok(marks)) => {
            Ok(StudentDraft::new(roll, name, course, marks))
        }
        (roll, name, course, marks) => {
            let errors = [
                (Field::Roll, roll.err()),
                (Field::Name, name.err()),
                (Field::Course, course.err()),
                (Field::Marks, marks.err()),
            ]
            .into_iter()
            .filter_map(|(field, message)| message.map(|message| FieldError { field, message }))
            .collect();
            Err(ValidationErrors(errors))
        }
    }
}

/// Validate a single field in isolation. The form uses this to flag problems
/// while the user is still typing.
pub fn check_field(field: Field, value: &str) -> Result<(), String> {
    match field {
        Field::Roll => check_roll(value).map(|_| ()),
        Field::Name => check_name(value).map(|_| ()),
        Field::Course => check_course(value).map(|_| ()),
        Field::Marks => check_marks(value).map(|_| ()),
    }
}

fn check_roll(value: &str) -> Result<String, String> {
    let roll = value.trim();
    if roll.is_empty() {
        return Err("Roll number is required.".to_string());
    }
    if !roll.chars().all(|ch| ch.is_ascii_digit()) {
        return Err("Roll number must contain digits only.".to_string());
    }
    if roll.len() > MAX_ROLL_DIGITS {
        return Err(format!(
            "Roll number must be at most {MAX_ROLL_DIGITS} digits."
        ));
    }
    Ok(roll.to_string())
}

fn check_name(value: &str) -> Result<String, String> {
    let name = collapse_whitespace(value);
    if name.is_empty() {
        return Err("Name is required.".to_string());
    }
    if !name
        .chars()
        .all(|ch| ch.is_alphabetic() || matches!(ch, ' ' | '.' | '-'))
    {
        return Err("Name may only contain letters, spaces, '.' and '-'.".to_string());
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(format!("Name must be at most {MAX_NAME_CHARS} characters."));
    }
    Ok(name)
}

fn check_course(value: &str) -> Result<String, String> {
    let course = collapse_whitespace(value);
    if course.is_empty() {
        return Err("Course is required.".to_string());
    }
    if course.chars().count() > MAX_COURSE_CHARS {
        return Err(format!(
            "Course must be at most {MAX_COURSE_CHARS} characters."
        ));
    }
    Ok(course)
}

fn check_marks(value: &str) -> Result<u8, String> {
    let marks = value.trim();
    if marks.is_empty() {
        return Err("Marks are required.".to_string());
    }
    if !marks.chars().all(|ch| ch.is_ascii_digit()) {
        return Err("Marks must be a whole number.".to_string());
    }
    match marks.parse::<u32>() {
        Ok(parsed) if parsed <= u32::from(MAX_MARKS) => Ok(parsed as u8),
        _ => Err(format!("Marks must be between 0 and {MAX_MARKS}.")),
    }
}

/// Trim and squeeze every whitespace run down to one space.
fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
