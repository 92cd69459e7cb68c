use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::models::{ImportSummary, SkippedRow};
use crate::validate::{validate, Field, FieldError, RawStudent, ValidationErrors};

use super::StudentStore;

/// Largest float magnitude that still converts to a whole-number string
/// without losing digits.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// A student as found in a JSON import file. Hand-edited files often carry
/// numbers where strings are expected (or the other way around), so every
/// field takes either.
#[derive(Debug, Deserialize)]
struct JsonRow {
    #[serde(default, alias = "roll_number")]
    roll: Scalar,
    #[serde(default)]
    name: Scalar,
    #[serde(default)]
    course: Scalar,
    #[serde(default)]
    marks: Scalar,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    #[default]
    Missing,
    /// Booleans, arrays and objects. The row gets skipped, not the file.
    Other(serde_json::Value),
}

impl Scalar {
    fn into_text(self, field: Field) -> Result<String, FieldError> {
        match self {
            Scalar::Text(text) => Ok(text),
            Scalar::Number(number) => Ok(number_text(&number)),
            Scalar::Missing => Ok(String::new()),
            Scalar::Other(value) => Err(FieldError {
                field,
                message: format!(
                    "{} must be text or a number, not {value}.",
                    field.label()
                ),
            }),
        }
    }
}

/// Integers as written; floats with no fractional part (`88.0`) as the
/// integer they hold. Anything else keeps its decimal form and fails the
/// whole-number checks later.
fn number_text(number: &serde_json::Number) -> String {
    if number.is_f64() {
        if let Some(value) = number.as_f64() {
            if value.fract() == 0.0 && value.abs() <= MAX_EXACT_FLOAT {
                return format!("{}", value as i64);
            }
        }
    }
    number.to_string()
}

/// One row of a CSV file. Headers are matched after trimming and
/// lowercasing, so `Name`, ` ROLL ` and `roll_number` all work.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    roll: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    course: String,
    #[serde(default)]
    marks: String,
}

#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    name: &'a str,
    roll: &'a str,
    course: &'a str,
    marks: u8,
}

/// A row read from any import format, plus the fields that could not even
/// be turned into text.
struct ImportedRow {
    raw: RawStudent,
    unreadable: Option<ValidationErrors>,
}

impl From<JsonRow> for ImportedRow {
    fn from(row: JsonRow) -> Self {
        let mut raw = RawStudent::default();
        let mut unreadable = Vec::new();
        let values = [
            (Field::Roll, row.roll),
            (Field::Name, row.name),
            (Field::Course, row.course),
            (Field::Marks, row.marks),
        ];
        for (field, value) in values {
            match value.into_text(field) {
                Ok(text) => *raw.value_mut(field) = text,
                Err(err) => unreadable.push(err),
            }
        }

        ImportedRow {
            raw,
            unreadable: ValidationErrors::from_errors(unreadable),
        }
    }
}

impl From<CsvRow> for ImportedRow {
    fn from(row: CsvRow) -> Self {
        ImportedRow {
            raw: RawStudent {
                roll: row.roll,
                name: row.name,
                course: row.course,
                marks: row.marks,
            },
            unreadable: None,
        }
    }
}

impl StudentStore {
    /// Write every student to `path` as a pretty-printed JSON array and
    /// return how many were written.
    pub fn export_json(&self, path: impl AsRef<Path>) -> StoreResult<usize> {
        let path = path.as_ref();
        create_parent(path)?;

        let students = self.all()?;
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &students)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        info!("exported {} students to {}", students.len(), path.display());
        Ok(students.len())
    }

    /// Read a JSON array of students from `path` and add each one through the
    /// validator. Rows that fail validation or reuse an existing roll number
    /// are skipped and listed in the summary; a storage failure stops the
    /// import, keeping the rows added so far.
    pub fn import_json(&self, path: impl AsRef<Path>) -> StoreResult<ImportSummary> {
        let path = path.as_ref();
        let rows: Vec<JsonRow> = serde_json::from_reader(BufReader::new(File::open(path)?))?;

        let summary = self.import_rows(rows.into_iter().map(|row| Ok(row.into())))?;
        log_import(&summary, path);
        Ok(summary)
    }

    /// Write every student to `path` as CSV with a
    /// `name,roll,course,marks` header.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> StoreResult<usize> {
        let path = path.as_ref();
        create_parent(path)?;

        let students = self.all()?;
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        for student in &students {
            writer.serialize(CsvRecord {
                name: &student.name,
                roll: &student.roll,
                course: &student.course,
                marks: student.marks,
            })?;
        }
        if students.is_empty() {
            writer.write_record(["name", "roll", "course", "marks"])?;
        }
        writer.flush()?;

        info!("exported {} students to {}", students.len(), path.display());
        Ok(students.len())
    }

    /// Import a CSV file with `name`, `roll`, `course` and `marks` columns
    /// in any order and any case. Extra columns are ignored. Rows are handled
    /// exactly like [`StudentStore::import_json`] rows.
    pub fn import_csv(&self, path: impl AsRef<Path>) -> StoreResult<ImportSummary> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(File::open(path)?));

        let headers: csv::StringRecord = reader
            .headers()?
            .iter()
            .map(|header| match Field::from_key(header) {
                Some(field) => field.key().to_string(),
                None => header.to_ascii_lowercase(),
            })
            .collect();
        let missing: Vec<&'static str> = Field::ALL
            .iter()
            .map(|field| field.key())
            .filter(|key| !headers.iter().any(|header| header == *key))
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::MissingColumns(missing));
        }
        reader.set_headers(headers);

        let rows = reader
            .deserialize::<CsvRow>()
            .map(|row| row.map(ImportedRow::from).map_err(StoreError::from));
        let summary = self.import_rows(rows)?;
        log_import(&summary, path);
        Ok(summary)
    }

    fn import_rows(
        &self,
        rows: impl IntoIterator<Item = StoreResult<ImportedRow>>,
    ) -> StoreResult<ImportSummary> {
        let mut summary = ImportSummary::default();
        for (index, row) in rows.into_iter().enumerate() {
            let ImportedRow { raw, unreadable } = row?;
            let outcome = match unreadable {
                Some(errors) => Err(StoreError::from(errors)),
                None => validate(&raw)
                    .map_err(StoreError::from)
                    .and_then(|draft| self.create(&draft)),
            };

            match outcome {
                Ok(_) => summary.inserted += 1,
                Err(err @ (StoreError::Validation(_) | StoreError::DuplicateKey(_))) => {
                    warn!("skipping import row {index}: {err}");
                    summary.skipped.push(SkippedRow {
                        index,
                        roll: raw.roll.trim().to_string(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(summary)
    }
}

fn create_parent(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn log_import(summary: &ImportSummary, path: &Path) {
    info!(
        "imported {} students from {} ({} skipped)",
        summary.inserted,
        path.display(),
        summary.skipped.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(text: &str) -> serde_json::Number {
        serde_json::from_str(text).expect("number")
    }

    #[test]
    fn whole_floats_read_as_integers() {
        assert_eq!(number_text(&number("88.0")), "88");
        assert_eq!(number_text(&number("88")), "88");
        assert_eq!(number_text(&number("88.5")), "88.5");
        assert_eq!(number_text(&number("-3.0")), "-3");
    }

    #[test]
    fn non_scalar_values_mark_the_row_unreadable() {
        let row: JsonRow =
            serde_json::from_str(r#"{"roll": 7, "name": true, "course": "MCA", "marks": {"x": 1}}"#)
                .expect("row parses");
        let imported = ImportedRow::from(row);
        let errors = imported.unreadable.expect("unreadable fields");
        let fields: Vec<Field> = errors.fields().collect();
        assert_eq!(fields, [Field::Name, Field::Marks]);
        assert_eq!(imported.raw.roll, "7");
    }
}
