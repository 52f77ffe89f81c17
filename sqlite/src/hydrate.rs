//! Rehydration of flat result rows into student aggregates.
//!
//! Two shapes of result set are understood:
//!
//! - **flat** rows from the `students` table alone, one student per row
//!   ([`hydrate_flat`]);
//! - **joined** rows from `students JOIN phones`, where each row repeats the
//!   student columns next to one phone ([`hydrate_joined`]).
//!
//! Joined hydration folds the rows back into one [`Student`] per distinct
//! student id. Students come out in the order their id was first seen and
//! each student's phones keep row order, whatever the interleaving of the
//! input.
//!
//! # Columns
//!
//! | column       | shape   | required                         |
//! |--------------|---------|----------------------------------|
//! | `id`         | integer | always                           |
//! | `name`       | text    | always                           |
//! | `birth_date` | text    | always, `YYYY-MM-DD`             |
//! | `phone_id`   | integer | joined rows; null means no phone |
//! | `area_code`  | text    | when `phone_id` is set           |
//! | `number`     | text    | when `phone_id` is set           |

use std::collections::HashMap;

use chrono::NaiveDate;
use student_registry_core::{DATE_FORMAT, Phone, Student};
use tracing::warn;

use crate::error::{Result, StoreError};
use crate::row::Row;

/// Builds one student per row, in row order, without phones.
///
/// # Errors
///
/// Returns [`StoreError::MalformedRow`] if a row lacks `id`, `name` or
/// `birth_date`, or if the birth date does not parse.
pub fn hydrate_flat(rows: &[Row]) -> Result<Vec<Student>> {
    rows.iter().map(student_from_row).collect()
}

/// Folds joined student/phone rows into deduplicated student aggregates.
///
/// A row whose `phone_id` is absent or null (left-join shape) registers its
/// student without adding a phone. A row that repeats a phone already
/// attached to its student is skipped when identical and rejected when the
/// phone data differs.
///
/// # Errors
///
/// Returns [`StoreError::MalformedRow`] for missing or mistyped columns, an
/// unparseable birth date, or conflicting data for the same phone id.
///
/// # Examples
///
/// ```
/// use student_registry_sqlite::{Row, hydrate_joined};
///
/// let row = |id: i64, name: &str, phone_id: i64, number: &str| {
///     Row::new()
///         .with("id", id)
///         .with("name", name)
///         .with("birth_date", "2000-01-01")
///         .with("phone_id", phone_id)
///         .with("area_code", "11")
///         .with("number", number)
/// };
///
/// let students = hydrate_joined(&[
///     row(1, "Ana", 10, "9999"),
///     row(2, "Bo", 12, "7777"),
///     row(1, "Ana", 11, "8888"),
/// ])
/// .unwrap();
///
/// assert_eq!(students.len(), 2);
/// assert_eq!(students[0].name(), "Ana");
/// assert_eq!(students[0].phones().len(), 2);
/// assert_eq!(students[1].phones()[0].number(), "7777");
/// ```
pub fn hydrate_joined(rows: &[Row]) -> Result<Vec<Student>> {
    let mut students: Vec<Student> = Vec::new();
    let mut index_by_id: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        // Every row must carry well-formed student columns; the first row
        // for an id supplies the values.
        let student = student_from_row(row)?;
        let student_id = row.require_i64("id")?;
        let idx = match index_by_id.get(&student_id).copied() {
            Some(idx) => idx,
            None => {
                index_by_id.insert(student_id, students.len());
                students.push(student);
                students.len() - 1
            }
        };

        let Some(phone) = phone_from_joined_row(row)? else {
            continue;
        };
        attach_phone(&mut students[idx], phone)?;
    }

    Ok(students)
}

/// Builds phones from rows of `SELECT id, area_code, number FROM phones`.
pub fn hydrate_phones(rows: &[Row]) -> Result<Vec<Phone>> {
    rows.iter()
        .map(|row| {
            Ok(Phone::persisted(
                row.require_i64("id")?,
                row.require_text_like("area_code")?,
                row.require_text_like("number")?,
            ))
        })
        .collect()
}

/// Parses a stored `YYYY-MM-DD` birth date.
pub fn parse_birth_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
        StoreError::malformed("birth_date", format!("is not a YYYY-MM-DD date ({raw:?}): {e}"))
    })
}

fn student_from_row(row: &Row) -> Result<Student> {
    let id = row.require_i64("id")?;
    let name = row.require_text("name")?;
    let birth_date = parse_birth_date(row.require_text("birth_date")?)?;
    Ok(Student::persisted(id, name, birth_date))
}

fn phone_from_joined_row(row: &Row) -> Result<Option<Phone>> {
    let Some(phone_id) = row.optional_i64("phone_id")? else {
        return Ok(None);
    };
    Ok(Some(Phone::persisted(
        phone_id,
        row.require_text_like("area_code")?,
        row.require_text_like("number")?,
    )))
}

fn attach_phone(student: &mut Student, phone: Phone) -> Result<()> {
    if let Some(phone_id) = phone.id() {
        if let Some(existing) = student.phone(phone_id) {
            if *existing == phone {
                warn!(
                    student_id = student.id(),
                    phone_id, "skipping repeated join row for phone"
                );
                return Ok(());
            }
            return Err(StoreError::malformed(
                "phone_id",
                format!(
                    "{phone_id} appears twice for student {} with different data",
                    student.id().unwrap_or_default()
                ),
            ));
        }
    }
    student.add_phone(phone)?;
    Ok(())
}
