//! Reading and writing student aggregates through a [`RowSource`].
//!
//! Provides [`StudentRepository`], the public contract consumed by callers.
//! Reads run one statement and hand the rows to the [`hydrate`](crate::hydrate)
//! functions; writes bind entity fields as positional parameters and report
//! whether the statement touched a row. SQL text is fixed: nothing from an
//! entity is ever spliced into it.
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use student_registry_core::{Phone, Student};
//! use student_registry_sqlite::{StudentRepository, open_database};
//!
//! let conn = open_database("students.db").unwrap();
//! let repo = StudentRepository::new(&conn);
//!
//! let mut carla = Student::new("Carla", NaiveDate::from_ymd_opt(2001, 2, 3).unwrap());
//! repo.save_and_assign(&mut carla).unwrap();
//! repo.save_phone(&mut carla, Phone::new("11", "91234-5678")).unwrap();
//!
//! for student in repo.students_with_phones().unwrap() {
//!     println!("{} has {} phone(s)", student.name(), student.phones().len());
//! }
//! ```

use chrono::NaiveDate;
use student_registry_core::{DATE_FORMAT, Phone, Student};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::hydrate::{hydrate_flat, hydrate_joined, hydrate_phones};
use crate::row::Value;
use crate::source::RowSource;

const SELECT_ALL_STUDENTS: &str = "SELECT id, name, birth_date FROM students ORDER BY id";
const SELECT_STUDENTS_BORN_ON: &str =
    "SELECT id, name, birth_date FROM students WHERE birth_date = ?1 ORDER BY id";
const SELECT_STUDENT_BY_ID: &str = "SELECT id, name, birth_date FROM students WHERE id = ?1";
const SELECT_STUDENTS_WITH_PHONES: &str = "
    SELECT students.id,
           students.name,
           students.birth_date,
           phones.id AS phone_id,
           phones.area_code,
           phones.number
      FROM students
      JOIN phones ON students.id = phones.student_id
     ORDER BY students.id, phones.id
";
const SELECT_PHONES_OF_STUDENT: &str =
    "SELECT id, area_code, number FROM phones WHERE student_id = ?1 ORDER BY id";
const INSERT_STUDENT: &str = "INSERT INTO students (name, birth_date) VALUES (?1, ?2)";
const UPDATE_STUDENT: &str = "UPDATE students SET name = ?1, birth_date = ?2 WHERE id = ?3";
const DELETE_STUDENT: &str = "DELETE FROM students WHERE id = ?1";
const INSERT_PHONE: &str = "INSERT INTO phones (area_code, number, student_id) VALUES (?1, ?2, ?3)";

/// Repository for [`Student`] aggregates.
///
/// Borrows its row source for its whole lifetime; the caller owns the
/// connection and decides when it is opened and closed. Every method issues
/// at most one statement and performs no retries.
///
/// # Examples
///
/// ```no_run
/// # use chrono::NaiveDate;
/// # use student_registry_sqlite::{StudentRepository, open_database};
/// let conn = open_database("students.db").unwrap();
/// let repo = StudentRepository::new(&conn);
///
/// let born = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
/// for student in repo.students_born_on(born).unwrap() {
///     println!("{}", student.name());
/// }
/// ```
pub struct StudentRepository<'a, S: RowSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: RowSource + ?Sized> StudentRepository<'a, S> {
    /// Creates a repository over the given row source.
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Every stored student, without phones.
    pub fn all_students(&self) -> Result<Vec<Student>> {
        let rows = self.source.query(SELECT_ALL_STUDENTS)?;
        hydrate_flat(&rows)
    }

    /// Students whose birth date equals `date`, without phones.
    pub fn students_born_on(&self, date: NaiveDate) -> Result<Vec<Student>> {
        let param = Value::from(date.format(DATE_FORMAT).to_string());
        let rows = self.source.query_with(SELECT_STUDENTS_BORN_ON, &[param])?;
        hydrate_flat(&rows)
    }

    /// Students that own at least one phone, each with its phones attached.
    pub fn students_with_phones(&self) -> Result<Vec<Student>> {
        let rows = self.source.query(SELECT_STUDENTS_WITH_PHONES)?;
        let students = hydrate_joined(&rows)?;
        debug!(
            rows = rows.len(),
            students = students.len(),
            "hydrated students with phones"
        );
        Ok(students)
    }

    /// Looks up one student by id, without phones.
    pub fn student_by_id(&self, id: i64) -> Result<Option<Student>> {
        let rows = self.source.query_with(SELECT_STUDENT_BY_ID, &[id.into()])?;
        Ok(hydrate_flat(&rows)?.into_iter().next())
    }

    /// Loads the stored phones of a persisted student and attaches them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] for a transient student, and
    /// [`StoreError::AggregateError`] if a loaded phone is already attached.
    pub fn fill_phones(&self, student: &mut Student) -> Result<()> {
        let id = require_id(student, "load phones of")?;
        let rows = self.source.query_with(SELECT_PHONES_OF_STUDENT, &[id.into()])?;
        for phone in hydrate_phones(&rows)? {
            student.add_phone(phone)?;
        }
        Ok(())
    }

    /// Inserts a transient student or updates a persisted one.
    ///
    /// Returns whether the statement affected a row. The student is not
    /// modified: after an insert it is still transient in memory. Use
    /// [`save_and_assign`](Self::save_and_assign) to pick up the new id.
    pub fn save(&self, student: &Student) -> Result<bool> {
        match student.id() {
            None => self.insert(student),
            Some(id) => self.update(id, student),
        }
    }

    /// Like [`save`](Self::save), but records the store-assigned id on the
    /// student after a successful insert.
    pub fn save_and_assign(&self, student: &mut Student) -> Result<bool> {
        if student.is_persisted() {
            return self.save(student);
        }
        let inserted = self.insert(student)?;
        if inserted {
            student.assign_id(self.source.last_insert_id());
        }
        Ok(inserted)
    }

    /// Deletes a persisted student. Its phones go with it.
    ///
    /// Returns whether a row was deleted; `false` means no row had the id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] for a transient student,
    /// before any statement is issued.
    pub fn remove(&self, student: &Student) -> Result<bool> {
        let id = require_id(student, "remove")?;
        let affected = self.source.execute(DELETE_STUDENT, &[id.into()])?;
        info!(student_id = id, removed = affected > 0, "remove student");
        Ok(affected > 0)
    }

    /// Stores a new phone for a persisted student and attaches it, with its
    /// assigned id, to the student's collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidOperation`] if the student is transient
    /// or the phone already has an id, before any statement is issued.
    pub fn save_phone(&self, student: &mut Student, phone: Phone) -> Result<bool> {
        let student_id = require_id(student, "add a phone to")?;
        if let Some(phone_id) = phone.id() {
            return Err(StoreError::InvalidOperation(format!(
                "phone {phone_id} is already persisted"
            )));
        }

        let affected = self.source.execute(
            INSERT_PHONE,
            &[
                phone.area_code().into(),
                phone.number().into(),
                student_id.into(),
            ],
        )?;
        if affected == 0 {
            return Ok(false);
        }

        let phone_id = self.source.last_insert_id();
        info!(student_id, phone_id, "insert phone");
        student.add_phone(Phone::persisted(phone_id, phone.area_code(), phone.number()))?;
        Ok(true)
    }

    fn insert(&self, student: &Student) -> Result<bool> {
        let affected = self.source.execute(
            INSERT_STUDENT,
            &[student.name().into(), student.birth_date_iso().into()],
        )?;
        info!(name = student.name(), inserted = affected > 0, "insert student");
        Ok(affected > 0)
    }

    fn update(&self, id: i64, student: &Student) -> Result<bool> {
        let affected = self.source.execute(
            UPDATE_STUDENT,
            &[
                student.name().into(),
                student.birth_date_iso().into(),
                id.into(),
            ],
        )?;
        info!(student_id = id, updated = affected > 0, "update student");
        Ok(affected > 0)
    }
}

fn require_id(student: &Student, action: &str) -> Result<i64> {
    student.id().ok_or_else(|| {
        StoreError::InvalidOperation(format!(
            "cannot {action} student '{}': it has not been persisted",
            student.name()
        ))
    })
}
