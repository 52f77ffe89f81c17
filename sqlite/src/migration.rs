//! Migration lifecycle operations for the registry tables.
//!
//! Provides [`Migration`] for creating, dropping, seeding, and refreshing
//! the `students` and `phones` tables. All mutation operations use
//! transactions so that either every change is applied or none is.
//!
//! # Example
//!
//! ```no_run
//! use student_registry_sqlite::{Migration, open_database};
//!
//! let conn = open_database("students.db").unwrap();
//! let mut migration = Migration::new(conn).unwrap();
//!
//! migration.up().unwrap();
//! let report = migration.seed("fixtures/students.json").unwrap();
//! println!("{} students, {} phones", report.students_inserted, report.phones_inserted);
//!
//! let status = migration.status().unwrap();
//! assert!(status.tables_exist);
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rusqlite::Connection;
use student_registry_core::{Phone, Student, validate_student};
use tracing::info;

use crate::error::{Result, StoreError};
use crate::repository::StudentRepository;
use crate::schema::{DROP_SQL, SCHEMA_SQL};

/// Manages the lifecycle of the registry tables.
///
/// Owns its connection; use [`into_connection`](Self::into_connection) to
/// hand it on to a repository once the tables are in place.
pub struct Migration {
    conn: Connection,
}

impl Migration {
    /// Creates a migration manager and turns foreign key enforcement on.
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Creates the tables and indexes. Safe to call repeatedly.
    pub fn up(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(SCHEMA_SQL)
            .map_err(|e| StoreError::MigrationError(format!("failed to create tables: {e}")))?;
        tx.commit()?;
        info!("registry tables created");
        Ok(())
    }

    /// Drops the tables. Safe to call when they do not exist.
    pub fn down(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(DROP_SQL)
            .map_err(|e| StoreError::MigrationError(format!("failed to drop tables: {e}")))?;
        tx.commit()?;
        info!("registry tables dropped");
        Ok(())
    }

    /// Reports whether the tables exist and how many rows they hold.
    pub fn status(&self) -> Result<MigrationStatus> {
        if !self.tables_exist()? {
            return Ok(MigrationStatus::default());
        }

        Ok(MigrationStatus {
            tables_exist: true,
            student_count: self.count_rows("students")?,
            phone_count: self.count_rows("phones")?,
        })
    }

    /// Seeds the tables from a JSON file holding an array of students.
    ///
    /// Each entry looks like
    /// `{"name": "Ana", "birth_date": "2000-01-01", "phones": [{"area_code": "11", "number": "9999"}]}`.
    /// Ids in the fixture are ignored; the store assigns fresh ones. Every
    /// student is validated before anything is written, and all inserts run
    /// in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] or [`StoreError::FixtureError`] if the
    /// file cannot be read or parsed, and [`StoreError::MigrationError`] if a
    /// student fails validation.
    pub fn seed(&mut self, fixture: impl AsRef<Path>) -> Result<SeedReport> {
        let fixture = fixture.as_ref();
        let reader = BufReader::new(File::open(fixture)?);
        let students: Vec<Student> = serde_json::from_reader(reader)?;

        for (idx, student) in students.iter().enumerate() {
            let errors = validate_student(student);
            if !errors.is_empty() {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                return Err(StoreError::MigrationError(format!(
                    "fixture entry {idx} ('{}') is invalid: {}",
                    student.name(),
                    messages.join("; ")
                )));
            }
        }

        let tx = self.conn.transaction()?;
        let mut report = SeedReport::default();
        {
            let repo = StudentRepository::new(&*tx);
            for mut fixture_student in students {
                let phones = fixture_student.take_phones();
                let mut student = Student::new(fixture_student.name(), fixture_student.birth_date());
                if !repo.save_and_assign(&mut student)? {
                    return Err(StoreError::MigrationError(format!(
                        "insert of '{}' affected no rows",
                        student.name()
                    )));
                }
                report.students_inserted += 1;

                for phone in phones {
                    let phone = Phone::new(phone.area_code(), phone.number());
                    if repo.save_phone(&mut student, phone)? {
                        report.phones_inserted += 1;
                    }
                }
            }
        }
        tx.commit()?;

        info!(
            fixture = %fixture.display(),
            students = report.students_inserted,
            phones = report.phones_inserted,
            "seed complete"
        );
        Ok(report)
    }

    /// Drops the tables, recreates them, and seeds from the given fixture.
    pub fn refresh(&mut self, fixture: impl AsRef<Path>) -> Result<SeedReport> {
        self.down()?;
        self.up()?;
        self.seed(fixture)
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the migration and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn tables_exist(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'students'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn count_rows(&self, table: &str) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        usize::try_from(count).map_err(|e| {
            StoreError::MigrationError(format!("invalid row count {count} for {table}: {e}"))
        })
    }
}

/// Snapshot returned by [`Migration::status`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Whether the `students` table exists.
    pub tables_exist: bool,
    pub student_count: usize,
    pub phone_count: usize,
}

/// Counts of rows written by [`Migration::seed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub students_inserted: usize,
    pub phones_inserted: usize,
}
