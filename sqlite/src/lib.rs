//! SQLite storage for student aggregates.
//!
//! This crate maps rows of the `students`/`phones` schema onto
//! [`Student`](student_registry_core::Student) aggregates and back. It
//! includes the row source abstraction, the hydrator that rebuilds nested
//! aggregates from flat result sets, the repository that callers use, and
//! migration lifecycle management for the two tables.
//!
//! # Architecture
//!
//! The crate is organized into six modules:
//!
//! - **`row`**: owned [`Row`]s and [`Value`]s with typed column access
//! - **`source`**: the [`RowSource`] trait and its `rusqlite` implementation
//! - **`hydrate`**: flat rows → students ([`hydrate_flat`], [`hydrate_joined`])
//! - **`repository`**: [`StudentRepository`] reads and writes
//! - **`schema`**: table and index SQL
//! - **`migration`**: lifecycle operations (up/down/seed/refresh/status)
//!
//! # Quick start: migrations
//!
//! ```no_run
//! use student_registry_sqlite::{Migration, open_database};
//!
//! let conn = open_database("students.db").unwrap();
//! let mut migration = Migration::new(conn).unwrap();
//!
//! migration.up().unwrap();
//! migration.seed("fixtures/students.json").unwrap();
//!
//! let status = migration.status().unwrap();
//! println!("Students: {}", status.student_count);
//! ```
//!
//! # Quick start: queries
//!
//! ```no_run
//! use student_registry_sqlite::{StudentRepository, open_database};
//!
//! let conn = open_database("students.db").unwrap();
//! let repo = StudentRepository::new(&conn);
//!
//! for student in repo.students_with_phones().unwrap() {
//!     println!("{} has {} phone(s)", student.name(), student.phones().len());
//! }
//! ```
//!
//! # Concurrency
//!
//! Every call blocks for one round-trip. A connection is not shared safely
//! between threads by this crate; use one connection per worker. The
//! hydration functions are pure and may run on any thread.

mod error;
mod hydrate;
mod migration;
mod repository;
mod row;
mod schema;
mod source;

pub use error::{Result, StoreError};
pub use hydrate::{hydrate_flat, hydrate_joined, hydrate_phones, parse_birth_date};
pub use migration::{Migration, MigrationStatus, SeedReport};
pub use repository::StudentRepository;
pub use row::{Row, Value};
pub use schema::{DROP_SQL, SCHEMA_SQL, TABLES};
pub use source::{RowSource, open_database, open_in_memory};
