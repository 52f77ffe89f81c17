//! SQL for the two registry tables.
//!
//! - `students`: id, name, birth date (stored as `YYYY-MM-DD` text)
//! - `phones`: id, area code, number, and the owning student's id
//!
//! Deleting a student cascades to its phones when foreign keys are enabled
//! (see [`open_database`](crate::open_database)).

/// Names of the tables created by [`SCHEMA_SQL`], in dependency order.
pub const TABLES: [&str; 2] = ["students", "phones"];

/// Creates both tables and the phone lookup index.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    birth_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS phones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    area_code TEXT NOT NULL,
    number TEXT NOT NULL,
    student_id INTEGER NOT NULL,
    FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_phones_student ON phones(student_id);
CREATE INDEX IF NOT EXISTS idx_students_birth_date ON students(birth_date);
"#;

/// Drops both tables in reverse dependency order.
pub const DROP_SQL: &str = r#"
DROP TABLE IF EXISTS phones;
DROP TABLE IF EXISTS students;
"#;
