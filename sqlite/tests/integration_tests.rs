//! Integration tests for the student-registry-sqlite crate.

use std::cell::RefCell;
use std::io::Write;

use chrono::NaiveDate;
use student_registry_core::{Lifecycle, Phone, Student};
use student_registry_sqlite::{
    Migration, Row, RowSource, StoreError, StudentRepository, Value, open_database, open_in_memory,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ---------------------------------------------------------------------------
// Recording row source
// ---------------------------------------------------------------------------

/// Row source that records every statement and answers with canned results.
struct RecordingSource {
    statements: RefCell<Vec<(String, Vec<Value>)>>,
    rows: Vec<Row>,
    affected: usize,
    next_id: i64,
}

impl RecordingSource {
    fn new() -> Self {
        Self {
            statements: RefCell::new(Vec::new()),
            rows: Vec::new(),
            affected: 1,
            next_id: 41,
        }
    }

    fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::new()
        }
    }

    fn affecting(affected: usize) -> Self {
        Self {
            affected,
            ..Self::new()
        }
    }

    fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.borrow().clone()
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.statements
            .borrow_mut()
            .push((normalize(sql), params.to_vec()));
    }
}

impl RowSource for RecordingSource {
    fn query_with(&self, sql: &str, params: &[Value]) -> student_registry_sqlite::Result<Vec<Row>> {
        self.record(sql, params);
        Ok(self.rows.clone())
    }

    fn execute(&self, sql: &str, params: &[Value]) -> student_registry_sqlite::Result<usize> {
        self.record(sql, params);
        Ok(self.affected)
    }

    fn last_insert_id(&self) -> i64 {
        self.next_id
    }
}

/// Row source whose every call fails as if the store were unreachable.
struct UnreachableSource;

impl RowSource for UnreachableSource {
    fn query_with(&self, _sql: &str, _params: &[Value]) -> student_registry_sqlite::Result<Vec<Row>> {
        Err(StoreError::ConnectionError(rusqlite::Error::InvalidQuery))
    }

    fn execute(&self, _sql: &str, _params: &[Value]) -> student_registry_sqlite::Result<usize> {
        Err(StoreError::ConnectionError(rusqlite::Error::InvalidQuery))
    }

    fn last_insert_id(&self) -> i64 {
        0
    }
}

fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn joined_row(
    id: i64,
    name: &str,
    birth_date: &str,
    phone_id: i64,
    area_code: &str,
    number: &str,
) -> Row {
    Row::new()
        .with("id", id)
        .with("name", name)
        .with("birth_date", birth_date)
        .with("phone_id", phone_id)
        .with("area_code", area_code)
        .with("number", number)
}

#[test]
fn save_transient_student_issues_insert_with_bound_fields() {
    let source = RecordingSource::new();
    let repo = StudentRepository::new(&source);
    let carla = Student::new("Carla", date(2001, 2, 3));

    assert!(repo.save(&carla).unwrap());

    let statements = source.statements();
    assert_eq!(statements.len(), 1);
    let (sql, params) = &statements[0];
    assert!(sql.starts_with("INSERT INTO students"));
    assert!(!sql.contains("Carla"));
    assert_eq!(
        params,
        &vec![Value::from("Carla"), Value::from("2001-02-03")]
    );
    // The in-memory entity is left transient.
    assert_eq!(carla.lifecycle(), Lifecycle::Transient);
}

#[test]
fn save_persisted_student_issues_update_keyed_by_id() {
    let source = RecordingSource::new();
    let repo = StudentRepository::new(&source);
    let ana = Student::persisted(7, "Ana", date(2000, 1, 1));

    assert!(repo.save(&ana).unwrap());

    let statements = source.statements();
    assert_eq!(statements.len(), 1);
    let (sql, params) = &statements[0];
    assert!(sql.starts_with("UPDATE students SET"));
    assert!(sql.ends_with("WHERE id = ?3"));
    assert_eq!(
        params,
        &vec![Value::from("Ana"), Value::from("2000-01-01"), Value::from(7)]
    );
}

#[test]
fn save_reports_false_when_no_row_is_affected() {
    let source = RecordingSource::affecting(0);
    let repo = StudentRepository::new(&source);

    assert!(!repo.save(&Student::persisted(99, "Nobody", date(2000, 1, 1))).unwrap());
}

#[test]
fn save_and_assign_records_store_id() {
    let source = RecordingSource::new();
    let repo = StudentRepository::new(&source);
    let mut carla = Student::new("Carla", date(2001, 2, 3));

    assert!(repo.save_and_assign(&mut carla).unwrap());
    assert_eq!(carla.id(), Some(41));
}

#[test]
fn save_and_assign_leaves_student_transient_when_insert_fails() {
    let source = RecordingSource::affecting(0);
    let repo = StudentRepository::new(&source);
    let mut carla = Student::new("Carla", date(2001, 2, 3));

    assert!(!repo.save_and_assign(&mut carla).unwrap());
    assert_eq!(carla.id(), None);
}

#[test]
fn remove_transient_student_fails_without_issuing_statements() {
    let source = RecordingSource::new();
    let repo = StudentRepository::new(&source);
    let student = Student::new("Ghost", date(2000, 1, 1));

    let err = repo.remove(&student).unwrap_err();
    assert!(matches!(err, StoreError::InvalidOperation(_)));
    assert!(source.statements().is_empty());
}

#[test]
fn remove_persisted_student_issues_delete_keyed_by_id() {
    let source = RecordingSource::new();
    let repo = StudentRepository::new(&source);

    assert!(repo.remove(&Student::persisted(3, "Bo", date(1999, 5, 5))).unwrap());

    let statements = source.statements();
    assert_eq!(
        statements,
        vec![(
            "DELETE FROM students WHERE id = ?1".to_string(),
            vec![Value::from(3)]
        )]
    );
}

#[test]
fn students_born_on_binds_iso_date() {
    let source = RecordingSource::with_rows(vec![
        Row::new()
            .with("id", 1)
            .with("name", "Ana")
            .with("birth_date", "2000-01-01"),
    ]);
    let repo = StudentRepository::new(&source);

    let students = repo.students_born_on(date(2000, 1, 1)).unwrap();

    assert_eq!(students.len(), 1);
    let (sql, params) = &source.statements()[0];
    assert!(sql.contains("WHERE birth_date = ?1"));
    assert_eq!(params, &vec![Value::from("2000-01-01")]);
}

#[test]
fn all_students_runs_parameterless_select() {
    let source = RecordingSource::with_rows(vec![
        Row::new()
            .with("id", 2)
            .with("name", "Bo")
            .with("birth_date", "1999-05-05"),
        Row::new()
            .with("id", 1)
            .with("name", "Ana")
            .with("birth_date", "2000-01-01"),
    ]);
    let repo = StudentRepository::new(&source);

    let students = repo.all_students().unwrap();

    let names: Vec<_> = students.iter().map(|s| s.name().to_string()).collect();
    assert_eq!(names, vec!["Bo", "Ana"]);
    let (sql, params) = &source.statements()[0];
    assert!(sql.starts_with("SELECT id, name, birth_date FROM students"));
    assert!(params.is_empty());
}

#[test]
fn students_with_phones_hydrates_reference_rows() {
    let source = RecordingSource::with_rows(vec![
        joined_row(1, "Ana", "2000-01-01", 10, "11", "9999"),
        joined_row(1, "Ana", "2000-01-01", 11, "11", "8888"),
        joined_row(2, "Bo", "1999-05-05", 12, "21", "7777"),
    ]);
    let repo = StudentRepository::new(&source);

    let students = repo.students_with_phones().unwrap();

    assert_eq!(students.len(), 2);
    assert_eq!(students[0].id(), Some(1));
    assert_eq!(
        students[0].phones(),
        &[
            Phone::persisted(10, "11", "9999"),
            Phone::persisted(11, "11", "8888")
        ]
    );
    assert_eq!(students[1].id(), Some(2));
    assert_eq!(students[1].phones(), &[Phone::persisted(12, "21", "7777")]);
    assert!(source.statements()[0].0.contains("JOIN phones"));
}

#[test]
fn malformed_rows_surface_to_caller() {
    let source = RecordingSource::with_rows(vec![
        Row::new()
            .with("id", 1)
            .with("name", "Ana")
            .with("birth_date", "first of january"),
    ]);
    let repo = StudentRepository::new(&source);

    assert!(matches!(
        repo.all_students(),
        Err(StoreError::MalformedRow { .. })
    ));
}

#[test]
fn connection_errors_propagate_from_reads_and_writes() {
    let repo = StudentRepository::new(&UnreachableSource);

    assert!(matches!(
        repo.all_students(),
        Err(StoreError::ConnectionError(_))
    ));
    assert!(matches!(
        repo.save(&Student::new("Carla", date(2001, 2, 3))),
        Err(StoreError::ConnectionError(_))
    ));
}

#[test]
fn save_phone_requires_persisted_owner() {
    let source = RecordingSource::new();
    let repo = StudentRepository::new(&source);
    let mut transient = Student::new("Carla", date(2001, 2, 3));

    let err = repo
        .save_phone(&mut transient, Phone::new("11", "9999"))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidOperation(_)));
    assert!(source.statements().is_empty());
    assert!(transient.phones().is_empty());
}

#[test]
fn save_phone_rejects_already_persisted_phone() {
    let source = RecordingSource::new();
    let repo = StudentRepository::new(&source);
    let mut ana = Student::persisted(1, "Ana", date(2000, 1, 1));

    let err = repo
        .save_phone(&mut ana, Phone::persisted(10, "11", "9999"))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidOperation(_)));
    assert!(source.statements().is_empty());
}

#[test]
fn save_phone_binds_owner_and_attaches_assigned_id() {
    let source = RecordingSource::new();
    let repo = StudentRepository::new(&source);
    let mut ana = Student::persisted(1, "Ana", date(2000, 1, 1));

    assert!(repo.save_phone(&mut ana, Phone::new("11", "9999")).unwrap());

    let (sql, params) = &source.statements()[0];
    assert!(sql.starts_with("INSERT INTO phones"));
    assert_eq!(
        params,
        &vec![Value::from("11"), Value::from("9999"), Value::from(1)]
    );
    assert_eq!(ana.phones(), &[Phone::persisted(41, "11", "9999")]);
}

#[test]
fn fill_phones_requires_persisted_student() {
    let source = RecordingSource::new();
    let repo = StudentRepository::new(&source);
    let mut transient = Student::new("Carla", date(2001, 2, 3));

    assert!(matches!(
        repo.fill_phones(&mut transient),
        Err(StoreError::InvalidOperation(_))
    ));
    assert!(source.statements().is_empty());
}

// ---------------------------------------------------------------------------
// SQLite-backed tests
// ---------------------------------------------------------------------------

fn migrated_connection() -> rusqlite::Connection {
    let mut migration = Migration::new(open_in_memory().unwrap()).unwrap();
    migration.up().unwrap();
    migration.into_connection()
}

fn write_fixture(dir: &tempfile::TempDir, name: &str, json: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(json.as_bytes()).unwrap();
    path
}

#[test]
fn sqlite_student_lifecycle() {
    let conn = migrated_connection();
    let repo = StudentRepository::new(&conn);

    // Transient -> persisted
    let mut carla = Student::new("Carla", date(2001, 2, 3));
    assert!(repo.save_and_assign(&mut carla).unwrap());
    let id = carla.id().unwrap();

    let stored = repo.student_by_id(id).unwrap().unwrap();
    assert_eq!(stored.name(), "Carla");
    assert_eq!(stored.birth_date(), date(2001, 2, 3));

    // Persisted -> updated
    carla.rename("Carla Souza");
    carla.set_birth_date(date(2001, 2, 4));
    assert!(repo.save(&carla).unwrap());
    let stored = repo.student_by_id(id).unwrap().unwrap();
    assert_eq!(stored.name(), "Carla Souza");
    assert!(repo.students_born_on(date(2001, 2, 3)).unwrap().is_empty());
    assert_eq!(repo.students_born_on(date(2001, 2, 4)).unwrap().len(), 1);

    // Persisted -> deleted; the id stays in memory.
    assert!(repo.remove(&carla).unwrap());
    assert_eq!(carla.id(), Some(id));
    assert!(repo.student_by_id(id).unwrap().is_none());
    assert!(!repo.remove(&carla).unwrap());
}

#[test]
fn sqlite_save_does_not_assign_id() {
    let conn = migrated_connection();
    let repo = StudentRepository::new(&conn);
    let carla = Student::new("Carla", date(2001, 2, 3));

    assert!(repo.save(&carla).unwrap());
    assert_eq!(carla.id(), None);

    let all = repo.all_students().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name(), "Carla");
    assert!(all[0].is_persisted());
}

#[test]
fn sqlite_update_of_missing_row_reports_false() {
    let conn = migrated_connection();
    let repo = StudentRepository::new(&conn);

    assert!(!repo.save(&Student::persisted(404, "Nobody", date(2000, 1, 1))).unwrap());
}

#[test]
fn sqlite_students_with_phones_groups_rows() {
    let conn = migrated_connection();
    let repo = StudentRepository::new(&conn);

    let mut ana = Student::new("Ana", date(2000, 1, 1));
    let mut bo = Student::new("Bo", date(1999, 5, 5));
    let mut cy = Student::new("Cy", date(2002, 12, 31));
    repo.save_and_assign(&mut ana).unwrap();
    repo.save_and_assign(&mut bo).unwrap();
    repo.save_and_assign(&mut cy).unwrap();

    // Interleave phone inserts across students.
    repo.save_phone(&mut ana, Phone::new("11", "9999")).unwrap();
    repo.save_phone(&mut bo, Phone::new("21", "7777")).unwrap();
    repo.save_phone(&mut ana, Phone::new("11", "8888")).unwrap();

    let students = repo.students_with_phones().unwrap();

    // Cy has no phones and the join is inner.
    assert_eq!(students.len(), 2);
    assert_eq!(students[0].name(), "Ana");
    assert_eq!(students[0].phones(), ana.phones());
    assert_eq!(students[1].name(), "Bo");
    assert_eq!(students[1].phones(), bo.phones());
}

#[test]
fn sqlite_fill_phones_loads_owned_phones_only() {
    let conn = migrated_connection();
    let repo = StudentRepository::new(&conn);

    let mut ana = Student::new("Ana", date(2000, 1, 1));
    let mut bo = Student::new("Bo", date(1999, 5, 5));
    repo.save_and_assign(&mut ana).unwrap();
    repo.save_and_assign(&mut bo).unwrap();
    repo.save_phone(&mut ana, Phone::new("11", "9999")).unwrap();
    repo.save_phone(&mut bo, Phone::new("21", "7777")).unwrap();

    let mut loaded = repo.student_by_id(ana.id().unwrap()).unwrap().unwrap();
    assert!(loaded.phones().is_empty());
    repo.fill_phones(&mut loaded).unwrap();
    assert_eq!(loaded.phones(), ana.phones());

    // Filling twice would attach the same ids again.
    assert!(matches!(
        repo.fill_phones(&mut loaded),
        Err(StoreError::AggregateError(_))
    ));
}

#[test]
fn sqlite_remove_cascades_to_phones() {
    let conn = migrated_connection();
    let repo = StudentRepository::new(&conn);

    let mut ana = Student::new("Ana", date(2000, 1, 1));
    repo.save_and_assign(&mut ana).unwrap();
    repo.save_phone(&mut ana, Phone::new("11", "9999")).unwrap();

    assert!(repo.remove(&ana).unwrap());

    let phones: i64 = conn
        .query_row("SELECT COUNT(*) FROM phones", [], |row| row.get(0))
        .unwrap();
    assert_eq!(phones, 0);
}

#[test]
fn sqlite_parameters_are_never_interpreted_as_sql() {
    let conn = migrated_connection();
    let repo = StudentRepository::new(&conn);
    let hostile = "Robert'); DROP TABLE students; --";

    let mut student = Student::new(hostile, date(2000, 1, 1));
    assert!(repo.save_and_assign(&mut student).unwrap());

    let stored = repo.all_students().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name(), hostile);
}

#[test]
fn sqlite_unparseable_stored_date_is_malformed() {
    let conn = migrated_connection();
    conn.execute(
        "INSERT INTO students (name, birth_date) VALUES ('Ana', 'not-a-date')",
        [],
    )
    .unwrap();

    let repo = StudentRepository::new(&conn);
    let err = repo.all_students().unwrap_err();
    assert!(matches!(
        err,
        StoreError::MalformedRow { ref column, .. } if column == "birth_date"
    ));
}

#[test]
fn sqlite_missing_tables_are_connection_errors() {
    let conn = open_in_memory().unwrap();
    let repo = StudentRepository::new(&conn);

    assert!(matches!(
        repo.all_students(),
        Err(StoreError::ConnectionError(_))
    ));
}

#[test]
fn sqlite_on_disk_database_persists_between_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("students.db");

    {
        let mut migration = Migration::new(open_database(&path).unwrap()).unwrap();
        migration.up().unwrap();
        let conn = migration.into_connection();
        let repo = StudentRepository::new(&conn);
        repo.save(&Student::new("Ana", date(2000, 1, 1))).unwrap();
    }

    let conn = open_database(&path).unwrap();
    let repo = StudentRepository::new(&conn);
    let all = repo.all_students().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name(), "Ana");
}

#[test]
fn sqlite_repository_over_transaction_rolls_back() {
    let mut conn = migrated_connection();
    {
        let tx = conn.transaction().unwrap();
        let repo = StudentRepository::new(&*tx);
        repo.save(&Student::new("Ana", date(2000, 1, 1))).unwrap();
        assert_eq!(repo.all_students().unwrap().len(), 1);
        // Dropped without commit.
    }

    let repo = StudentRepository::new(&conn);
    assert!(repo.all_students().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Migration seeding
// ---------------------------------------------------------------------------

const FIXTURE: &str = r#"[
    {
        "name": "Ana",
        "birth_date": "2000-01-01",
        "phones": [
            {"area_code": "11", "number": "9999"},
            {"area_code": "11", "number": "8888"}
        ]
    },
    {"id": 99, "name": "Bo", "birth_date": "1999-05-05", "phones": [{"area_code": "21", "number": "7777"}]},
    {"name": "Cy", "birth_date": "2002-12-31"}
]"#;

#[test]
fn seed_inserts_students_and_phones() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(&dir, "students.json", FIXTURE);

    let mut migration = Migration::new(open_in_memory().unwrap()).unwrap();
    migration.up().unwrap();
    let report = migration.seed(&fixture).unwrap();

    assert_eq!(report.students_inserted, 3);
    assert_eq!(report.phones_inserted, 3);

    let status = migration.status().unwrap();
    assert_eq!(status.student_count, 3);
    assert_eq!(status.phone_count, 3);

    let conn = migration.into_connection();
    let repo = StudentRepository::new(&conn);
    let with_phones = repo.students_with_phones().unwrap();
    assert_eq!(with_phones.len(), 2);
    assert_eq!(with_phones[0].name(), "Ana");
    assert_eq!(with_phones[0].phones().len(), 2);
    // Fixture ids are ignored.
    assert_ne!(with_phones[1].id(), Some(99));
}

#[test]
fn seed_rejects_invalid_fixture_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(
        &dir,
        "invalid.json",
        r#"[
            {"name": "Ana", "birth_date": "2000-01-01"},
            {"name": " ", "birth_date": "1999-05-05"}
        ]"#,
    );

    let mut migration = Migration::new(open_in_memory().unwrap()).unwrap();
    migration.up().unwrap();
    let err = migration.seed(&fixture).unwrap_err();

    assert!(matches!(err, StoreError::MigrationError(_)));
    assert_eq!(migration.status().unwrap().student_count, 0);
}

#[test]
fn seed_reports_unparseable_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(
        &dir,
        "broken.json",
        r#"[{"name": "Ana", "birth_date": "01/01/2000"}]"#,
    );

    let mut migration = Migration::new(open_in_memory().unwrap()).unwrap();
    migration.up().unwrap();

    assert!(matches!(
        migration.seed(&fixture),
        Err(StoreError::FixtureError(_))
    ));
}

#[test]
fn seed_reports_missing_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let mut migration = Migration::new(open_in_memory().unwrap()).unwrap();
    migration.up().unwrap();

    assert!(matches!(
        migration.seed(dir.path().join("absent.json")),
        Err(StoreError::IoError(_))
    ));
}

#[test]
fn refresh_replaces_existing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(&dir, "students.json", FIXTURE);

    let mut migration = Migration::new(open_in_memory().unwrap()).unwrap();
    migration.up().unwrap();
    migration.seed(&fixture).unwrap();
    let report = migration.refresh(&fixture).unwrap();

    assert_eq!(report.students_inserted, 3);
    assert_eq!(migration.status().unwrap().student_count, 3);
}
