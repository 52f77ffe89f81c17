use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use student_registry_core::{DATE_FORMAT, Phone, Student, validate_student};
use student_registry_sqlite::{Migration, StudentRepository, open_database};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;

use config::CliConfig;

/// Output format for commands that print students.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Parser)]
#[command(name = "student-registry")]
#[command(about = "Manage students and their phones in a SQLite registry")]
struct Cli {
    /// Database file path (overrides the config file).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// YAML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create, drop, seed, or inspect the registry tables.
    Migrate(MigrateArgs),
    /// List students.
    List(ListArgs),
    /// Show one student with its phones.
    Show(ShowArgs),
    /// Add a student, optionally with phones.
    Add(AddArgs),
    /// Change a student's name or birth date.
    Update(UpdateArgs),
    /// Remove a student and its phones.
    Remove(RemoveArgs),
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(subcommand)]
    operation: MigrateOperation,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Create the tables.
    Up,
    /// Drop the tables.
    Down,
    /// Show table status and row counts.
    Status,
    /// Insert students from a JSON fixture.
    Seed(SeedArgs),
    /// Drop, recreate, and reseed from a JSON fixture.
    Refresh(SeedArgs),
}

#[derive(Debug, Args)]
struct SeedArgs {
    /// JSON file holding an array of students.
    #[arg(long)]
    source: PathBuf,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Only students born on this date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date, conflicts_with = "with_phones")]
    born_on: Option<NaiveDate>,
    /// Only students that have phones, with the phones included.
    #[arg(long)]
    with_phones: bool,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Student id.
    #[arg(long)]
    id: i64,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct AddArgs {
    /// Student name.
    #[arg(long)]
    name: String,
    /// Birth date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    birth_date: NaiveDate,
    /// Phone as AREA:NUMBER; may be repeated.
    #[arg(long = "phone", value_parser = parse_phone)]
    phones: Vec<Phone>,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    /// Student id.
    #[arg(long)]
    id: i64,
    /// New name.
    #[arg(long)]
    name: Option<String>,
    /// New birth date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    birth_date: Option<NaiveDate>,
}

#[derive(Debug, Args)]
struct RemoveArgs {
    /// Student id.
    #[arg(long)]
    id: i64,
}

fn main() {
    let cli = Cli::parse();

    let config = match CliConfig::load_optional(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };
    init_logging(config.log_filter());

    let db = config.database_path(cli.db.as_deref());
    debug!(db = %db.display(), "using database");

    let result = match cli.command {
        Command::Migrate(args) => run_migrate(&db, args),
        Command::List(args) => run_list(&db, args),
        Command::Show(args) => run_show(&db, args),
        Command::Add(args) => run_add(&db, args),
        Command::Update(args) => run_update(&db, args),
        Command::Remove(args) => run_remove(&db, args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Installs a stderr subscriber so stdout stays machine-readable.
fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(db: &Path) -> Result<Connection, String> {
    open_database(db).map_err(|e| format!("Failed to open database '{}': {e}", db.display()))
}

// ---------------------------------------------------------------------------
// migrate command
// ---------------------------------------------------------------------------

fn run_migrate(db: &Path, args: MigrateArgs) -> Result<(), String> {
    let mut migration =
        Migration::new(open(db)?).map_err(|e| format!("Failed to initialize migration: {e}"))?;

    match args.operation {
        MigrateOperation::Up => {
            migration
                .up()
                .map_err(|e| format!("Migration up failed: {e}"))?;
            println!("Migration up complete. Tables created in '{}'.", db.display());
        }
        MigrateOperation::Down => {
            migration
                .down()
                .map_err(|e| format!("Migration down failed: {e}"))?;
            println!("Migration down complete. Tables dropped from '{}'.", db.display());
        }
        MigrateOperation::Status => {
            let status = migration
                .status()
                .map_err(|e| format!("Failed to get migration status: {e}"))?;
            println!("Migration Status:");
            println!(
                "  Tables exist: {}",
                if status.tables_exist { "yes" } else { "no" }
            );
            println!("  Student count: {}", status.student_count);
            println!("  Phone count: {}", status.phone_count);
        }
        MigrateOperation::Seed(seed) => {
            let report = migration
                .seed(&seed.source)
                .map_err(|e| format!("Seed failed: {e}"))?;
            println!("Seed complete:");
            println!("  Students inserted: {}", report.students_inserted);
            println!("  Phones inserted: {}", report.phones_inserted);
        }
        MigrateOperation::Refresh(seed) => {
            let report = migration
                .refresh(&seed.source)
                .map_err(|e| format!("Refresh failed: {e}"))?;
            println!("Refresh complete (tables dropped, recreated, and reseeded):");
            println!("  Students inserted: {}", report.students_inserted);
            println!("  Phones inserted: {}", report.phones_inserted);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// read commands
// ---------------------------------------------------------------------------

fn run_list(db: &Path, args: ListArgs) -> Result<(), String> {
    let conn = open(db)?;
    let repo = StudentRepository::new(&conn);

    let students = if args.with_phones {
        repo.students_with_phones()
    } else if let Some(date) = args.born_on {
        repo.students_born_on(date)
    } else {
        repo.all_students()
    }
    .map_err(|e| format!("Failed to list students: {e}"))?;

    print!("{}", render_students(&students, args.format)?);
    Ok(())
}

fn run_show(db: &Path, args: ShowArgs) -> Result<(), String> {
    let conn = open(db)?;
    let repo = StudentRepository::new(&conn);

    let mut student = find_student(&repo, args.id)?;
    repo.fill_phones(&mut student)
        .map_err(|e| format!("Failed to load phones of student {}: {e}", args.id))?;

    print!("{}", render_students(std::slice::from_ref(&student), args.format)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// write commands
// ---------------------------------------------------------------------------

fn run_add(db: &Path, args: AddArgs) -> Result<(), String> {
    let mut student = Student::new(args.name, args.birth_date);
    for phone in &args.phones {
        student
            .add_phone(phone.clone())
            .map_err(|e| e.to_string())?;
    }
    check_valid(&student)?;

    let mut conn = open(db)?;
    let tx = conn
        .transaction()
        .map_err(|e| format!("Failed to start transaction: {e}"))?;
    {
        let repo = StudentRepository::new(&*tx);
        let phones = student.take_phones();
        let inserted = repo
            .save_and_assign(&mut student)
            .map_err(|e| format!("Failed to add student: {e}"))?;
        if !inserted {
            return Err(format!("Student '{}' was not inserted", student.name()));
        }
        for phone in phones {
            repo.save_phone(&mut student, phone)
                .map_err(|e| format!("Failed to add phone: {e}"))?;
        }
    }
    tx.commit()
        .map_err(|e| format!("Failed to commit: {e}"))?;

    println!(
        "Added student {} ({}) with {} phone(s).",
        student.id().unwrap_or_default(),
        student.name(),
        student.phones().len()
    );
    Ok(())
}

fn run_update(db: &Path, args: UpdateArgs) -> Result<(), String> {
    if args.name.is_none() && args.birth_date.is_none() {
        return Err("Nothing to update: pass --name and/or --birth-date".to_string());
    }

    let conn = open(db)?;
    let repo = StudentRepository::new(&conn);

    let mut student = find_student(&repo, args.id)?;
    if let Some(name) = args.name {
        student.rename(name);
    }
    if let Some(date) = args.birth_date {
        student.set_birth_date(date);
    }
    check_valid(&student)?;

    let updated = repo
        .save(&student)
        .map_err(|e| format!("Failed to update student {}: {e}", args.id))?;
    if !updated {
        return Err(format!("Student {} was not updated", args.id));
    }
    println!("Updated student {}.", args.id);
    Ok(())
}

fn run_remove(db: &Path, args: RemoveArgs) -> Result<(), String> {
    let conn = open(db)?;
    let repo = StudentRepository::new(&conn);

    let student = find_student(&repo, args.id)?;
    let removed = repo
        .remove(&student)
        .map_err(|e| format!("Failed to remove student {}: {e}", args.id))?;
    if !removed {
        return Err(format!("Student {} was not removed", args.id));
    }
    println!("Removed student {} ({}).", args.id, student.name());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find_student(repo: &StudentRepository<'_, Connection>, id: i64) -> Result<Student, String> {
    repo.student_by_id(id)
        .map_err(|e| format!("Failed to load student {id}: {e}"))?
        .ok_or_else(|| format!("Student {id} not found"))
}

fn check_valid(student: &Student) -> Result<(), String> {
    let errors = validate_student(student);
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    Err(format!("Invalid student: {}", messages.join("; ")))
}

fn render_students(students: &[Student], format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(students)
                .map_err(|e| format!("JSON serialization failed: {e}"))?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Table => Ok(render_table(students)),
    }
}

fn render_table(students: &[Student]) -> String {
    let mut out = String::new();
    for student in students {
        let id = student
            .id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let phones: Vec<String> = student.phones().iter().map(ToString::to_string).collect();
        out.push_str(&format!(
            "{id}\t{}\t{}\t{}\n",
            student.name(),
            student.birth_date_iso(),
            phones.join(", ")
        ));
    }
    out
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| format!("expected a YYYY-MM-DD date, got '{raw}': {e}"))
}

fn parse_phone(raw: &str) -> Result<Phone, String> {
    let (area_code, number) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected AREA:NUMBER, got '{raw}'"))?;
    let (area_code, number) = (area_code.trim(), number.trim());
    if area_code.is_empty() || number.is_empty() {
        return Err(format!("expected AREA:NUMBER, got '{raw}'"));
    }
    Ok(Phone::new(area_code, number))
}
