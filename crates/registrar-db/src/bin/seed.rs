//! # Seed Data Generator
//!
//! Populates a registrar database with one term of development data, going
//! through the same admission workflows as production callers.
//!
//! ## Usage
//! ```bash
//! # Seed ./registrar_dev.db
//! cargo run -p registrar-db --bin seed
//!
//! # Specify database path
//! cargo run -p registrar-db --bin seed -- --db ./data/registrar.db
//!
//! # Use a config file (policies, pool sizing)
//! cargo run -p registrar-db --bin seed -- --config ./registrar.toml
//! ```
//!
//! ## Generated Data
//! - 6 teachers, each with one class on a distinct weekday slot
//! - 24 students enrolled in three classes each
//! - A MIDTERM (one absentee) and a FINAL for the first class, graded
//! - Four weeks of roll calls for the first class
//! - Two homerooms splitting the students

use chrono::{Duration, Local, NaiveDate, Weekday};
use registrar_core::{
    Actor, AttendanceMark, AttendanceRequest, AttendanceStatus, AttendanceType, ClassBooking, ClassSpec,
    ExamRequest, ExamType, HomeroomStatus, Money, RosterEntry, TimeWindow, WeeklySlot,
};
use registrar_db::{Database, RegistrarConfig};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// (teacher, room, subject, weekday, first period, last period)
const CLASSES: &[(&str, &str, &str, Weekday, u8, u8)] = &[
    ("t-alvarez", "A-101", "Algebra", Weekday::Mon, 1, 2),
    ("t-bianchi", "A-102", "Biology", Weekday::Mon, 3, 4),
    ("t-chen", "B-201", "Chemistry", Weekday::Tue, 1, 2),
    ("t-dubois", "B-202", "French", Weekday::Wed, 2, 3),
    ("t-eze", "C-301", "History", Weekday::Thu, 1, 3),
    ("t-fischer", "C-302", "Physics", Weekday::Fri, 4, 5),
];

const FIRST_NAMES: &[&str] = &["Ada", "Ben", "Cleo", "Dara", "Eli", "Fay", "Gus", "Hana"];
const LAST_NAMES: &[&str] = &["Moreau", "Okafor", "Silva"];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,registrar=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn term_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 2).unwrap_or_default()
}

fn term_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 31).unwrap_or_default()
}

fn class_spec(
    (teacher, room, subject, day, from, to): (&str, &str, &str, Weekday, u8, u8),
) -> Result<ClassSpec, Box<dyn std::error::Error>> {
    Ok(ClassSpec {
        class_name: format!("{subject} ({day})"),
        description: Some(format!("{subject} taught by {teacher}")),
        teacher_id: teacher.to_string(),
        subject_id: subject.to_lowercase(),
        room: room.to_string(),
        window: TimeWindow::new(term_start(), term_end(), Some(WeeklySlot::new(day, from, to)?))?,
        tuition: Money::from_cents(250_000),
        tuition_due_date: term_start() + Duration::days(30),
        final_term_weight: 0.6,
        absence_warning_threshold: 3,
        absence_limit: 5,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Registrar Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./registrar_dev.db)");
                println!("  -c, --config <PATH>    registrar.toml to load policies from");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = RegistrarConfig::load(config_path)?;
    config.database.path = db_path.unwrap_or_else(|| PathBuf::from("./registrar_dev.db"));

    println!("🌱 Registrar Seed Data Generator");
    println!("================================");
    println!("Database: {}", config.database.path.display());
    println!("Policy:   {:?}", config.policy);
    println!();

    let db = Database::new(config.to_db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.classes().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} classes", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let office = Actor::admin("seed");
    let admissions = db.admissions();
    let today = Local::now().date_naive();
    let start = std::time::Instant::now();

    // Classes
    let mut classes: Vec<ClassBooking> = Vec::with_capacity(CLASSES.len());
    for row in CLASSES {
        classes.push(admissions.create_class(&office, class_spec(*row)?).await?);
    }
    println!("✓ Booked {} classes", classes.len());

    // Students
    let mut student_ids = Vec::new();
    for last in LAST_NAMES {
        for first in FIRST_NAMES {
            student_ids.push(db.students().create(&format!("{first} {last}")).await?.id);
        }
    }
    println!("✓ Registered {} students", student_ids.len());

    // Enrollments: every student takes three consecutive classes
    let mut seats = 0;
    for (offset, class) in classes.iter().enumerate() {
        let takers: Vec<String> = student_ids
            .iter()
            .enumerate()
            .filter(|(n, _)| (n + offset) % classes.len() < 3)
            .map(|(_, id)| id.clone())
            .collect();
        let outcome = admissions.enroll_students(&office, &class.id, &takers, today).await?;
        seats += outcome.totals.admitted;
        if !outcome.is_fully_admitted() {
            println!("⚠ {} rejections for {}", outcome.totals.rejected, class.spec.class_name);
            println!("{}", serde_json::to_string_pretty(&outcome.rejected)?);
        }
    }
    println!("✓ Created {} enrollments", seats);

    // Roll calls for the first class, one per week
    let first = &classes[0];
    let roster = db.enrollments().for_class(&first.id).await?;
    for week in 0..4 {
        let marks = roster
            .iter()
            .enumerate()
            .map(|(n, seat)| AttendanceMark {
                enrollment_id: seat.id.clone(),
                status: match (n + week) % 7 {
                    0 => AttendanceStatus::Absent,
                    1 => AttendanceStatus::Late,
                    _ => AttendanceStatus::Present,
                },
            })
            .collect();
        let request = AttendanceRequest {
            date: term_start() + Duration::weeks(week as i64),
            attendance_type: AttendanceType::Regular,
            marks,
        };
        admissions.record_attendance(&office, &first.id, request).await?;
    }
    println!("✓ Recorded 4 roll calls for {}", first.spec.class_name);

    // Exams for the first class, graded by its teacher
    let teacher = Actor::teacher(first.spec.teacher_id.clone());
    for (exam_type, on) in [
        (ExamType::Midterm, NaiveDate::from_ymd_opt(2024, 11, 4)),
        (ExamType::Final, NaiveDate::from_ymd_opt(2025, 1, 27)),
    ] {
        let request = ExamRequest {
            exam_type,
            date: on.unwrap_or_else(term_end),
            roster: roster
                .iter()
                .enumerate()
                .map(|(n, seat)| RosterEntry {
                    enrollment_id: seat.id.clone(),
                    is_absent: exam_type == ExamType::Midterm && n == 0,
                })
                .collect(),
        };
        let exam = admissions.create_examination(&office, &first.id, request).await?;
        for (n, entry) in exam.entries.iter().enumerate().filter(|(_, e)| !e.is_absent) {
            let grade = 5.0 + (n % 6) as f64 * 0.75;
            admissions.grade_entry(&teacher, &entry.id, grade).await?;
        }
    }
    println!("✓ Scheduled and graded MIDTERM + FINAL for {}", first.spec.class_name);

    // Homerooms
    let (upper, lower) = student_ids.split_at(student_ids.len() / 2);
    for ((name, head), members) in [("10A", "t-alvarez"), ("10B", "t-chen")].into_iter().zip([upper, lower]) {
        let homeroom = admissions.create_homeroom(&office, name, head).await?;
        let outcome = admissions
            .add_students_to_homeroom(&office, &homeroom.id, members, HomeroomStatus::Anticipated)
            .await?;
        println!("✓ Homeroom {} with {} students", name, outcome.totals.admitted);
    }

    let elapsed = start.elapsed();
    println!();
    println!("================================");
    println!("✅ Seed complete in {:.2?}", elapsed);

    db.close().await;
    Ok(())
}
