//! Shared fixtures for database tests.

use chrono::{NaiveDate, Weekday};
use registrar_core::{Actor, ClassSpec, Money, TimeWindow, WeeklySlot};

use crate::{Database, DbConfig};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn admin() -> Actor {
    Actor::admin("registrar-office")
}

pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A WAL file database with a multi-connection pool, for the race tests.
pub async fn file_db(dir: &tempfile::TempDir, max_connections: u32) -> Database {
    Database::new(DbConfig::new(dir.path().join("registrar.db")).max_connections(max_connections))
        .await
        .unwrap()
}

/// A class running 2024-01-01..=2024-06-01 in the given slot.
pub fn class_spec(teacher: &str, room: &str, day: Weekday, from: u8, to: u8) -> ClassSpec {
    class_spec_between(teacher, room, date(2024, 1, 1), date(2024, 6, 1), day, from, to)
}

pub fn class_spec_between(
    teacher: &str,
    room: &str,
    start: NaiveDate,
    end: NaiveDate,
    day: Weekday,
    from: u8,
    to: u8,
) -> ClassSpec {
    ClassSpec {
        class_name: format!("{teacher} {day} {from}-{to}"),
        description: None,
        teacher_id: teacher.to_string(),
        subject_id: "math".to_string(),
        room: room.to_string(),
        window: TimeWindow::new(start, end, Some(WeeklySlot::new(day, from, to).unwrap())).unwrap(),
        tuition: Money::from_cents(150_000),
        tuition_due_date: start,
        final_term_weight: 0.6,
        absence_warning_threshold: 2,
        absence_limit: 3,
    }
}

/// Registers students and returns their ids in order.
pub async fn students(db: &Database, names: &[&str]) -> Vec<String> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        ids.push(db.students().create(name).await.unwrap().id);
    }
    ids
}
