//! # Attendance Repository
//!
//! Roll calls and their per-enrollment marks.

use std::collections::HashMap;

use chrono::NaiveDate;
use registrar_core::{AttendanceEvent, AttendanceMark, AttendanceStatus, AttendanceType};
use sqlx::{SqliteConnection, SqlitePool};

use super::new_id;
use crate::error::DbResult;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceEventRow {
    pub id: String,
    pub class_id: String,
    pub attendance_date: NaiveDate,
    pub attendance_type: AttendanceType,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceMarkRow {
    pub event_id: String,
    pub enrollment_id: String,
    pub status: AttendanceStatus,
}

fn assemble(events: Vec<AttendanceEventRow>, marks: Vec<AttendanceMarkRow>) -> Vec<AttendanceEvent> {
    let mut by_event: HashMap<String, Vec<AttendanceMark>> = HashMap::new();
    for mark in marks {
        by_event.entry(mark.event_id).or_default().push(AttendanceMark {
            enrollment_id: mark.enrollment_id,
            status: mark.status,
        });
    }

    events
        .into_iter()
        .map(|row| AttendanceEvent {
            marks: by_event.remove(&row.id).unwrap_or_default(),
            id: row.id,
            class_id: row.class_id,
            date: row.attendance_date,
            attendance_type: row.attendance_type,
        })
        .collect()
}

/// Every roll call of a class, oldest first, with all marks.
pub async fn class_attendance_events(
    conn: &mut SqliteConnection,
    class_id: &str,
) -> DbResult<Vec<AttendanceEvent>> {
    let events = sqlx::query_as::<_, AttendanceEventRow>(
        "SELECT id, class_id, attendance_date, attendance_type FROM attendance_events \
         WHERE class_id = ? ORDER BY attendance_date, attendance_type",
    )
    .bind(class_id)
    .fetch_all(&mut *conn)
    .await?;

    let marks = sqlx::query_as::<_, AttendanceMarkRow>(
        r#"
        SELECT m.event_id AS event_id, m.enrollment_id AS enrollment_id, m.status AS status
        FROM attendance_marks m
        JOIN attendance_events ev ON ev.id = m.event_id
        WHERE ev.class_id = ?
        ORDER BY m.id
        "#,
    )
    .bind(class_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(assemble(events, marks))
}

/// Roll calls that marked `enrollment_id`, carrying only that mark.
pub async fn attendance_events(
    conn: &mut SqliteConnection,
    enrollment_id: &str,
) -> DbResult<Vec<AttendanceEvent>> {
    let events = sqlx::query_as::<_, AttendanceEventRow>(
        r#"
        SELECT ev.id AS id, ev.class_id AS class_id, ev.attendance_date AS attendance_date,
               ev.attendance_type AS attendance_type
        FROM attendance_events ev
        JOIN attendance_marks m ON m.event_id = ev.id
        WHERE m.enrollment_id = ?
        ORDER BY ev.attendance_date, ev.attendance_type
        "#,
    )
    .bind(enrollment_id)
    .fetch_all(&mut *conn)
    .await?;

    let marks = sqlx::query_as::<_, AttendanceMarkRow>(
        "SELECT event_id, enrollment_id, status FROM attendance_marks WHERE enrollment_id = ?",
    )
    .bind(enrollment_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(assemble(events, marks))
}

pub async fn insert_event(conn: &mut SqliteConnection, event: &AttendanceEvent) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO attendance_events (id, class_id, attendance_date, attendance_type) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(&event.id)
    .bind(&event.class_id)
    .bind(event.date)
    .bind(event.attendance_type)
    .execute(&mut *conn)
    .await?;

    for mark in &event.marks {
        sqlx::query(
            "INSERT INTO attendance_marks (id, event_id, enrollment_id, status) VALUES (?, ?, ?, ?)",
        )
        .bind(new_id())
        .bind(&event.id)
        .bind(&mark.enrollment_id)
        .bind(mark.status)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AttendanceRepository {
    pool: SqlitePool,
}

impl AttendanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AttendanceRepository { pool }
    }

    pub async fn for_class(&self, class_id: &str) -> DbResult<Vec<AttendanceEvent>> {
        let mut conn = self.pool.acquire().await?;
        class_attendance_events(&mut conn, class_id).await
    }

    pub async fn for_enrollment(&self, enrollment_id: &str) -> DbResult<Vec<AttendanceEvent>> {
        let mut conn = self.pool.acquire().await?;
        attendance_events(&mut conn, enrollment_id).await
    }
}
