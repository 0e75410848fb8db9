//! # Class Repository
//!
//! Class bookings: the rows teacher and room conflict checks scan.
//!
//! ## Snapshot Reads
//! ```text
//! bookings_for_teacher(T, window)   WHERE teacher_id = T
//! bookings_for_room(R, window)      WHERE room = R
//!                                   AND start_date <= window.end
//!                                   AND end_date   >= window.start
//! ```
//! The date prefilter is the same closed-interval test the checker runs;
//! the checker still decides on the weekly slot.

use chrono::NaiveDate;
use registrar_core::{ClassBooking, ClassSpec, Money, TimeWindow, WeeklySlot};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::{narrow, weekday_from_db, weekday_to_db};
use crate::error::{DbError, DbResult};

/// Column list for `FROM classes c`. Aliased so joined reads keep the
/// plain column names.
pub(crate) const CLASS_COLUMNS: &str = "c.id AS id, c.class_name AS class_name, c.description AS description, \
     c.teacher_id AS teacher_id, c.subject_id AS subject_id, \
     c.room AS room, c.start_date AS start_date, c.end_date AS end_date, \
     c.day_of_week AS day_of_week, c.period_start AS period_start, \
     c.period_end AS period_end, c.tuition_cents AS tuition_cents, \
     c.tuition_due_date AS tuition_due_date, \
     c.final_term_weight AS final_term_weight, \
     c.absence_warning_threshold AS absence_warning_threshold, \
     c.absence_limit AS absence_limit";

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClassRow {
    pub id: String,
    pub class_name: String,
    pub description: Option<String>,
    pub teacher_id: String,
    pub subject_id: String,
    pub room: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub day_of_week: Option<i64>,
    pub period_start: Option<i64>,
    pub period_end: Option<i64>,
    pub tuition_cents: i64,
    pub tuition_due_date: NaiveDate,
    pub final_term_weight: f64,
    pub absence_warning_threshold: i64,
    pub absence_limit: i64,
}

impl TryFrom<ClassRow> for ClassBooking {
    type Error = DbError;

    fn try_from(row: ClassRow) -> DbResult<Self> {
        let slot = match (row.day_of_week, row.period_start, row.period_end) {
            (Some(day), Some(start), Some(end)) => {
                let slot = WeeklySlot::new(
                    weekday_from_db("classes", day)?,
                    narrow("classes", "period_start", start)?,
                    narrow("classes", "period_end", end)?,
                )
                .map_err(|e| DbError::invalid_row("classes", e.to_string()))?;
                Some(slot)
            }
            (None, None, None) => None,
            _ => {
                return Err(DbError::invalid_row(
                    "classes",
                    format!("class {} has a partial weekly slot", row.id),
                ))
            }
        };

        let window = TimeWindow::new(row.start_date, row.end_date, slot)
            .map_err(|e| DbError::invalid_row("classes", e.to_string()))?;

        Ok(ClassBooking::new(
            row.id,
            ClassSpec {
                class_name: row.class_name,
                description: row.description,
                teacher_id: row.teacher_id,
                subject_id: row.subject_id,
                room: row.room,
                window,
                tuition: Money::from_cents(row.tuition_cents),
                tuition_due_date: row.tuition_due_date,
                final_term_weight: row.final_term_weight,
                absence_warning_threshold: narrow(
                    "classes",
                    "absence_warning_threshold",
                    row.absence_warning_threshold,
                )?,
                absence_limit: narrow("classes", "absence_limit", row.absence_limit)?,
            },
        ))
    }
}

fn into_bookings(rows: Vec<ClassRow>) -> DbResult<Vec<ClassBooking>> {
    rows.into_iter().map(ClassBooking::try_from).collect()
}

// =============================================================================
// Connection-Level Operations
// =============================================================================

pub async fn fetch_class(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<ClassBooking>> {
    let sql = format!("SELECT {CLASS_COLUMNS} FROM classes c WHERE c.id = ?");
    let row = sqlx::query_as::<_, ClassRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(ClassBooking::try_from).transpose()
}

/// Like [`fetch_class`], but a missing class is a NotFound rejection.
pub async fn require_class(conn: &mut SqliteConnection, id: &str) -> DbResult<ClassBooking> {
    fetch_class(conn, id)
        .await?
        .ok_or_else(|| registrar_core::CoreError::not_found("Class", id).into())
}

/// Classes taught by `teacher_id` whose dates touch `window`.
pub async fn bookings_for_teacher(
    conn: &mut SqliteConnection,
    teacher_id: &str,
    window: &TimeWindow,
) -> DbResult<Vec<ClassBooking>> {
    let sql = format!(
        "SELECT {CLASS_COLUMNS} FROM classes c \
         WHERE c.teacher_id = ? AND c.start_date <= ? AND c.end_date >= ? \
         ORDER BY c.start_date, c.id"
    );
    let rows = sqlx::query_as::<_, ClassRow>(&sql)
        .bind(teacher_id)
        .bind(window.end_date)
        .bind(window.start_date)
        .fetch_all(&mut *conn)
        .await?;

    debug!(teacher_id, count = rows.len(), "Loaded teacher bookings");
    into_bookings(rows)
}

/// Classes held in `room` whose dates touch `window`.
pub async fn bookings_for_room(
    conn: &mut SqliteConnection,
    room: &str,
    window: &TimeWindow,
) -> DbResult<Vec<ClassBooking>> {
    let sql = format!(
        "SELECT {CLASS_COLUMNS} FROM classes c \
         WHERE c.room = ? AND c.start_date <= ? AND c.end_date >= ? \
         ORDER BY c.start_date, c.id"
    );
    let rows = sqlx::query_as::<_, ClassRow>(&sql)
        .bind(room)
        .bind(window.end_date)
        .bind(window.start_date)
        .fetch_all(&mut *conn)
        .await?;

    debug!(room, count = rows.len(), "Loaded room bookings");
    into_bookings(rows)
}

pub async fn insert_class(conn: &mut SqliteConnection, class: &ClassBooking) -> DbResult<()> {
    let spec = &class.spec;
    let slot = spec.window.slot;

    sqlx::query(
        r#"
        INSERT INTO classes (
            id, class_name, description, teacher_id, subject_id, room,
            start_date, end_date, day_of_week, period_start, period_end,
            tuition_cents, tuition_due_date, final_term_weight,
            absence_warning_threshold, absence_limit
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&class.id)
    .bind(&spec.class_name)
    .bind(&spec.description)
    .bind(&spec.teacher_id)
    .bind(&spec.subject_id)
    .bind(&spec.room)
    .bind(spec.window.start_date)
    .bind(spec.window.end_date)
    .bind(slot.map(|s| weekday_to_db(s.day_of_week)))
    .bind(slot.map(|s| i64::from(s.period_start)))
    .bind(slot.map(|s| i64::from(s.period_end)))
    .bind(spec.tuition.cents())
    .bind(spec.tuition_due_date)
    .bind(spec.final_term_weight)
    .bind(i64::from(spec.absence_warning_threshold))
    .bind(i64::from(spec.absence_limit))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrites every column of an existing class.
pub async fn update_class(conn: &mut SqliteConnection, class: &ClassBooking) -> DbResult<()> {
    let spec = &class.spec;
    let slot = spec.window.slot;

    let result = sqlx::query(
        r#"
        UPDATE classes SET
            class_name = ?, description = ?, teacher_id = ?, subject_id = ?, room = ?,
            start_date = ?, end_date = ?, day_of_week = ?, period_start = ?, period_end = ?,
            tuition_cents = ?, tuition_due_date = ?, final_term_weight = ?,
            absence_warning_threshold = ?, absence_limit = ?,
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(&spec.class_name)
    .bind(&spec.description)
    .bind(&spec.teacher_id)
    .bind(&spec.subject_id)
    .bind(&spec.room)
    .bind(spec.window.start_date)
    .bind(spec.window.end_date)
    .bind(slot.map(|s| weekday_to_db(s.day_of_week)))
    .bind(slot.map(|s| i64::from(s.period_start)))
    .bind(slot.map(|s| i64::from(s.period_end)))
    .bind(spec.tuition.cents())
    .bind(spec.tuition_due_date)
    .bind(spec.final_term_weight)
    .bind(i64::from(spec.absence_warning_threshold))
    .bind(i64::from(spec.absence_limit))
    .bind(&class.id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Class", &class.id));
    }
    Ok(())
}

// =============================================================================
// Class Repository
// =============================================================================

/// Read-only access to class bookings.
#[derive(Debug, Clone)]
pub struct ClassRepository {
    pool: SqlitePool,
}

impl ClassRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClassRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<ClassBooking>> {
        let mut conn = self.pool.acquire().await?;
        fetch_class(&mut conn, id).await
    }

    pub async fn for_teacher(&self, teacher_id: &str, window: &TimeWindow) -> DbResult<Vec<ClassBooking>> {
        let mut conn = self.pool.acquire().await?;
        bookings_for_teacher(&mut conn, teacher_id, window).await
    }

    pub async fn for_room(&self, room: &str, window: &TimeWindow) -> DbResult<Vec<ClassBooking>> {
        let mut conn = self.pool.acquire().await?;
        bookings_for_room(&mut conn, room, window).await
    }

    pub async fn list(&self) -> DbResult<Vec<ClassBooking>> {
        let sql = format!("SELECT {CLASS_COLUMNS} FROM classes c ORDER BY c.start_date, c.class_name");
        let rows = sqlx::query_as::<_, ClassRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        into_bookings(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{class_spec, date};
    use crate::{Database, DbConfig};
    use chrono::Weekday;

    #[tokio::test]
    async fn test_insert_and_fetch_round_trips_the_slot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let class = ClassBooking::new("c-1", class_spec("t-1", "A-1", Weekday::Wed, 2, 4));

        let mut conn = db.pool().acquire().await.unwrap();
        insert_class(&mut conn, &class).await.unwrap();
        drop(conn);

        let loaded = db.classes().get("c-1").await.unwrap().unwrap();
        assert_eq!(loaded, class);
    }

    #[tokio::test]
    async fn test_date_prefilter_is_inclusive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let class = ClassBooking::new("c-1", class_spec("t-1", "A-1", Weekday::Mon, 1, 2));

        let mut conn = db.pool().acquire().await.unwrap();
        insert_class(&mut conn, &class).await.unwrap();

        // starts on the day the existing class ends
        let touching = TimeWindow::new(date(2024, 6, 1), date(2024, 9, 1), None).unwrap();
        let later = TimeWindow::new(date(2024, 6, 2), date(2024, 9, 1), None).unwrap();

        assert_eq!(bookings_for_teacher(&mut conn, "t-1", &touching).await.unwrap().len(), 1);
        assert!(bookings_for_teacher(&mut conn, "t-1", &later).await.unwrap().is_empty());
        assert_eq!(bookings_for_room(&mut conn, "A-1", &touching).await.unwrap().len(), 1);
        assert!(bookings_for_room(&mut conn, "B-2", &touching).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_class_is_not_found_rejection() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let err = require_class(&mut conn, "nope").await.unwrap_err();
        assert!(err.rejection().is_some());
    }
}
