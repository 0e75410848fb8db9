//! # Tuition Repository
//!
//! One payment record per enrollment, written in the same transaction as
//! the enrollment itself.

use chrono::NaiveDate;
use registrar_core::tuition::is_overdue;
use registrar_core::{PaymentMethod, TuitionRecord, TuitionStatus};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TuitionRow {
    pub id: String,
    pub enrollment_id: String,
    pub status: TuitionStatus,
    pub method: PaymentMethod,
}

impl From<TuitionRow> for TuitionRecord {
    fn from(row: TuitionRow) -> Self {
        TuitionRecord {
            id: row.id,
            enrollment_id: row.enrollment_id,
            status: row.status,
            method: row.method,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct DueRow {
    #[sqlx(flatten)]
    record: TuitionRow,
    tuition_due_date: NaiveDate,
}

pub async fn fetch_tuition(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<TuitionRecord>> {
    let row = sqlx::query_as::<_, TuitionRow>(
        "SELECT id, enrollment_id, status, method FROM tuition_records WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(TuitionRecord::from))
}

pub async fn tuition_for_enrollment(
    conn: &mut SqliteConnection,
    enrollment_id: &str,
) -> DbResult<Option<TuitionRecord>> {
    let row = sqlx::query_as::<_, TuitionRow>(
        "SELECT id, enrollment_id, status, method FROM tuition_records WHERE enrollment_id = ?",
    )
    .bind(enrollment_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(TuitionRecord::from))
}

pub async fn insert_tuition(conn: &mut SqliteConnection, record: &TuitionRecord) -> DbResult<()> {
    sqlx::query("INSERT INTO tuition_records (id, enrollment_id, status, method) VALUES (?, ?, ?, ?)")
        .bind(&record.id)
        .bind(&record.enrollment_id)
        .bind(record.status)
        .bind(record.method)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn store_tuition(conn: &mut SqliteConnection, record: &TuitionRecord) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE tuition_records SET status = ?, method = ?, updated_at = datetime('now') WHERE id = ?",
    )
    .bind(record.status)
    .bind(record.method)
    .bind(&record.id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("TuitionRecord", &record.id));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TuitionRepository {
    pool: SqlitePool,
}

impl TuitionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TuitionRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<TuitionRecord>> {
        let mut conn = self.pool.acquire().await?;
        fetch_tuition(&mut conn, id).await
    }

    pub async fn for_enrollment(&self, enrollment_id: &str) -> DbResult<Option<TuitionRecord>> {
        let mut conn = self.pool.acquire().await?;
        tuition_for_enrollment(&mut conn, enrollment_id).await
    }

    /// Unpaid records past their class's due date, for an external sweep.
    pub async fn overdue(&self, today: NaiveDate) -> DbResult<Vec<TuitionRecord>> {
        let rows = sqlx::query_as::<_, DueRow>(
            r#"
            SELECT t.id AS id, t.enrollment_id AS enrollment_id, t.status AS status,
                   t.method AS method, c.tuition_due_date AS tuition_due_date
            FROM tuition_records t
            JOIN enrollments e ON e.id = t.enrollment_id
            JOIN classes c ON c.id = e.class_id
            WHERE t.status != 'PAID'
            ORDER BY c.tuition_due_date, t.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (TuitionRecord::from(row.record), row.tuition_due_date))
            .filter(|(record, due)| is_overdue(record, *due, today))
            .map(|(record, _)| record)
            .collect())
    }
}
