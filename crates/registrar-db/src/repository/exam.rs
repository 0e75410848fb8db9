//! # Examination Repository
//!
//! Examinations and their rosters. Reads always return an examination
//! together with its entries.

use std::collections::HashMap;

use chrono::NaiveDate;
use registrar_core::{ExamEntry, ExamType, Examination};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExaminationRow {
    pub id: String,
    pub class_id: String,
    pub exam_type: ExamType,
    pub exam_date: NaiveDate,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExamEntryRow {
    pub id: String,
    pub examination_id: String,
    pub enrollment_id: String,
    pub grade: Option<f64>,
    pub is_absent: bool,
}

impl From<ExamEntryRow> for ExamEntry {
    fn from(row: ExamEntryRow) -> Self {
        ExamEntry {
            id: row.id,
            examination_id: row.examination_id,
            enrollment_id: row.enrollment_id,
            grade: row.grade,
            is_absent: row.is_absent,
        }
    }
}

fn assemble(exams: Vec<ExaminationRow>, entries: Vec<ExamEntryRow>) -> Vec<Examination> {
    let mut by_exam: HashMap<String, Vec<ExamEntry>> = HashMap::new();
    for entry in entries {
        by_exam
            .entry(entry.examination_id.clone())
            .or_default()
            .push(entry.into());
    }

    exams
        .into_iter()
        .map(|row| Examination {
            entries: by_exam.remove(&row.id).unwrap_or_default(),
            id: row.id,
            class_id: row.class_id,
            exam_type: row.exam_type,
            date: row.exam_date,
        })
        .collect()
}

// =============================================================================
// Connection-Level Operations
// =============================================================================

/// All examinations of a class with their rosters, in date order.
pub async fn examinations(conn: &mut SqliteConnection, class_id: &str) -> DbResult<Vec<Examination>> {
    let exams = sqlx::query_as::<_, ExaminationRow>(
        "SELECT id, class_id, exam_type, exam_date FROM examinations WHERE class_id = ? \
         ORDER BY exam_date, exam_type",
    )
    .bind(class_id)
    .fetch_all(&mut *conn)
    .await?;

    if exams.is_empty() {
        return Ok(Vec::new());
    }

    let entries = sqlx::query_as::<_, ExamEntryRow>(
        r#"
        SELECT x.id AS id, x.examination_id AS examination_id, x.enrollment_id AS enrollment_id,
               x.grade AS grade, x.is_absent AS is_absent
        FROM exam_entries x
        JOIN examinations e ON e.id = x.examination_id
        WHERE e.class_id = ?
        ORDER BY x.id
        "#,
    )
    .bind(class_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(assemble(exams, entries))
}

/// The class's examination of one type, if scheduled.
pub async fn examination(
    conn: &mut SqliteConnection,
    class_id: &str,
    exam_type: ExamType,
) -> DbResult<Option<Examination>> {
    let exams = examinations(conn, class_id).await?;
    Ok(exams.into_iter().find(|e| e.exam_type == exam_type))
}

pub async fn fetch_examination(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Examination>> {
    let class_id: Option<String> = sqlx::query_scalar("SELECT class_id FROM examinations WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match class_id {
        Some(class_id) => {
            let exams = examinations(conn, &class_id).await?;
            Ok(exams.into_iter().find(|e| e.id == id))
        }
        None => Ok(None),
    }
}

pub async fn has_examinations(conn: &mut SqliteConnection, class_id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM examinations WHERE class_id = ? LIMIT 1")
        .bind(class_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// An entry plus the examination it belongs to.
pub async fn fetch_entry(conn: &mut SqliteConnection, entry_id: &str) -> DbResult<Option<(ExamEntry, Examination)>> {
    let exam_id: Option<String> =
        sqlx::query_scalar("SELECT examination_id FROM exam_entries WHERE id = ?")
            .bind(entry_id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(exam_id) = exam_id else {
        return Ok(None);
    };
    let Some(exam) = fetch_examination(conn, &exam_id).await? else {
        return Ok(None);
    };
    let entry = exam.entries.iter().find(|e| e.id == entry_id).cloned();
    Ok(entry.map(|entry| (entry, exam)))
}

pub async fn insert_examination(conn: &mut SqliteConnection, exam: &Examination) -> DbResult<()> {
    sqlx::query("INSERT INTO examinations (id, class_id, exam_type, exam_date) VALUES (?, ?, ?, ?)")
        .bind(&exam.id)
        .bind(&exam.class_id)
        .bind(exam.exam_type)
        .bind(exam.date)
        .execute(&mut *conn)
        .await?;

    for entry in &exam.entries {
        sqlx::query(
            "INSERT INTO exam_entries (id, examination_id, enrollment_id, grade, is_absent) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(&exam.id)
        .bind(&entry.enrollment_id)
        .bind(entry.grade)
        .bind(entry.is_absent)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn set_entry_grade(conn: &mut SqliteConnection, entry_id: &str, grade: f64) -> DbResult<()> {
    let result = sqlx::query("UPDATE exam_entries SET grade = ? WHERE id = ? AND is_absent = 0")
        .bind(grade)
        .bind(entry_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("ExamEntry", entry_id));
    }
    Ok(())
}

/// Removes the examination and its roster.
pub async fn delete_examination(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM exam_entries WHERE examination_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query("DELETE FROM examinations WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Examination", id));
    }
    Ok(())
}

// =============================================================================
// Examination Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct ExamRepository {
    pool: SqlitePool,
}

impl ExamRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExamRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Examination>> {
        let mut conn = self.pool.acquire().await?;
        fetch_examination(&mut conn, id).await
    }

    pub async fn for_class(&self, class_id: &str) -> DbResult<Vec<Examination>> {
        let mut conn = self.pool.acquire().await?;
        examinations(&mut conn, class_id).await
    }

    pub async fn of_type(&self, class_id: &str, exam_type: ExamType) -> DbResult<Option<Examination>> {
        let mut conn = self.pool.acquire().await?;
        examination(&mut conn, class_id, exam_type).await
    }

    pub async fn entry(&self, entry_id: &str) -> DbResult<Option<ExamEntry>> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_entry(&mut conn, entry_id).await?.map(|(entry, _)| entry))
    }
}
