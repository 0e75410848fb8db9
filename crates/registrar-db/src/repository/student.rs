//! # Student Repository
//!
//! Students are reference data: batches only ask whether an id exists.

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use super::{new_id, placeholders};
use crate::error::DbResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StudentRecord {
    pub id: String,
    pub full_name: String,
}

pub async fn student_exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM students WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Subset of `ids` that exist, in no particular order.
pub async fn existing_students(conn: &mut SqliteConnection, ids: &[String]) -> DbResult<Vec<String>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!("SELECT id FROM students WHERE id IN ({})", placeholders(ids.len()));
    let mut query = sqlx::query_scalar::<_, String>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    Ok(query.fetch_all(&mut *conn).await?)
}

pub async fn insert_student(conn: &mut SqliteConnection, student: &StudentRecord) -> DbResult<()> {
    sqlx::query("INSERT INTO students (id, full_name) VALUES (?, ?)")
        .bind(&student.id)
        .bind(&student.full_name)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct StudentRepository {
    pool: SqlitePool,
}

impl StudentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StudentRepository { pool }
    }

    /// Registers a student and returns the new id.
    pub async fn create(&self, full_name: &str) -> DbResult<StudentRecord> {
        let student = StudentRecord {
            id: new_id(),
            full_name: full_name.to_string(),
        };
        let mut conn = self.pool.acquire().await?;
        insert_student(&mut conn, &student).await?;

        info!(student_id = %student.id, "Student registered");
        Ok(student)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<StudentRecord>> {
        let student = sqlx::query_as::<_, StudentRecord>(
            "SELECT id, full_name FROM students WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    pub async fn exists(&self, id: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        student_exists(&mut conn, id).await
    }
}
