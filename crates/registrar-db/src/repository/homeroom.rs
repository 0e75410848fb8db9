//! # Homeroom Repository
//!
//! Homerooms and memberships. The partial unique index
//! `idx_memberships_one_anticipated` backs the one-ANTICIPATED rule at the
//! storage level.

use registrar_core::{Homeroom, HomeroomMembership, HomeroomStatus};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HomeroomRow {
    pub id: String,
    pub name: String,
    pub teacher_id: String,
}

impl From<HomeroomRow> for Homeroom {
    fn from(row: HomeroomRow) -> Self {
        Homeroom {
            id: row.id,
            name: row.name,
            teacher_id: row.teacher_id,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MembershipRow {
    pub id: String,
    pub homeroom_id: String,
    pub student_id: String,
    pub status: HomeroomStatus,
}

impl From<MembershipRow> for HomeroomMembership {
    fn from(row: MembershipRow) -> Self {
        HomeroomMembership {
            id: row.id,
            homeroom_id: row.homeroom_id,
            student_id: row.student_id,
            status: row.status,
        }
    }
}

// =============================================================================
// Connection-Level Operations
// =============================================================================

pub async fn fetch_homeroom(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Homeroom>> {
    let row = sqlx::query_as::<_, HomeroomRow>("SELECT id, name, teacher_id FROM homerooms WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Homeroom::from))
}

/// Homerooms that already use `name` or are headed by `teacher_id`.
pub async fn homerooms_claiming(
    conn: &mut SqliteConnection,
    name: &str,
    teacher_id: &str,
) -> DbResult<Vec<Homeroom>> {
    let rows = sqlx::query_as::<_, HomeroomRow>(
        "SELECT id, name, teacher_id FROM homerooms WHERE name = ? OR teacher_id = ? ORDER BY name",
    )
    .bind(name)
    .bind(teacher_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Homeroom::from).collect())
}

/// All of a student's memberships, any status, any homeroom.
pub async fn memberships_for_student(
    conn: &mut SqliteConnection,
    student_id: &str,
) -> DbResult<Vec<HomeroomMembership>> {
    let rows = sqlx::query_as::<_, MembershipRow>(
        "SELECT id, homeroom_id, student_id, status FROM homeroom_memberships \
         WHERE student_id = ? ORDER BY created_at, id",
    )
    .bind(student_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(HomeroomMembership::from).collect())
}

pub async fn fetch_membership(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<HomeroomMembership>> {
    let row = sqlx::query_as::<_, MembershipRow>(
        "SELECT id, homeroom_id, student_id, status FROM homeroom_memberships WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(HomeroomMembership::from))
}

pub async fn insert_homeroom(conn: &mut SqliteConnection, homeroom: &Homeroom) -> DbResult<()> {
    sqlx::query("INSERT INTO homerooms (id, name, teacher_id) VALUES (?, ?, ?)")
        .bind(&homeroom.id)
        .bind(&homeroom.name)
        .bind(&homeroom.teacher_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_membership(conn: &mut SqliteConnection, membership: &HomeroomMembership) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO homeroom_memberships (id, homeroom_id, student_id, status) VALUES (?, ?, ?, ?)",
    )
    .bind(&membership.id)
    .bind(&membership.homeroom_id)
    .bind(&membership.student_id)
    .bind(membership.status)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn set_membership_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: HomeroomStatus,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE homeroom_memberships SET status = ?, updated_at = datetime('now') WHERE id = ?",
    )
    .bind(status)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("HomeroomMembership", id));
    }
    Ok(())
}

pub async fn delete_membership(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM homeroom_memberships WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("HomeroomMembership", id));
    }
    Ok(())
}

// =============================================================================
// Homeroom Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct HomeroomRepository {
    pool: SqlitePool,
}

impl HomeroomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        HomeroomRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Homeroom>> {
        let mut conn = self.pool.acquire().await?;
        fetch_homeroom(&mut conn, id).await
    }

    pub async fn list(&self) -> DbResult<Vec<Homeroom>> {
        let rows = sqlx::query_as::<_, HomeroomRow>("SELECT id, name, teacher_id FROM homerooms ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Homeroom::from).collect())
    }

    pub async fn members(&self, homeroom_id: &str) -> DbResult<Vec<HomeroomMembership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            "SELECT id, homeroom_id, student_id, status FROM homeroom_memberships \
             WHERE homeroom_id = ? ORDER BY created_at, id",
        )
        .bind(homeroom_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(HomeroomMembership::from).collect())
    }

    pub async fn membership(&self, id: &str) -> DbResult<Option<HomeroomMembership>> {
        let mut conn = self.pool.acquire().await?;
        fetch_membership(&mut conn, id).await
    }

    pub async fn for_student(&self, student_id: &str) -> DbResult<Vec<HomeroomMembership>> {
        let mut conn = self.pool.acquire().await?;
        memberships_for_student(&mut conn, student_id).await
    }
}
