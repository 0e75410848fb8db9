//! # Enrollment Repository
//!
//! Seats, their grade snapshots, and the student timetable join that the
//! enrollment checker scans.
//!
//! ```text
//! bookings_for_student(S)
//!
//!   enrollments e ──JOIN── classes c
//!   WHERE e.student_id = S           (every status; the checker filters)
//!        │
//!        ▼
//!   StudentBooking { enrollment_id, status, booking: ClassBooking }
//! ```

use registrar_core::{Enrollment, EnrollmentStatus, GradeSnapshot, StudentBooking};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::class::{ClassRow, CLASS_COLUMNS};
use super::narrow;
use crate::error::{DbError, DbResult};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrollmentRow {
    pub id: String,
    pub class_id: String,
    pub student_id: String,
    pub status: EnrollmentStatus,
    pub midterm_grade: Option<f64>,
    pub final_grade: Option<f64>,
    pub overall_grade: Option<f64>,
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        Enrollment {
            id: row.id,
            class_id: row.class_id,
            student_id: row.student_id,
            status: row.status,
            grades: GradeSnapshot {
                midterm: row.midterm_grade,
                final_exam: row.final_grade,
                overall: row.overall_grade,
            },
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct StudentBookingRow {
    enrollment_id: String,
    enrollment_status: EnrollmentStatus,
    #[sqlx(flatten)]
    class: ClassRow,
}

const ENROLLMENT_COLUMNS: &str =
    "id, class_id, student_id, status, midterm_grade, final_grade, overall_grade";

// =============================================================================
// Connection-Level Operations
// =============================================================================

pub async fn fetch_enrollment(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Enrollment>> {
    let sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = ?");
    let row = sqlx::query_as::<_, EnrollmentRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Enrollment::from))
}

pub async fn require_enrollment(conn: &mut SqliteConnection, id: &str) -> DbResult<Enrollment> {
    fetch_enrollment(conn, id)
        .await?
        .ok_or_else(|| registrar_core::CoreError::not_found("Enrollment", id).into())
}

/// Every seat of a class, any status, oldest first.
pub async fn class_enrollments(conn: &mut SqliteConnection, class_id: &str) -> DbResult<Vec<Enrollment>> {
    let sql = format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE class_id = ? ORDER BY created_at, id"
    );
    let rows = sqlx::query_as::<_, EnrollmentRow>(&sql)
        .bind(class_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(Enrollment::from).collect())
}

/// Seats of any status. A class with withdrawn students stays locked.
pub async fn enrollment_count(conn: &mut SqliteConnection, class_id: &str) -> DbResult<usize> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE class_id = ?")
        .bind(class_id)
        .fetch_one(&mut *conn)
        .await?;
    narrow("enrollments", "count", count)
}

/// The student's whole timetable, withdrawn seats included.
pub async fn bookings_for_student(
    conn: &mut SqliteConnection,
    student_id: &str,
) -> DbResult<Vec<StudentBooking>> {
    let sql = format!(
        "SELECT e.id AS enrollment_id, e.status AS enrollment_status, {CLASS_COLUMNS} \
         FROM enrollments e JOIN classes c ON c.id = e.class_id \
         WHERE e.student_id = ? ORDER BY c.start_date, c.id"
    );
    let rows = sqlx::query_as::<_, StudentBookingRow>(&sql)
        .bind(student_id)
        .fetch_all(&mut *conn)
        .await?;

    debug!(student_id, count = rows.len(), "Loaded student bookings");
    rows.into_iter()
        .map(|row| -> DbResult<StudentBooking> {
            Ok(StudentBooking {
                enrollment_id: row.enrollment_id,
                status: row.enrollment_status,
                booking: row.class.try_into()?,
            })
        })
        .collect()
}

pub async fn insert_enrollment(conn: &mut SqliteConnection, enrollment: &Enrollment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO enrollments (id, class_id, student_id, status, midterm_grade, final_grade, overall_grade)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&enrollment.id)
    .bind(&enrollment.class_id)
    .bind(&enrollment.student_id)
    .bind(enrollment.status)
    .bind(enrollment.grades.midterm)
    .bind(enrollment.grades.final_exam)
    .bind(enrollment.grades.overall)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn set_status(conn: &mut SqliteConnection, id: &str, status: EnrollmentStatus) -> DbResult<()> {
    let result = sqlx::query("UPDATE enrollments SET status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Enrollment", id));
    }
    Ok(())
}

pub async fn store_grades(conn: &mut SqliteConnection, id: &str, grades: &GradeSnapshot) -> DbResult<()> {
    sqlx::query(
        "UPDATE enrollments SET midterm_grade = ?, final_grade = ?, overall_grade = ? WHERE id = ?",
    )
    .bind(grades.midterm)
    .bind(grades.final_exam)
    .bind(grades.overall)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// =============================================================================
// Enrollment Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct EnrollmentRepository {
    pool: SqlitePool,
}

impl EnrollmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EnrollmentRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Enrollment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_enrollment(&mut conn, id).await
    }

    pub async fn for_class(&self, class_id: &str) -> DbResult<Vec<Enrollment>> {
        let mut conn = self.pool.acquire().await?;
        class_enrollments(&mut conn, class_id).await
    }

    pub async fn for_student(&self, student_id: &str) -> DbResult<Vec<StudentBooking>> {
        let mut conn = self.pool.acquire().await?;
        bookings_for_student(&mut conn, student_id).await
    }

    pub async fn count_for_class(&self, class_id: &str) -> DbResult<usize> {
        let mut conn = self.pool.acquire().await?;
        enrollment_count(&mut conn, class_id).await
    }
}
