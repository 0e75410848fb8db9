//! Enrollment workflows.
//!
//! ```text
//! enroll_students(class, [s1, s2, s2, s3])
//!      │ dedupe → [s1, s2, s3]
//!      ▼
//! lock Class(class) + Student(s1..s3)
//!      │
//!      ▼
//! StudentSnapshot per id ──► EnrollmentConflictChecker::evaluate_batch
//!      │                          │
//!      │              strict: first rejection aborts, nothing written
//!      │              lenient: admitted get a seat + tuition record
//!      ▼
//! BatchOutcome { admitted, rejected, totals }
//! ```

use std::collections::HashSet;

use chrono::NaiveDate;
use registrar_core::batch::dedupe_ids;
use registrar_core::tuition::initial_status;
use registrar_core::{
    Actor, BatchOutcome, Capability, Enrollment, EnrollmentConflictChecker, EnrollmentStatus,
    GradeSnapshot, PaymentMethod, StudentSnapshot, TuitionRecord,
};
use tracing::{debug, info};

use super::{rejected, Admissions};
use crate::error::DbResult;
use crate::locks::ConflictKey;
use crate::repository::{class, enrollment, exam, new_id, student, tuition};

impl Admissions {
    /// Enrolls a batch of students under the configured batch policy.
    ///
    /// `today` decides each new tuition record's initial status.
    pub async fn enroll_students(
        &self,
        actor: &Actor,
        class_id: &str,
        student_ids: &[String],
        today: NaiveDate,
    ) -> DbResult<BatchOutcome> {
        actor
            .require(Capability::ManageEnrollment)
            .map_err(|e| rejected("enroll_students", e))?;

        let ids = dedupe_ids(student_ids);
        let keys = std::iter::once(ConflictKey::Class(class_id.to_string()))
            .chain(ids.iter().cloned().map(ConflictKey::Student));
        let _guards = self.locks.acquire(keys).await;
        let mut tx = self.begin_write().await?;

        let target = class::require_class(&mut *tx, class_id).await?;
        let frozen = exam::has_examinations(&mut *tx, class_id).await?;

        let mut snapshots = Vec::with_capacity(ids.len());
        let known: HashSet<String> =
            student::existing_students(&mut *tx, &ids).await?.into_iter().collect();
        for id in &ids {
            let exists = known.contains(id);
            let bookings = if exists {
                enrollment::bookings_for_student(&mut *tx, id).await?
            } else {
                Vec::new()
            };
            snapshots.push(StudentSnapshot {
                student_id: id.clone(),
                exists,
                bookings,
            });
        }

        let outcome = EnrollmentConflictChecker::new()
            .evaluate_batch(&target, frozen, &snapshots, self.policy.enrollment_batch)
            .map_err(|e| rejected("enroll_students", e))?;

        let tuition_status = initial_status(target.window(), today);
        for student_id in &outcome.admitted {
            let seat = Enrollment {
                id: new_id(),
                class_id: target.id.clone(),
                student_id: student_id.clone(),
                status: EnrollmentStatus::Enrolled,
                grades: GradeSnapshot::default(),
            };
            enrollment::insert_enrollment(&mut *tx, &seat).await?;
            tuition::insert_tuition(
                &mut *tx,
                &TuitionRecord {
                    id: new_id(),
                    enrollment_id: seat.id.clone(),
                    status: tuition_status,
                    method: PaymentMethod::default(),
                },
            )
            .await?;
            debug!(enrollment_id = %seat.id, %student_id, "Seat created");
        }
        tx.commit().await?;

        info!(
            class_id,
            requested = outcome.totals.requested,
            admitted = outcome.totals.admitted,
            rejected = outcome.totals.rejected,
            policy = ?self.policy.enrollment_batch,
            "Enrollment batch committed"
        );
        Ok(outcome)
    }

    /// ENROLLED → WITHDRAWN. The seat keeps its grades and tuition record.
    pub async fn withdraw_enrollment(&self, actor: &Actor, enrollment_id: &str) -> DbResult<Enrollment> {
        actor
            .require(Capability::ManageEnrollment)
            .map_err(|e| rejected("withdraw_enrollment", e))?;

        // class and student of a seat never change, so this read can run unlocked
        let seat = {
            let mut conn = self.pool.acquire().await?;
            enrollment::require_enrollment(&mut conn, enrollment_id).await?
        };

        let _guards = self
            .locks
            .acquire([
                ConflictKey::Class(seat.class_id.clone()),
                ConflictKey::Student(seat.student_id.clone()),
            ])
            .await;
        let mut tx = self.begin_write().await?;

        let mut seat = enrollment::require_enrollment(&mut *tx, enrollment_id).await?;
        EnrollmentConflictChecker::new()
            .check_withdraw(&seat)
            .map_err(|e| rejected("withdraw_enrollment", e))?;

        enrollment::set_status(&mut *tx, enrollment_id, EnrollmentStatus::Withdrawn).await?;
        tx.commit().await?;

        seat.status = EnrollmentStatus::Withdrawn;
        info!(enrollment_id, class_id = %seat.class_id, "Enrollment withdrawn");
        Ok(seat)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
