//! Tuition status updates.

use registrar_core::tuition::check_transition;
use registrar_core::{Actor, Capability, PaymentMethod, TuitionRecord, TuitionStatus};
use tracing::info;

use super::{missing, rejected, Admissions};
use crate::error::DbResult;
use crate::locks::ConflictKey;
use crate::repository::{enrollment, tuition};

impl Admissions {
    /// Moves a tuition record to `next`, optionally recording how it was
    /// paid. A same-status update only changes the method.
    pub async fn update_tuition_status(
        &self,
        actor: &Actor,
        tuition_id: &str,
        next: TuitionStatus,
        method: Option<PaymentMethod>,
    ) -> DbResult<TuitionRecord> {
        actor
            .require(Capability::ManageTuition)
            .map_err(|e| rejected("update_tuition_status", e))?;

        let class_id = {
            let mut conn = self.pool.acquire().await?;
            let record = tuition::fetch_tuition(&mut conn, tuition_id)
                .await?
                .ok_or_else(|| missing("TuitionRecord", tuition_id))?;
            enrollment::require_enrollment(&mut conn, &record.enrollment_id).await?.class_id
        };

        let _guards = self.locks.acquire([ConflictKey::Class(class_id)]).await;
        let mut tx = self.begin_write().await?;

        let current = tuition::fetch_tuition(&mut *tx, tuition_id)
            .await?
            .ok_or_else(|| missing("TuitionRecord", tuition_id))?;
        let moves = check_transition(&current, next).map_err(|e| rejected("update_tuition_status", e))?;

        let updated = TuitionRecord {
            status: next,
            method: method.unwrap_or(current.method),
            ..current.clone()
        };
        if moves || updated.method != current.method {
            tuition::store_tuition(&mut *tx, &updated).await?;
            tx.commit().await?;
            info!(
                tuition_id,
                from = %current.status,
                to = %updated.status,
                method = ?updated.method,
                "Tuition updated"
            );
        }
        Ok(updated)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, class_spec, date, memory_db, students};
    use crate::Database;
    use chrono::{NaiveDate, Weekday};
    use registrar_core::{CoreError, ErrorKind, StateError};

    /// Tuition record of a fresh seat enrolled on `today`.
    async fn record(db: &Database, today: NaiveDate) -> TuitionRecord {
        let admissions = db.admissions();
        let class = admissions
            .create_class(&admin(), class_spec("T", "A-1", Weekday::Mon, 1, 2))
            .await
            .unwrap();
        let ids = students(db, &["Ada"]).await;
        admissions
            .enroll_students(&admin(), &class.id, &ids, today)
            .await
            .unwrap();
        let seat = db.enrollments().for_class(&class.id).await.unwrap().remove(0);
        db.tuition().for_enrollment(&seat.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_processing_to_paid_by_transfer() {
        let db = memory_db().await;
        let start = record(&db, date(2024, 2, 1)).await;
        assert_eq!(start.status, TuitionStatus::Processing);

        let paid = db
            .admissions()
            .update_tuition_status(&admin(), &start.id, TuitionStatus::Paid, Some(PaymentMethod::BankTransfer))
            .await
            .unwrap();
        assert_eq!(paid.status, TuitionStatus::Paid);
        assert_eq!(db.tuition().get(&start.id).await.unwrap(), Some(paid));
    }

    #[tokio::test]
    async fn test_paid_is_terminal() {
        let db = memory_db().await;
        let start = record(&db, date(2023, 11, 1)).await;
        assert_eq!(start.status, TuitionStatus::Unpaid);
        let admissions = db.admissions();

        admissions
            .update_tuition_status(&admin(), &start.id, TuitionStatus::Paid, None)
            .await
            .unwrap();
        let err = admissions
            .update_tuition_status(&admin(), &start.id, TuitionStatus::Unpaid, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(CoreError::State(StateError::TuitionTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unpaid_cannot_return_to_processing() {
        let db = memory_db().await;
        let start = record(&db, date(2023, 11, 1)).await;
        let err = db
            .admissions()
            .update_tuition_status(&admin(), &start.id, TuitionStatus::Processing, None)
            .await
            .unwrap_err();
        assert_eq!(err.rejection().map(CoreError::kind), Some(ErrorKind::State));
    }

    #[tokio::test]
    async fn test_overdue_lists_unpaid_past_due() {
        let db = memory_db().await;
        let start = record(&db, date(2024, 2, 1)).await;

        // due date is the class start, 2024-01-01
        assert!(db.tuition().overdue(date(2024, 1, 1)).await.unwrap().is_empty());
        assert_eq!(db.tuition().overdue(date(2024, 1, 2)).await.unwrap(), vec![start.clone()]);

        db.admissions()
            .update_tuition_status(&admin(), &start.id, TuitionStatus::Paid, None)
            .await
            .unwrap();
        assert!(db.tuition().overdue(date(2024, 3, 1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_record_and_student_actor() {
        let db = memory_db().await;
        let err = db
            .admissions()
            .update_tuition_status(&admin(), "ghost", TuitionStatus::Paid, None)
            .await
            .unwrap_err();
        assert_eq!(err.rejection().map(CoreError::kind), Some(ErrorKind::NotFound));

        let err = db
            .admissions()
            .update_tuition_status(&Actor::student("S"), "ghost", TuitionStatus::Paid, None)
            .await
            .unwrap_err();
        assert_eq!(err.rejection().map(CoreError::kind), Some(ErrorKind::Forbidden));
    }
}
