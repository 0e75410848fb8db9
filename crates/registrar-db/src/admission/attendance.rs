//! Roll calls and absence standings.

use registrar_core::{
    AbsenceSummary, Actor, AttendanceAggregator, AttendanceEvent, AttendanceRequest, Capability,
};
use tracing::info;

use super::{rejected, Admissions};
use crate::error::DbResult;
use crate::locks::ConflictKey;
use crate::repository::{attendance, class, enrollment, new_id};

impl Admissions {
    /// Records one roll call for a class.
    pub async fn record_attendance(
        &self,
        actor: &Actor,
        class_id: &str,
        request: AttendanceRequest,
    ) -> DbResult<AttendanceEvent> {
        let _guards = self.locks.acquire([ConflictKey::Class(class_id.to_string())]).await;
        let mut tx = self.begin_write().await?;

        let target = class::require_class(&mut *tx, class_id).await?;
        actor
            .require_for_class(Capability::RecordAttendance, &target.spec)
            .map_err(|e| rejected("record_attendance", e))?;

        let seats = enrollment::class_enrollments(&mut *tx, class_id).await?;
        let existing = attendance::class_attendance_events(&mut *tx, class_id).await?;
        AttendanceAggregator::new()
            .check_record(&target, &seats, &existing, &request)
            .map_err(|e| rejected("record_attendance", e))?;

        let event = AttendanceEvent {
            id: new_id(),
            class_id: target.id.clone(),
            date: request.date,
            attendance_type: request.attendance_type,
            marks: request.marks,
        };
        attendance::insert_event(&mut *tx, &event).await?;
        tx.commit().await?;

        info!(
            event_id = %event.id,
            class_id,
            date = %event.date,
            attendance_type = %event.attendance_type,
            marks = event.marks.len(),
            "Attendance recorded"
        );
        Ok(event)
    }

    /// Absence count and standing for every seat of a class.
    pub async fn attendance_summary(&self, actor: &Actor, class_id: &str) -> DbResult<Vec<AbsenceSummary>> {
        let mut conn = self.pool.acquire().await?;

        let target = class::require_class(&mut conn, class_id).await?;
        actor
            .require_for_class(Capability::ViewRecords, &target.spec)
            .map_err(|e| rejected("attendance_summary", e))?;

        let seats = enrollment::class_enrollments(&mut conn, class_id).await?;
        let events = attendance::class_attendance_events(&mut conn, class_id).await?;
        Ok(AttendanceAggregator::new().summarize(&target, &seats, &events))
    }

    /// Absence count and standing for a single seat.
    pub async fn absence_standing(&self, actor: &Actor, enrollment_id: &str) -> DbResult<AbsenceSummary> {
        let mut conn = self.pool.acquire().await?;

        let seat = enrollment::require_enrollment(&mut conn, enrollment_id).await?;
        let target = class::require_class(&mut conn, &seat.class_id).await?;
        actor
            .require_for_class(Capability::ViewRecords, &target.spec)
            .map_err(|e| rejected("absence_standing", e))?;

        let events = attendance::attendance_events(&mut conn, enrollment_id).await?;
        let aggregator = AttendanceAggregator::new();
        let absences = aggregator.absence_count(enrollment_id, &events);
        Ok(AbsenceSummary {
            enrollment_id: seat.id,
            student_id: seat.student_id,
            absences,
            standing: aggregator.standing(absences, &target.spec),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
