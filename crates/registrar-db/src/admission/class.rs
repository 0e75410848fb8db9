//! Class booking workflows.

use registrar_core::{Actor, Capability, ClassBooking, ClassSpec, ScheduleConflictChecker};
use tracing::info;

use super::{rejected, Admissions};
use crate::error::DbResult;
use crate::locks::ConflictKey;
use crate::repository::{class, enrollment, new_id};

impl Admissions {
    /// Books a new class if neither its teacher nor its room is taken.
    pub async fn create_class(&self, actor: &Actor, spec: ClassSpec) -> DbResult<ClassBooking> {
        actor
            .require(Capability::ManageClasses)
            .map_err(|e| rejected("create_class", e))?;

        let _guards = self
            .locks
            .acquire([
                ConflictKey::Teacher(spec.teacher_id.clone()),
                ConflictKey::Room(spec.room.clone()),
            ])
            .await;
        let mut tx = self.begin_write().await?;

        let teacher_bookings = class::bookings_for_teacher(&mut *tx, &spec.teacher_id, &spec.window).await?;
        let room_bookings = class::bookings_for_room(&mut *tx, &spec.room, &spec.window).await?;

        ScheduleConflictChecker::new()
            .admit_create(&spec, &teacher_bookings, &room_bookings)
            .map_err(|e| rejected("create_class", e))?;

        let booking = ClassBooking::new(new_id(), spec);
        class::insert_class(&mut *tx, &booking).await?;
        tx.commit().await?;

        info!(
            class_id = %booking.id,
            teacher_id = %booking.spec.teacher_id,
            room = %booking.spec.room,
            "Class booked"
        );
        Ok(booking)
    }

    /// Replaces a class's fields. Once anyone is enrolled only the name,
    /// description, tuition and grading/absence terms may change.
    pub async fn update_class(&self, actor: &Actor, class_id: &str, proposed: ClassSpec) -> DbResult<ClassBooking> {
        actor
            .require(Capability::ManageClasses)
            .map_err(|e| rejected("update_class", e))?;

        let _guards = self
            .locks
            .acquire([
                ConflictKey::Teacher(proposed.teacher_id.clone()),
                ConflictKey::Room(proposed.room.clone()),
                ConflictKey::Class(class_id.to_string()),
            ])
            .await;
        let mut tx = self.begin_write().await?;

        let current = class::require_class(&mut *tx, class_id).await?;
        let seats = enrollment::enrollment_count(&mut *tx, class_id).await?;
        let teacher_bookings =
            class::bookings_for_teacher(&mut *tx, &proposed.teacher_id, &proposed.window).await?;
        let room_bookings = class::bookings_for_room(&mut *tx, &proposed.room, &proposed.window).await?;

        ScheduleConflictChecker::new()
            .admit_update(&current, &proposed, seats, &teacher_bookings, &room_bookings)
            .map_err(|e| rejected("update_class", e))?;

        let updated = ClassBooking::new(current.id, proposed);
        class::update_class(&mut *tx, &updated).await?;
        tx.commit().await?;

        info!(class_id = %updated.id, enrollments = seats, "Class updated");
        Ok(updated)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
