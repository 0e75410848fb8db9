//! # Schedule Conflict Checker
//!
//! Decides whether a class can be created or changed without double-booking
//! its teacher or its room.
//!
//! ## Admission Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  candidate ClassSpec                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_class_spec ──────────────► ValidationError (fail fast)       │
//! │       │                                                                 │
//! │       ▼  (update only)                                                  │
//! │  check_update_allowed ─────────────► StateError::BookingLocked         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  check_teacher_conflict ───────────► ConflictError::TeacherBusy        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  check_room_conflict ──────────────► ConflictError::RoomBusy           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  admitted                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The checker holds no state. Callers pass the committed bookings for the
//! candidate's teacher and room as slices; entries for other teachers or
//! rooms are ignored, so passing a wider snapshot is harmless.

use crate::error::{ConflictError, CoreResult, StateError};
use crate::types::{ClassBooking, ClassSpec};
use crate::validation::validate_class_spec;
use crate::window::bookings_conflict;

/// Teacher and room double-booking checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleConflictChecker;

impl ScheduleConflictChecker {
    pub fn new() -> Self {
        ScheduleConflictChecker
    }

    /// Fails with the first committed booking of the same teacher whose
    /// window conflicts with the candidate.
    ///
    /// `exclude_id` skips the booking being updated so a class never
    /// conflicts with its own previous version.
    pub fn check_teacher_conflict(
        &self,
        candidate: &ClassSpec,
        existing: &[ClassBooking],
        exclude_id: Option<&str>,
    ) -> Result<(), ConflictError> {
        let clash = first_clash(candidate, existing, exclude_id, |b| {
            b.spec.teacher_id == candidate.teacher_id
        });
        match clash {
            Some(booking) => Err(ConflictError::TeacherBusy {
                teacher_id: candidate.teacher_id.clone(),
                class_id: booking.id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Same as [`check_teacher_conflict`](Self::check_teacher_conflict),
    /// scoped to the candidate's room.
    pub fn check_room_conflict(
        &self,
        candidate: &ClassSpec,
        existing: &[ClassBooking],
        exclude_id: Option<&str>,
    ) -> Result<(), ConflictError> {
        let clash = first_clash(candidate, existing, exclude_id, |b| b.spec.room == candidate.room);
        match clash {
            Some(booking) => Err(ConflictError::RoomBusy {
                room: candidate.room.clone(),
                class_id: booking.id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// A booking with at least one enrollment may only change its
    /// non-structural fields (name, description, tuition terms, absence
    /// terms).
    pub fn check_update_allowed(
        &self,
        current: &ClassBooking,
        proposed: &ClassSpec,
        enrollment_count: usize,
    ) -> Result<(), StateError> {
        if enrollment_count == 0 {
            return Ok(());
        }

        let before = &current.spec;
        let changed = if before.teacher_id != proposed.teacher_id {
            Some("teacher")
        } else if before.subject_id != proposed.subject_id {
            Some("subject")
        } else if before.room != proposed.room {
            Some("room")
        } else if before.window.slot != proposed.window.slot {
            Some("weekly slot")
        } else if before.window.start_date != proposed.window.start_date
            || before.window.end_date != proposed.window.end_date
        {
            Some("dates")
        } else {
            None
        };

        match changed {
            Some(field) => Err(StateError::BookingLocked {
                class_id: current.id.clone(),
                field: field.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Full admission of a new class.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::{NaiveDate, Weekday};
    /// use registrar_core::schedule::ScheduleConflictChecker;
    /// use registrar_core::types::ClassSpec;
    /// use registrar_core::window::{TimeWindow, WeeklySlot};
    /// use registrar_core::Money;
    ///
    /// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    /// let end = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    /// let spec = ClassSpec {
    ///     class_name: "Chemistry".into(),
    ///     description: None,
    ///     teacher_id: "t-1".into(),
    ///     subject_id: "chem".into(),
    ///     room: "Lab 2".into(),
    ///     window: TimeWindow::new(start, end, Some(WeeklySlot::new(Weekday::Tue, 1, 2).unwrap())).unwrap(),
    ///     tuition: Money::from_cents(90_000),
    ///     tuition_due_date: start,
    ///     final_term_weight: 0.5,
    ///     absence_warning_threshold: 2,
    ///     absence_limit: 4,
    /// };
    ///
    /// let checker = ScheduleConflictChecker::new();
    /// assert!(checker.admit_create(&spec, &[], &[]).is_ok());
    /// ```
    pub fn admit_create(
        &self,
        candidate: &ClassSpec,
        teacher_bookings: &[ClassBooking],
        room_bookings: &[ClassBooking],
    ) -> CoreResult<()> {
        validate_class_spec(candidate)?;
        self.check_teacher_conflict(candidate, teacher_bookings, None)?;
        self.check_room_conflict(candidate, room_bookings, None)?;
        Ok(())
    }

    /// Full admission of a change to `current`.
    pub fn admit_update(
        &self,
        current: &ClassBooking,
        proposed: &ClassSpec,
        enrollment_count: usize,
        teacher_bookings: &[ClassBooking],
        room_bookings: &[ClassBooking],
    ) -> CoreResult<()> {
        validate_class_spec(proposed)?;
        self.check_update_allowed(current, proposed, enrollment_count)?;
        let own_id = Some(current.id.as_str());
        self.check_teacher_conflict(proposed, teacher_bookings, own_id)?;
        self.check_room_conflict(proposed, room_bookings, own_id)?;
        Ok(())
    }
}

fn first_clash<'a, F>(
    candidate: &ClassSpec,
    existing: &'a [ClassBooking],
    exclude_id: Option<&str>,
    same_resource: F,
) -> Option<&'a ClassBooking>
where
    F: Fn(&ClassBooking) -> bool,
{
    existing.iter().find(|b| {
        Some(b.id.as_str()) != exclude_id
            && same_resource(b)
            && bookings_conflict(&candidate.window, b.window())
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
