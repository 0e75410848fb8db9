//! # Enrollment Conflict Checker
//!
//! Admits students into a class when none of their current classes
//! occupies the same weekly slot in an overlapping date range.
//!
//! ## Batch Enrollment Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  enroll [S1, S2] into class C                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  C has an examination? ──yes──► StateError::EnrollmentFrozen           │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  for each distinct student:                                            │
//! │     unknown?            → StudentNotFound                              │
//! │     already in C?       → AlreadyEnrolled                              │
//! │     active class overlaps C? → TimeConflict                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Lenient: BatchOutcome { admitted, rejected, totals }                  │
//! │  Strict:  first rejection becomes the error, nothing admitted          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::batch::{BatchOutcome, BatchPolicy, Rejection, RejectionReason};
use crate::error::{ConflictError, CoreResult, StateError};
use crate::types::{ClassBooking, Enrollment, EnrollmentStatus, StudentBooking};
use crate::window::bookings_conflict;

/// Everything the checker needs to know about one requested student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSnapshot {
    pub student_id: String,
    pub exists: bool,
    /// All of the student's enrollments, any status.
    pub bookings: Vec<StudentBooking>,
}

/// Student time-overlap checks for enrollment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrollmentConflictChecker;

impl EnrollmentConflictChecker {
    pub fn new() -> Self {
        EnrollmentConflictChecker
    }

    /// Fails if the student already holds a seat in `candidate`, or if a
    /// non-withdrawn enrollment's class conflicts with it.
    ///
    /// A withdrawn seat in the same class still counts as a seat: the
    /// enrollment row keeps its grades and tuition history.
    pub fn check_student_conflict(
        &self,
        student_id: &str,
        candidate: &ClassBooking,
        bookings: &[StudentBooking],
    ) -> Result<(), ConflictError> {
        if bookings.iter().any(|b| b.booking.id == candidate.id) {
            return Err(ConflictError::AlreadyEnrolled {
                student_id: student_id.to_string(),
                class_id: candidate.id.clone(),
            });
        }

        let clash = bookings.iter().find(|b| {
            b.status.occupies_timetable() && bookings_conflict(candidate.window(), b.booking.window())
        });
        match clash {
            Some(b) => Err(ConflictError::StudentBusy {
                student_id: student_id.to_string(),
                class_id: b.booking.id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Per-student verdict used by batch evaluation.
    pub fn evaluate_student(
        &self,
        candidate: &ClassBooking,
        student: &StudentSnapshot,
    ) -> Result<(), RejectionReason> {
        if !student.exists {
            return Err(RejectionReason::StudentNotFound);
        }
        self.check_student_conflict(&student.student_id, candidate, &student.bookings)
            .map_err(|err| match err {
                ConflictError::AlreadyEnrolled { class_id, .. } => {
                    RejectionReason::AlreadyEnrolled { class_id }
                }
                ConflictError::StudentBusy { class_id, .. } => {
                    RejectionReason::TimeConflict { class_id }
                }
                // check_student_conflict yields nothing else
                _ => RejectionReason::TimeConflict {
                    class_id: candidate.id.clone(),
                },
            })
    }

    /// Evaluates a whole enrollment request.
    ///
    /// Snapshots with a repeated `student_id` are evaluated once. Returns
    /// the outcome to write; the caller inserts only `admitted`.
    pub fn evaluate_batch(
        &self,
        candidate: &ClassBooking,
        examinations_exist: bool,
        students: &[StudentSnapshot],
        policy: BatchPolicy,
    ) -> CoreResult<BatchOutcome> {
        if examinations_exist {
            return Err(StateError::EnrollmentFrozen {
                class_id: candidate.id.clone(),
            }
            .into());
        }

        let mut seen = HashSet::new();
        let mut admitted = Vec::new();
        let mut rejected = Vec::new();

        for student in students {
            if !seen.insert(student.student_id.as_str()) {
                continue;
            }
            match self.evaluate_student(candidate, student) {
                Ok(()) => admitted.push(student.student_id.clone()),
                Err(reason) => {
                    let rejection = Rejection::new(student.student_id.clone(), reason);
                    if policy == BatchPolicy::Strict {
                        return Err(rejection.to_error());
                    }
                    rejected.push(rejection);
                }
            }
        }

        Ok(BatchOutcome::new(admitted, rejected))
    }

    /// Only an ENROLLED seat can be withdrawn.
    pub fn check_withdraw(&self, enrollment: &Enrollment) -> Result<(), StateError> {
        if enrollment.status != EnrollmentStatus::Enrolled {
            return Err(StateError::EnrollmentClosed {
                enrollment_id: enrollment.id.clone(),
                status: enrollment.status.to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ErrorKind};
    use crate::testing::{booking, class_spec, enrollment};
    use chrono::Weekday;

    fn seat(enrollment_id: &str, status: EnrollmentStatus, class: ClassBooking) -> StudentBooking {
        StudentBooking {
            enrollment_id: enrollment_id.to_string(),
            status,
            booking: class,
        }
    }

    fn student(id: &str, bookings: Vec<StudentBooking>) -> StudentSnapshot {
        StudentSnapshot {
            student_id: id.to_string(),
            exists: true,
            bookings,
        }
    }

    #[test]
    fn test_lenient_batch_reports_time_conflict() {
        // C is Mon 1-2; S2 already attends D on Mon 2-3
        let c = booking("C", class_spec("T1", "A-1", Weekday::Mon, 1, 2));
        let d = booking("D", class_spec("T2", "B-1", Weekday::Mon, 2, 3));

        let students = vec![
            student("S1", vec![]),
            student("S2", vec![seat("e-1", EnrollmentStatus::Enrolled, d)]),
        ];

        let outcome = EnrollmentConflictChecker
            .evaluate_batch(&c, false, &students, BatchPolicy::Lenient)
            .unwrap();

        assert_eq!(outcome.admitted, vec!["S1".to_string()]);
        assert_eq!(
            outcome.rejected,
            vec![Rejection::new(
                "S2",
                RejectionReason::TimeConflict {
                    class_id: "D".to_string()
                }
            )]
        );
        assert_eq!(outcome.totals.requested, 2);
    }

    #[test]
    fn test_strict_batch_aborts_on_first_rejection() {
        let c = booking("C", class_spec("T1", "A-1", Weekday::Mon, 1, 2));
        let d = booking("D", class_spec("T2", "B-1", Weekday::Mon, 1, 2));
        let students = vec![
            student("S1", vec![]),
            student("S2", vec![seat("e-1", EnrollmentStatus::Enrolled, d)]),
        ];

        let err = EnrollmentConflictChecker
            .evaluate_batch(&c, false, &students, BatchPolicy::Strict)
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::Conflict(ConflictError::StudentBusy {
                student_id: "S2".to_string(),
                class_id: "D".to_string()
            })
        );
    }

    #[test]
    fn test_withdrawn_seat_frees_the_slot() {
        let c = booking("C", class_spec("T1", "A-1", Weekday::Mon, 1, 2));
        let d = booking("D", class_spec("T2", "B-1", Weekday::Mon, 1, 2));
        let seats = vec![seat("e-1", EnrollmentStatus::Withdrawn, d)];

        assert!(EnrollmentConflictChecker
            .check_student_conflict("S1", &c, &seats)
            .is_ok());
    }

    #[test]
    fn test_completed_seat_still_conflicts() {
        let c = booking("C", class_spec("T1", "A-1", Weekday::Mon, 1, 2));
        let d = booking("D", class_spec("T2", "B-1", Weekday::Mon, 2, 3));
        let seats = vec![seat("e-1", EnrollmentStatus::Completed, d)];

        assert!(EnrollmentConflictChecker
            .check_student_conflict("S1", &c, &seats)
            .is_err());
    }

    #[test]
    fn test_student_conflict_iff_windows_conflict() {
        let c = booking("C", class_spec("T1", "A-1", Weekday::Thu, 3, 4));
        for (day, from, to) in [
            (Weekday::Thu, 1u8, 2u8),
            (Weekday::Thu, 4, 6),
            (Weekday::Fri, 3, 4),
        ] {
            let other = booking("D", class_spec("T2", "B-1", day, from, to));
            let expected = bookings_conflict(c.window(), other.window());
            let seats = vec![seat("e-1", EnrollmentStatus::Enrolled, other)];
            let result = EnrollmentConflictChecker.check_student_conflict("S1", &c, &seats);
            assert_eq!(result.is_err(), expected);
        }
    }

    #[test]
    fn test_exams_freeze_enrollment() {
        let c = booking("C", class_spec("T1", "A-1", Weekday::Mon, 1, 2));
        let err = EnrollmentConflictChecker
            .evaluate_batch(&c, true, &[student("S1", vec![])], BatchPolicy::Lenient)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_unknown_and_duplicate_students() {
        let c = booking("C", class_spec("T1", "A-1", Weekday::Mon, 1, 2));
        let mut ghost = student("S9", vec![]);
        ghost.exists = false;
        let already = student(
            "S3",
            vec![seat("e-3", EnrollmentStatus::Enrolled, c.clone())],
        );
        let students = vec![
            student("S1", vec![]),
            student("S1", vec![]),
            ghost,
            already,
        ];

        let outcome = EnrollmentConflictChecker
            .evaluate_batch(&c, false, &students, BatchPolicy::Lenient)
            .unwrap();

        assert_eq!(outcome.admitted, vec!["S1".to_string()]);
        assert_eq!(outcome.totals.requested, 3);
        assert_eq!(outcome.rejected[0].reason, RejectionReason::StudentNotFound);
        assert_eq!(
            outcome.rejected[1].reason,
            RejectionReason::AlreadyEnrolled {
                class_id: "C".to_string()
            }
        );
    }

    #[test]
    fn test_withdraw_only_from_enrolled() {
        let mut seat = enrollment("e-1", "C", "S1");
        assert!(EnrollmentConflictChecker.check_withdraw(&seat).is_ok());

        seat.status = EnrollmentStatus::Withdrawn;
        assert!(matches!(
            EnrollmentConflictChecker.check_withdraw(&seat),
            Err(StateError::EnrollmentClosed { .. })
        ));
    }
}
