//! # Homeroom Membership Guard
//!
//! Keeps every student ANTICIPATED in at most one homeroom.
//!
//! ## Membership States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │      create (any status)                                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │     ┌─────────────┐   expel    ┌──────────┐                            │
//! │     │ ANTICIPATED │──────────►│ EXPELLED │  terminal                   │
//! │     └─────────────┘            └──────────┘                            │
//! │           │         graduate   ┌───────────┐                           │
//! │           └──────────────────►│ GRADUATED │  terminal                  │
//! │                                └───────────┘                           │
//! │                                                                         │
//! │  Entering ANTICIPATED (create or transition) scans the student's       │
//! │  other memberships; another ANTICIPATED one is a ConflictError.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::batch::{BatchOutcome, Rejection, RejectionReason};
use crate::error::{ConflictError, CoreResult, StateError};
use crate::types::{Homeroom, HomeroomMembership, HomeroomStatus};
use crate::validation::validate_required;

/// A requested student with all of their memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeroomCandidate {
    pub student_id: String,
    pub exists: bool,
    pub memberships: Vec<HomeroomMembership>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HomeroomMembershipGuard;

impl HomeroomMembershipGuard {
    pub fn new() -> Self {
        HomeroomMembershipGuard
    }

    /// Names are unique and a teacher heads at most one homeroom.
    pub fn check_new_homeroom(
        &self,
        name: &str,
        teacher_id: &str,
        existing: &[Homeroom],
    ) -> CoreResult<()> {
        validate_required("homeroom name", name)?;
        validate_required("homeroom teacher", teacher_id)?;

        if existing.iter().any(|h| h.name == name) {
            return Err(ConflictError::HomeroomNameTaken {
                name: name.to_string(),
            }
            .into());
        }
        if let Some(h) = existing.iter().find(|h| h.teacher_id == teacher_id) {
            return Err(ConflictError::TeacherHasHomeroom {
                teacher_id: teacher_id.to_string(),
                homeroom_id: h.id.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Admission of a new `(student, homeroom, status)` membership.
    pub fn check_new_membership(
        &self,
        homeroom_id: &str,
        student_id: &str,
        status: HomeroomStatus,
        student_memberships: &[HomeroomMembership],
    ) -> Result<(), ConflictError> {
        if student_memberships.iter().any(|m| m.homeroom_id == homeroom_id) {
            return Err(ConflictError::AlreadyInHomeroom {
                student_id: student_id.to_string(),
                homeroom_id: homeroom_id.to_string(),
            });
        }
        if status == HomeroomStatus::Anticipated {
            check_no_other_anticipated(student_id, None, student_memberships)?;
        }
        Ok(())
    }

    /// Decides a status change. Returns `Ok(false)` when the membership is
    /// already in `next` and nothing has to be written.
    pub fn check_transition(
        &self,
        membership: &HomeroomMembership,
        next: HomeroomStatus,
        student_memberships: &[HomeroomMembership],
    ) -> CoreResult<bool> {
        if membership.status == next {
            return Ok(false);
        }
        if membership.status.is_terminal() {
            return Err(StateError::TerminalMembership {
                membership_id: membership.id.clone(),
                status: membership.status,
            }
            .into());
        }
        if next == HomeroomStatus::Anticipated {
            check_no_other_anticipated(
                &membership.student_id,
                Some(&membership.id),
                student_memberships,
            )?;
        }
        Ok(true)
    }

    /// Lenient batch add: every distinct student is evaluated on its own.
    pub fn evaluate_batch(
        &self,
        homeroom_id: &str,
        status: HomeroomStatus,
        students: &[HomeroomCandidate],
    ) -> BatchOutcome {
        let mut seen = HashSet::new();
        let mut admitted = Vec::new();
        let mut rejected = Vec::new();

        for student in students {
            if !seen.insert(student.student_id.as_str()) {
                continue;
            }
            if !student.exists {
                rejected.push(Rejection::new(
                    student.student_id.clone(),
                    RejectionReason::StudentNotFound,
                ));
                continue;
            }
            let verdict = self.check_new_membership(
                homeroom_id,
                &student.student_id,
                status,
                &student.memberships,
            );
            match verdict {
                Ok(()) => admitted.push(student.student_id.clone()),
                Err(ConflictError::ActiveInAnotherHomeroom { homeroom_id, .. }) => rejected.push(
                    Rejection::new(
                        student.student_id.clone(),
                        RejectionReason::ActiveInAnotherHomeroom { homeroom_id },
                    ),
                ),
                Err(_) => rejected.push(Rejection::new(
                    student.student_id.clone(),
                    RejectionReason::AlreadyInHomeroom {
                        homeroom_id: homeroom_id.to_string(),
                    },
                )),
            }
        }

        BatchOutcome::new(admitted, rejected)
    }
}

fn check_no_other_anticipated(
    student_id: &str,
    except_membership: Option<&str>,
    memberships: &[HomeroomMembership],
) -> Result<(), ConflictError> {
    let active = memberships.iter().find(|m| {
        m.status == HomeroomStatus::Anticipated && Some(m.id.as_str()) != except_membership
    });
    match active {
        Some(m) => Err(ConflictError::ActiveInAnotherHomeroom {
            student_id: student_id.to_string(),
            homeroom_id: m.homeroom_id.clone(),
        }),
        None => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
