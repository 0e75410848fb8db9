//! # Batch Outcomes
//!
//! Shared result shape for multi-student operations (class enrollment,
//! homeroom assignment).
//!
//! ```text
//! request [S1, S2, S2, S3]
//!      │ dedupe (first occurrence wins)
//!      ▼
//! [S1, S2, S3] ── evaluate each ──┬──► admitted: [S1, S3]
//!                                 └──► rejected: [{S2, time_conflict}]
//!
//! totals { requested: 3, admitted: 2, rejected: 1 }
//! ```
//!
//! Under [`BatchPolicy::Strict`] the first rejection aborts the whole batch
//! instead, and nothing is written.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{ConflictError, CoreError};

// =============================================================================
// Policy
// =============================================================================

/// How a batch reacts to a rejected item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPolicy {
    /// Abort on the first rejected student.
    Strict,
    /// Admit what can be admitted and report the rest.
    #[default]
    Lenient,
}

impl BatchPolicy {
    /// Parses `"strict"` / `"lenient"`, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(BatchPolicy::Strict),
            "lenient" => Some(BatchPolicy::Lenient),
            _ => None,
        }
    }
}

// =============================================================================
// Rejections
// =============================================================================

/// Why one student was left out of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RejectionReason {
    /// One of the student's current classes overlaps the target class.
    TimeConflict { class_id: String },
    AlreadyEnrolled { class_id: String },
    StudentNotFound,
    /// The student is ANTICIPATED in another homeroom.
    ActiveInAnotherHomeroom { homeroom_id: String },
    AlreadyInHomeroom { homeroom_id: String },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::TimeConflict { class_id } => {
                write!(f, "time conflict with class {class_id}")
            }
            RejectionReason::AlreadyEnrolled { class_id } => {
                write!(f, "already enrolled in class {class_id}")
            }
            RejectionReason::StudentNotFound => write!(f, "student not found"),
            RejectionReason::ActiveInAnotherHomeroom { homeroom_id } => {
                write!(f, "already anticipated in homeroom {homeroom_id}")
            }
            RejectionReason::AlreadyInHomeroom { homeroom_id } => {
                write!(f, "already a member of homeroom {homeroom_id}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub student_id: String,
    pub reason: RejectionReason,
}

impl Rejection {
    pub fn new(student_id: impl Into<String>, reason: RejectionReason) -> Self {
        Rejection {
            student_id: student_id.into(),
            reason,
        }
    }

    /// The typed error a strict batch aborts with.
    pub fn to_error(&self) -> CoreError {
        let student_id = self.student_id.clone();
        match &self.reason {
            RejectionReason::TimeConflict { class_id } => ConflictError::StudentBusy {
                student_id,
                class_id: class_id.clone(),
            }
            .into(),
            RejectionReason::AlreadyEnrolled { class_id } => ConflictError::AlreadyEnrolled {
                student_id,
                class_id: class_id.clone(),
            }
            .into(),
            RejectionReason::StudentNotFound => CoreError::not_found("Student", student_id),
            RejectionReason::ActiveInAnotherHomeroom { homeroom_id } => {
                ConflictError::ActiveInAnotherHomeroom {
                    student_id,
                    homeroom_id: homeroom_id.clone(),
                }
                .into()
            }
            RejectionReason::AlreadyInHomeroom { homeroom_id } => {
                ConflictError::AlreadyInHomeroom {
                    student_id,
                    homeroom_id: homeroom_id.clone(),
                }
                .into()
            }
        }
    }
}

// =============================================================================
// Outcome
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchTotals {
    pub requested: usize,
    pub admitted: usize,
    pub rejected: usize,
}

/// Per-student result of a lenient batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub admitted: Vec<String>,
    pub rejected: Vec<Rejection>,
    pub totals: BatchTotals,
}

impl BatchOutcome {
    pub fn new(admitted: Vec<String>, rejected: Vec<Rejection>) -> Self {
        let totals = BatchTotals {
            requested: admitted.len() + rejected.len(),
            admitted: admitted.len(),
            rejected: rejected.len(),
        };
        BatchOutcome {
            admitted,
            rejected,
            totals,
        }
    }

    pub fn is_fully_admitted(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Drops repeated ids, keeping the first occurrence and the request order.
pub fn dedupe_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.as_ref())
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
