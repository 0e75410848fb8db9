//! # Exam Sequencer
//!
//! Ordering and eligibility rules for examinations.
//!
//! ## Exam Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   (none) ──create MIDTERM──► MIDTERM ──create FINAL──► MIDTERM + FINAL │
//! │                                        (final.date >= midterm.date)    │
//! │                                                                         │
//! │   create FINAL without MIDTERM ──► StateError::MidtermRequired         │
//! │   delete MIDTERM while FINAL    ──► StateError::MidtermHasFinal        │
//! │   second exam of the same type  ──► ConflictError::ExamAlreadyExists   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Create Check Order
//! 1. date inside the class window (Validation)
//! 2. roster has no repeated enrollment (Validation)
//! 3. no exam of this type yet (Conflict)
//! 4. FINAL needs an earlier-or-same-day MIDTERM (State)
//! 5. every roster enrollment belongs to the class (NotFound)
//!
//! ## Grading Absent Entries
//! An absent entry never receives a grade. [`AbsentGradingPolicy`] decides
//! whether an attempt is reported back as [`GradeDecision::SkippedAbsent`]
//! or refused with [`StateError::AbsentEntry`].

use serde::{Deserialize, Serialize};

use crate::error::{ConflictError, CoreError, CoreResult, StateError, ValidationError};
use crate::types::{ClassBooking, Enrollment, ExamEntry, ExamRequest, ExamType, Examination, GradeSnapshot};
use crate::validation::{validate_grade, validate_unique_ids};

// =============================================================================
// Policies & Decisions
// =============================================================================

/// What happens when someone grades an absent entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsentGradingPolicy {
    /// Leave the entry untouched and report it.
    #[default]
    Skip,
    /// Refuse with a StateError.
    Reject,
}

impl AbsentGradingPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Some(AbsentGradingPolicy::Skip),
            "reject" => Some(AbsentGradingPolicy::Reject),
            _ => None,
        }
    }
}

/// Result of a single grading attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "grade", rename_all = "snake_case")]
pub enum GradeDecision {
    /// Store this grade on the entry.
    Apply(f64),
    /// The entry is absent; its grade stays as it was.
    SkippedAbsent,
}

// =============================================================================
// Sequencer
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ExamSequencer;

impl ExamSequencer {
    pub fn new() -> Self {
        ExamSequencer
    }

    /// Decides whether `request` may be scheduled for `class`.
    ///
    /// `class_enrollments` are the class's enrollments; `existing` are the
    /// class's current examinations.
    pub fn check_create(
        &self,
        class: &ClassBooking,
        class_enrollments: &[Enrollment],
        existing: &[Examination],
        request: &ExamRequest,
    ) -> CoreResult<()> {
        let window = class.window();
        if !window.contains(request.date) {
            return Err(ValidationError::OutsideClassWindow {
                field: "exam date".to_string(),
                date: request.date,
                start: window.start_date,
                end: window.end_date,
            }
            .into());
        }

        validate_unique_ids(
            "roster enrollment",
            request.roster.iter().map(|r| r.enrollment_id.as_str()),
        )?;

        if existing.iter().any(|e| e.exam_type == request.exam_type) {
            return Err(ConflictError::ExamAlreadyExists {
                class_id: class.id.clone(),
                exam_type: request.exam_type,
            }
            .into());
        }

        if request.exam_type == ExamType::Final {
            let midterm = existing
                .iter()
                .find(|e| e.exam_type == ExamType::Midterm)
                .ok_or_else(|| StateError::MidtermRequired {
                    class_id: class.id.clone(),
                })?;
            if midterm.date > request.date {
                return Err(StateError::FinalBeforeMidterm {
                    midterm_date: midterm.date,
                    final_date: request.date,
                }
                .into());
            }
        }

        for line in &request.roster {
            let belongs = class_enrollments
                .iter()
                .any(|e| e.id == line.enrollment_id && e.class_id == class.id);
            if !belongs {
                return Err(CoreError::not_found("Enrollment", line.enrollment_id.clone()));
            }
        }

        Ok(())
    }

    /// Decides what a grading attempt does to `entry`.
    ///
    /// The grade is range-checked first, so an out-of-range grade is a
    /// ValidationError even for an absent entry.
    pub fn grade(
        &self,
        entry: &ExamEntry,
        grade: f64,
        policy: AbsentGradingPolicy,
    ) -> CoreResult<GradeDecision> {
        validate_grade(grade)?;

        if entry.is_absent {
            return match policy {
                AbsentGradingPolicy::Skip => Ok(GradeDecision::SkippedAbsent),
                AbsentGradingPolicy::Reject => Err(StateError::AbsentEntry {
                    entry_id: entry.id.clone(),
                }
                .into()),
            };
        }

        Ok(GradeDecision::Apply(grade))
    }

    /// A MIDTERM cannot be removed while the class still has a FINAL.
    pub fn check_delete(&self, exam: &Examination, class_exams: &[Examination]) -> Result<(), StateError> {
        let has_final = class_exams
            .iter()
            .any(|e| e.id != exam.id && e.exam_type == ExamType::Final);
        if exam.exam_type == ExamType::Midterm && has_final {
            return Err(StateError::MidtermHasFinal {
                class_id: exam.class_id.clone(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Grade Snapshots
// =============================================================================

/// `midterm * (1 - w) + final * w`, once both grades exist.
pub fn weighted_final_grade(midterm: Option<f64>, final_exam: Option<f64>, final_weight: f64) -> Option<f64> {
    match (midterm, final_exam) {
        (Some(m), Some(f)) => Some(m * (1.0 - final_weight) + f * final_weight),
        _ => None,
    }
}

/// Copies a new grade into the snapshot and recomputes the overall grade.
pub fn refresh_snapshot(
    snapshot: GradeSnapshot,
    exam_type: ExamType,
    grade: Option<f64>,
    final_weight: f64,
) -> GradeSnapshot {
    let mut next = snapshot;
    match exam_type {
        ExamType::Midterm => next.midterm = grade,
        ExamType::Final => next.final_exam = grade,
    }
    next.overall = weighted_final_grade(next.midterm, next.final_exam, final_weight);
    next
}

// =============================================================================
// Unit Tests
// =============================================================================
