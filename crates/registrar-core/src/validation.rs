//! # Validation Module
//!
//! Field-level checks that run before any conflict lookup.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Admission Layers                                   │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (fail fast, no snapshots needed)                 │
//! │  ├── Required strings, date ordering, weight bounds                    │
//! │  └── Grade bounds                                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Checkers (schedule, enrollment, exam, homeroom)              │
//! │  └── Compare the candidate against committed snapshots                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (class_id, exam_type), (class_id, student_id), ...        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A ValidationError never depends on committed state, so the same input
//! is rejected the same way no matter when it arrives.

use crate::error::ValidationError;
use crate::types::ClassSpec;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Inclusive bounds of an exam grade.
pub const MIN_GRADE: f64 = 0.0;
pub const MAX_GRADE: f64 = 10.0;

// =============================================================================
// String Validators
// =============================================================================

/// Rejects empty or whitespace-only values.
///
/// ## Example
/// ```rust
/// use registrar_core::validation::validate_required;
///
/// assert!(validate_required("room", "B-204").is_ok());
/// assert!(validate_required("room", "   ").is_err());
/// ```
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Class Booking Validators
// =============================================================================

/// Validates every field of a class before it is compared with anything.
///
/// ## Rules (checked in this order)
/// 1. class name, teacher, subject and room are present
/// 2. `start_date <= end_date`
/// 3. weekly slot: periods start at 1 and `period_start < period_end`
/// 4. `start_date <= tuition_due_date <= end_date`
/// 5. tuition is not negative
/// 6. `0 <= final_term_weight <= 1`
/// 7. `absence_warning_threshold <= absence_limit`
pub fn validate_class_spec(spec: &ClassSpec) -> ValidationResult<()> {
    validate_required("class name", &spec.class_name)?;
    validate_required("teacher", &spec.teacher_id)?;
    validate_required("subject", &spec.subject_id)?;
    validate_required("room", &spec.room)?;

    let window = &spec.window;
    if window.start_date > window.end_date {
        return Err(ValidationError::DateOrder {
            earlier: "start date".to_string(),
            earlier_date: window.start_date,
            later: "end date".to_string(),
            later_date: window.end_date,
        });
    }

    if let Some(slot) = &window.slot {
        if slot.period_start == 0 {
            return Err(ValidationError::MustBePositive {
                field: "period start".to_string(),
            });
        }
        if slot.period_start >= slot.period_end {
            return Err(ValidationError::PeriodOrder {
                start: slot.period_start,
                end: slot.period_end,
            });
        }
    }

    if spec.tuition_due_date < window.start_date {
        return Err(ValidationError::DateOrder {
            earlier: "start date".to_string(),
            earlier_date: window.start_date,
            later: "tuition due date".to_string(),
            later_date: spec.tuition_due_date,
        });
    }
    if spec.tuition_due_date > window.end_date {
        return Err(ValidationError::DateOrder {
            earlier: "tuition due date".to_string(),
            earlier_date: spec.tuition_due_date,
            later: "end date".to_string(),
            later_date: window.end_date,
        });
    }

    if spec.tuition.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "tuition".to_string(),
        });
    }

    validate_unit_interval("final term weight", spec.final_term_weight)?;

    if spec.absence_warning_threshold > spec.absence_limit {
        return Err(ValidationError::ThresholdOrder {
            warning: spec.absence_warning_threshold,
            limit: spec.absence_limit,
        });
    }

    Ok(())
}

/// `0.0 <= value <= 1.0`; NaN fails.
pub fn validate_unit_interval(field: &str, value: f64) -> ValidationResult<()> {
    validate_range(field, value, 0.0, 1.0)
}

// =============================================================================
// Grade Validators
// =============================================================================

/// Validates an exam grade.
///
/// ## Example
/// ```rust
/// use registrar_core::validation::validate_grade;
///
/// assert!(validate_grade(0.0).is_ok());
/// assert!(validate_grade(10.0).is_ok());
/// assert!(validate_grade(10.5).is_err());
/// assert!(validate_grade(f64::NAN).is_err());
/// ```
pub fn validate_grade(grade: f64) -> ValidationResult<()> {
    validate_range("grade", grade, MIN_GRADE, MAX_GRADE)
}

fn validate_range(field: &str, value: f64, min: f64, max: f64) -> ValidationResult<()> {
    // written as a positive range test so NaN lands in the error branch
    if !(min..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
            value,
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Rejects the first id that appears twice.
pub fn validate_unique_ids<'a, I>(field: &str, ids: I) -> ValidationResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ValidationError::Duplicate {
                field: field.to_string(),
                value: id.to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
