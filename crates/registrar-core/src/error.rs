//! # Error Types
//!
//! Domain-specific error types for registrar-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  registrar-core errors (this file)                                     │
//! │  ├── ValidationError  - Malformed or out-of-range input                │
//! │  ├── ConflictError    - Overlaps with committed state                  │
//! │  ├── StateError       - Illegal transition                             │
//! │  ├── NotFoundError    - Referenced entity does not exist               │
//! │  └── CoreError        - One of the above, or Forbidden                 │
//! │                                                                         │
//! │  registrar-db errors (separate crate)                                  │
//! │  └── DbError          - Database failures + Rejected(CoreError)        │
//! │                                                                         │
//! │  Flow: checker → CoreError → DbError::Rejected → caller                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (class id, student id, dates)
//! 3. Errors are enum variants, never String
//! 4. Every business outcome is deterministic and non-retryable

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{AttendanceType, ExamType, HomeroomStatus, TuitionStatus};

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Always detected before any conflict check runs. The caller has to
/// correct the input; retrying the same request cannot succeed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value must be strictly greater than zero.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Two dates are in the wrong order.
    #[error("{earlier} ({earlier_date}) must not be after {later} ({later_date})")]
    DateOrder {
        earlier: String,
        earlier_date: NaiveDate,
        later: String,
        later_date: NaiveDate,
    },

    /// The weekly slot ends before (or when) it starts.
    #[error("period start {start} must be before period end {end}")]
    PeriodOrder { start: u8, end: u8 },

    /// The absence warning fires after the hard limit.
    #[error("absence warning threshold {warning} must not exceed absence limit {limit}")]
    ThresholdOrder { warning: u32, limit: u32 },

    /// Numeric value is out of range (NaN is always out of range).
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    /// A date falls outside the class date range.
    #[error("{field} {date} is outside the class range {start}..={end}")]
    OutsideClassWindow {
        field: String,
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// The same value appears twice where it must be unique.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Conflict Error
// =============================================================================

/// The input is well-formed but collides with committed state.
///
/// ## Typical Flow
/// ```text
/// New class for teacher T, Mon period 2-3
///      │
///      ▼
/// T already teaches Mon period 1-2 in an overlapping date range
///      │
///      ▼
/// TeacherBusy { teacher_id: T, class_id: <existing> }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("teacher {teacher_id} already teaches class {class_id} in this slot")]
    TeacherBusy { teacher_id: String, class_id: String },

    #[error("room {room} is already booked by class {class_id} in this slot")]
    RoomBusy { room: String, class_id: String },

    #[error("student {student_id} already attends class {class_id} in this slot")]
    StudentBusy { student_id: String, class_id: String },

    #[error("student {student_id} is already enrolled in class {class_id}")]
    AlreadyEnrolled { student_id: String, class_id: String },

    #[error("class {class_id} already has a {exam_type} examination")]
    ExamAlreadyExists { class_id: String, exam_type: ExamType },

    #[error("student {student_id} is already active in homeroom {homeroom_id}")]
    ActiveInAnotherHomeroom {
        student_id: String,
        homeroom_id: String,
    },

    #[error("student {student_id} is already a member of homeroom {homeroom_id}")]
    AlreadyInHomeroom {
        student_id: String,
        homeroom_id: String,
    },

    #[error("class {class_id} already has a {attendance_type} attendance on {date}")]
    AttendanceAlreadyRecorded {
        class_id: String,
        date: NaiveDate,
        attendance_type: AttendanceType,
    },

    #[error("homeroom name '{name}' is already taken")]
    HomeroomNameTaken { name: String },

    #[error("teacher {teacher_id} already heads homeroom {homeroom_id}")]
    TeacherHasHomeroom {
        teacher_id: String,
        homeroom_id: String,
    },
}

// =============================================================================
// State Error
// =============================================================================

/// The requested transition is illegal from the current state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    /// Structural fields of a class freeze once anyone is enrolled.
    #[error("class {class_id} has enrollments; {field} can no longer change")]
    BookingLocked { class_id: String, field: String },

    #[error("class {class_id} needs a midterm before a final can be scheduled")]
    MidtermRequired { class_id: String },

    #[error("final on {final_date} cannot precede the midterm on {midterm_date}")]
    FinalBeforeMidterm {
        midterm_date: NaiveDate,
        final_date: NaiveDate,
    },

    #[error("class {class_id} has examinations; enrollment is frozen")]
    EnrollmentFrozen { class_id: String },

    #[error("class {class_id} still has a final; the midterm cannot be removed")]
    MidtermHasFinal { class_id: String },

    #[error("enrollment {enrollment_id} is {status}; it cannot be withdrawn")]
    EnrollmentClosed {
        enrollment_id: String,
        status: String,
    },

    #[error("homeroom membership {membership_id} is {status}; no further transitions")]
    TerminalMembership {
        membership_id: String,
        status: HomeroomStatus,
    },

    #[error("exam entry {entry_id} is marked absent and cannot be graded")]
    AbsentEntry { entry_id: String },

    #[error("tuition record {tuition_id} cannot move from {from} to {to}")]
    TuitionTransition {
        tuition_id: String,
        from: TuitionStatus,
        to: TuitionStatus,
    },
}

// =============================================================================
// Not Found Error
// =============================================================================

/// A referenced entity does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: String,
    pub id: String,
}

impl NotFoundError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn new(entity: impl Into<String>, id: impl Into<String>) -> Self {
        NotFoundError {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// The four business outcomes, plus missing capabilities.
///
/// Checkers return these to their immediate caller. No checker recovers
/// from another checker's rejection; the enclosing mutation is aborted
/// unless a batch explicitly evaluates items leniently.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Illegal state: {0}")]
    State(#[from] StateError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// The caller's role does not carry the required capability.
    #[error("user {user_id} may not {action}")]
    Forbidden { user_id: String, action: String },
}

/// Taxonomy bucket of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    State,
    NotFound,
    Forbidden,
}

impl CoreError {
    /// Returns which bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::State(_) => ErrorKind::State,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Forbidden { .. } => ErrorKind::Forbidden,
        }
    }

    /// Shorthand used by lookups: `CoreError::not_found("Class", id)`.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound(NotFoundError::new(entity, id))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
