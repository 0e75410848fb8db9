//! # Domain Types
//!
//! Snapshot types the admission engine reasons about.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  ClassBooking   │   │   Enrollment    │   │  Examination    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  class_id       │   │  class_id       │       │
//! │  │  teacher_id     │   │  student_id     │◄──│  entries[]      │       │
//! │  │  room           │   │  status         │   │  exam_type      │       │
//! │  │  window         │   │  grades         │   │  date           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ AttendanceEvent │   │    Homeroom     │   │ TuitionRecord   │       │
//! │  │  marks[]        │   │  memberships    │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity is owned by the persistence layer. The engine receives
//! these as read-only snapshots and never mutates them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;
use crate::window::TimeWindow;

// =============================================================================
// Status Enums
// =============================================================================

/// Exam kinds. A class holds at most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamType {
    Midterm,
    Final,
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamType::Midterm => write!(f, "MIDTERM"),
            ExamType::Final => write!(f, "FINAL"),
        }
    }
}

/// Lifecycle of a student's seat in a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    #[default]
    Enrolled,
    Withdrawn,
    Completed,
}

impl EnrollmentStatus {
    /// Withdrawn seats no longer occupy the student's timetable.
    pub fn occupies_timetable(&self) -> bool {
        !matches!(self, EnrollmentStatus::Withdrawn)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollmentStatus::Enrolled => write!(f, "ENROLLED"),
            EnrollmentStatus::Withdrawn => write!(f, "WITHDRAWN"),
            EnrollmentStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// Per-student result of one attendance event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Excused,
}

impl AttendanceStatus {
    /// LATE counts against the absence limit exactly like ABSENT.
    pub fn counts_as_absence(&self) -> bool {
        matches!(self, AttendanceStatus::Absent | AttendanceStatus::Late)
    }
}

/// Kind of session an attendance event was taken for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceType {
    Regular,
    Makeup,
}

impl fmt::Display for AttendanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceType::Regular => write!(f, "REGULAR"),
            AttendanceType::Makeup => write!(f, "MAKEUP"),
        }
    }
}

/// Homeroom membership lifecycle.
///
/// ```text
///   ANTICIPATED ──► EXPELLED   (terminal)
///        │
///        └────────► GRADUATED  (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HomeroomStatus {
    Anticipated,
    Expelled,
    Graduated,
}

impl HomeroomStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, HomeroomStatus::Expelled | HomeroomStatus::Graduated)
    }
}

impl fmt::Display for HomeroomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomeroomStatus::Anticipated => write!(f, "ANTICIPATED"),
            HomeroomStatus::Expelled => write!(f, "EXPELLED"),
            HomeroomStatus::Graduated => write!(f, "GRADUATED"),
        }
    }
}

/// Tuition payment state of one enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TuitionStatus {
    Processing,
    Unpaid,
    Paid,
}

impl fmt::Display for TuitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuitionStatus::Processing => write!(f, "PROCESSING"),
            TuitionStatus::Unpaid => write!(f, "UNPAID"),
            TuitionStatus::Paid => write!(f, "PAID"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
}

// =============================================================================
// Class Booking
// =============================================================================

/// Everything that describes a class except its identity.
///
/// Used as the candidate on create, and as the proposed state on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSpec {
    pub class_name: String,
    pub description: Option<String>,
    pub teacher_id: String,
    pub subject_id: String,
    pub room: String,
    /// Date range plus the recurring weekly slot.
    pub window: TimeWindow,
    pub tuition: Money,
    pub tuition_due_date: NaiveDate,
    /// Share of the final exam in the overall grade, `0.0..=1.0`.
    pub final_term_weight: f64,
    pub absence_warning_threshold: u32,
    pub absence_limit: u32,
}

/// A committed class: the unit of teacher and room conflict checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassBooking {
    pub id: String,
    #[serde(flatten)]
    pub spec: ClassSpec,
}

impl ClassBooking {
    pub fn new(id: impl Into<String>, spec: ClassSpec) -> Self {
        ClassBooking {
            id: id.into(),
            spec,
        }
    }

    #[inline]
    pub fn window(&self) -> &TimeWindow {
        &self.spec.window
    }
}

// =============================================================================
// Enrollment
// =============================================================================

/// Grade snapshots copied onto the enrollment after each grading pass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GradeSnapshot {
    pub midterm: Option<f64>,
    pub final_exam: Option<f64>,
    /// Weighted by the class's `final_term_weight` once both exams are graded.
    pub overall: Option<f64>,
}

/// A student's seat in a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: String,
    pub class_id: String,
    pub student_id: String,
    pub status: EnrollmentStatus,
    pub grades: GradeSnapshot,
}

/// One of a student's enrollments joined with the class it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentBooking {
    pub enrollment_id: String,
    pub status: EnrollmentStatus,
    pub booking: ClassBooking,
}

// =============================================================================
// Examination
// =============================================================================

/// One row of an exam roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamEntry {
    pub id: String,
    pub examination_id: String,
    pub enrollment_id: String,
    /// `None` until graded. Never set while `is_absent` holds.
    pub grade: Option<f64>,
    pub is_absent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Examination {
    pub id: String,
    pub class_id: String,
    pub exam_type: ExamType,
    pub date: NaiveDate,
    pub entries: Vec<ExamEntry>,
}

/// Roster line of an exam that is about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub enrollment_id: String,
    pub is_absent: bool,
}

/// Request to schedule an exam for a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamRequest {
    pub exam_type: ExamType,
    pub date: NaiveDate,
    pub roster: Vec<RosterEntry>,
}

// =============================================================================
// Attendance
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceMark {
    pub enrollment_id: String,
    pub status: AttendanceStatus,
}

/// One roll call for a class on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: String,
    pub class_id: String,
    pub date: NaiveDate,
    pub attendance_type: AttendanceType,
    pub marks: Vec<AttendanceMark>,
}

/// Request to record a roll call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRequest {
    pub date: NaiveDate,
    pub attendance_type: AttendanceType,
    pub marks: Vec<AttendanceMark>,
}

// =============================================================================
// Homeroom
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Homeroom {
    pub id: String,
    pub name: String,
    pub teacher_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeroomMembership {
    pub id: String,
    pub homeroom_id: String,
    pub student_id: String,
    pub status: HomeroomStatus,
}

// =============================================================================
// Tuition
// =============================================================================

/// Payment record owned by exactly one enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuitionRecord {
    pub id: String,
    pub enrollment_id: String,
    pub status: TuitionStatus,
    pub method: PaymentMethod,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_late_counts_as_absence() {
        assert!(AttendanceStatus::Absent.counts_as_absence());
        assert!(AttendanceStatus::Late.counts_as_absence());
        assert!(!AttendanceStatus::Present.counts_as_absence());
        assert!(!AttendanceStatus::Excused.counts_as_absence());
    }

    #[test]
    fn test_terminal_homeroom_statuses() {
        assert!(!HomeroomStatus::Anticipated.is_terminal());
        assert!(HomeroomStatus::Expelled.is_terminal());
        assert!(HomeroomStatus::Graduated.is_terminal());
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&ExamType::Midterm).unwrap();
        assert_eq!(json, "\"MIDTERM\"");

        let status: HomeroomStatus = serde_json::from_str("\"GRADUATED\"").unwrap();
        assert_eq!(status, HomeroomStatus::Graduated);
    }
}
