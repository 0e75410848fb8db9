//! # registrar-core: Admission Engine for School Operations
//!
//! Decides whether a proposed class schedule, enrollment, examination or
//! homeroom change is admissible given what is already committed. Every
//! function is pure: snapshots in, decision out.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Registrar Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Request handlers (external)                       │   │
//! │  │     resolve caller → Actor, map payload → ClassSpec etc.        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              registrar-db (admission workflows)                 │   │
//! │  │   lock conflict keys → BEGIN → read snapshots → check → write   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ snapshots                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ registrar-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌────────────┐  ┌──────────┐  ┌────────────┐   │   │
//! │  │   │  window  │  │  schedule  │  │   exam   │  │  homeroom  │   │   │
//! │  │   │ overlaps │  │ enrollment │  │ sequence │  │ attendance │   │   │
//! │  │   └──────────┘  └────────────┘  └──────────┘  └────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`window`] - TimeWindow and the inclusive overlap predicates
//! - [`schedule`] - Teacher and room double-booking checks
//! - [`enrollment`] - Student time conflicts and batch enrollment
//! - [`exam`] - MIDTERM/FINAL ordering, roster and grading rules
//! - [`attendance`] - Absence counting and standing
//! - [`homeroom`] - Single-ANTICIPATED-membership guard
//! - [`tuition`] - Tuition status rules
//! - [`access`] - Explicit caller identity and capabilities
//! - [`batch`] - Lenient/strict batch outcomes
//! - [`validation`] - Field checks that run before any conflict lookup
//! - [`error`] - Validation / Conflict / State / NotFound taxonomy
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{NaiveDate, Weekday};
//! use registrar_core::window::{bookings_conflict, TimeWindow, WeeklySlot};
//!
//! let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
//! let a = TimeWindow::new(d(1, 1), d(6, 1), Some(WeeklySlot::new(Weekday::Mon, 1, 2).unwrap())).unwrap();
//! let b = TimeWindow::new(d(3, 1), d(9, 1), Some(WeeklySlot::new(Weekday::Mon, 2, 3).unwrap())).unwrap();
//!
//! // period 2 is shared on Mondays between March and June
//! assert!(bookings_conflict(&a, &b));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod attendance;
pub mod batch;
pub mod enrollment;
pub mod error;
pub mod exam;
pub mod homeroom;
pub mod money;
pub mod schedule;
pub mod tuition;
pub mod types;
pub mod validation;
pub mod window;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{Actor, Capability, Role};
pub use attendance::{AbsenceStanding, AbsenceSummary, AttendanceAggregator};
pub use batch::{BatchOutcome, BatchPolicy, BatchTotals, Rejection, RejectionReason};
pub use enrollment::{EnrollmentConflictChecker, StudentSnapshot};
pub use error::{
    ConflictError, CoreError, CoreResult, ErrorKind, NotFoundError, StateError, ValidationError,
};
pub use exam::{AbsentGradingPolicy, ExamSequencer, GradeDecision};
pub use homeroom::{HomeroomCandidate, HomeroomMembershipGuard};
pub use money::Money;
pub use schedule::ScheduleConflictChecker;
pub use types::*;
pub use window::{TimeWindow, WeeklySlot};
