//! # Tuition Rules
//!
//! ```text
//!  enrollment ──► PROCESSING (today inside class window)
//!             └─► UNPAID     (otherwise)
//!
//!  PROCESSING ──► PAID | UNPAID
//!  UNPAID     ──► PAID
//!  PAID       ──► (terminal)
//! ```
//!
//! "Today" is always passed in; this module never reads the clock.

use chrono::NaiveDate;

use crate::error::StateError;
use crate::types::{TuitionRecord, TuitionStatus};
use crate::window::TimeWindow;

/// Status a new enrollment's tuition record starts in.
pub fn initial_status(window: &TimeWindow, today: NaiveDate) -> TuitionStatus {
    if window.contains(today) {
        TuitionStatus::Processing
    } else {
        TuitionStatus::Unpaid
    }
}

/// Validates a status update. Returns `Ok(false)` for a same-status no-op.
pub fn check_transition(record: &TuitionRecord, next: TuitionStatus) -> Result<bool, StateError> {
    use TuitionStatus::*;

    match (record.status, next) {
        (from, to) if from == to => Ok(false),
        (Processing, Paid) | (Processing, Unpaid) | (Unpaid, Paid) => Ok(true),
        (from, to) => Err(StateError::TuitionTransition {
            tuition_id: record.id.clone(),
            from,
            to,
        }),
    }
}

/// Past the due date and not paid. Consumed by the external overdue sweep.
pub fn is_overdue(record: &TuitionRecord, due_date: NaiveDate, today: NaiveDate) -> bool {
    record.status != TuitionStatus::Paid && today > due_date
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::date;
    use crate::types::PaymentMethod;

    fn record(status: TuitionStatus) -> TuitionRecord {
        TuitionRecord {
            id: "tu-1".to_string(),
            enrollment_id: "e-1".to_string(),
            status,
            method: PaymentMethod::Cash,
        }
    }

    #[test]
    fn test_initial_status_follows_window() {
        let window = TimeWindow::new(date(2024, 1, 1), date(2024, 6, 1), None).unwrap();
        assert_eq!(initial_status(&window, date(2024, 1, 1)), TuitionStatus::Processing);
        assert_eq!(initial_status(&window, date(2024, 6, 1)), TuitionStatus::Processing);
        assert_eq!(initial_status(&window, date(2023, 12, 1)), TuitionStatus::Unpaid);
        assert_eq!(initial_status(&window, date(2024, 7, 1)), TuitionStatus::Unpaid);
    }

    #[test]
    fn test_transitions() {
        assert_eq!(check_transition(&record(TuitionStatus::Processing), TuitionStatus::Paid), Ok(true));
        assert_eq!(check_transition(&record(TuitionStatus::Processing), TuitionStatus::Unpaid), Ok(true));
        assert_eq!(check_transition(&record(TuitionStatus::Unpaid), TuitionStatus::Paid), Ok(true));
        assert_eq!(check_transition(&record(TuitionStatus::Paid), TuitionStatus::Paid), Ok(false));

        assert!(check_transition(&record(TuitionStatus::Paid), TuitionStatus::Unpaid).is_err());
        assert!(check_transition(&record(TuitionStatus::Unpaid), TuitionStatus::Processing).is_err());
    }

    #[test]
    fn test_overdue() {
        let due = date(2024, 2, 1);
        assert!(!is_overdue(&record(TuitionStatus::Unpaid), due, due));
        assert!(is_overdue(&record(TuitionStatus::Unpaid), due, date(2024, 2, 2)));
        assert!(is_overdue(&record(TuitionStatus::Processing), due, date(2024, 3, 1)));
        assert!(!is_overdue(&record(TuitionStatus::Paid), due, date(2024, 3, 1)));
    }
}
