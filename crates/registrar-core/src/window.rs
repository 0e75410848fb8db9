//! # Time Windows
//!
//! Closed date ranges with an optional recurring weekly slot, and the
//! overlap predicates every conflict check is built from.
//!
//! ## What Counts As A Conflict
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A: 2024-01-01 ──────────────── 2024-06-01   Mon, periods 1-2         │
//! │  B:            2024-03-01 ──────────────── 2024-09-01   Mon, 2-3      │
//! │                                                                         │
//! │  dates_overlap  ✓  (ranges share March..June)                          │
//! │  slots_overlap  ✓  (same weekday, period 2 is shared)                  │
//! │  ─────────────────                                                      │
//! │  bookings_conflict = dates_overlap && slots_overlap = ✓                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both predicates are closed on both ends: `a.end == b.start` overlaps,
//! and so does `a.period_end == b.period_start`.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// =============================================================================
// Weekly Slot
// =============================================================================

/// A `(weekday, period_start, period_end)` interval that repeats every week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeeklySlot {
    pub day_of_week: Weekday,
    pub period_start: u8,
    pub period_end: u8,
}

impl WeeklySlot {
    /// Creates a slot, rejecting empty or inverted period ranges.
    pub fn new(day_of_week: Weekday, period_start: u8, period_end: u8) -> Result<Self, ValidationError> {
        if period_start >= period_end {
            return Err(ValidationError::PeriodOrder {
                start: period_start,
                end: period_end,
            });
        }
        Ok(WeeklySlot {
            day_of_week,
            period_start,
            period_end,
        })
    }

    /// Same weekday and the closed period ranges intersect.
    pub fn overlaps(&self, other: &WeeklySlot) -> bool {
        self.day_of_week == other.day_of_week
            && !(self.period_end < other.period_start || other.period_end < self.period_start)
    }
}

// =============================================================================
// Time Window
// =============================================================================

/// Inclusive calendar range, optionally narrowed to a weekly slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub slot: Option<WeeklySlot>,
}

impl TimeWindow {
    /// Creates a window, checking `start_date <= end_date`.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::{NaiveDate, Weekday};
    /// use registrar_core::window::{TimeWindow, WeeklySlot};
    ///
    /// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    /// let end = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    /// let slot = WeeklySlot::new(Weekday::Mon, 1, 2).unwrap();
    ///
    /// assert!(TimeWindow::new(start, end, Some(slot)).is_ok());
    /// assert!(TimeWindow::new(end, start, Some(slot)).is_err());
    /// ```
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        slot: Option<WeeklySlot>,
    ) -> Result<Self, ValidationError> {
        if start_date > end_date {
            return Err(ValidationError::DateOrder {
                earlier: "start date".to_string(),
                earlier_date: start_date,
                later: "end date".to_string(),
                later_date: end_date,
            });
        }
        Ok(TimeWindow {
            start_date,
            end_date,
            slot,
        })
    }

    /// Whether `date` lies inside the closed date range.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn dates_overlap(&self, other: &TimeWindow) -> bool {
        dates_overlap(self, other)
    }

    pub fn slots_overlap(&self, other: &TimeWindow) -> bool {
        slots_overlap(self, other)
    }

    pub fn conflicts_with(&self, other: &TimeWindow) -> bool {
        bookings_conflict(self, other)
    }
}

// =============================================================================
// Overlap Predicates
// =============================================================================

/// `!(a.end < b.start || b.end < a.start)`
pub fn dates_overlap(a: &TimeWindow, b: &TimeWindow) -> bool {
    !(a.end_date < b.start_date || b.end_date < a.start_date)
}

/// Same weekday and intersecting periods. A window without a slot never
/// collides with anything on the weekly grid.
pub fn slots_overlap(a: &TimeWindow, b: &TimeWindow) -> bool {
    match (&a.slot, &b.slot) {
        (Some(x), Some(y)) => x.overlaps(y),
        _ => false,
    }
}

/// The teacher/room/student conflict predicate.
pub fn bookings_conflict(a: &TimeWindow, b: &TimeWindow) -> bool {
    dates_overlap(a, b) && slots_overlap(a, b)
}

// =============================================================================
// Unit Tests
// =============================================================================
