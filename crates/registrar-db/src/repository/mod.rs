//! # Repository Module
//!
//! Snapshot reads and plain writes, one module per aggregate.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  free fns over &mut SqliteConnection                                    │
//! │  ───────────────────────────────────                                    │
//! │  class::bookings_for_teacher(conn, ..)      ◄── admission workflows     │
//! │  enrollment::bookings_for_student(conn, ..)     pass `&mut *tx` so the  │
//! │  exam::examinations(conn, ..)                   read and the write see  │
//! │  ...                                            the same transaction    │
//! │                                                                         │
//! │  XxxRepository { pool }                                                 │
//! │  ──────────────────────                                                 │
//! │  db.classes().get(id)                       ◄── read-only callers       │
//! │  db.enrollments().for_class(id)                 acquire a pooled conn   │
//! │                                                 and call the free fns   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in here decides admissibility. Writes assume the caller has
//! already run the matching checker.

pub mod attendance;
pub mod class;
pub mod enrollment;
pub mod exam;
pub mod homeroom;
pub mod student;
pub mod tuition;

use chrono::Weekday;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Fresh UUID v4 string for a new row.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Monday = 1 .. Sunday = 7.
pub(crate) fn weekday_to_db(day: Weekday) -> i64 {
    i64::from(day.number_from_monday())
}

pub(crate) fn weekday_from_db(table: &str, value: i64) -> DbResult<Weekday> {
    let day = match value {
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        6 => Weekday::Sat,
        7 => Weekday::Sun,
        other => {
            return Err(DbError::invalid_row(
                table,
                format!("day_of_week {other} is not in 1..=7"),
            ))
        }
    };
    Ok(day)
}

/// Narrows a stored INTEGER into the domain's unsigned type.
pub(crate) fn narrow<T: TryFrom<i64>>(table: &str, column: &str, value: i64) -> DbResult<T> {
    T::try_from(value)
        .map_err(|_| DbError::invalid_row(table, format!("{column} {value} is out of range")))
}

/// `?, ?, ?` for an `IN (...)` list of `n` items.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
