//! Shared fixtures for unit tests.

use chrono::{NaiveDate, Weekday};

use crate::money::Money;
use crate::types::{ClassBooking, ClassSpec, Enrollment, EnrollmentStatus, GradeSnapshot};
use crate::window::{TimeWindow, WeeklySlot};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A class running 2024-01-01..=2024-06-01 in the given slot.
pub fn class_spec(teacher: &str, room: &str, day: Weekday, from: u8, to: u8) -> ClassSpec {
    class_spec_between(teacher, room, date(2024, 1, 1), date(2024, 6, 1), day, from, to)
}

pub fn class_spec_between(
    teacher: &str,
    room: &str,
    start: NaiveDate,
    end: NaiveDate,
    day: Weekday,
    from: u8,
    to: u8,
) -> ClassSpec {
    ClassSpec {
        class_name: "Algebra I".to_string(),
        description: None,
        teacher_id: teacher.to_string(),
        subject_id: "math".to_string(),
        room: room.to_string(),
        window: TimeWindow {
            start_date: start,
            end_date: end,
            slot: Some(WeeklySlot {
                day_of_week: day,
                period_start: from,
                period_end: to,
            }),
        },
        tuition: Money::from_cents(150_000),
        tuition_due_date: start,
        final_term_weight: 0.6,
        absence_warning_threshold: 3,
        absence_limit: 5,
    }
}

pub fn booking(id: &str, spec: ClassSpec) -> ClassBooking {
    ClassBooking::new(id, spec)
}

pub fn enrollment(id: &str, class_id: &str, student_id: &str) -> Enrollment {
    Enrollment {
        id: id.to_string(),
        class_id: class_id.to_string(),
        student_id: student_id.to_string(),
        status: EnrollmentStatus::Enrolled,
        grades: GradeSnapshot::default(),
    }
}
