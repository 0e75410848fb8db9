//! # Attendance Aggregator
//!
//! Counts absences per enrollment and compares them with the class terms.
//!
//! ```text
//! count = #events where status ∈ {ABSENT, LATE}
//!
//!   0 ────────── warning_threshold ────────── absence_limit ──────────►
//!      Clear              Warning                  LimitReached
//! ```
//!
//! A threshold of zero disables that level.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ConflictError, CoreError, CoreResult, ValidationError};
use crate::types::{AttendanceEvent, AttendanceRequest, ClassBooking, ClassSpec, Enrollment};
use crate::validation::validate_unique_ids;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbsenceStanding {
    Clear,
    Warning,
    LimitReached,
}

/// One row of a class attendance summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceSummary {
    pub enrollment_id: String,
    pub student_id: String,
    pub absences: u32,
    pub standing: AbsenceStanding,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttendanceAggregator;

impl AttendanceAggregator {
    pub fn new() -> Self {
        AttendanceAggregator
    }

    /// Events in which `enrollment_id` was marked ABSENT or LATE.
    pub fn absence_count(&self, enrollment_id: &str, events: &[AttendanceEvent]) -> u32 {
        let count = events
            .iter()
            .flat_map(|event| event.marks.iter())
            .filter(|mark| mark.enrollment_id == enrollment_id && mark.status.counts_as_absence())
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub fn standing(&self, absences: u32, terms: &ClassSpec) -> AbsenceStanding {
        if terms.absence_limit > 0 && absences >= terms.absence_limit {
            AbsenceStanding::LimitReached
        } else if terms.absence_warning_threshold > 0 && absences >= terms.absence_warning_threshold {
            AbsenceStanding::Warning
        } else {
            AbsenceStanding::Clear
        }
    }

    /// One summary row per enrollment, in enrollment order.
    pub fn summarize(
        &self,
        class: &ClassBooking,
        enrollments: &[Enrollment],
        events: &[AttendanceEvent],
    ) -> Vec<AbsenceSummary> {
        enrollments
            .iter()
            .filter(|e| e.class_id == class.id)
            .map(|e| {
                let absences = self.absence_count(&e.id, events);
                AbsenceSummary {
                    enrollment_id: e.id.clone(),
                    student_id: e.student_id.clone(),
                    absences,
                    standing: self.standing(absences, &class.spec),
                }
            })
            .collect()
    }

    /// Decides whether a roll call may be recorded.
    ///
    /// Checks, in order: date inside the class window, no repeated
    /// enrollment, no event for the same (date, type), every marked
    /// enrollment belongs to the class.
    pub fn check_record(
        &self,
        class: &ClassBooking,
        class_enrollments: &[Enrollment],
        existing: &[AttendanceEvent],
        request: &AttendanceRequest,
    ) -> CoreResult<()> {
        let window = class.window();
        if !window.contains(request.date) {
            return Err(ValidationError::OutsideClassWindow {
                field: "attendance date".to_string(),
                date: request.date,
                start: window.start_date,
                end: window.end_date,
            }
            .into());
        }

        validate_unique_ids(
            "attendance enrollment",
            request.marks.iter().map(|m| m.enrollment_id.as_str()),
        )?;

        let taken = existing
            .iter()
            .any(|e| e.date == request.date && e.attendance_type == request.attendance_type);
        if taken {
            return Err(ConflictError::AttendanceAlreadyRecorded {
                class_id: class.id.clone(),
                date: request.date,
                attendance_type: request.attendance_type,
            }
            .into());
        }

        let members: HashSet<&str> = class_enrollments
            .iter()
            .filter(|e| e.class_id == class.id)
            .map(|e| e.id.as_str())
            .collect();
        if let Some(stray) = request
            .marks
            .iter()
            .find(|m| !members.contains(m.enrollment_id.as_str()))
        {
            return Err(CoreError::not_found("Enrollment", stray.enrollment_id.clone()));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{booking, class_spec, date, enrollment};
    use crate::types::{AttendanceMark, AttendanceStatus, AttendanceType};
    use chrono::{NaiveDate, Weekday};

    fn mark(enrollment_id: &str, status: AttendanceStatus) -> AttendanceMark {
        AttendanceMark {
            enrollment_id: enrollment_id.to_string(),
            status,
        }
    }

    fn event(id: &str, on: NaiveDate, marks: Vec<AttendanceMark>) -> AttendanceEvent {
        AttendanceEvent {
            id: id.to_string(),
            class_id: "C".to_string(),
            date: on,
            attendance_type: AttendanceType::Regular,
            marks,
        }
    }

    #[test]
    fn test_absent_and_late_both_count() {
        let events = vec![
            event("a-1", date(2024, 1, 1), vec![mark("e-1", AttendanceStatus::Absent)]),
            event("a-2", date(2024, 1, 8), vec![mark("e-1", AttendanceStatus::Late)]),
            event("a-3", date(2024, 1, 15), vec![mark("e-1", AttendanceStatus::Excused)]),
            event("a-4", date(2024, 1, 22), vec![mark("e-2", AttendanceStatus::Absent)]),
        ];
        assert_eq!(AttendanceAggregator.absence_count("e-1", &events), 2);
        assert_eq!(AttendanceAggregator.absence_count("e-2", &events), 1);
        assert_eq!(AttendanceAggregator.absence_count("e-3", &events), 0);
    }

    #[test]
    fn test_standing_thresholds() {
        // warning 3, limit 5
        let terms = class_spec("T", "A-1", Weekday::Mon, 1, 2);
        assert_eq!(AttendanceAggregator.standing(2, &terms), AbsenceStanding::Clear);
        assert_eq!(AttendanceAggregator.standing(3, &terms), AbsenceStanding::Warning);
        assert_eq!(AttendanceAggregator.standing(4, &terms), AbsenceStanding::Warning);
        assert_eq!(AttendanceAggregator.standing(5, &terms), AbsenceStanding::LimitReached);
    }

    #[test]
    fn test_zero_threshold_disables_level() {
        let mut terms = class_spec("T", "A-1", Weekday::Mon, 1, 2);
        terms.absence_warning_threshold = 0;
        terms.absence_limit = 0;
        assert_eq!(AttendanceAggregator.standing(0, &terms), AbsenceStanding::Clear);
        assert_eq!(AttendanceAggregator.standing(9, &terms), AbsenceStanding::Clear);
    }

    #[test]
    fn test_summarize_per_enrollment() {
        let class = booking("C", class_spec("T", "A-1", Weekday::Mon, 1, 2));
        let enrollments = vec![enrollment("e-1", "C", "S1"), enrollment("e-2", "C", "S2")];
        let events: Vec<_> = (0..3)
            .map(|i| {
                event(
                    &format!("a-{i}"),
                    date(2024, 1, 1 + i * 7),
                    vec![mark("e-1", AttendanceStatus::Absent), mark("e-2", AttendanceStatus::Present)],
                )
            })
            .collect();

        let summary = AttendanceAggregator.summarize(&class, &enrollments, &events);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].absences, 3);
        assert_eq!(summary[0].standing, AbsenceStanding::Warning);
        assert_eq!(summary[1].absences, 0);
        assert_eq!(summary[1].standing, AbsenceStanding::Clear);
    }

    #[test]
    fn test_check_record() {
        let class = booking("C", class_spec("T", "A-1", Weekday::Mon, 1, 2));
        let enrollments = vec![enrollment("e-1", "C", "S1")];
        let existing = vec![event("a-1", date(2024, 1, 1), vec![])];

        let request = |on: NaiveDate, attendance_type, ids: &[&str]| AttendanceRequest {
            date: on,
            attendance_type,
            marks: ids.iter().map(|id| mark(id, AttendanceStatus::Present)).collect(),
        };

        let ok = request(date(2024, 1, 8), AttendanceType::Regular, &["e-1"]);
        assert!(AttendanceAggregator
            .check_record(&class, &enrollments, &existing, &ok)
            .is_ok());

        let makeup_same_day = request(date(2024, 1, 1), AttendanceType::Makeup, &["e-1"]);
        assert!(AttendanceAggregator
            .check_record(&class, &enrollments, &existing, &makeup_same_day)
            .is_ok());

        let cases = [
            (request(date(2024, 7, 1), AttendanceType::Regular, &["e-1"]), ErrorKind::Validation),
            (request(date(2024, 1, 8), AttendanceType::Regular, &["e-1", "e-1"]), ErrorKind::Validation),
            (request(date(2024, 1, 1), AttendanceType::Regular, &["e-1"]), ErrorKind::Conflict),
            (request(date(2024, 1, 8), AttendanceType::Regular, &["e-404"]), ErrorKind::NotFound),
        ];
        for (req, kind) in cases {
            let err = AttendanceAggregator
                .check_record(&class, &enrollments, &existing, &req)
                .unwrap_err();
            assert_eq!(err.kind(), kind);
        }
    }
}
