//! Examination workflows: scheduling, grading and removal.
//!
//! Every write runs under the class key, so the MIDTERM/FINAL ordering and
//! the enrollment freeze see one consistent picture of the class.

use registrar_core::exam::refresh_snapshot;
use registrar_core::{
    Actor, Capability, ExamEntry, ExamRequest, ExamSequencer, Examination, GradeDecision,
};
use tracing::{debug, info};

use super::{missing, rejected, Admissions};
use crate::error::DbResult;
use crate::locks::ConflictKey;
use crate::repository::{class, enrollment, exam, new_id};

impl Admissions {
    /// Schedules an exam with its roster. Entries start ungraded.
    pub async fn create_examination(
        &self,
        actor: &Actor,
        class_id: &str,
        request: ExamRequest,
    ) -> DbResult<Examination> {
        let _guards = self.locks.acquire([ConflictKey::Class(class_id.to_string())]).await;
        let mut tx = self.begin_write().await?;

        let target = class::require_class(&mut *tx, class_id).await?;
        actor
            .require_for_class(Capability::ManageExams, &target.spec)
            .map_err(|e| rejected("create_examination", e))?;

        let seats = enrollment::class_enrollments(&mut *tx, class_id).await?;
        let existing = exam::examinations(&mut *tx, class_id).await?;
        ExamSequencer::new()
            .check_create(&target, &seats, &existing, &request)
            .map_err(|e| rejected("create_examination", e))?;

        let exam_id = new_id();
        let entries = request
            .roster
            .iter()
            .map(|line| ExamEntry {
                id: new_id(),
                examination_id: exam_id.clone(),
                enrollment_id: line.enrollment_id.clone(),
                grade: None,
                is_absent: line.is_absent,
            })
            .collect();
        let created = Examination {
            id: exam_id,
            class_id: target.id.clone(),
            exam_type: request.exam_type,
            date: request.date,
            entries,
        };
        exam::insert_examination(&mut *tx, &created).await?;
        tx.commit().await?;

        info!(
            exam_id = %created.id,
            class_id,
            exam_type = %created.exam_type,
            roster = created.entries.len(),
            "Examination scheduled"
        );
        Ok(created)
    }

    /// Grades one roster entry and refreshes the seat's grade snapshot.
    ///
    /// Absent entries follow the configured [`AbsentGradingPolicy`](registrar_core::AbsentGradingPolicy).
    pub async fn grade_entry(&self, actor: &Actor, entry_id: &str, grade: f64) -> DbResult<GradeDecision> {
        let class_id = self.entry_class(entry_id).await?;

        let _guards = self.locks.acquire([ConflictKey::Class(class_id.clone())]).await;
        let mut tx = self.begin_write().await?;

        let (entry, examination) = exam::fetch_entry(&mut *tx, entry_id)
            .await?
            .ok_or_else(|| missing("ExamEntry", entry_id))?;
        let target = class::require_class(&mut *tx, &class_id).await?;
        actor
            .require_for_class(Capability::GradeExams, &target.spec)
            .map_err(|e| rejected("grade_entry", e))?;

        let decision = ExamSequencer::new()
            .grade(&entry, grade, self.policy.absent_grading)
            .map_err(|e| rejected("grade_entry", e))?;

        match decision {
            GradeDecision::Apply(value) => {
                exam::set_entry_grade(&mut *tx, entry_id, value).await?;
                let seat = enrollment::require_enrollment(&mut *tx, &entry.enrollment_id).await?;
                let grades = refresh_snapshot(
                    seat.grades,
                    examination.exam_type,
                    Some(value),
                    target.spec.final_term_weight,
                );
                enrollment::store_grades(&mut *tx, &seat.id, &grades).await?;
                tx.commit().await?;
                info!(entry_id, enrollment_id = %seat.id, grade = value, "Entry graded");
            }
            GradeDecision::SkippedAbsent => {
                debug!(entry_id, "Absent entry left ungraded");
            }
        }
        Ok(decision)
    }

    /// Removes an exam and clears the matching grade from every seat.
    pub async fn delete_examination(&self, actor: &Actor, exam_id: &str) -> DbResult<()> {
        let class_id = {
            let mut conn = self.pool.acquire().await?;
            exam::fetch_examination(&mut conn, exam_id)
                .await?
                .ok_or_else(|| missing("Examination", exam_id))?
                .class_id
        };

        let _guards = self.locks.acquire([ConflictKey::Class(class_id.clone())]).await;
        let mut tx = self.begin_write().await?;

        let target = class::require_class(&mut *tx, &class_id).await?;
        actor
            .require_for_class(Capability::ManageExams, &target.spec)
            .map_err(|e| rejected("delete_examination", e))?;

        let class_exams = exam::examinations(&mut *tx, &class_id).await?;
        let doomed = class_exams
            .iter()
            .find(|e| e.id == exam_id)
            .ok_or_else(|| missing("Examination", exam_id))?;
        ExamSequencer::new()
            .check_delete(doomed, &class_exams)
            .map_err(|e| rejected("delete_examination", e))?;

        for seat in enrollment::class_enrollments(&mut *tx, &class_id).await? {
            let grades = refresh_snapshot(seat.grades, doomed.exam_type, None, target.spec.final_term_weight);
            if grades != seat.grades {
                enrollment::store_grades(&mut *tx, &seat.id, &grades).await?;
            }
        }
        exam::delete_examination(&mut *tx, exam_id).await?;
        tx.commit().await?;

        info!(exam_id, class_id = %class_id, exam_type = %doomed.exam_type, "Examination removed");
        Ok(())
    }

    /// Class of the exam an entry belongs to. Neither ever changes owner.
    async fn entry_class(&self, entry_id: &str) -> DbResult<String> {
        let mut conn = self.pool.acquire().await?;
        exam::fetch_entry(&mut conn, entry_id)
            .await?
            .map(|(_, examination)| examination.class_id)
            .ok_or_else(|| missing("ExamEntry", entry_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicySettings;
    use crate::error::DbError;
    use crate::testing::{admin, class_spec, date, memory_db, students};
    use crate::{Database, DbConfig};
    use chrono::{NaiveDate, Weekday};
    use registrar_core::{
        AbsentGradingPolicy, ClassBooking, ConflictError, CoreError, Enrollment, ErrorKind, ExamType,
        RosterEntry, StateError,
    };

    /// A class with two seated students.
    async fn seated_class(db: &Database) -> (ClassBooking, Vec<Enrollment>) {
        let admissions = db.admissions();
        let class = admissions
            .create_class(&admin(), class_spec("T", "A-1", Weekday::Mon, 1, 2))
            .await
            .unwrap();
        let ids = students(db, &["Ada", "Bo"]).await;
        admissions
            .enroll_students(&admin(), &class.id, &ids, date(2024, 1, 10))
            .await
            .unwrap();
        let seats = db.enrollments().for_class(&class.id).await.unwrap();
        (class, seats)
    }

    fn request(exam_type: ExamType, on: NaiveDate, seats: &[Enrollment], absent: &[usize]) -> ExamRequest {
        ExamRequest {
            exam_type,
            date: on,
            roster: seats
                .iter()
                .enumerate()
                .map(|(i, s)| RosterEntry {
                    enrollment_id: s.id.clone(),
                    is_absent: absent.contains(&i),
                })
                .collect(),
        }
    }

    fn kind(err: &DbError) -> Option<ErrorKind> {
        err.rejection().map(CoreError::kind)
    }

    #[tokio::test]
    async fn test_final_requires_midterm() {
        let db = memory_db().await;
        let (class, seats) = seated_class(&db).await;

        let err = db
            .admissions()
            .create_examination(&admin(), &class.id, request(ExamType::Final, date(2024, 5, 1), &seats, &[]))
            .await
            .unwrap_err();
        assert_eq!(
            err.rejection(),
            Some(&CoreError::State(StateError::MidtermRequired { class_id: class.id.clone() }))
        );
        assert!(db.exams().for_class(&class.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_final_cannot_precede_midterm() {
        let db = memory_db().await;
        let (class, seats) = seated_class(&db).await;
        let admissions = db.admissions();

        admissions
            .create_examination(&admin(), &class.id, request(ExamType::Midterm, date(2024, 3, 1), &seats, &[]))
            .await
            .unwrap();
        let err = admissions
            .create_examination(&admin(), &class.id, request(ExamType::Final, date(2024, 2, 1), &seats, &[]))
            .await
            .unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(CoreError::State(StateError::FinalBeforeMidterm { .. }))
        ));

        // same day is allowed
        admissions
            .create_examination(&admin(), &class.id, request(ExamType::Final, date(2024, 3, 1), &seats, &[]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_second_exam_of_a_type_conflicts() {
        let db = memory_db().await;
        let (class, seats) = seated_class(&db).await;
        let admissions = db.admissions();

        admissions
            .create_examination(&admin(), &class.id, request(ExamType::Midterm, date(2024, 3, 1), &seats, &[]))
            .await
            .unwrap();
        let err = admissions
            .create_examination(&admin(), &class.id, request(ExamType::Midterm, date(2024, 3, 8), &seats, &[]))
            .await
            .unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(CoreError::Conflict(ConflictError::ExamAlreadyExists { .. }))
        ));
    }

    #[tokio::test]
    async fn test_exam_date_and_roster_are_checked() {
        let db = memory_db().await;
        let (class, mut seats) = seated_class(&db).await;
        let admissions = db.admissions();

        let err = admissions
            .create_examination(&admin(), &class.id, request(ExamType::Midterm, date(2024, 7, 1), &seats, &[]))
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::Validation));

        seats[1].id = "stranger".to_string();
        let err = admissions
            .create_examination(&admin(), &class.id, request(ExamType::Midterm, date(2024, 3, 1), &seats, &[]))
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_absent_entry_is_skipped_by_default() {
        let db = memory_db().await;
        let (class, seats) = seated_class(&db).await;
        let exam = db
            .admissions()
            .create_examination(&admin(), &class.id, request(ExamType::Midterm, date(2024, 3, 1), &seats, &[1]))
            .await
            .unwrap();
        let absent = exam.entries.iter().find(|e| e.is_absent).unwrap();

        let decision = db.admissions().grade_entry(&admin(), &absent.id, 9.0).await.unwrap();
        assert_eq!(decision, GradeDecision::SkippedAbsent);
        assert_eq!(db.exams().entry(&absent.id).await.unwrap().unwrap().grade, None);
    }

    #[tokio::test]
    async fn test_absent_entry_rejected_under_reject_policy() {
        let policy = PolicySettings {
            absent_grading: AbsentGradingPolicy::Reject,
            ..PolicySettings::default()
        };
        let db = Database::new(DbConfig::in_memory().policy(policy)).await.unwrap();
        let (class, seats) = seated_class(&db).await;
        let exam = db
            .admissions()
            .create_examination(&admin(), &class.id, request(ExamType::Midterm, date(2024, 3, 1), &seats, &[0]))
            .await
            .unwrap();
        let absent = exam.entries.iter().find(|e| e.is_absent).unwrap();

        let err = db.admissions().grade_entry(&admin(), &absent.id, 9.0).await.unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(CoreError::State(StateError::AbsentEntry { .. }))
        ));

        // range check comes first
        let err = db.admissions().grade_entry(&admin(), &absent.id, 11.0).await.unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_grades_feed_weighted_overall() {
        let db = memory_db().await;
        let (class, seats) = seated_class(&db).await;
        let admissions = db.admissions();
        let midterm = admissions
            .create_examination(&admin(), &class.id, request(ExamType::Midterm, date(2024, 3, 1), &seats[..1], &[]))
            .await
            .unwrap();
        let final_exam = admissions
            .create_examination(&admin(), &class.id, request(ExamType::Final, date(2024, 5, 1), &seats[..1], &[]))
            .await
            .unwrap();

        admissions.grade_entry(&admin(), &midterm.entries[0].id, 5.0).await.unwrap();
        let halfway = db.enrollments().get(&seats[0].id).await.unwrap().unwrap();
        assert_eq!(halfway.grades.midterm, Some(5.0));
        assert_eq!(halfway.grades.overall, None);

        admissions.grade_entry(&admin(), &final_exam.entries[0].id, 10.0).await.unwrap();
        let done = db.enrollments().get(&seats[0].id).await.unwrap().unwrap();
        let overall = done.grades.overall.unwrap();
        assert!((overall - 8.0).abs() < 1e-9, "overall = {overall}");
    }

    #[tokio::test]
    async fn test_teacher_grades_only_own_class() {
        let db = memory_db().await;
        let (class, seats) = seated_class(&db).await;
        let exam = db
            .admissions()
            .create_examination(&admin(), &class.id, request(ExamType::Midterm, date(2024, 3, 1), &seats, &[]))
            .await
            .unwrap();
        let entry = &exam.entries[0];

        let err = db
            .admissions()
            .grade_entry(&Actor::teacher("someone-else"), &entry.id, 7.0)
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::Forbidden));

        let decision = db.admissions().grade_entry(&Actor::teacher("T"), &entry.id, 7.0).await.unwrap();
        assert_eq!(decision, GradeDecision::Apply(7.0));
    }

    #[tokio::test]
    async fn test_midterm_delete_blocked_by_final() {
        let db = memory_db().await;
        let (class, seats) = seated_class(&db).await;
        let admissions = db.admissions();
        let midterm = admissions
            .create_examination(&admin(), &class.id, request(ExamType::Midterm, date(2024, 3, 1), &seats, &[]))
            .await
            .unwrap();
        let final_exam = admissions
            .create_examination(&admin(), &class.id, request(ExamType::Final, date(2024, 5, 1), &seats, &[]))
            .await
            .unwrap();
        admissions.grade_entry(&admin(), &final_exam.entries[0].id, 6.0).await.unwrap();

        let err = admissions.delete_examination(&admin(), &midterm.id).await.unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(CoreError::State(StateError::MidtermHasFinal { .. }))
        ));

        admissions.delete_examination(&admin(), &final_exam.id).await.unwrap();
        admissions.delete_examination(&admin(), &midterm.id).await.unwrap();
        assert!(db.exams().for_class(&class.id).await.unwrap().is_empty());

        let seat = db.enrollments().get(&final_exam.entries[0].enrollment_id).await.unwrap().unwrap();
        assert_eq!(seat.grades.final_exam, None);
    }

    #[tokio::test]
    async fn test_unknown_entry_is_not_found() {
        let db = memory_db().await;
        let err = db.admissions().grade_entry(&admin(), "ghost", 5.0).await.unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::NotFound));
    }
}
