//! Homeroom workflows.
//!
//! Membership changes lock the student, since the one-ANTICIPATED rule
//! spans all of a student's homerooms.

use std::collections::HashSet;

use registrar_core::batch::dedupe_ids;
use registrar_core::{
    Actor, BatchOutcome, Capability, Homeroom, HomeroomCandidate, HomeroomMembership,
    HomeroomMembershipGuard, HomeroomStatus,
};
use tracing::{debug, info};

use super::{missing, rejected, Admissions};
use crate::error::DbResult;
use crate::locks::ConflictKey;
use crate::repository::{homeroom, new_id, student};

impl Admissions {
    pub async fn create_homeroom(&self, actor: &Actor, name: &str, teacher_id: &str) -> DbResult<Homeroom> {
        actor
            .require(Capability::ManageHomerooms)
            .map_err(|e| rejected("create_homeroom", e))?;

        let name = name.trim();
        let _guards = self
            .locks
            .acquire([
                ConflictKey::Homeroom(name.to_string()),
                ConflictKey::HomeroomHead(teacher_id.to_string()),
            ])
            .await;
        let mut tx = self.begin_write().await?;

        let claimed = homeroom::homerooms_claiming(&mut *tx, name, teacher_id).await?;
        HomeroomMembershipGuard::new()
            .check_new_homeroom(name, teacher_id, &claimed)
            .map_err(|e| rejected("create_homeroom", e))?;

        let created = Homeroom {
            id: new_id(),
            name: name.to_string(),
            teacher_id: teacher_id.to_string(),
        };
        homeroom::insert_homeroom(&mut *tx, &created).await?;
        tx.commit().await?;

        info!(homeroom_id = %created.id, name, teacher_id, "Homeroom created");
        Ok(created)
    }

    /// Adds students to a homeroom. Always lenient: each student is admitted
    /// or rejected on their own.
    pub async fn add_students_to_homeroom(
        &self,
        actor: &Actor,
        homeroom_id: &str,
        student_ids: &[String],
        status: HomeroomStatus,
    ) -> DbResult<BatchOutcome> {
        actor
            .require(Capability::ManageHomerooms)
            .map_err(|e| rejected("add_students_to_homeroom", e))?;

        let ids = dedupe_ids(student_ids);
        let _guards = self.locks.acquire(ids.iter().cloned().map(ConflictKey::Student)).await;
        let mut tx = self.begin_write().await?;

        homeroom::fetch_homeroom(&mut *tx, homeroom_id)
            .await?
            .ok_or_else(|| missing("Homeroom", homeroom_id))?;

        let mut candidates = Vec::with_capacity(ids.len());
        let known: HashSet<String> =
            student::existing_students(&mut *tx, &ids).await?.into_iter().collect();
        for id in &ids {
            let exists = known.contains(id);
            let memberships = if exists {
                homeroom::memberships_for_student(&mut *tx, id).await?
            } else {
                Vec::new()
            };
            candidates.push(HomeroomCandidate {
                student_id: id.clone(),
                exists,
                memberships,
            });
        }

        let outcome = HomeroomMembershipGuard::new().evaluate_batch(homeroom_id, status, &candidates);
        for student_id in &outcome.admitted {
            let membership = HomeroomMembership {
                id: new_id(),
                homeroom_id: homeroom_id.to_string(),
                student_id: student_id.clone(),
                status,
            };
            homeroom::insert_membership(&mut *tx, &membership).await?;
            debug!(membership_id = %membership.id, %student_id, "Membership created");
        }
        tx.commit().await?;

        info!(
            homeroom_id,
            status = ?status,
            requested = outcome.totals.requested,
            admitted = outcome.totals.admitted,
            rejected = outcome.totals.rejected,
            "Homeroom batch committed"
        );
        Ok(outcome)
    }

    /// Moves a membership to `next`. Same-status updates write nothing.
    pub async fn update_membership_status(
        &self,
        actor: &Actor,
        membership_id: &str,
        next: HomeroomStatus,
    ) -> DbResult<HomeroomMembership> {
        actor
            .require(Capability::ManageHomerooms)
            .map_err(|e| rejected("update_membership_status", e))?;

        let student_id = self.membership_student(membership_id).await?;
        let _guards = self.locks.acquire([ConflictKey::Student(student_id.clone())]).await;
        let mut tx = self.begin_write().await?;

        let mut membership = homeroom::fetch_membership(&mut *tx, membership_id)
            .await?
            .ok_or_else(|| missing("HomeroomMembership", membership_id))?;
        let others = homeroom::memberships_for_student(&mut *tx, &student_id).await?;
        let changed = HomeroomMembershipGuard::new()
            .check_transition(&membership, next, &others)
            .map_err(|e| rejected("update_membership_status", e))?;

        if changed {
            homeroom::set_membership_status(&mut *tx, membership_id, next).await?;
            tx.commit().await?;
            info!(membership_id, from = ?membership.status, to = ?next, "Membership status changed");
            membership.status = next;
        }
        Ok(membership)
    }

    /// Deletes one membership. Nothing else is touched.
    pub async fn remove_membership(&self, actor: &Actor, membership_id: &str) -> DbResult<()> {
        actor
            .require(Capability::ManageHomerooms)
            .map_err(|e| rejected("remove_membership", e))?;

        let student_id = self.membership_student(membership_id).await?;
        let _guards = self.locks.acquire([ConflictKey::Student(student_id)]).await;
        let mut tx = self.begin_write().await?;

        homeroom::fetch_membership(&mut *tx, membership_id)
            .await?
            .ok_or_else(|| missing("HomeroomMembership", membership_id))?;
        homeroom::delete_membership(&mut *tx, membership_id).await?;
        tx.commit().await?;

        info!(membership_id, "Membership removed");
        Ok(())
    }

    async fn membership_student(&self, membership_id: &str) -> DbResult<String> {
        let mut conn = self.pool.acquire().await?;
        homeroom::fetch_membership(&mut conn, membership_id)
            .await?
            .map(|m| m.student_id)
            .ok_or_else(|| missing("HomeroomMembership", membership_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, file_db, memory_db, students};
    use registrar_core::{ConflictError, CoreError, ErrorKind, RejectionReason, StateError};

    #[tokio::test]
    async fn test_homeroom_name_and_teacher_are_unique() {
        let db = memory_db().await;
        let admissions = db.admissions();
        admissions.create_homeroom(&admin(), "7A", "T1").await.unwrap();

        let err = admissions.create_homeroom(&admin(), "7A", "T2").await.unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(CoreError::Conflict(ConflictError::HomeroomNameTaken { .. }))
        ));

        let err = admissions.create_homeroom(&admin(), "7B", "T1").await.unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(CoreError::Conflict(ConflictError::TeacherHasHomeroom { .. }))
        ));

        let err = admissions.create_homeroom(&admin(), "  ", "T3").await.unwrap_err();
        assert_eq!(err.rejection().map(CoreError::kind), Some(ErrorKind::Validation));
        assert_eq!(db.homerooms().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_anticipated_membership_is_rejected() {
        let db = memory_db().await;
        let admissions = db.admissions();
        let a = admissions.create_homeroom(&admin(), "7A", "T1").await.unwrap();
        let b = admissions.create_homeroom(&admin(), "7B", "T2").await.unwrap();
        let ids = students(&db, &["Ada", "Bo"]).await;

        let first = admissions
            .add_students_to_homeroom(&admin(), &a.id, &ids[..1], HomeroomStatus::Anticipated)
            .await
            .unwrap();
        assert!(first.is_fully_admitted());

        let second = admissions
            .add_students_to_homeroom(&admin(), &b.id, &ids, HomeroomStatus::Anticipated)
            .await
            .unwrap();
        assert_eq!(second.admitted, vec![ids[1].clone()]);
        assert_eq!(
            second.rejected[0].reason,
            RejectionReason::ActiveInAnotherHomeroom { homeroom_id: a.id.clone() }
        );
        assert_eq!(db.homerooms().for_student(&ids[0]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_reports_members_and_unknown_students() {
        let db = memory_db().await;
        let admissions = db.admissions();
        let room = admissions.create_homeroom(&admin(), "8C", "T").await.unwrap();
        let ids = students(&db, &["Ada"]).await;
        admissions
            .add_students_to_homeroom(&admin(), &room.id, &ids, HomeroomStatus::Graduated)
            .await
            .unwrap();

        let request = vec![ids[0].clone(), "ghost".to_string(), "ghost".to_string()];
        let outcome = admissions
            .add_students_to_homeroom(&admin(), &room.id, &request, HomeroomStatus::Anticipated)
            .await
            .unwrap();

        assert!(outcome.admitted.is_empty());
        assert_eq!(outcome.totals.requested, 2);
        let reasons: Vec<_> = outcome.rejected.iter().map(|r| r.reason.clone()).collect();
        assert!(reasons.contains(&RejectionReason::AlreadyInHomeroom { homeroom_id: room.id.clone() }));
        assert!(reasons.contains(&RejectionReason::StudentNotFound));
    }

    #[tokio::test]
    async fn test_missing_homeroom_is_not_found() {
        let db = memory_db().await;
        let ids = students(&db, &["Ada"]).await;
        let err = db
            .admissions()
            .add_students_to_homeroom(&admin(), "ghost", &ids, HomeroomStatus::Anticipated)
            .await
            .unwrap_err();
        assert_eq!(err.rejection().map(CoreError::kind), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_terminal_memberships_do_not_move() {
        let db = memory_db().await;
        let admissions = db.admissions();
        let room = admissions.create_homeroom(&admin(), "9A", "T").await.unwrap();
        let ids = students(&db, &["Ada"]).await;
        admissions
            .add_students_to_homeroom(&admin(), &room.id, &ids, HomeroomStatus::Anticipated)
            .await
            .unwrap();
        let membership = db.homerooms().for_student(&ids[0]).await.unwrap().remove(0);

        let same = admissions
            .update_membership_status(&admin(), &membership.id, HomeroomStatus::Anticipated)
            .await
            .unwrap();
        assert_eq!(same, membership);

        let graduated = admissions
            .update_membership_status(&admin(), &membership.id, HomeroomStatus::Graduated)
            .await
            .unwrap();
        assert_eq!(graduated.status, HomeroomStatus::Graduated);

        let err = admissions
            .update_membership_status(&admin(), &membership.id, HomeroomStatus::Expelled)
            .await
            .unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(CoreError::State(StateError::TerminalMembership { .. }))
        ));
    }

    #[tokio::test]
    async fn test_graduating_frees_the_student_for_another_homeroom() {
        let db = memory_db().await;
        let admissions = db.admissions();
        let a = admissions.create_homeroom(&admin(), "6A", "T1").await.unwrap();
        let b = admissions.create_homeroom(&admin(), "7A", "T2").await.unwrap();
        let ids = students(&db, &["Ada"]).await;
        admissions
            .add_students_to_homeroom(&admin(), &a.id, &ids, HomeroomStatus::Anticipated)
            .await
            .unwrap();
        let membership = db.homerooms().for_student(&ids[0]).await.unwrap().remove(0);
        admissions
            .update_membership_status(&admin(), &membership.id, HomeroomStatus::Graduated)
            .await
            .unwrap();

        let outcome = admissions
            .add_students_to_homeroom(&admin(), &b.id, &ids, HomeroomStatus::Anticipated)
            .await
            .unwrap();
        assert!(outcome.is_fully_admitted());
    }

    #[tokio::test]
    async fn test_remove_membership() {
        let db = memory_db().await;
        let admissions = db.admissions();
        let room = admissions.create_homeroom(&admin(), "5B", "T").await.unwrap();
        let ids = students(&db, &["Ada"]).await;
        admissions
            .add_students_to_homeroom(&admin(), &room.id, &ids, HomeroomStatus::Anticipated)
            .await
            .unwrap();
        let membership = db.homerooms().members(&room.id).await.unwrap().remove(0);

        admissions.remove_membership(&admin(), &membership.id).await.unwrap();
        assert!(db.homerooms().members(&room.id).await.unwrap().is_empty());

        let err = admissions.remove_membership(&admin(), &membership.id).await.unwrap_err();
        assert_eq!(err.rejection().map(CoreError::kind), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_teacher_cannot_manage_homerooms() {
        let db = memory_db().await;
        let err = db
            .admissions()
            .create_homeroom(&Actor::teacher("T"), "7A", "T")
            .await
            .unwrap_err();
        assert_eq!(err.rejection().map(CoreError::kind), Some(ErrorKind::Forbidden));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_anticipated_adds_keep_one_active_membership() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_db(&dir, 4).await;
        let admissions = db.admissions();
        let a = admissions.create_homeroom(&admin(), "9A", "T1").await.unwrap();
        let b = admissions.create_homeroom(&admin(), "9B", "T2").await.unwrap();

        for round in 0..10 {
            let name = format!("S{round}");
            let student = students(&db, &[name.as_str()]).await;
            let tasks: Vec<_> = [a.id.clone(), b.id.clone()]
                .into_iter()
                .map(|homeroom_id| {
                    let admissions = db.admissions();
                    let student = student.clone();
                    tokio::spawn(async move {
                        let outcome = admissions
                            .add_students_to_homeroom(
                                &admin(),
                                &homeroom_id,
                                &student,
                                HomeroomStatus::Anticipated,
                            )
                            .await;
                        (homeroom_id, outcome)
                    })
                })
                .collect();

            let mut admitted = Vec::new();
            let mut rejected = Vec::new();
            for task in tasks {
                let (homeroom_id, outcome) = task.await.unwrap();
                let outcome = outcome.unwrap();
                if outcome.is_fully_admitted() {
                    admitted.push(homeroom_id);
                } else {
                    rejected.push(outcome.rejected[0].reason.clone());
                }
            }

            assert_eq!(admitted.len(), 1, "round {round}");
            assert_eq!(
                rejected,
                vec![RejectionReason::ActiveInAnotherHomeroom { homeroom_id: admitted[0].clone() }],
                "round {round}"
            );
        }

        let members = db.homerooms().members(&a.id).await.unwrap().len()
            + db.homerooms().members(&b.id).await.unwrap().len();
        assert_eq!(members, 10);
    }

    #[tokio::test]
    async fn test_homeroom_setup_does_not_wait_on_class_scheduling() {
        let db = memory_db().await;
        let admissions = db.admissions();
        let _scheduling = admissions.locks.acquire([ConflictKey::Teacher("T".to_string())]).await;

        let created = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            admissions.create_homeroom(&admin(), "6C", "T"),
        )
        .await;

        assert!(matches!(created, Ok(Ok(_))));
    }
}
