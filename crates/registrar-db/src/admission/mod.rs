//! # Admission Workflows
//!
//! Every mutation of committed state: lock, read, decide, write, commit.
//!
//! ## Workflow Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     One Admission Workflow                              │
//! │                                                                         │
//! │  1. actor.require(capability)          → Forbidden                      │
//! │  2. locks.acquire(conflict keys)       sorted, held until step 6        │
//! │  3. BEGIN IMMEDIATE                    SQLite write lock taken up front │
//! │  4. read snapshots via &mut *tx        repository free functions        │
//! │  5. registrar-core checker             → Rejected(CoreError), rollback  │
//! │  6. write + tx.commit()                → Ok(result)                     │
//! │                                                                         │
//! │  Dropping the transaction without commit rolls it back; dropping the    │
//! │  guards afterwards releases the keys.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conflict Keys per Workflow
//! ```text
//! create_class          Teacher(new) + Room(new)
//! update_class          Teacher(new) + Room(new) + Class(id)
//! enroll / withdraw     Class(id) + Student(each id)
//! exams, grading        Class(id)
//! attendance, tuition   Class(id)
//! homeroom create       Homeroom(name) + HomeroomHead(teacher id)
//! membership changes    Student(id)
//! ```
//! A class with enrollments cannot move in time, so a student's timetable
//! only changes under that student's key.

mod attendance;
mod class;
mod enrollment;
mod exam;
mod homeroom;
mod tuition;

use std::sync::Arc;

use registrar_core::CoreError;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::warn;

use crate::config::PolicySettings;
use crate::error::{DbError, DbResult};
use crate::locks::LockRegistry;

/// Handle for the check-then-write workflows. Cheap to create; obtain one
/// with [`Database::admissions`](crate::Database::admissions).
#[derive(Debug, Clone)]
pub struct Admissions {
    pool: SqlitePool,
    locks: Arc<LockRegistry>,
    policy: PolicySettings,
}

impl Admissions {
    pub(crate) fn new(pool: SqlitePool, locks: Arc<LockRegistry>, policy: PolicySettings) -> Self {
        Admissions { pool, locks, policy }
    }

    pub fn policy(&self) -> PolicySettings {
        self.policy
    }

    /// Opens a workflow transaction holding the SQLite write lock from its
    /// first read. Writers on disjoint keys queue on `busy_timeout` here
    /// instead of failing the read-to-write upgrade later.
    async fn begin_write(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }
}

/// A workflow target that does not exist.
fn missing(entity: &str, id: &str) -> DbError {
    DbError::Rejected(CoreError::not_found(entity, id))
}

/// Logs a business rejection and wraps it for the caller.
fn rejected(operation: &'static str, err: impl Into<CoreError>) -> DbError {
    let err = err.into();
    warn!(operation, kind = ?err.kind(), error = %err, "Admission rejected");
    DbError::Rejected(err)
}
