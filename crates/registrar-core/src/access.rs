//! # Caller Identity
//!
//! Every mutation receives an explicit [`Actor`]; nothing here looks up a
//! "current user". A role is translated into capability grants once, in
//! [`Role::grant`], and every workflow asks for the capability it needs.
//!
//! ```text
//! ┌───────────┬────────────────────────────────────────────────────────┐
//! │ Role      │ Grants                                                 │
//! ├───────────┼────────────────────────────────────────────────────────┤
//! │ Admin     │ every capability, any class                            │
//! │ Teacher   │ RecordAttendance, GradeExams, ViewRecords (own classes)│
//! │ Student   │ ViewRecords (any class)                                │
//! └───────────┴────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::ClassSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

/// Things a workflow may ask permission for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageClasses,
    ManageEnrollment,
    ManageExams,
    GradeExams,
    RecordAttendance,
    ManageHomerooms,
    ManageTuition,
    ViewRecords,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Capability::ManageClasses => "manage classes",
            Capability::ManageEnrollment => "manage enrollment",
            Capability::ManageExams => "manage examinations",
            Capability::GradeExams => "grade examinations",
            Capability::RecordAttendance => "record attendance",
            Capability::ManageHomerooms => "manage homerooms",
            Capability::ManageTuition => "manage tuition",
            Capability::ViewRecords => "view records",
        };
        f.write_str(action)
    }
}

/// How far a granted capability reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    AnyClass,
    /// Only classes whose `teacher_id` is the actor.
    OwnClasses,
}

impl Role {
    /// The single place where roles turn into permissions.
    pub fn grant(&self, capability: Capability) -> Option<Scope> {
        match (self, capability) {
            (Role::Admin, _) => Some(Scope::AnyClass),
            (
                Role::Teacher,
                Capability::RecordAttendance | Capability::GradeExams | Capability::ViewRecords,
            ) => Some(Scope::OwnClasses),
            (Role::Student, Capability::ViewRecords) => Some(Scope::AnyClass),
            _ => None,
        }
    }
}

/// The authenticated caller of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Actor {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Actor::new(user_id, Role::Admin)
    }

    pub fn teacher(user_id: impl Into<String>) -> Self {
        Actor::new(user_id, Role::Teacher)
    }

    pub fn student(user_id: impl Into<String>) -> Self {
        Actor::new(user_id, Role::Student)
    }

    /// Requires `capability` with [`Scope::AnyClass`].
    pub fn require(&self, capability: Capability) -> CoreResult<()> {
        match self.role.grant(capability) {
            Some(Scope::AnyClass) => Ok(()),
            _ => Err(self.forbidden(capability)),
        }
    }

    /// Requires `capability` for one particular class.
    pub fn require_for_class(&self, capability: Capability, class: &ClassSpec) -> CoreResult<()> {
        match self.role.grant(capability) {
            Some(Scope::AnyClass) => Ok(()),
            Some(Scope::OwnClasses) if class.teacher_id == self.user_id => Ok(()),
            _ => Err(self.forbidden(capability)),
        }
    }

    fn forbidden(&self, capability: Capability) -> CoreError {
        CoreError::Forbidden {
            user_id: self.user_id.clone(),
            action: capability.to_string(),
        }
    }
}
