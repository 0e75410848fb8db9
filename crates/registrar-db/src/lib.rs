//! # registrar-db: Persistence & Atomic Admission for Registrar
//!
//! SQLite storage for classes, enrollments, exams, attendance, homerooms and
//! tuition, plus the workflows that make every check-then-write atomic.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Registrar Data Flow                               │
//! │                                                                         │
//! │  caller (API handler, seed binary, test)                                │
//! │       │  Actor + request                                                │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   registrar-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  Admissions   │    │ Repositories  │    │  Migrations  │  │   │
//! │  │   │ (admission/)  │───►│ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ LockRegistry  │    │ snapshot reads│    │ 001_initial  │  │   │
//! │  │   │ transactions  │    │ plain writes  │    │ _schema.sql  │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ snapshots                                           │   │
//! │  │           ▼                                                     │   │
//! │  │   registrar-core checkers (pure, no I/O)                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL)                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - `registrar.toml` loading and environment overrides
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`locks`] - Per-conflict-key lock registry
//! - [`repository`] - Snapshot reads and writes per aggregate
//! - [`admission`] - Lock → check → write → commit workflows
//!
//! ## Usage
//!
//! ```rust,ignore
//! use registrar_db::{Database, RegistrarConfig};
//! use registrar_core::Actor;
//!
//! let config = RegistrarConfig::load(None)?;
//! let db = Database::new(config.to_db_config()).await?;
//!
//! let admissions = db.admissions();
//! let class = admissions.create_class(&Actor::admin("office"), spec).await?;
//! let outcome = admissions
//!     .enroll_students(&Actor::admin("office"), &class.id, &student_ids, today)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod admission;
pub mod config;
pub mod error;
pub mod locks;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use admission::Admissions;
pub use config::{ConfigError, PolicySettings, RegistrarConfig};
pub use error::{DbError, DbResult};
pub use locks::{ConflictKey, LockRegistry};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::attendance::AttendanceRepository;
pub use repository::class::ClassRepository;
pub use repository::enrollment::EnrollmentRepository;
pub use repository::exam::ExamRepository;
pub use repository::homeroom::HomeroomRepository;
pub use repository::student::{StudentRecord, StudentRepository};
pub use repository::tuition::TuitionRepository;
