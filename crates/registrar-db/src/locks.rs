//! # Conflict-Key Locks
//!
//! Serializes check-then-write workflows that could invalidate each other.
//!
//! ## Why Keys, Not One Big Lock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create class (teacher T1, room A)   ──► lock {Teacher(T1), Room(A)}    │
//! │  create class (teacher T1, room B)   ──► lock {Teacher(T1), Room(B)}    │
//! │                                             ▲                           │
//! │                  shares Teacher(T1) ────────┘  → waits for the first    │
//! │                                                                         │
//! │  create class (teacher T2, room C)   ──► lock {Teacher(T2), Room(C)}    │
//! │                  shares nothing          → runs in parallel             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guards are held from the first snapshot read until the transaction
//! commits or rolls back. Keys are always taken in sorted order, so two
//! workflows never wait on each other in a cycle.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

// =============================================================================
// Conflict Key
// =============================================================================

/// A resource whose committed state an admission decision depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConflictKey {
    Teacher(String),
    Room(String),
    Student(String),
    /// Exams, attendance, enrollment count and roster of one class.
    Class(String),
    /// Homeroom name reservation.
    Homeroom(String),
    /// A teacher's single homeroom-head slot. Class scheduling never takes it.
    HomeroomHead(String),
}

impl fmt::Display for ConflictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKey::Teacher(id) => write!(f, "teacher:{id}"),
            ConflictKey::Room(room) => write!(f, "room:{room}"),
            ConflictKey::Student(id) => write!(f, "student:{id}"),
            ConflictKey::Class(id) => write!(f, "class:{id}"),
            ConflictKey::Homeroom(name) => write!(f, "homeroom:{name}"),
            ConflictKey::HomeroomHead(id) => write!(f, "homeroom-head:{id}"),
        }
    }
}

// =============================================================================
// Lock Registry
// =============================================================================

/// Guards held for the lifetime of one workflow. Dropping releases them.
#[must_use = "locks are released as soon as the guard set is dropped"]
pub struct KeyGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
}

#[cfg(test)]
impl KeyGuards {
    fn len(&self) -> usize {
        self._guards.len()
    }
}

/// Process-wide table of per-key async mutexes.
///
/// Entries are created on first use and kept; the table grows with the
/// number of distinct teachers, rooms, students and classes touched.
#[derive(Debug, Default)]
pub struct LockRegistry {
    slots: Mutex<HashMap<ConflictKey, Arc<AsyncMutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires every key, in sorted order, waiting as long as needed.
    pub async fn acquire(&self, keys: impl IntoIterator<Item = ConflictKey>) -> KeyGuards {
        let mut keys: Vec<ConflictKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            let slot = self.slot(&key);
            trace!(%key, "Waiting for conflict key");
            guards.push(slot.lock_owned().await);
        }

        KeyGuards { _guards: guards }
    }

    /// Number of keys ever locked.
    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.table().len()
    }

    fn slot(&self, key: &ConflictKey) -> Arc<AsyncMutex<()>> {
        let mut table = self.table();
        table
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<ConflictKey, Arc<AsyncMutex<()>>>> {
        // The table only holds Arcs; a panic mid-insert leaves it usable.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_duplicate_keys_are_locked_once() {
        let registry = LockRegistry::new();

        let guards = registry
            .acquire([
                ConflictKey::Teacher("t-1".into()),
                ConflictKey::Teacher("t-1".into()),
                ConflictKey::Room("A".into()),
            ])
            .await;

        assert_eq!(guards.len(), 2);
        assert_eq!(registry.tracked_keys(), 2);
    }

    #[tokio::test]
    async fn test_shared_key_blocks_second_holder() {
        let registry = Arc::new(LockRegistry::new());
        let first = registry
            .acquire([ConflictKey::Teacher("t-1".into()), ConflictKey::Room("A".into())])
            .await;

        let contender = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .acquire([ConflictKey::Room("B".into()), ConflictKey::Teacher("t-1".into())])
                    .await
                    .len()
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(first);
        assert_eq!(contender.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_disjoint_keys_do_not_wait() {
        let registry = LockRegistry::new();
        let _first = registry.acquire([ConflictKey::Class("c-1".into())]).await;

        let second = tokio::time::timeout(
            Duration::from_millis(200),
            registry.acquire([ConflictKey::Class("c-2".into())]),
        )
        .await;

        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_homeroom_head_does_not_share_teacher_slot() {
        let registry = LockRegistry::new();
        let _scheduling = registry.acquire([ConflictKey::Teacher("t-1".into())]).await;

        let homeroom = tokio::time::timeout(
            Duration::from_millis(200),
            registry.acquire([ConflictKey::HomeroomHead("t-1".into())]),
        )
        .await;

        assert_eq!(homeroom.map(|guards| guards.len()).ok(), Some(1));
    }

    #[test]
    fn test_keys_sort_by_kind_then_value() {
        let mut keys = vec![
            ConflictKey::Student("s-1".into()),
            ConflictKey::Room("B".into()),
            ConflictKey::Teacher("t-2".into()),
            ConflictKey::Room("A".into()),
        ];
        keys.sort();

        let labels: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["teacher:t-2", "room:A", "room:B", "student:s-1"]);
    }
}
