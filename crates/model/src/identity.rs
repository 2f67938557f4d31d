//! Composite identity keys and the navigation slot that caches a resolved parent.
//!
//! Entities that reference a version denormalize its full identity (service,
//! library and version ids). Rather than three independent foreign-key fields
//! plus a cached reference kept in sync by side effects, the key is a single
//! [`VersionKey`] value and the cached parent lives next to it inside one
//! [`Navigation`] slot. Every write replaces the key and the reference
//! together under the slot's lock, so no reader can observe a key that
//! disagrees with the cached parent.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Identity of a library: the owning service plus the library itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryKey {
    pub service_id: Uuid,
    pub library_id: Uuid,
}
impl LibraryKey {
    pub fn new(service_id: Uuid, library_id: Uuid) -> Self {
        Self { service_id, library_id }
    }

    pub fn version(self, version_id: Uuid) -> VersionKey {
        VersionKey::new(self.service_id, self.library_id, version_id)
    }
}

/// Identity of a version: `(service, library, version)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionKey {
    pub service_id: Uuid,
    pub library_id: Uuid,
    pub version_id: Uuid,
}
impl VersionKey {
    pub fn new(service_id: Uuid, library_id: Uuid, version_id: Uuid) -> Self {
        Self { service_id, library_id, version_id }
    }

    pub fn library(&self) -> LibraryKey {
        LibraryKey::new(self.service_id, self.library_id)
    }
}

/// An entity that can be the target of a [`Navigation`].
pub trait Identified {
    type Key: Copy + Eq + Debug;

    /// The entity's own identity, which a navigation's key must agree with.
    fn key(&self) -> Self::Key;
}

struct Slot<T: Identified> {
    key: T::Key,
    target: Option<Arc<T>>,
}

/// A foreign key plus an optional cached reference to the entity it points at.
///
/// Invariant: when a target is cached, `target.key() == key`.
///
/// The lock is per instance and is only ever held for the few instructions it
/// takes to read or swap the pair, never across I/O.
pub struct Navigation<T: Identified> {
    slot: Mutex<Slot<T>>,
}
impl<T: Identified> Navigation<T> {
    /// An unresolved navigation holding only the key.
    pub fn new(key: T::Key) -> Self {
        Self {
            slot: Mutex::new(Slot { key, target: None }),
        }
    }

    /// A resolved navigation; the key is taken from the target.
    pub fn resolved(target: Arc<T>) -> Self {
        Self {
            slot: Mutex::new(Slot {
                key: target.key(),
                target: Some(target),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        // The slot is only ever assigned whole, so a poisoned guard still
        // holds a consistent pair.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn key(&self) -> T::Key {
        self.lock().key
    }

    pub fn target(&self) -> Option<Arc<T>> {
        self.lock().target.clone()
    }

    /// Key and cached target, read together.
    pub fn snapshot(&self) -> (T::Key, Option<Arc<T>>) {
        let slot = self.lock();
        (slot.key, slot.target.clone())
    }

    /// Point at a different target. The key is overwritten from the target's
    /// identity. Returns the previously cached target.
    pub fn set_target(&self, target: Arc<T>) -> Option<Arc<T>> {
        let mut slot = self.lock();
        slot.key = target.key();
        slot.target.replace(target)
    }

    /// Replace the whole key. A cached target that no longer matches is
    /// dropped and returned; a matching one is kept.
    pub fn replace_identity(&self, key: T::Key) -> Option<Arc<T>> {
        let mut slot = self.lock();
        slot.key = key;
        match slot.target.as_ref().is_some_and(|t| t.key() != key) {
            true => slot.target.take(),
            false => None,
        }
    }

    /// Replace the key only if it agrees with the cached target (or nothing
    /// is cached). On disagreement nothing changes and the cached target's
    /// key is returned as the error.
    pub fn try_replace_identity(&self, key: T::Key) -> Result<(), T::Key> {
        let mut slot = self.lock();
        if let Some(target) = &slot.target {
            let cached = target.key();
            if cached != key {
                return Err(cached);
            }
        }
        slot.key = key;
        Ok(())
    }

    /// Derive a new key from the current one and apply it with
    /// [`try_replace_identity`](Self::try_replace_identity) semantics, all
    /// under a single acquisition of the lock.
    pub fn try_update(&self, update: impl FnOnce(T::Key) -> T::Key) -> Result<(), T::Key> {
        let mut slot = self.lock();
        let key = update(slot.key);
        if let Some(target) = &slot.target {
            let cached = target.key();
            if cached != key {
                return Err(cached);
            }
        }
        slot.key = key;
        Ok(())
    }

    /// Drop the cached target, keeping the key.
    pub fn clear_target(&self) -> Option<Arc<T>> {
        self.lock().target.take()
    }
}
impl<T: Identified> Clone for Navigation<T> {
    fn clone(&self) -> Self {
        let (key, target) = self.snapshot();
        Self {
            slot: Mutex::new(Slot { key, target }),
        }
    }
}
impl<T: Identified> Debug for Navigation<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let (key, target) = self.snapshot();
        f.debug_struct("Navigation").field("key", &key).field("resolved", &target.is_some()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[derive(Debug)]
    struct Parent(VersionKey);
    impl Identified for Parent {
        type Key = VersionKey;
        fn key(&self) -> VersionKey {
            self.0
        }
    }

    fn key() -> VersionKey {
        VersionKey::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_resolved_takes_key_from_target() {
        let parent = Arc::new(Parent(key()));
        let nav = Navigation::resolved(parent.clone());
        assert_eq!(nav.key(), parent.0);
        assert!(nav.target().is_some());
    }

    #[test]
    fn test_set_target_overwrites_key() {
        let nav = Navigation::<Parent>::new(key());
        let parent = Arc::new(Parent(key()));
        assert!(nav.set_target(parent.clone()).is_none());
        assert_eq!(nav.key(), parent.0);
    }

    #[test]
    fn test_replace_identity_drops_stale_target() {
        let parent = Arc::new(Parent(key()));
        let nav = Navigation::resolved(parent.clone());
        let other = key();
        let evicted = nav.replace_identity(other);
        assert!(evicted.is_some_and(|p| p.0 == parent.0));
        assert_eq!(nav.snapshot().0, other);
        assert!(nav.target().is_none());
    }

    #[test]
    fn test_replace_identity_keeps_matching_target() {
        let parent = Arc::new(Parent(key()));
        let nav = Navigation::resolved(parent.clone());
        assert!(nav.replace_identity(parent.0).is_none());
        assert!(nav.target().is_some());
    }

    #[test]
    fn test_try_update_rejects_mismatch() {
        let parent = Arc::new(Parent(key()));
        let nav = Navigation::resolved(parent.clone());
        let cached = nav
            .try_update(|k| VersionKey {
                version_id: Uuid::new_v4(),
                ..k
            })
            .unwrap_err();
        assert_eq!(cached, parent.0);
        // Nothing changed.
        assert_eq!(nav.key(), parent.0);
        assert!(nav.target().is_some());
    }

    #[test]
    fn test_try_update_without_target() {
        let original = key();
        let nav = Navigation::<Parent>::new(original);
        let version_id = Uuid::new_v4();
        nav.try_update(|k| VersionKey { version_id, ..k }).unwrap();
        assert_eq!(nav.key(), VersionKey { version_id, ..original });
    }

    #[test]
    fn test_concurrent_writers_never_tear() {
        let nav = Arc::new(Navigation::<Parent>::new(key()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let nav = nav.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let parent = Arc::new(Parent(key()));
                        nav.set_target(parent);
                        let (key, target) = nav.snapshot();
                        if let Some(target) = target {
                            assert_eq!(target.0, key);
                        }
                        nav.replace_identity(self::key());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let (key, target) = nav.snapshot();
        assert!(target.is_none_or(|t| t.0 == key));
    }
}
