//! Process-wide default storage
//!
//! Created empty on first use, exactly once, behind a `RwLock`. Prefer passing
//! an explicit `Storage` around; the default exists for callers that have no
//! natural place to keep one.
//!
//! Holding a read guard (`StorageRef::Default` or `default_storage()`) while
//! asking for `default_storage_mut()` or calling `set_default` on the same
//! thread deadlocks.

use std::ops::Deref;

use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use super::Storage;

static DEFAULT_STORAGE: Lazy<RwLock<Storage>> = Lazy::new(|| {
    debug!("Initialising default storage");
    RwLock::new(Storage::new())
});

/// Either a caller-supplied storage or the locked default
pub enum StorageRef<'a> {
    Explicit(&'a Storage),
    Default(RwLockReadGuard<'static, Storage>),
}

impl Deref for StorageRef<'_> {
    type Target = Storage;

    fn deref(&self) -> &Storage {
        match self {
            StorageRef::Explicit(storage) => *storage,
            StorageRef::Default(guard) => &**guard,
        }
    }
}

/// Use `candidate` if given, otherwise the default storage
pub fn resolve(candidate: Option<&Storage>) -> StorageRef<'_> {
    match candidate {
        Some(storage) => StorageRef::Explicit(storage),
        None => StorageRef::Default(default_storage()),
    }
}

/// Shared access to the default storage
pub fn default_storage() -> RwLockReadGuard<'static, Storage> {
    DEFAULT_STORAGE.read()
}

/// Exclusive access to the default storage (e.g. to add pools)
pub fn default_storage_mut() -> RwLockWriteGuard<'static, Storage> {
    DEFAULT_STORAGE.write()
}

/// Replace the default storage, returning the previous one
pub fn set_default(storage: Storage) -> Storage {
    let mut guard = DEFAULT_STORAGE.write();
    debug!(pools = storage.pool_count(), "Replacing default storage");
    std::mem::replace(&mut *guard, storage)
}
