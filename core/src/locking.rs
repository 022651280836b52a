use dashmap::DashMap;
use std::sync::Arc;

#[allow(unused_imports)]
use crate::executor::Executor;

/// [`Locker`] provides coarse-grained exclusivity by opaque string key. The
/// [`Executor`] borrows it to serialize invocations that share an exclusive
/// key; the locker itself performs no key expansion or interpretation.
pub trait Locker: Send + Sync {
    /// Attempts to take the key without blocking; `false` when already held.
    fn acquire(&self, key: &str) -> bool;

    /// Releases a held key. Releasing a key that is not held is a no-op.
    fn release(&self, key: &str);

    /// Whether the key is currently held.
    fn is_locked(&self, key: &str) -> bool;
}

/// The in-memory [`Locker`], a concurrent set of currently held keys.
#[derive(Default)]
pub struct InMemoryLocker {
    held: DashMap<String, ()>,
}

impl InMemoryLocker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Locker for InMemoryLocker {
    fn acquire(&self, key: &str) -> bool {
        self.held.insert(key.to_owned(), ()).is_none()
    }

    fn release(&self, key: &str) {
        self.held.remove(key);
    }

    fn is_locked(&self, key: &str) -> bool {
        self.held.contains_key(key)
    }
}

/// Scoped hold on a locker key: acquired on construction, released on drop,
/// so every exit path of the surrounding scope gives the key back. An
/// aborted future holding a guard releases it when the future is dropped.
pub struct LockGuard {
    locker: Arc<dyn Locker>,
    key: String,
}

impl LockGuard {
    /// Acquires `key` on `locker`, or `None` when the key is contended (in
    /// which case nothing will be released later).
    pub fn try_acquire(locker: Arc<dyn Locker>, key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        locker.acquire(&key).then_some(Self { locker, key })
    }

    /// The held key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.locker.release(&self.key);
    }
}
