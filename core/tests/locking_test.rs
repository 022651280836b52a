use std::sync::Arc;
use taskloom::locking::{InMemoryLocker, LockGuard, Locker};

#[test]
fn acquire_is_non_blocking_and_exclusive() {
    let locker = InMemoryLocker::new();

    assert!(locker.acquire("a"));
    assert!(locker.is_locked("a"));
    assert!(!locker.acquire("a"));

    locker.release("a");
    assert!(!locker.is_locked("a"));
    assert!(locker.acquire("a"));
}

#[test]
fn keys_are_independent() {
    let locker = InMemoryLocker::new();

    assert!(locker.acquire("a"));
    assert!(locker.acquire("b"));
    locker.release("a");
    assert!(!locker.is_locked("a"));
    assert!(locker.is_locked("b"));
}

#[test]
fn releasing_an_unheld_key_is_a_noop() {
    let locker = InMemoryLocker::new();
    locker.release("never-held");
    assert!(!locker.is_locked("never-held"));
}

#[test]
fn guard_releases_on_scope_exit() {
    let locker: Arc<dyn Locker> = Arc::new(InMemoryLocker::new());

    {
        let guard = LockGuard::try_acquire(locker.clone(), "a").unwrap();
        assert_eq!(guard.key(), "a");
        assert!(locker.is_locked("a"));
    }

    assert!(!locker.is_locked("a"));
}

#[test]
fn guard_releases_on_panic_unwind() {
    let locker: Arc<dyn Locker> = Arc::new(InMemoryLocker::new());

    let inner = locker.clone();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
        let _guard = LockGuard::try_acquire(inner, "b").unwrap();
        panic!("boom");
    }));

    assert!(result.is_err());
    assert!(!locker.is_locked("b"));
}

#[test]
fn guard_is_none_when_contended_and_does_not_release() {
    let locker: Arc<dyn Locker> = Arc::new(InMemoryLocker::new());
    assert!(locker.acquire("c"));

    assert!(LockGuard::try_acquire(locker.clone(), "c").is_none());
    // The pre-held key stays held; a failed guard has nothing to give back.
    assert!(locker.is_locked("c"));
}
