use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Mutual exclusion around `T`.
///
/// A thread that panics while holding the lock does not poison it for
/// everyone else: the data is handed out as-is to the next holder.
#[derive(Debug, Default)]
pub struct Lock<T> {
    inner: Mutex<T>,
}

/// Proof that the lock is held. Dropping it releases the lock.
#[derive(Debug)]
pub struct LockGuard<'a, T> {
    guard: MutexGuard<'a, T>,
}

impl<T> Lock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    pub fn acquire(&self) -> LockGuard<'_, T> {
        LockGuard {
            guard: self.inner.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

impl<T> Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for LockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

/// Condition variable with Mesa semantics: a woken thread must re-check
/// its predicate.
#[derive(Debug, Default)]
pub struct Condition {
    inner: Condvar,
}

impl Condition {
    pub const fn new() -> Self {
        Self {
            inner: Condvar::new(),
        }
    }

    /// Atomically releases the lock and sleeps until woken, then reacquires.
    pub fn sleep<'a, T>(&self, guard: LockGuard<'a, T>) -> LockGuard<'a, T> {
        LockGuard {
            guard: self
                .inner
                .wait(guard.guard)
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Sleeps until `done` holds. The check and the wait are atomic with
    /// respect to the lock.
    pub fn sleep_until<'a, T, F>(&self, mut guard: LockGuard<'a, T>, mut done: F) -> LockGuard<'a, T>
    where
        F: FnMut(&mut T) -> bool,
    {
        while !done(&mut *guard) {
            guard = self.sleep(guard);
        }
        guard
    }

    pub fn wake_all(&self) {
        self.inner.notify_all();
    }
}
