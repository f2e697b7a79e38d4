//! Lock primitives built on `std::sync`.
//!
//! `std`'s own guards cannot be released from a raw handle, so each raw lock
//! here keeps its state behind a short-lived internal `std::sync::Mutex` and
//! parks contended threads on a `std::sync::Condvar`. The internal mutex is
//! only ever held for a few instructions and never while user code runs, so
//! poisoning cannot leave the state inconsistent and is ignored.

use parking_lot::lock_api::{GuardSend, MutexGuard, RawMutex, RawRwLock};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Instant;

use super::{Backend, RawCondvar};

/// Backend built on `std::sync::Mutex` and `std::sync::Condvar`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdSync;

#[cfg_attr(not(feature = "std-backend"), allow(dead_code))]
pub(super) type Selected = StdSync;

impl Backend for StdSync {
    const NAME: &'static str = "std";

    type RawMutex = StdRawMutex;
    type RawRwLock = StdRawRwLock;
    type RawCondvar = StdCondvar;
}

fn state<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn park<'a, T>(
    condvar: &Condvar,
    guard: std::sync::MutexGuard<'a, T>,
) -> std::sync::MutexGuard<'a, T> {
    condvar.wait(guard).unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive raw lock: a `locked` flag plus a condvar for contended lockers.
#[derive(Debug)]
pub struct StdRawMutex {
    locked: Mutex<bool>,
    unlocked: Condvar,
}

impl StdRawMutex {
    /// Takes the lock while already holding the internal state mutex.
    fn reacquire<'a>(
        &'a self,
        mut locked: std::sync::MutexGuard<'a, bool>,
    ) -> std::sync::MutexGuard<'a, bool> {
        while *locked {
            locked = park(&self.unlocked, locked);
        }
        *locked = true;
        locked
    }
}

unsafe impl RawMutex for StdRawMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = StdRawMutex {
        locked: Mutex::new(false),
        unlocked: Condvar::new(),
    };

    type GuardMarker = GuardSend;

    fn lock(&self) {
        drop(self.reacquire(state(&self.locked)));
    }

    fn try_lock(&self) -> bool {
        let mut locked = state(&self.locked);
        if *locked {
            return false;
        }
        *locked = true;
        true
    }

    unsafe fn unlock(&self) {
        *state(&self.locked) = false;
        self.unlocked.notify_one();
    }

    fn is_locked(&self) -> bool {
        *state(&self.locked)
    }
}

/// Shared/exclusive raw lock.
///
/// `state` counts active readers, or is [`WRITER`] while a writer holds the
/// lock.
#[derive(Debug)]
pub struct StdRawRwLock {
    state: Mutex<isize>,
    changed: Condvar,
}

const WRITER: isize = -1;

unsafe impl RawRwLock for StdRawRwLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = StdRawRwLock {
        state: Mutex::new(0),
        changed: Condvar::new(),
    };

    type GuardMarker = GuardSend;

    fn lock_shared(&self) {
        let mut readers = state(&self.state);
        while *readers == WRITER {
            readers = park(&self.changed, readers);
        }
        *readers += 1;
    }

    fn try_lock_shared(&self) -> bool {
        let mut readers = state(&self.state);
        if *readers == WRITER {
            return false;
        }
        *readers += 1;
        true
    }

    unsafe fn unlock_shared(&self) {
        let mut readers = state(&self.state);
        debug_assert!(*readers > 0, "reader unlock without a reader holding the lock");
        *readers -= 1;
        if *readers == 0 {
            drop(readers);
            self.changed.notify_all();
        }
    }

    fn lock_exclusive(&self) {
        let mut readers = state(&self.state);
        while *readers != 0 {
            readers = park(&self.changed, readers);
        }
        *readers = WRITER;
    }

    fn try_lock_exclusive(&self) -> bool {
        let mut readers = state(&self.state);
        if *readers != 0 {
            return false;
        }
        *readers = WRITER;
        true
    }

    unsafe fn unlock_exclusive(&self) {
        *state(&self.state) = 0;
        self.changed.notify_all();
    }

    fn is_locked(&self) -> bool {
        *state(&self.state) != 0
    }

    fn is_locked_exclusive(&self) -> bool {
        *state(&self.state) == WRITER
    }
}

/// Condition variable paired with [`StdRawMutex`].
///
/// Waiters sleep on the internal state mutex of the raw mutex they were
/// handed, which makes "release the lock and start waiting" atomic with
/// respect to any thread that takes the lock afterwards to signal. A
/// `StdCondvar` must always be used with the same mutex.
#[derive(Debug)]
pub struct StdCondvar {
    cond: Condvar,
}

impl StdCondvar {
    fn raw_mutex<'a, T: ?Sized>(guard: &MutexGuard<'a, StdRawMutex, T>) -> &'a StdRawMutex {
        // SAFETY: the guard proves the mutex is locked; we only hand the raw
        // lock back in the locked state.
        unsafe { MutexGuard::mutex(guard).raw() }
    }
}

impl RawCondvar<StdRawMutex> for StdCondvar {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = StdCondvar {
        cond: Condvar::new(),
    };

    fn wait<T: ?Sized>(&self, guard: &mut MutexGuard<'_, StdRawMutex, T>) {
        let raw = Self::raw_mutex(guard);
        let mut locked = state(&raw.locked);
        *locked = false;
        raw.unlocked.notify_one();
        locked = park(&self.cond, locked);
        drop(raw.reacquire(locked));
    }

    fn wait_until<T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, StdRawMutex, T>,
        deadline: Instant,
    ) -> bool {
        let raw = Self::raw_mutex(guard);
        let mut locked = state(&raw.locked);
        *locked = false;
        raw.unlocked.notify_one();

        let timeout = deadline.saturating_duration_since(Instant::now());
        let (locked, result) = self
            .cond
            .wait_timeout(locked, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        drop(raw.reacquire(locked));
        result.timed_out()
    }

    fn notify_one(&self) {
        self.cond.notify_one();
    }

    fn notify_all(&self) {
        self.cond.notify_all();
    }
}
