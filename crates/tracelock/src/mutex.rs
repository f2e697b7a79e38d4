use parking_lot::lock_api;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::Location;

use crate::backend::{Backend, DefaultBackend};
use crate::trace::{Held, LockMeta, Op, TracePolicy};

/// An exclusive lock over a `T`, traced per its [`TracePolicy`].
///
/// A bare lock with no protected data is `Mutex<()>`. The lock is not
/// reentrant: locking it again from the thread that holds it deadlocks.
pub struct Mutex<T, B: Backend = DefaultBackend> {
    meta: LockMeta,
    inner: lock_api::Mutex<B::RawMutex, T>,
}

/// Proof that a [`Mutex`] is held. Dropping it unlocks the mutex.
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct MutexGuard<'a, T, B: Backend = DefaultBackend> {
    held: Held<'a>,
    inner: lock_api::MutexGuard<'a, B::RawMutex, T>,
}

impl<B: Backend> Mutex<(), B> {
    /// An unlocked bare mutex, for statics that need no runtime init.
    #[allow(clippy::declare_interior_mutable_const)]
    pub const INIT: Self = Self::const_new("mutex", (), TracePolicy::Inherit);
}

impl<T> Mutex<T> {
    /// Creates a mutex on the default backend that follows the process-wide
    /// trace switch.
    #[track_caller]
    pub fn new(name: &'static str, value: T) -> Self {
        Self::with_backend(name, value, TracePolicy::Inherit, DefaultBackend::default())
    }

    #[track_caller]
    pub fn with_policy(name: &'static str, value: T, policy: TracePolicy) -> Self {
        Self::with_backend(name, value, policy, DefaultBackend::default())
    }
}

impl<T, B: Backend> Mutex<T, B> {
    #[track_caller]
    pub fn with_backend(name: &'static str, value: T, policy: TracePolicy, _backend: B) -> Self {
        let Self { meta, inner } = Self::const_new(name, value, policy);
        Self {
            meta: meta.init(Op::Init, Location::caller()),
            inner,
        }
    }

    /// Creates a mutex in a const context. No init record is emitted.
    pub const fn const_new(name: &'static str, value: T, policy: TracePolicy) -> Self {
        Self {
            meta: LockMeta::new(name, B::NAME, Op::Destroy, policy),
            inner: lock_api::Mutex::const_new(
                <B::RawMutex as lock_api::RawMutex>::INIT,
                value,
            ),
        }
    }

    /// Blocks until the mutex is acquired.
    #[track_caller]
    pub fn lock(&self) -> MutexGuard<'_, T, B> {
        let site = Location::caller();
        self.meta.trace(Op::Lock, site);
        MutexGuard {
            inner: self.inner.lock(),
            held: Held::new(&self.meta, Op::Unlock, site),
        }
    }

    /// Acquires the mutex only if it is free right now.
    ///
    /// `None` leaves the mutex exactly as it was.
    #[track_caller]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T, B>> {
        let site = Location::caller();
        self.meta.trace(Op::TryLock, site);
        let inner = self.inner.try_lock()?;
        Some(MutexGuard {
            held: Held::new(&self.meta, Op::Unlock, site),
            inner,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Destroys the mutex, returning the protected value.
    #[track_caller]
    pub fn destroy(mut self) -> T {
        self.meta.destroy(Location::caller());
        let Self { meta: _, inner } = self;
        inner.into_inner()
    }

    pub fn name(&self) -> &'static str {
        self.meta.name()
    }

    pub fn policy(&self) -> TracePolicy {
        self.meta.policy()
    }
}

impl<T: Default, B: Backend> Default for Mutex<T, B> {
    #[track_caller]
    fn default() -> Self {
        Self::with_backend("mutex", T::default(), TracePolicy::Inherit, B::default())
    }
}

impl<T: fmt::Debug, B: Backend> fmt::Debug for Mutex<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("name", &self.meta.name())
            .field("inner", &self.inner)
            .finish()
    }
}

impl<'a, T, B: Backend> MutexGuard<'a, T, B> {
    /// Unlocks, recording this call site as the release site.
    #[track_caller]
    pub fn unlock(mut self) {
        self.held.release_at(Location::caller());
    }

    /// The backend guard, for handing to a backend condition variable.
    pub(crate) fn backend_guard(&mut self) -> &mut lock_api::MutexGuard<'a, B::RawMutex, T> {
        &mut self.inner
    }
}

impl<T, B: Backend> Deref for MutexGuard<'_, T, B> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

impl<T, B: Backend> DerefMut for MutexGuard<'_, T, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.deref_mut()
    }
}

impl<T: fmt::Debug, B: Backend> fmt::Debug for MutexGuard<'_, T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}
