use parking_lot::lock_api;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::Location;

use crate::backend::{Backend, DefaultBackend};
use crate::trace::{Held, LockMeta, Op, TracePolicy};

/// A reader-writer lock over a `T`: any number of readers, or one writer.
///
/// Reader and writer operations are traced under distinct names
/// (`reader_lock`, `writer_trylock`, ...).
pub struct RwLock<T, B: Backend = DefaultBackend> {
    meta: LockMeta,
    inner: lock_api::RwLock<B::RawRwLock, T>,
}

/// Shared access to an [`RwLock`]. Dropping it releases the read lock.
#[must_use = "if unused the RwLock will immediately unlock"]
pub struct RwLockReadGuard<'a, T, B: Backend = DefaultBackend> {
    held: Held<'a>,
    inner: lock_api::RwLockReadGuard<'a, B::RawRwLock, T>,
}

/// Exclusive access to an [`RwLock`]. Dropping it releases the write lock.
#[must_use = "if unused the RwLock will immediately unlock"]
pub struct RwLockWriteGuard<'a, T, B: Backend = DefaultBackend> {
    held: Held<'a>,
    inner: lock_api::RwLockWriteGuard<'a, B::RawRwLock, T>,
}

impl<B: Backend> RwLock<(), B> {
    /// An unlocked bare rwlock, for statics that need no runtime init.
    #[allow(clippy::declare_interior_mutable_const)]
    pub const INIT: Self = Self::const_new("rwlock", (), TracePolicy::Inherit);
}

impl<T> RwLock<T> {
    #[track_caller]
    pub fn new(name: &'static str, value: T) -> Self {
        Self::with_backend(name, value, TracePolicy::Inherit, DefaultBackend::default())
    }

    #[track_caller]
    pub fn with_policy(name: &'static str, value: T, policy: TracePolicy) -> Self {
        Self::with_backend(name, value, policy, DefaultBackend::default())
    }
}

impl<T, B: Backend> RwLock<T, B> {
    #[track_caller]
    pub fn with_backend(name: &'static str, value: T, policy: TracePolicy, _backend: B) -> Self {
        let Self { meta, inner } = Self::const_new(name, value, policy);
        Self {
            meta: meta.init(Op::RwInit, Location::caller()),
            inner,
        }
    }

    /// Creates an rwlock in a const context. No init record is emitted.
    pub const fn const_new(name: &'static str, value: T, policy: TracePolicy) -> Self {
        Self {
            meta: LockMeta::new(name, B::NAME, Op::RwDestroy, policy),
            inner: lock_api::RwLock::const_new(
                <B::RawRwLock as lock_api::RawRwLock>::INIT,
                value,
            ),
        }
    }

    /// Blocks until shared access is granted.
    #[track_caller]
    pub fn read(&self) -> RwLockReadGuard<'_, T, B> {
        let site = Location::caller();
        self.meta.trace(Op::ReaderLock, site);
        RwLockReadGuard {
            inner: self.inner.read(),
            held: Held::new(&self.meta, Op::ReaderUnlock, site),
        }
    }

    /// Takes shared access only if no writer holds the lock right now.
    #[track_caller]
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T, B>> {
        let site = Location::caller();
        self.meta.trace(Op::ReaderTryLock, site);
        let inner = self.inner.try_read()?;
        Some(RwLockReadGuard {
            held: Held::new(&self.meta, Op::ReaderUnlock, site),
            inner,
        })
    }

    /// Blocks until every reader and writer has released the lock.
    #[track_caller]
    pub fn write(&self) -> RwLockWriteGuard<'_, T, B> {
        let site = Location::caller();
        self.meta.trace(Op::WriterLock, site);
        RwLockWriteGuard {
            inner: self.inner.write(),
            held: Held::new(&self.meta, Op::WriterUnlock, site),
        }
    }

    /// Takes exclusive access only if the lock is completely free right now.
    #[track_caller]
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T, B>> {
        let site = Location::caller();
        self.meta.trace(Op::WriterTryLock, site);
        let inner = self.inner.try_write()?;
        Some(RwLockWriteGuard {
            held: Held::new(&self.meta, Op::WriterUnlock, site),
            inner,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    pub fn is_locked_exclusive(&self) -> bool {
        self.inner.is_locked_exclusive()
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

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

impl<T: Default, B: Backend> Default for RwLock<T, B> {
    #[track_caller]
    fn default() -> Self {
        Self::with_backend("rwlock", T::default(), TracePolicy::Inherit, B::default())
    }
}

impl<T: fmt::Debug, B: Backend> fmt::Debug for RwLock<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwLock")
            .field("name", &self.meta.name())
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T, B: Backend> RwLockReadGuard<'_, T, B> {
    #[track_caller]
    pub fn unlock(mut self) {
        self.held.release_at(Location::caller());
    }
}

impl<T, B: Backend> RwLockWriteGuard<'_, T, B> {
    #[track_caller]
    pub fn unlock(mut self) {
        self.held.release_at(Location::caller());
    }
}

impl<T, B: Backend> Deref for RwLockReadGuard<'_, T, B> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

impl<T, B: Backend> Deref for RwLockWriteGuard<'_, T, B> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

impl<T, B: Backend> DerefMut for RwLockWriteGuard<'_, T, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.deref_mut()
    }
}

impl<T: fmt::Debug, B: Backend> fmt::Debug for RwLockReadGuard<'_, T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl<T: fmt::Debug, B: Backend> fmt::Debug for RwLockWriteGuard<'_, T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}
