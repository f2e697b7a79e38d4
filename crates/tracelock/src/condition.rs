use std::fmt;
use std::panic::Location;

use crate::backend::{Backend, DefaultBackend, RawCondvar};
use crate::deadline::Deadline;
use crate::mutex::MutexGuard;
use crate::trace::{LockMeta, Op, TracePolicy};

/// A condition variable, always used together with one [`Mutex`].
///
/// Waiting takes the guard of the locked mutex, releases the mutex while
/// suspended and holds it again on return. Wakeups may be spurious, so
/// callers re-check their predicate in a loop:
///
/// ```rust,no_run
/// # use tracelock::{Condition, Mutex};
/// let ready = Mutex::new("ready", false);
/// let changed = Condition::new("ready.changed");
///
/// let mut guard = ready.lock();
/// while !*guard {
///     changed.wait(&mut guard);
/// }
/// ```
///
/// A condition must not be used with two different mutexes.
///
/// [`Mutex`]: crate::Mutex
pub struct Condition<B: Backend = DefaultBackend> {
    meta: LockMeta,
    inner: B::RawCondvar,
}

/// Whether a timed wait returned because its deadline passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeoutResult(bool);

impl WaitTimeoutResult {
    pub fn timed_out(self) -> bool {
        self.0
    }
}

impl Condition {
    #[track_caller]
    pub fn new(name: &'static str) -> Self {
        Self::with_backend(name, TracePolicy::Inherit, DefaultBackend::default())
    }

    #[track_caller]
    pub fn with_policy(name: &'static str, policy: TracePolicy) -> Self {
        Self::with_backend(name, policy, DefaultBackend::default())
    }
}

impl<B: Backend> Condition<B> {
    #[track_caller]
    pub fn with_backend(name: &'static str, policy: TracePolicy, _backend: B) -> Self {
        let Self { meta, inner } = Self::const_new(name, policy);
        Self {
            meta: meta.init(Op::CondInit, Location::caller()),
            inner,
        }
    }

    /// Creates a condition in a const context. No init record is emitted.
    pub const fn const_new(name: &'static str, policy: TracePolicy) -> Self {
        Self {
            meta: LockMeta::new(name, B::NAME, Op::CondDestroy, policy),
            inner: <B::RawCondvar as RawCondvar<B::RawMutex>>::INIT,
        }
    }

    /// Releases the guard's mutex, blocks until woken, then reacquires it.
    #[track_caller]
    pub fn wait<T>(&self, guard: &mut MutexGuard<'_, T, B>) {
        self.meta.trace(Op::Wait, Location::caller());
        self.inner.wait(guard.backend_guard());
    }

    /// Like [`wait`](Self::wait), but also returns once `deadline` passes.
    ///
    /// The mutex is held again on return either way.
    #[track_caller]
    pub fn wait_until<T>(
        &self,
        guard: &mut MutexGuard<'_, T, B>,
        deadline: Deadline,
    ) -> WaitTimeoutResult {
        self.meta.trace(Op::WaitUntil, Location::caller());
        let timed_out = self
            .inner
            .wait_until(guard.backend_guard(), deadline.to_instant());
        WaitTimeoutResult(timed_out)
    }

    /// Wakes at most one waiting thread.
    #[track_caller]
    pub fn signal(&self) {
        self.meta.trace(Op::Signal, Location::caller());
        self.inner.notify_one();
    }

    /// Wakes every waiting thread.
    #[track_caller]
    pub fn broadcast(&self) {
        self.meta.trace(Op::Broadcast, Location::caller());
        self.inner.notify_all();
    }

    #[track_caller]
    pub fn destroy(mut self) {
        self.meta.destroy(Location::caller());
    }

    pub fn name(&self) -> &'static str {
        self.meta.name()
    }

    pub fn policy(&self) -> TracePolicy {
        self.meta.policy()
    }
}

impl<B: Backend> Default for Condition<B> {
    #[track_caller]
    fn default() -> Self {
        Self::with_backend("condition", TracePolicy::Inherit, B::default())
    }
}

impl<B: Backend> fmt::Debug for Condition<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("name", &self.meta.name())
            .finish_non_exhaustive()
    }
}
