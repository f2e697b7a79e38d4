//! The trace gate.
//!
//! Every lock operation runs `if policy.enabled() { emit(record) }` and then
//! delegates to the backend. A record names the operation, the call site
//! (captured with `#[track_caller]`) and the lock, and goes straight to
//! `tracing`; nothing is retained.
//!
//! Locks cannot know their final address when constructed, so besides the
//! address each lock gets a serial id, handed out from a process-wide
//! counter the first time the lock is traced.

use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "trace")]
use crate::config::process_tracing_enabled;

/// `tracing` target of every trace record.
pub const TRACE_TARGET: &str = "tracelock";

/// Whether a lock emits trace records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracePolicy {
    /// Follow the process-wide switch (see [`crate::configure`]).
    #[default]
    Inherit,
    Enabled,
    Disabled,
}

impl TracePolicy {
    #[cfg(feature = "trace")]
    #[inline]
    pub fn enabled(self) -> bool {
        match self {
            Self::Inherit => process_tracing_enabled(),
            Self::Enabled => true,
            Self::Disabled => false,
        }
    }

    #[cfg(not(feature = "trace"))]
    #[inline(always)]
    pub fn enabled(self) -> bool {
        false
    }
}

impl From<bool> for TracePolicy {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

/// A traced operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Init,
    Destroy,
    Lock,
    TryLock,
    Unlock,
    CondInit,
    CondDestroy,
    Wait,
    WaitUntil,
    Signal,
    Broadcast,
    RwInit,
    RwDestroy,
    ReaderLock,
    ReaderTryLock,
    ReaderUnlock,
    WriterLock,
    WriterTryLock,
    WriterUnlock,
}

impl Op {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Destroy => "destroy",
            Self::Lock => "lock",
            Self::TryLock => "trylock",
            Self::Unlock => "unlock",
            Self::CondInit => "cond_init",
            Self::CondDestroy => "cond_destroy",
            Self::Wait => "wait",
            Self::WaitUntil => "wait_until",
            Self::Signal => "signal",
            Self::Broadcast => "broadcast",
            Self::RwInit => "rw_init",
            Self::RwDestroy => "rw_destroy",
            Self::ReaderLock => "reader_lock",
            Self::ReaderTryLock => "reader_trylock",
            Self::ReaderUnlock => "reader_unlock",
            Self::WriterLock => "writer_lock",
            Self::WriterTryLock => "writer_trylock",
            Self::WriterUnlock => "writer_unlock",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static NEXT_LOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Serial id of a lock; zero until first traced.
#[derive(Debug)]
struct LockId(AtomicU64);

impl LockId {
    const UNASSIGNED: u64 = 0;

    const fn new() -> Self {
        Self(AtomicU64::new(Self::UNASSIGNED))
    }

    fn get(&self) -> u64 {
        let id = self.0.load(Ordering::Relaxed);
        if id != Self::UNASSIGNED {
            return id;
        }
        let fresh = NEXT_LOCK_ID.fetch_add(1, Ordering::Relaxed);
        match self.0.compare_exchange(
            Self::UNASSIGNED,
            fresh,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => fresh,
            Err(winner) => winner,
        }
    }
}

/// Per-lock trace state, embedded in every lock type.
///
/// Dropping it is the lock's destruction, so this type emits the destroy
/// record; the lock types themselves need no `Drop` impl and can still be
/// taken apart by `destroy`.
pub(crate) struct LockMeta {
    name: &'static str,
    backend: &'static str,
    destroy_op: Op,
    policy: TracePolicy,
    id: LockId,
    /// Where the lock was built, if not in a const context.
    created_at: Option<&'static Location<'static>>,
    /// Set once the destroy record has been emitted.
    destroyed: bool,
}

impl LockMeta {
    pub(crate) const fn new(
        name: &'static str,
        backend: &'static str,
        destroy_op: Op,
        policy: TracePolicy,
    ) -> Self {
        Self {
            name,
            backend,
            destroy_op,
            policy,
            id: LockId::new(),
            created_at: None,
            destroyed: false,
        }
    }

    /// Records the runtime construction of a lock.
    pub(crate) fn init(mut self, op: Op, site: &'static Location<'static>) -> Self {
        self.created_at = Some(site);
        if self.policy.enabled() {
            emit(&TraceRecord {
                op,
                site: Some(site),
                name: self.name,
                id: self.id.get(),
                addr: None,
                backend: self.backend,
            });
        }
        self
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn policy(&self) -> TracePolicy {
        self.policy
    }

    #[inline]
    pub(crate) fn trace(&self, op: Op, site: &'static Location<'static>) {
        if self.policy.enabled() {
            self.emit(op, Some(site));
        }
    }

    #[cold]
    fn emit(&self, op: Op, site: Option<&'static Location<'static>>) {
        emit(&TraceRecord {
            op,
            site,
            name: self.name,
            id: self.id.get(),
            addr: Some(std::ptr::from_ref(self) as usize),
            backend: self.backend,
        });
    }

    /// Traces an explicit destroy at `site`.
    ///
    /// Called while the metadata still sits inside its lock, so the record
    /// carries the same address as every earlier one.
    pub(crate) fn destroy(&mut self, site: &'static Location<'static>) {
        self.trace(self.destroy_op, site);
        self.destroyed = true;
    }
}

impl Drop for LockMeta {
    fn drop(&mut self) {
        if !self.destroyed && self.policy.enabled() {
            // None for a const-initialized lock.
            self.emit(self.destroy_op, self.created_at);
        }
    }
}

impl fmt::Debug for LockMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockMeta")
            .field("name", &self.name)
            .field("backend", &self.backend)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Release bookkeeping carried by every guard.
///
/// Guards declare this field before the backend guard, so the release is
/// traced before the lock is actually given up.
pub(crate) struct Held<'a> {
    meta: &'a LockMeta,
    release_op: Op,
    acquired_at: &'static Location<'static>,
    released_at: Option<&'static Location<'static>>,
}

impl<'a> Held<'a> {
    pub(crate) fn new(
        meta: &'a LockMeta,
        release_op: Op,
        acquired_at: &'static Location<'static>,
    ) -> Self {
        Self {
            meta,
            release_op,
            acquired_at,
            released_at: None,
        }
    }

    /// Marks an explicit release at `site`; the record is emitted on drop.
    pub(crate) fn release_at(&mut self, site: &'static Location<'static>) {
        self.released_at = Some(site);
    }
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        self.meta
            .trace(self.release_op, self.released_at.unwrap_or(self.acquired_at));
    }
}

/// One trace record, formatted as `[file:line:column:op] name#id 0xADDR`.
///
/// The third position is the column of the call, not a function name:
/// `Location` does not know which function it sits in.
struct TraceRecord<'a> {
    op: Op,
    site: Option<&'a Location<'a>>,
    name: &'static str,
    id: u64,
    addr: Option<usize>,
    backend: &'static str,
}

impl fmt::Display for TraceRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.site {
            Some(site) => write!(
                f,
                "[{}:{}:{}:{}]",
                site.file(),
                site.line(),
                site.column(),
                self.op
            )?,
            None => write!(f, "[<unknown>:{}]", self.op)?,
        }
        write!(f, " {}#{}", self.name, self.id)?;
        match self.addr {
            Some(addr) => write!(f, " {addr:#x}"),
            None => Ok(()),
        }
    }
}

fn emit(record: &TraceRecord<'_>) {
    tracing::info!(
        target: TRACE_TARGET,
        op = record.op.as_str(),
        lock = record.name,
        lock_id = record.id,
        addr = record.addr.map(|addr| addr as u64),
        file = record.site.map(Location::file),
        line = record.site.map(Location::line),
        column = record.site.map(Location::column),
        backend = record.backend,
        "{record}"
    );
}
