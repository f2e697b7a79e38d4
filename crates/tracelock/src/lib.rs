//! Backend-agnostic synchronization primitives with opt-in call-site tracing.
//!
//! `tracelock` gives a server one vocabulary for its locks: [`Mutex`],
//! [`RwLock`] and [`Condition`]. Every type is generic over a [`Backend`],
//! and every operation can emit a trace record naming the call site that
//! acquired, attempted or released the lock.
//!
//! ```rust,no_run
//! use tracelock::{Condition, Deadline, Mutex};
//! use std::time::Duration;
//!
//! let queue = Mutex::new("work_queue", Vec::<u32>::new());
//! let ready = Condition::new("work_queue.ready");
//!
//! let mut guard = queue.lock();
//! while guard.is_empty() {
//!     let deadline = Deadline::after(Duration::from_millis(100));
//!     if ready.wait_until(&mut guard, deadline).timed_out() {
//!         break;
//!     }
//! }
//! ```
//!
//! # Tracing
//!
//! Each lock carries a [`TracePolicy`] fixed at construction. The default,
//! [`TracePolicy::Inherit`], follows the process-wide switch, which is read
//! once from `TRACELOCK_TRACE` unless [`configure`] ran first:
//!
//! ```text
//! TRACELOCK_TRACE=1 ./your-binary
//! ```
//!
//! Records are `tracing` events with target `tracelock`; the application's
//! subscriber decides where they go. Tracing never changes the outcome or
//! blocking behavior of an operation.
//!
//! # Cargo features
//!
//! | Feature | Effect |
//! |---------|--------|
//! | `trace` *(default)* | Compiles the trace gate in. Without it, every lock is a plain pass-through. |
//! | `std-backend` | Makes [`StdSync`] the [`DefaultBackend`] instead of [`ParkingLot`]. |

mod backend;
mod condition;
mod config;
mod deadline;
mod mutex;
mod rwlock;
mod trace;


pub use backend::{
    Backend, DefaultBackend, ParkingLot, RawCondvar, StdCondvar, StdRawMutex, StdRawRwLock, StdSync,
};
pub use condition::{Condition, WaitTimeoutResult};
pub use config::{
    ConfigError, TRACE_ENV_VAR, configure, parse_switch, process_tracing_enabled,
};
pub use deadline::{Deadline, MICROS_PER_SEC};
pub use mutex::{Mutex, MutexGuard};
pub use rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use trace::{Op, TRACE_TARGET, TracePolicy};
