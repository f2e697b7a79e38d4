//! Native locking backends.
//!
//! A [`Backend`] names the three raw primitives every lock type is built
//! from. Lock types are generic over it, so the choice costs nothing at run
//! time; [`DefaultBackend`] is what they use when no backend is named.
//!
//! - [`ParkingLot`] uses `parking_lot`'s raw mutex, rwlock and condvar.
//! - [`StdSync`] builds the same primitives on `std::sync::Mutex` and
//!   `std::sync::Condvar`.
//!
//! If the `std-backend` feature is enabled, [`DefaultBackend`] is
//! [`StdSync`]. Otherwise it is [`ParkingLot`].

use parking_lot::lock_api::{MutexGuard, RawMutex, RawRwLock};
use std::time::Instant;

mod parking_lot_backend;
mod std_backend;

pub use parking_lot_backend::ParkingLot;
pub use std_backend::{StdCondvar, StdRawMutex, StdRawRwLock, StdSync};

#[cfg(not(feature = "std-backend"))]
use parking_lot_backend as chosen;

#[cfg(feature = "std-backend")]
use std_backend as chosen;

/// The backend lock types use when none is named explicitly.
pub type DefaultBackend = chosen::Selected;

/// A family of raw primitives that implement the lock types.
///
/// Implementors are zero-sized markers; passing one to a `with_backend`
/// constructor selects the backend.
pub trait Backend: Copy + Default + Send + Sync + 'static {
    /// Short name, included in every trace record.
    const NAME: &'static str;

    type RawMutex: RawMutex + Send + Sync;
    type RawRwLock: RawRwLock + Send + Sync;
    type RawCondvar: RawCondvar<Self::RawMutex> + Send + Sync;
}

/// A condition variable that cooperates with one backend's raw mutex.
///
/// Waiting takes the guard of an already-locked mutex. The mutex is released
/// while the thread is suspended and is held again when the call returns.
/// Spurious wakeups are allowed.
pub trait RawCondvar<M: RawMutex>: Sized {
    /// Initial value for a condition variable that has no waiters.
    const INIT: Self;

    fn wait<T: ?Sized>(&self, guard: &mut MutexGuard<'_, M, T>);

    /// Waits until notified or until `deadline` passes. Returns `true` if
    /// the wait timed out.
    fn wait_until<T: ?Sized>(&self, guard: &mut MutexGuard<'_, M, T>, deadline: Instant) -> bool;

    fn notify_one(&self);

    fn notify_all(&self);
}
