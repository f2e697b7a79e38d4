use parking_lot::{Condvar, MutexGuard};
use std::time::Instant;

use super::{Backend, RawCondvar};

/// Backend built on [`parking_lot`]'s raw primitives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParkingLot;

#[cfg_attr(feature = "std-backend", allow(dead_code))]
pub(super) type Selected = ParkingLot;

impl Backend for ParkingLot {
    const NAME: &'static str = "parking_lot";

    type RawMutex = parking_lot::RawMutex;
    type RawRwLock = parking_lot::RawRwLock;
    type RawCondvar = Condvar;
}

impl RawCondvar<parking_lot::RawMutex> for Condvar {
    const INIT: Self = Condvar::new();

    #[inline]
    fn wait<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>) {
        Condvar::wait(self, guard)
    }

    #[inline]
    fn wait_until<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>, deadline: Instant) -> bool {
        Condvar::wait_until(self, guard, deadline).timed_out()
    }

    #[inline]
    fn notify_one(&self) {
        Condvar::notify_one(self);
    }

    #[inline]
    fn notify_all(&self) {
        Condvar::notify_all(self);
    }
}
