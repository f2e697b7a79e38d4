pub mod concurrent_readers;
pub mod signal_waiter;
pub mod timed_wait;
pub mod trylock_during_hold;

use std::thread::JoinHandle;

pub(crate) fn join<T>(name: &str, handle: JoinHandle<T>) -> Result<T, String> {
    handle
        .join()
        .map_err(|_| format!("thread {name} panicked"))
}
