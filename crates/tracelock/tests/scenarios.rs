use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use tracelock::{
    Backend, Condition, Deadline, Mutex, ParkingLot, RwLock, StdSync, TracePolicy,
};

macro_rules! for_each_backend {
    ($($name:ident),* $(,)?) => {
        $(
            mod $name {
                use super::*;

                #[test]
                fn parking_lot() {
                    super::$name::<ParkingLot>()
                }

                #[test]
                fn std_sync() {
                    super::$name::<StdSync>()
                }
            }
        )*
    };
}

for_each_backend!(
    mutex_is_mutually_exclusive,
    trylock_fails_during_hold_and_succeeds_after,
    readers_share_and_block_writer_trylock,
    writer_excludes_everyone,
    signal_wakes_waiter_holding_mutex,
    signal_wakes_at_most_one_waiter,
    broadcast_wakes_every_waiter,
    wait_until_times_out_near_deadline,
    wait_until_returns_early_on_signal,
);

fn mutex<T, B: Backend>(name: &'static str, value: T) -> Arc<Mutex<T, B>> {
    Arc::new(Mutex::with_backend(name, value, TracePolicy::Enabled, B::default()))
}

fn condition<B: Backend>(name: &'static str) -> Arc<Condition<B>> {
    Arc::new(Condition::with_backend(name, TracePolicy::Enabled, B::default()))
}

fn mutex_is_mutually_exclusive<B: Backend>() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 1_000;

    let counter = mutex::<usize, B>("exclusive.counter", 0);
    let inside = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let counter = Arc::clone(&counter);
            let inside = Arc::clone(&inside);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let mut guard = counter.lock();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    *guard += 1;
                    assert_eq!(inside.fetch_sub(1, Ordering::SeqCst), 1);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked");
    }
    assert_eq!(*counter.lock(), THREADS * ROUNDS);
}

fn trylock_fails_during_hold_and_succeeds_after<B: Backend>() {
    let lock = mutex::<(), B>("scenario.trylock", ());
    let held = Arc::new(Barrier::new(2));

    let holder = {
        let lock = Arc::clone(&lock);
        let held = Arc::clone(&held);
        thread::spawn(move || {
            let guard = lock.lock();
            held.wait();
            thread::sleep(Duration::from_millis(50));
            guard.unlock();
        })
    };

    held.wait();
    assert!(lock.try_lock().is_none(), "trylock must fail while held");
    assert!(lock.is_locked(), "failed trylock must not change the lock");

    holder.join().expect("holder panicked");
    assert!(lock.try_lock().is_some(), "trylock must succeed once released");
}

fn readers_share_and_block_writer_trylock<B: Backend>() {
    const READERS: usize = 3;

    let lock = Arc::new(RwLock::with_backend(
        "scenario.readers",
        7u32,
        TracePolicy::Enabled,
        B::default(),
    ));
    let all_reading = Arc::new(Barrier::new(READERS + 1));
    let checked = Arc::new(Barrier::new(READERS + 1));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let all_reading = Arc::clone(&all_reading);
            let checked = Arc::clone(&checked);
            thread::spawn(move || {
                let guard = lock.read();
                assert_eq!(*guard, 7);
                all_reading.wait();
                checked.wait();
                guard.unlock();
            })
        })
        .collect();

    all_reading.wait();
    assert!(lock.try_write().is_none(), "writer trylock must fail under readers");
    assert!(lock.try_read().is_some(), "another reader may still join");
    assert!(lock.is_locked());
    assert!(!lock.is_locked_exclusive());
    checked.wait();

    for reader in readers {
        reader.join().expect("reader panicked");
    }
    assert!(lock.try_write().is_some());
}

fn writer_excludes_everyone<B: Backend>() {
    let lock = Arc::new(RwLock::with_backend(
        "scenario.writer",
        Vec::<u32>::new(),
        TracePolicy::Enabled,
        B::default(),
    ));
    let active = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..6u32)
        .map(|i| {
            let lock = Arc::clone(&lock);
            let active = Arc::clone(&active);
            thread::spawn(move || {
                for round in 0..200 {
                    if (i + round) % 3 == 0 {
                        let mut guard = lock.write();
                        assert_eq!(active.swap(usize::MAX, Ordering::SeqCst), 0);
                        guard.push(i);
                        assert_eq!(active.swap(0, Ordering::SeqCst), usize::MAX);
                    } else {
                        let guard = lock.read();
                        let before = active.fetch_add(1, Ordering::SeqCst);
                        assert_ne!(before, usize::MAX, "reader overlapped a writer");
                        let _ = guard.len();
                        active.fetch_sub(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked");
    }

    let writes = (0..6u32)
        .map(|i| (0..200u32).filter(|round| (i + round) % 3 == 0).count())
        .sum::<usize>();
    assert_eq!(lock.read().len(), writes);
}

fn signal_wakes_waiter_holding_mutex<B: Backend>() {
    let state = mutex::<bool, B>("scenario.cond.mutex", false);
    let changed = condition::<B>("scenario.cond");
    let waiting = Arc::new(Barrier::new(2));

    let waiter = {
        let state = Arc::clone(&state);
        let changed = Arc::clone(&changed);
        let waiting = Arc::clone(&waiting);
        thread::spawn(move || {
            let mut guard = state.lock();
            waiting.wait();
            while !*guard {
                changed.wait(&mut guard);
            }
            assert!(state.is_locked(), "waiter must return holding the mutex");
            assert!(state.try_lock().is_none());
            *guard
        })
    };

    waiting.wait();
    {
        let mut guard = state.lock();
        *guard = true;
        changed.signal();
        guard.unlock();
    }

    assert!(waiter.join().expect("waiter panicked"));
}

fn signal_wakes_at_most_one_waiter<B: Backend>() {
    const WAITERS: usize = 4;
    // A broadcast would wake all four; leave room for one spurious wakeup.
    const MAX_WAKEUPS: usize = 2;

    #[derive(Default)]
    struct Tickets {
        available: usize,
        waiting: usize,
        wakeups: usize,
    }

    let tickets = mutex::<Tickets, B>("scenario.tickets", Tickets::default());
    let available = condition::<B>("scenario.tickets.available");
    let finished = Arc::new(AtomicUsize::new(0));

    let waiters: Vec<_> = (0..WAITERS)
        .map(|_| {
            let tickets = Arc::clone(&tickets);
            let available = Arc::clone(&available);
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                let mut guard = tickets.lock();
                guard.waiting += 1;
                while guard.available == 0 {
                    available.wait(&mut guard);
                    guard.wakeups += 1;
                }
                guard.available -= 1;
                finished.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    wait_for(|| tickets.lock().waiting == WAITERS);

    {
        let mut guard = tickets.lock();
        guard.available += 1;
        available.signal();
    }
    wait_for(|| finished.load(Ordering::SeqCst) == 1);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(finished.load(Ordering::SeqCst), 1, "one ticket, one waiter");
    let wakeups = tickets.lock().wakeups;
    assert!(
        (1..=MAX_WAKEUPS).contains(&wakeups),
        "one signal woke {wakeups} of {WAITERS} waiters"
    );

    {
        let mut guard = tickets.lock();
        guard.available += WAITERS - 1;
        available.broadcast();
    }
    for waiter in waiters {
        waiter.join().expect("waiter panicked");
    }
    assert_eq!(finished.load(Ordering::SeqCst), WAITERS);
}

fn broadcast_wakes_every_waiter<B: Backend>() {
    const WAITERS: usize = 4;

    let gate = mutex::<(bool, usize), B>("scenario.gate", (false, 0));
    let opened = condition::<B>("scenario.gate.opened");

    let waiters: Vec<_> = (0..WAITERS)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let opened = Arc::clone(&opened);
            thread::spawn(move || {
                let mut guard = gate.lock();
                guard.1 += 1;
                while !guard.0 {
                    opened.wait(&mut guard);
                }
            })
        })
        .collect();

    wait_for(|| gate.lock().1 == WAITERS);
    {
        let mut guard = gate.lock();
        guard.0 = true;
        opened.broadcast();
    }

    for waiter in waiters {
        waiter.join().expect("waiter panicked");
    }
}

fn wait_until_times_out_near_deadline<B: Backend>() {
    let lock = mutex::<(), B>("scenario.timed.mutex", ());
    let never = condition::<B>("scenario.timed.never");

    let mut guard = lock.lock();
    let started = Instant::now();
    let deadline = Deadline::after(Duration::from_millis(50));
    let mut result = never.wait_until(&mut guard, deadline);
    while !result.timed_out() {
        result = never.wait_until(&mut guard, deadline);
    }
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(45), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "overshot by {elapsed:?}");
    assert!(lock.is_locked(), "timed wait must reacquire the mutex");
    assert!(lock.try_lock().is_none());
}

fn wait_until_returns_early_on_signal<B: Backend>() {
    let state = mutex::<bool, B>("scenario.early.mutex", false);
    let changed = condition::<B>("scenario.early");

    let signaller = {
        let state = Arc::clone(&state);
        let changed = Arc::clone(&changed);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            *state.lock() = true;
            changed.signal();
        })
    };

    let started = Instant::now();
    let deadline = Deadline::after(Duration::from_secs(10));
    let mut guard = state.lock();
    while !*guard {
        let result = changed.wait_until(&mut guard, deadline);
        assert!(!result.timed_out(), "signal should arrive long before the deadline");
    }
    assert!(started.elapsed() < Duration::from_secs(5));
    drop(guard);

    signaller.join().expect("signaller panicked");
}

fn wait_for(mut done: impl FnMut() -> bool) {
    let give_up = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < give_up, "condition never became true");
        thread::sleep(Duration::from_millis(1));
    }
}
