use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tracelock::Mutex;
use tracing::info;

pub fn run() -> Result<(), String> {
    let account = Arc::new(Mutex::new("demo.account", 100u64));
    let held = Arc::new(Barrier::new(2));

    let holder = {
        let account = Arc::clone(&account);
        let held = Arc::clone(&held);
        thread::spawn(move || {
            let mut balance = account.lock();
            held.wait();
            info!("holder owns demo.account for 50ms");
            thread::sleep(Duration::from_millis(50));
            *balance -= 30;
            balance.unlock();
        })
    };

    held.wait();
    match account.try_lock() {
        Some(_) => return Err("trylock succeeded while the holder owned the mutex".to_owned()),
        None => info!("trylock failed while held, as expected"),
    }

    super::join("holder", holder)?;

    let balance = account
        .try_lock()
        .ok_or_else(|| "trylock failed after the holder released the mutex".to_owned())?;
    info!(balance = *balance, "trylock succeeded after release");
    Ok(())
}
