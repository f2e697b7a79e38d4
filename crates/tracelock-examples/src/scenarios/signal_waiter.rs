use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracelock::{Condition, Mutex};
use tracing::info;

pub fn run() -> Result<(), String> {
    let inbox = Arc::new(Mutex::new("demo.inbox", Vec::<String>::new()));
    let arrived = Arc::new(Condition::new("demo.inbox.arrived"));

    let waiter = {
        let inbox = Arc::clone(&inbox);
        let arrived = Arc::clone(&arrived);
        thread::spawn(move || {
            let mut messages = inbox.lock();
            while messages.is_empty() {
                info!("waiter sleeping on demo.inbox.arrived");
                arrived.wait(&mut messages);
            }
            let still_held = inbox.is_locked();
            (messages.remove(0), still_held)
        })
    };

    thread::sleep(Duration::from_millis(20));
    {
        let mut messages = inbox.lock();
        messages.push("hello".to_owned());
        arrived.signal();
    }

    let (message, still_held) = super::join("waiter", waiter)?;
    if !still_held {
        return Err("waiter returned without holding demo.inbox".to_owned());
    }
    info!(%message, "waiter woke holding demo.inbox");
    Ok(())
}
