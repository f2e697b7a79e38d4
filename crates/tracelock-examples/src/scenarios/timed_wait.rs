use std::time::{Duration, Instant};
use tracelock::{Condition, Deadline, Mutex};
use tracing::info;

pub fn run() -> Result<(), String> {
    let jobs = Mutex::new("demo.jobs", 0u32);
    let posted = Condition::new("demo.jobs.posted");

    let started = Instant::now();
    let deadline = Deadline::after(Duration::from_millis(50));
    info!(%deadline, "waiting for a job that never comes");

    let mut pending = jobs.lock();
    while *pending == 0 {
        if posted.wait_until(&mut pending, deadline).timed_out() {
            break;
        }
    }
    let elapsed = started.elapsed();

    if !jobs.is_locked() {
        return Err("timed wait returned without reacquiring demo.jobs".to_owned());
    }
    drop(pending);

    info!(elapsed_ms = elapsed.as_millis() as u64, "timed wait gave up");
    Ok(())
}
