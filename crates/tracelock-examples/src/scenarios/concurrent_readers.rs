use std::sync::{Arc, Barrier};
use std::thread;
use tracelock::RwLock;
use tracing::info;

const READERS: usize = 3;

pub fn run() -> Result<(), String> {
    let routes = Arc::new(RwLock::new(
        "demo.routes",
        vec!["/health", "/metrics", "/api"],
    ));
    let all_reading = Arc::new(Barrier::new(READERS + 1));
    let checked = Arc::new(Barrier::new(READERS + 1));

    let readers: Vec<_> = (0..READERS)
        .map(|reader| {
            let routes = Arc::clone(&routes);
            let all_reading = Arc::clone(&all_reading);
            let checked = Arc::clone(&checked);
            thread::spawn(move || {
                let table = routes.read();
                info!(reader, route = table[reader], "reader holds demo.routes");
                all_reading.wait();
                checked.wait();
            })
        })
        .collect();

    all_reading.wait();
    let writer_blocked = routes.try_write().is_none();
    checked.wait();

    for (i, reader) in readers.into_iter().enumerate() {
        super::join(&format!("reader-{i}"), reader)?;
    }
    if !writer_blocked {
        return Err("writer trylock succeeded while readers held the lock".to_owned());
    }
    info!("writer trylock failed while {READERS} readers held the lock");

    routes.write().push("/admin");
    info!(routes = routes.read().len(), "writer got in once the readers left");
    Ok(())
}
