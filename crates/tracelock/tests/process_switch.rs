//! Runs in its own test binary: the process switch can be set only once.

#![cfg(feature = "trace")]

use std::sync::{Arc, Mutex as StdMutex};
use tracelock::{ConfigError, Mutex, TRACE_TARGET, TracePolicy};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Clone, Default)]
struct Ops(Arc<StdMutex<Vec<String>>>);

struct OpField<'a>(&'a mut Option<String>);

impl Visit for OpField<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "op" {
            *self.0 = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}

impl<S: Subscriber> Layer<S> for Ops {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != TRACE_TARGET {
            return;
        }
        let mut op = None;
        event.record(&mut OpField(&mut op));
        if let Some(op) = op {
            self.0.lock().expect("ops lock poisoned").push(op);
        }
    }
}

#[test]
fn configured_switch_drives_inherit_locks() {
    tracelock::configure(true).expect("switch should not be resolved yet");
    assert!(tracelock::process_tracing_enabled());
    assert_eq!(
        tracelock::configure(false),
        Err(ConfigError::AlreadyConfigured { enabled: true })
    );

    let ops = Ops::default();
    let subscriber = tracing_subscriber::registry().with(ops.clone());
    tracing::subscriber::with_default(subscriber, || {
        let mutex = Mutex::new("switch.mutex", 0u32);
        assert_eq!(mutex.policy(), TracePolicy::Inherit);
        *mutex.lock() += 1;
        mutex.destroy();

        let quiet = Mutex::with_policy("switch.quiet", (), TracePolicy::Disabled);
        drop(quiet.lock());
    });

    let ops = ops.0.lock().expect("ops lock poisoned").clone();
    assert_eq!(ops, ["init", "lock", "unlock", "destroy"]);
}
