//! Tests for `Dispatcher::dispatch`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use injest::bindings::{Binding, BindingTable};
use injest::host::{DispatchOptions, Dispatcher};
use injest::{CloudEvent, CloudEventsFunction};

fn events(n: usize) -> Vec<CloudEvent> {
    (0..n)
        .map(|i| CloudEvent::new(format!("evt-{i}"), "test", "test.event"))
        .collect()
}

fn dispatcher(table: &Arc<BindingTable>, workers: usize, max_attempts: u32) -> Dispatcher {
    Dispatcher::new(
        CloudEventsFunction::with_bindings(Arc::clone(table)),
        DispatchOptions {
            workers,
            max_attempts,
        },
    )
}

#[tokio::test]
async fn every_event_is_delivered_once() {
    let table = Arc::new(BindingTable::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    table.bind(Binding::accept_with(move |_, event| {
        sink.lock().expect("lock").push(event.id.clone());
        Ok(())
    }));

    let report = dispatcher(&table, 4, 3).dispatch(events(20)).await;

    assert!(report.is_success());
    assert_eq!(report.delivered, 20);
    assert_eq!(report.attempts, 20);

    let mut ids = seen.lock().expect("lock").clone();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn unbound_run_fails_each_event_once() {
    let table = Arc::new(BindingTable::new());
    let report = dispatcher(&table, 2, 5).dispatch(events(3)).await;

    assert_eq!(report.delivered, 0);
    assert_eq!(report.failed.len(), 3);
    assert_eq!(report.attempts, 3);
    for failure in &report.failed {
        assert!(failure.unconfigured);
        assert_eq!(failure.attempts, 1);
        assert!(failure.error.contains("injest/CloudEventsFunction-accept"));
    }
}

#[tokio::test]
async fn persistent_failure_exhausts_attempts() {
    let table = Arc::new(BindingTable::new());
    table.bind(Binding::accept_with(|_, event| {
        if event.id == "evt-1" {
            anyhow::bail!("poison event");
        }
        Ok(())
    }));

    let report = dispatcher(&table, 2, 3).dispatch(events(3)).await;

    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed.len(), 1);
    let failure = &report.failed[0];
    assert_eq!(failure.event_id, "evt-1");
    assert_eq!(failure.attempts, 3);
    assert!(!failure.unconfigured);
    assert_eq!(failure.error, "poison event");
    assert_eq!(report.attempts, 5);
}

#[tokio::test]
async fn panicking_handler_is_reported_as_failure() {
    let table = Arc::new(BindingTable::new());
    table.bind(Binding::accept_with(|_, event| {
        if event.id == "evt-1" {
            panic!("corrupt payload in {}", event.id);
        }
        Ok(())
    }));

    let report = dispatcher(&table, 2, 3).dispatch(events(3)).await;

    assert!(!report.is_success());
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed.len(), 1);
    let failure = &report.failed[0];
    assert_eq!(failure.event_id, "evt-1");
    assert_eq!(failure.attempts, 1, "a panic is not retried");
    assert!(!failure.unconfigured);
    assert!(
        failure.error.contains("corrupt payload in evt-1"),
        "{}",
        failure.error
    );
    assert_eq!(report.attempts, 3);
}

#[tokio::test]
async fn concurrency_is_bounded_by_workers() {
    let table = Arc::new(BindingTable::new());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (current, max_seen) = (Arc::clone(&in_flight), Arc::clone(&peak));
    table.bind(Binding::accept_with(move |_, _| {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        max_seen.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(5));
        current.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }));

    let report = dispatcher(&table, 2, 1).dispatch(events(12)).await;

    assert!(report.is_success());
    assert!(peak.load(Ordering::SeqCst) <= 2, "more than 2 deliveries overlapped");
}

#[tokio::test]
async fn binding_installed_mid_life_is_used() {
    let table = Arc::new(BindingTable::new());
    let d = dispatcher(&table, 1, 1);

    let first = d.dispatch(events(1)).await;
    assert_eq!(first.failed.len(), 1);

    table.bind(Binding::accept_with(|_, _| Ok(())));
    let second = d.dispatch(events(1)).await;
    assert!(second.is_success());
    assert_ne!(first.run_id, second.run_id);
}
