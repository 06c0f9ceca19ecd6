//! Tests for `CloudEventsFunction::accept` delegation and failure modes.

use std::sync::{Arc, Mutex};

use serde_json::json;

use injest::bindings::{Binding, BindingTable};
use injest::hooks::EventHandler;
use injest::{CloudEvent, CloudEventsFunction, FunctionError, Slot};

/// Records every call it receives.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(u64, CloudEvent)>>,
}

impl EventHandler for Recorder {
    fn accept(&self, function: &CloudEventsFunction, event: &CloudEvent) -> anyhow::Result<()> {
        self.calls
            .lock()
            .expect("recorder lock")
            .push((function.identity(), event.clone()));
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("bucket {0} does not exist")]
struct MissingBucket(String);

fn sample_event() -> CloudEvent {
    CloudEvent::new(
        "evt-1",
        "//storage.googleapis.com/projects/_/buckets/ingest-results",
        "google.cloud.storage.object.v1.finalized",
    )
    .with_subject("objects/release_date.txt")
    .with_data(json!({"bucket": "ingest-results"}))
}

#[test]
fn bound_handler_receives_adapter_and_event_once() {
    let table = Arc::new(BindingTable::new());
    let recorder = Arc::new(Recorder::default());
    table.bind(Binding::Accept(recorder.clone()));

    let function = CloudEventsFunction::with_bindings(table);
    let event = sample_event();
    function.accept(&event).expect("bound handler succeeds");

    let calls = recorder.calls.lock().expect("recorder lock");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, function.identity());
    assert_eq!(calls[0].1, event);
}

#[test]
fn unbound_accept_fails_every_time() {
    let function = CloudEventsFunction::with_bindings(Arc::new(BindingTable::new()));
    for i in 0..3 {
        let err = function
            .accept(&CloudEvent::new(format!("evt-{i}"), "s", "t"))
            .expect_err("unbound accept must not succeed");
        match err {
            FunctionError::Unconfigured { slot, name } => {
                assert_eq!(slot, Slot::Accept);
                assert_eq!(name, "injest/CloudEventsFunction-accept");
            }
            other => panic!("expected Unconfigured, got {other:?}"),
        }
    }
}

#[test]
fn handler_error_is_propagated_untouched() {
    let table = Arc::new(BindingTable::new());
    table.bind(Binding::accept_with(|_, event| {
        Err(MissingBucket(event.source.clone()).into())
    }));
    let function = CloudEventsFunction::with_bindings(table);

    let err = function
        .accept(&sample_event())
        .expect_err("handler failure must surface");
    assert!(!err.is_unconfigured());

    let inner = err.handler_error().expect("handler error");
    let missing = inner
        .downcast_ref::<MissingBucket>()
        .expect("original error type is preserved");
    assert_eq!(
        missing.0,
        "//storage.googleapis.com/projects/_/buckets/ingest-results"
    );
    assert_eq!(err.to_string(), missing.to_string());
}

#[test]
fn unbinding_restores_hard_failure() {
    let table = Arc::new(BindingTable::new());
    let function = CloudEventsFunction::with_bindings(Arc::clone(&table));

    table.bind(Binding::accept_with(|_, _| Ok(())));
    assert!(function.accept(&sample_event()).is_ok());

    table.unbind(Slot::Accept);
    assert!(function
        .accept(&sample_event())
        .expect_err("unbound again")
        .is_unconfigured());
}

#[test]
fn rebinding_switches_handler_for_existing_adapter() {
    let table = Arc::new(BindingTable::new());
    let function = CloudEventsFunction::with_bindings(Arc::clone(&table));
    let first = Arc::new(Recorder::default());
    let second = Arc::new(Recorder::default());

    table.bind(Binding::Accept(first.clone()));
    function.accept(&sample_event()).expect("first");
    table.bind(Binding::Accept(second.clone()));
    function.accept(&sample_event()).expect("second");

    assert_eq!(first.calls.lock().expect("lock").len(), 1);
    assert_eq!(second.calls.lock().expect("lock").len(), 1);
}
