//! Minimal host shell: delivers events to the adapter the way an
//! event-dispatch framework would.
//!
//! The dispatcher owns one adapter, delivers events concurrently on a
//! bounded number of blocking workers, and retries failed deliveries.
//! An unconfigured handler or a panicking handler is never retried; every
//! event ends up either delivered or in the report's failures.

use std::any::Any;
use std::io::BufRead;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::event::CloudEvent;
use crate::function::{CloudEventsFunction, FunctionError};

/// Dispatch tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Concurrent deliveries (minimum 1).
    pub workers: usize,
    /// Attempts per event, including the first (minimum 1).
    pub max_attempts: u32,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 3,
        }
    }
}

/// An event that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Id of the failed event.
    pub event_id: String,
    /// Attempts spent on it.
    pub attempts: u32,
    /// Whether the failure was an unbound `accept` slot.
    pub unconfigured: bool,
    /// Rendered error of the last attempt.
    pub error: String,
}

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Identifier of the run, attached to every log line it emits.
    pub run_id: Uuid,
    /// Events accepted without error.
    pub delivered: usize,
    /// Events that were not delivered.
    pub failed: Vec<DeliveryFailure>,
    /// Total `accept` invocations across all events.
    pub attempts: u64,
}

impl DispatchReport {
    /// Whether every event was delivered.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, event_id: String, outcome: Delivery) {
        match outcome {
            Delivery::Accepted { attempts } => {
                self.delivered = self.delivered.saturating_add(1);
                self.attempts = self.attempts.saturating_add(u64::from(attempts));
            }
            Delivery::Failed { attempts, error } => {
                warn!(event_id = %event_id, attempts, error = %error, "event delivery failed");
                self.attempts = self.attempts.saturating_add(u64::from(attempts));
                self.failed.push(DeliveryFailure {
                    event_id,
                    attempts,
                    unconfigured: error.is_unconfigured(),
                    error: error.to_string(),
                });
            }
            Delivery::Panicked { attempts, message } => {
                warn!(event_id = %event_id, attempts, panic = %message, "event handler panicked");
                self.attempts = self.attempts.saturating_add(u64::from(attempts));
                self.failed.push(DeliveryFailure {
                    event_id,
                    attempts,
                    unconfigured: false,
                    error: format!("handler panicked: {message}"),
                });
            }
        }
    }
}

/// Outcome of delivering a single event.
#[derive(Debug)]
pub enum Delivery {
    /// Accepted after `attempts` tries.
    Accepted {
        /// Tries used.
        attempts: u32,
    },
    /// Gave up after `attempts` tries.
    Failed {
        /// Tries used.
        attempts: u32,
        /// Error of the last try.
        error: FunctionError,
    },
    /// The bound handler panicked; not retried.
    Panicked {
        /// Tries used, including the one that panicked.
        attempts: u32,
        /// Panic payload rendered as text.
        message: String,
    },
}

/// Delivers events to one [`CloudEventsFunction`].
#[derive(Debug)]
pub struct Dispatcher {
    function: Arc<CloudEventsFunction>,
    options: DispatchOptions,
}

impl Dispatcher {
    /// Take ownership of the adapter the host constructed.
    pub fn new(function: CloudEventsFunction, options: DispatchOptions) -> Self {
        Self {
            function: Arc::new(function),
            options,
        }
    }

    /// The adapter events are delivered to.
    pub fn function(&self) -> &CloudEventsFunction {
        &self.function
    }

    /// Deliver one event synchronously, retrying per [`DispatchOptions`].
    pub fn deliver(&self, event: &CloudEvent) -> Delivery {
        deliver_with_retry(&self.function, event, self.options.max_attempts)
    }

    /// Deliver every event, at most `workers` at a time.
    pub async fn dispatch(&self, events: Vec<CloudEvent>) -> DispatchReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("dispatch", %run_id);
        self.dispatch_inner(run_id, events).instrument(span).await
    }

    async fn dispatch_inner(&self, run_id: Uuid, events: Vec<CloudEvent>) -> DispatchReport {
        let total = events.len();
        let permits = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let mut tasks = JoinSet::new();
        // Every event stays here until its outcome is recorded.
        let mut outstanding: Vec<String> = events.iter().map(|e| e.id.clone()).collect();

        for event in events {
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!(error = %e, "worker pool closed, stopping dispatch");
                    break;
                }
            };
            let function = Arc::clone(&self.function);
            let max_attempts = self.options.max_attempts;
            tasks.spawn_blocking(move || {
                let outcome = deliver_with_retry(&function, &event, max_attempts);
                drop(permit);
                (event.id, outcome)
            });
        }

        let mut report = DispatchReport {
            run_id,
            ..DispatchReport::default()
        };
        while let Some(joined) = tasks.join_next().await {
            let (event_id, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "delivery task did not complete");
                    continue;
                }
            };
            if let Some(pos) = outstanding.iter().position(|id| *id == event_id) {
                outstanding.swap_remove(pos);
            }
            report.record(event_id, outcome);
        }

        for event_id in outstanding {
            warn!(event_id = %event_id, "event was never delivered");
            report.failed.push(DeliveryFailure {
                event_id,
                attempts: 0,
                unconfigured: false,
                error: "delivery did not complete".to_owned(),
            });
        }

        info!(
            total,
            delivered = report.delivered,
            failed = report.failed.len(),
            attempts = report.attempts,
            "dispatch finished"
        );
        report
    }
}

/// Invoke `accept` until it succeeds, fails with an unconfigured handler,
/// panics, or `max_attempts` tries are used.
fn deliver_with_retry(
    function: &CloudEventsFunction,
    event: &CloudEvent,
    max_attempts: u32,
) -> Delivery {
    let max_attempts = max_attempts.max(1);
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        let result = match panic::catch_unwind(AssertUnwindSafe(|| function.accept(event))) {
            Ok(result) => result,
            Err(payload) => {
                return Delivery::Panicked {
                    attempts,
                    message: panic_message(payload.as_ref()),
                };
            }
        };
        match result {
            Ok(()) => return Delivery::Accepted { attempts },
            Err(error) if error.is_unconfigured() || attempts >= max_attempts => {
                return Delivery::Failed { attempts, error };
            }
            Err(error) => {
                debug!(event_id = %event.id, attempts, error = %error, "retrying delivery");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Read JSON-lines CloudEvents, skipping blank lines.
///
/// # Errors
///
/// Fails on the first unreadable or invalid line, naming its line number.
pub fn read_events(reader: impl BufRead) -> anyhow::Result<Vec<CloudEvent>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index.saturating_add(1);
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let event =
            CloudEvent::from_json(&line).with_context(|| format!("invalid event on line {line_no}"))?;
        events.push(event);
    }
    Ok(events)
}
