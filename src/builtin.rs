//! Built-in bindings shipped with the binary.

use tracing::info;

use crate::bindings::{Binding, BindingTable};
use crate::event::CloudEvent;
use crate::function::CloudEventsFunction;
use crate::hooks::EventHandler;

/// `accept` handler that records each delivered event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn accept(&self, function: &CloudEventsFunction, event: &CloudEvent) -> anyhow::Result<()> {
        info!(
            function = function.identity(),
            event_id = %event.id,
            source = %event.source,
            event_type = %event.event_type,
            subject = event.subject.as_deref().unwrap_or(""),
            "event accepted"
        );
        Ok(())
    }
}

/// Install the built-in bindings into `table`.
pub fn install(table: &BindingTable) {
    table.bind(Binding::accept(LoggingHandler));
}
