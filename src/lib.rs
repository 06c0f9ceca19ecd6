//! injest — a late-bound CloudEvents function adapter.
//!
//! The host framework constructs a [`CloudEventsFunction`] and calls its
//! methods. The adapter has no behavior of its own: each method resolves a
//! [`Slot`] in a [`BindingTable`] at call time and forwards to whatever is
//! bound there, or falls back to a named default. Implementations can be
//! bound, replaced or removed at any point, before or after the adapter
//! exists.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod builtin;
pub mod config;
pub mod event;
pub mod function;
pub mod hooks;
pub mod host;
pub mod logging;
pub mod slot;

pub use bindings::{Binding, BindingTable};
pub use event::CloudEvent;
pub use function::{CloudEventsFunction, FunctionError};
pub use slot::{Slot, SlotNamespace};
