//! The CloudEvents function adapter handed to the host framework.
//!
//! [`CloudEventsFunction`] carries no behavior of its own. Each method
//! resolves its slot in the binding table at call time and forwards to the
//! bound implementation, or runs the slot's named fallback:
//!
//! | Method | Unbound |
//! |---|---|
//! | [`equals`](CloudEventsFunction::equals) | [`IdentityEquals`] |
//! | [`describe`](CloudEventsFunction::describe) | [`DefaultDescribe`] |
//! | [`hash_code`](CloudEventsFunction::hash_code) | [`IdentityHash`] |
//! | [`try_clone`](CloudEventsFunction::try_clone) | [`DefaultClone`] (refuses) |
//! | [`accept`](CloudEventsFunction::accept) | [`FunctionError::Unconfigured`] |

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::bindings::{self, BindingTable};
use crate::event::CloudEvent;
use crate::hooks::{
    DefaultClone, DefaultDescribe, DescribeHook, EqualsHook, HashHook, IdentityEquals,
    IdentityHash,
};
use crate::slot::Slot;

/// Source of adapter identities. Starts at 1 so 0 never names an adapter.
static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

/// Errors surfaced to the host framework by the adapter.
#[derive(Debug, thiserror::Error)]
pub enum FunctionError {
    /// `accept` was called while its slot is unbound.
    #[error("handler not configured: {slot} ({name} not defined?)")]
    Unconfigured {
        /// Slot that was found unbound.
        slot: Slot,
        /// Qualified name of the slot.
        name: String,
    },
    /// The default copy was requested for an adapter that does not support it.
    #[error("clone not supported: {class}")]
    CloneNotSupported {
        /// Fully qualified class name of the adapter.
        class: String,
    },
    /// The bound implementation failed; the error is its own, untouched.
    #[error(transparent)]
    Handler(anyhow::Error),
}

impl FunctionError {
    /// Whether this is the unbound-handler failure.
    pub fn is_unconfigured(&self) -> bool {
        matches!(self, Self::Unconfigured { .. })
    }

    /// The bound implementation's own error, if that is what failed.
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Handler(e) => Some(e),
            _ => None,
        }
    }
}

/// Adapter that satisfies the host's CloudEvents function contract by
/// delegating every method through a [`BindingTable`].
pub struct CloudEventsFunction {
    bindings: Arc<BindingTable>,
    identity: u64,
}

impl CloudEventsFunction {
    /// No-argument constructor used by the host framework.
    ///
    /// Binds the adapter to the global table (see [`bindings::global`]),
    /// running any registered initializers on first use.
    pub fn new() -> Self {
        Self::with_bindings(bindings::global())
    }

    /// Construct an adapter over an explicit binding table.
    pub fn with_bindings(bindings: Arc<BindingTable>) -> Self {
        let identity = NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed);
        trace!(identity, "cloud events function constructed");
        Self { bindings, identity }
    }

    /// A field-for-field copy with a fresh identity, sharing the same table.
    ///
    /// This is what a bound `clone` implementation usually wants to return.
    pub fn shallow_copy(&self) -> Self {
        Self::with_bindings(Arc::clone(&self.bindings))
    }

    /// Table this adapter resolves its slots in.
    pub fn bindings(&self) -> &Arc<BindingTable> {
        &self.bindings
    }

    /// Identity of this instance, unique within the process.
    pub fn identity(&self) -> u64 {
        self.identity
    }

    /// Handle one event delivered by the host framework.
    ///
    /// # Errors
    ///
    /// [`FunctionError::Unconfigured`] when nothing is bound to `accept`;
    /// [`FunctionError::Handler`] carrying the handler's own error when it fails.
    pub fn accept(&self, event: &CloudEvent) -> Result<(), FunctionError> {
        match self.bindings.event_handler() {
            Some(handler) => {
                trace!(identity = self.identity, event_id = %event.id, "delegating accept");
                handler.accept(self, event).map_err(FunctionError::Handler)
            }
            None => Err(FunctionError::Unconfigured {
                slot: Slot::Accept,
                name: self.bindings.namespace().qualify(Slot::Accept),
            }),
        }
    }

    /// Compare with `other` through the `equals` slot.
    pub fn equals(&self, other: &CloudEventsFunction) -> bool {
        match self.bindings.equals_hook() {
            Some(hook) => hook.equals(self, other),
            None => IdentityEquals.equals(self, other),
        }
    }

    /// Hash through the `hashCode` slot.
    pub fn hash_code(&self) -> u64 {
        match self.bindings.hash_hook() {
            Some(hook) => hook.hash_code(self),
            None => IdentityHash.hash_code(self),
        }
    }

    /// String representation through the `toString` slot.
    pub fn describe(&self) -> String {
        match self.bindings.describe_hook() {
            Some(hook) => hook.describe(self),
            None => DefaultDescribe.describe(self),
        }
    }

    /// Copy through the `clone` slot.
    ///
    /// # Errors
    ///
    /// [`FunctionError::CloneNotSupported`] when unbound;
    /// [`FunctionError::Handler`] when the bound implementation fails.
    pub fn try_clone(&self) -> Result<CloudEventsFunction, FunctionError> {
        match self.bindings.clone_hook() {
            Some(hook) => hook.clone_function(self).map_err(FunctionError::Handler),
            None => DefaultClone.try_clone(self),
        }
    }
}

impl Default for CloudEventsFunction {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CloudEventsFunction {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Hash for CloudEventsFunction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl std::fmt::Display for CloudEventsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

impl std::fmt::Debug for CloudEventsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudEventsFunction")
            .field("identity", &self.identity)
            .field("namespace", self.bindings.namespace())
            .finish()
    }
}
