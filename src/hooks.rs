//! Typed capabilities that can be bound into slots.
//!
//! One trait per slot. Every implementation receives the adapter instance
//! as its first argument, followed by the method's own arguments. Closures
//! with the matching signature implement the traits directly.
//!
//! The `Identity*` / `Default*` types are the named fallbacks the adapter
//! runs when a slot is unbound.

use crate::event::CloudEvent;
use crate::function::{CloudEventsFunction, FunctionError};

/// Business handler bound into the `accept` slot.
pub trait EventHandler: Send + Sync {
    /// Handle one delivered event.
    ///
    /// # Errors
    ///
    /// Any error is returned to the host framework unchanged.
    fn accept(&self, function: &CloudEventsFunction, event: &CloudEvent) -> anyhow::Result<()>;
}

/// Equality override bound into the `equals` slot.
pub trait EqualsHook: Send + Sync {
    /// Compare `function` with `other`.
    fn equals(&self, function: &CloudEventsFunction, other: &CloudEventsFunction) -> bool;
}

/// Hash override bound into the `hashCode` slot.
pub trait HashHook: Send + Sync {
    /// Hash `function`.
    fn hash_code(&self, function: &CloudEventsFunction) -> u64;
}

/// String representation override bound into the `toString` slot.
pub trait DescribeHook: Send + Sync {
    /// Render `function` as a string.
    fn describe(&self, function: &CloudEventsFunction) -> String;
}

/// Copy override bound into the `clone` slot.
pub trait CloneHook: Send + Sync {
    /// Produce a copy of `function`.
    ///
    /// # Errors
    ///
    /// Any error is returned to the caller unchanged.
    fn clone_function(&self, function: &CloudEventsFunction)
        -> anyhow::Result<CloudEventsFunction>;
}

impl<F> EventHandler for F
where
    F: Fn(&CloudEventsFunction, &CloudEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn accept(&self, function: &CloudEventsFunction, event: &CloudEvent) -> anyhow::Result<()> {
        self(function, event)
    }
}

impl<F> EqualsHook for F
where
    F: Fn(&CloudEventsFunction, &CloudEventsFunction) -> bool + Send + Sync,
{
    fn equals(&self, function: &CloudEventsFunction, other: &CloudEventsFunction) -> bool {
        self(function, other)
    }
}

impl<F> HashHook for F
where
    F: Fn(&CloudEventsFunction) -> u64 + Send + Sync,
{
    fn hash_code(&self, function: &CloudEventsFunction) -> u64 {
        self(function)
    }
}

impl<F> DescribeHook for F
where
    F: Fn(&CloudEventsFunction) -> String + Send + Sync,
{
    fn describe(&self, function: &CloudEventsFunction) -> String {
        self(function)
    }
}

impl<F> CloneHook for F
where
    F: Fn(&CloudEventsFunction) -> anyhow::Result<CloudEventsFunction> + Send + Sync,
{
    fn clone_function(
        &self,
        function: &CloudEventsFunction,
    ) -> anyhow::Result<CloudEventsFunction> {
        self(function)
    }
}

// ---------------------------------------------------------------------------
// Fallbacks
// ---------------------------------------------------------------------------

/// Identity equality: an adapter equals only itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityEquals;

impl EqualsHook for IdentityEquals {
    fn equals(&self, function: &CloudEventsFunction, other: &CloudEventsFunction) -> bool {
        function.identity() == other.identity()
    }
}

/// Identity hash derived from the adapter's identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHash;

impl HashHook for IdentityHash {
    fn hash_code(&self, function: &CloudEventsFunction) -> u64 {
        // splitmix64 finalizer; spreads sequential identities.
        let mut z = function.identity().wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

/// `<class name>@<hex hash>`, where the hash goes through the `hashCode` slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDescribe;

impl DescribeHook for DefaultDescribe {
    fn describe(&self, function: &CloudEventsFunction) -> String {
        format!(
            "{}@{:x}",
            function.bindings().namespace().class_name(),
            function.hash_code()
        )
    }
}

/// The adapter does not opt into copying, so the default copy is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClone;

impl DefaultClone {
    /// Attempt the default copy.
    ///
    /// # Errors
    ///
    /// Always returns [`FunctionError::CloneNotSupported`].
    pub fn try_clone(
        &self,
        function: &CloudEventsFunction,
    ) -> Result<CloudEventsFunction, FunctionError> {
        Err(FunctionError::CloneNotSupported {
            class: function.bindings().namespace().class_name(),
        })
    }
}
