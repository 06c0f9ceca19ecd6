//! Slots: the fixed set of overridable operations on the function adapter.
//!
//! Every slot has a qualified name of the form `<namespace>/<class>-<method>`
//! (for example `injest/CloudEventsFunction-accept`). Qualified names only
//! appear in diagnostics; lookups are keyed by [`Slot`] itself.

use std::fmt;
use std::str::FromStr;

/// Number of slots the adapter exposes.
pub const SLOT_COUNT: usize = 5;

/// One overridable operation of [`crate::function::CloudEventsFunction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// Equality comparison.
    Equals,
    /// String representation.
    ToString,
    /// Hash computation.
    HashCode,
    /// Shallow copy.
    Clone,
    /// Business event handler.
    Accept,
}

impl Slot {
    /// Every slot, in declaration order.
    pub const ALL: [Slot; SLOT_COUNT] = [
        Slot::Equals,
        Slot::ToString,
        Slot::HashCode,
        Slot::Clone,
        Slot::Accept,
    ];

    /// Method name as the host framework knows it.
    pub const fn method_name(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::ToString => "toString",
            Self::HashCode => "hashCode",
            Self::Clone => "clone",
            Self::Accept => "accept",
        }
    }

    /// Whether calling this slot unbound falls back to a soft default.
    ///
    /// Only [`Slot::Accept`] has no soft fallback.
    pub const fn has_soft_fallback(self) -> bool {
        !matches!(self, Self::Accept)
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Equals => 0,
            Self::ToString => 1,
            Self::HashCode => 2,
            Self::Clone => 3,
            Self::Accept => 4,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Returned when a string names no known slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown slot: {0}")]
pub struct ParseSlotError(pub String);

impl FromStr for Slot {
    type Err = ParseSlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::ALL
            .into_iter()
            .find(|slot| slot.method_name() == s)
            .ok_or_else(|| ParseSlotError(s.to_owned()))
    }
}

/// Namespace that owns a set of slots.
///
/// Determines the adapter's class name (`<namespace>.<class>`) and the
/// qualified slot names reported in errors and listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotNamespace {
    namespace: String,
    class: String,
}

impl SlotNamespace {
    /// Create a namespace from its namespace and class parts.
    pub fn new(namespace: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            class: class.into(),
        }
    }

    /// Namespace part, e.g. `injest`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Class part, e.g. `CloudEventsFunction`.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Fully qualified class name, e.g. `injest.CloudEventsFunction`.
    pub fn class_name(&self) -> String {
        format!("{}.{}", self.namespace, self.class)
    }

    /// Qualified slot name, e.g. `injest/CloudEventsFunction-accept`.
    pub fn qualify(&self, slot: Slot) -> String {
        format!("{}/{}-{}", self.namespace, self.class, slot.method_name())
    }
}

impl Default for SlotNamespace {
    fn default() -> Self {
        Self::new("injest", "CloudEventsFunction")
    }
}
