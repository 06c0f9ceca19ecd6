//! Process-wide binding table.
//!
//! Holds at most one implementation per [`Slot`]. Each slot is an
//! [`ArcSwapOption`], so replacement is a single atomic pointer swap and
//! lookups are wait-free: a reader sees either the old binding or the new one,
//! never a mix.
//!
//! Adapters can be given an explicit table (`CloudEventsFunction::with_bindings`)
//! or use the documented global instance returned by [`global`]. Code that must
//! populate the global table before a host constructs the adapter registers an
//! initializer with [`register_initializer`]; registered initializers run once,
//! on first access to the global table.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use arc_swap::ArcSwapOption;
use tracing::{debug, warn};

use crate::event::CloudEvent;
use crate::function::CloudEventsFunction;
use crate::hooks::{CloneHook, DescribeHook, EqualsHook, EventHandler, HashHook};
use crate::slot::{Slot, SlotNamespace, SLOT_COUNT};

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// An implementation bound to exactly one slot.
///
/// The variant determines the slot, so a binding can never land in a slot
/// whose signature it does not match.
#[derive(Clone)]
pub enum Binding {
    /// Bound to [`Slot::Equals`].
    Equals(Arc<dyn EqualsHook>),
    /// Bound to [`Slot::ToString`].
    Describe(Arc<dyn DescribeHook>),
    /// Bound to [`Slot::HashCode`].
    Hash(Arc<dyn HashHook>),
    /// Bound to [`Slot::Clone`].
    Clone(Arc<dyn CloneHook>),
    /// Bound to [`Slot::Accept`].
    Accept(Arc<dyn EventHandler>),
}

impl Binding {
    /// Slot this binding belongs to.
    pub fn slot(&self) -> Slot {
        match self {
            Self::Equals(_) => Slot::Equals,
            Self::Describe(_) => Slot::ToString,
            Self::Hash(_) => Slot::HashCode,
            Self::Clone(_) => Slot::Clone,
            Self::Accept(_) => Slot::Accept,
        }
    }

    /// Bind an [`EventHandler`] to `accept`.
    pub fn accept(handler: impl EventHandler + 'static) -> Self {
        Self::Accept(Arc::new(handler))
    }

    /// Bind a closure to `accept`.
    pub fn accept_with<F>(f: F) -> Self
    where
        F: Fn(&CloudEventsFunction, &CloudEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Accept(Arc::new(f))
    }

    /// Bind a closure to `equals`.
    pub fn equals_with<F>(f: F) -> Self
    where
        F: Fn(&CloudEventsFunction, &CloudEventsFunction) -> bool + Send + Sync + 'static,
    {
        Self::Equals(Arc::new(f))
    }

    /// Bind a closure to `hashCode`.
    pub fn hash_with<F>(f: F) -> Self
    where
        F: Fn(&CloudEventsFunction) -> u64 + Send + Sync + 'static,
    {
        Self::Hash(Arc::new(f))
    }

    /// Bind a closure to `toString`.
    pub fn describe_with<F>(f: F) -> Self
    where
        F: Fn(&CloudEventsFunction) -> String + Send + Sync + 'static,
    {
        Self::Describe(Arc::new(f))
    }

    /// Bind a closure to `clone`.
    pub fn clone_with<F>(f: F) -> Self
    where
        F: Fn(&CloudEventsFunction) -> anyhow::Result<CloudEventsFunction> + Send + Sync + 'static,
    {
        Self::Clone(Arc::new(f))
    }

    /// Whether `self` and `other` hold the very same implementation.
    pub fn ptr_eq(&self, other: &Binding) -> bool {
        match (self, other) {
            (Self::Equals(a), Self::Equals(b)) => Arc::ptr_eq(a, b),
            (Self::Describe(a), Self::Describe(b)) => Arc::ptr_eq(a, b),
            (Self::Hash(a), Self::Hash(b)) => Arc::ptr_eq(a, b),
            (Self::Clone(a), Self::Clone(b)) => Arc::ptr_eq(a, b),
            (Self::Accept(a), Self::Accept(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Binding").field(&self.slot()).finish()
    }
}

// ---------------------------------------------------------------------------
// BindingTable
// ---------------------------------------------------------------------------

/// Zero-or-one implementation per slot, shared by every adapter built on it.
pub struct BindingTable {
    namespace: SlotNamespace,
    slots: [ArcSwapOption<Binding>; SLOT_COUNT],
}

impl std::fmt::Debug for BindingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingTable")
            .field("namespace", &self.namespace)
            .field("bound", &self.bound_slots())
            .finish()
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingTable {
    /// Create an empty table in the default namespace.
    pub fn new() -> Self {
        Self::with_namespace(SlotNamespace::default())
    }

    /// Create an empty table in `namespace`.
    pub fn with_namespace(namespace: SlotNamespace) -> Self {
        Self {
            namespace,
            slots: std::array::from_fn(|_| ArcSwapOption::empty()),
        }
    }

    /// Namespace used for qualified slot names.
    pub fn namespace(&self) -> &SlotNamespace {
        &self.namespace
    }

    /// Install `binding` in its slot, replacing whatever was there.
    ///
    /// Returns the replaced binding, if any.
    pub fn bind(&self, binding: Binding) -> Option<Binding> {
        let slot = binding.slot();
        let previous = self.cell(slot).swap(Some(Arc::new(binding)));
        debug!(
            slot = %slot,
            name = %self.namespace.qualify(slot),
            replaced = previous.is_some(),
            "slot bound"
        );
        previous.map(|b| (*b).clone())
    }

    /// Return `slot` to the unbound state.
    ///
    /// Returns the removed binding, if any.
    pub fn unbind(&self, slot: Slot) -> Option<Binding> {
        let previous = self.cell(slot).swap(None);
        if previous.is_some() {
            debug!(slot = %slot, name = %self.namespace.qualify(slot), "slot unbound");
        }
        previous.map(|b| (*b).clone())
    }

    /// Current binding of `slot`, or `None`.
    pub fn lookup(&self, slot: Slot) -> Option<Binding> {
        self.cell(slot).load_full().map(|b| (*b).clone())
    }

    /// Whether `slot` currently has a binding.
    pub fn is_bound(&self, slot: Slot) -> bool {
        self.cell(slot).load().is_some()
    }

    /// Slots that currently have a binding, in declaration order.
    pub fn bound_slots(&self) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|slot| self.is_bound(*slot))
            .collect()
    }

    /// Current `accept` handler.
    pub fn event_handler(&self) -> Option<Arc<dyn EventHandler>> {
        match self.lookup(Slot::Accept)? {
            Binding::Accept(handler) => Some(handler),
            _ => None,
        }
    }

    /// Current `equals` override.
    pub fn equals_hook(&self) -> Option<Arc<dyn EqualsHook>> {
        match self.lookup(Slot::Equals)? {
            Binding::Equals(hook) => Some(hook),
            _ => None,
        }
    }

    /// Current `hashCode` override.
    pub fn hash_hook(&self) -> Option<Arc<dyn HashHook>> {
        match self.lookup(Slot::HashCode)? {
            Binding::Hash(hook) => Some(hook),
            _ => None,
        }
    }

    /// Current `toString` override.
    pub fn describe_hook(&self) -> Option<Arc<dyn DescribeHook>> {
        match self.lookup(Slot::ToString)? {
            Binding::Describe(hook) => Some(hook),
            _ => None,
        }
    }

    /// Current `clone` override.
    pub fn clone_hook(&self) -> Option<Arc<dyn CloneHook>> {
        match self.lookup(Slot::Clone)? {
            Binding::Clone(hook) => Some(hook),
            _ => None,
        }
    }

    fn cell(&self, slot: Slot) -> &ArcSwapOption<Binding> {
        &self.slots[slot.index()]
    }
}

// ---------------------------------------------------------------------------
// Global instance
// ---------------------------------------------------------------------------

/// Initializer run against the global table.
pub type Initializer = Box<dyn FnOnce(&BindingTable) + Send>;

struct PendingInit {
    installed: Option<Arc<BindingTable>>,
    queue: Vec<Initializer>,
}

static GLOBAL: OnceLock<Arc<BindingTable>> = OnceLock::new();
static GLOBAL_NAMESPACE: OnceLock<SlotNamespace> = OnceLock::new();
static PENDING: Mutex<PendingInit> = Mutex::new(PendingInit {
    installed: None,
    queue: Vec::new(),
});

/// The process-wide binding table used by `CloudEventsFunction::new`.
///
/// Created on first call, at which point every initializer registered so
/// far runs exactly once, in registration order. An initializer that
/// registers another initializer queues it behind the ones already waiting.
/// Initializers receive the table as an argument and must not call `global`
/// themselves.
pub fn global() -> Arc<BindingTable> {
    Arc::clone(GLOBAL.get_or_init(|| {
        let namespace = GLOBAL_NAMESPACE.get().cloned().unwrap_or_default();
        let table = Arc::new(BindingTable::with_namespace(namespace));
        let mut ran: usize = 0;
        loop {
            let queued = {
                let mut pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
                if pending.queue.is_empty() {
                    pending.installed = Some(Arc::clone(&table));
                    break;
                }
                std::mem::take(&mut pending.queue)
            };
            ran = ran.saturating_add(queued.len());
            for init in queued {
                init(&table);
            }
        }
        debug!(initializers = ran, "initialised global binding table");
        table
    }))
}

/// Run `init` against the global table.
///
/// Until the table exists and its queued initializers have finished, the
/// initializer is queued; afterwards it runs immediately on the calling
/// thread.
pub fn register_initializer(init: impl FnOnce(&BindingTable) + Send + 'static) {
    let installed = {
        let mut pending = PENDING.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.installed.is_none() {
            pending.queue.push(Box::new(init));
            return;
        }
        pending.installed.clone()
    };
    if let Some(table) = installed {
        init(&table);
    }
}

/// Choose the namespace of the global table.
///
/// Only effective before the first call to [`global`]; returns `false` and
/// logs a warning otherwise.
pub fn set_global_namespace(namespace: SlotNamespace) -> bool {
    if GLOBAL.get().is_some() {
        warn!("global binding table already initialised, namespace unchanged");
        return false;
    }
    GLOBAL_NAMESPACE.set(namespace).is_ok()
}
