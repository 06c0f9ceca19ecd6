//! Tests for bind / unbind / lookup on `BindingTable`.

use std::sync::Arc;

use injest::bindings::{Binding, BindingTable};
use injest::{CloudEventsFunction, Slot, SlotNamespace};

fn every_slot_binding() -> Vec<Binding> {
    vec![
        Binding::equals_with(|_, _| true),
        Binding::describe_with(|_| "bound".to_owned()),
        Binding::hash_with(|_| 42),
        Binding::clone_with(|f| Ok(f.shallow_copy())),
        Binding::accept_with(|_, _| Ok(())),
    ]
}

#[test]
fn lookup_returns_what_was_bound() {
    let table = BindingTable::new();
    for binding in every_slot_binding() {
        let slot = binding.slot();
        table.bind(binding.clone());
        let found = table.lookup(slot).expect("slot should be bound");
        assert!(found.ptr_eq(&binding), "lookup({slot}) returned another binding");
    }
    assert_eq!(table.bound_slots(), Slot::ALL.to_vec());
}

#[test]
fn unbind_returns_slot_to_absent() {
    let table = BindingTable::new();
    for binding in every_slot_binding() {
        let slot = binding.slot();
        table.bind(binding);
        assert!(table.unbind(slot).is_some());
        assert!(table.lookup(slot).is_none(), "{slot} should be unbound");
    }
}

#[test]
fn unbind_of_unbound_slot_is_a_no_op() {
    let table = BindingTable::new();
    assert!(table.unbind(Slot::Accept).is_none());
    assert!(!table.is_bound(Slot::Accept));
}

#[test]
fn last_bind_wins() {
    let table = BindingTable::new();
    let first = Binding::hash_with(|_| 1);
    let second = Binding::hash_with(|_| 2);
    table.bind(first.clone());
    table.bind(second.clone());

    let found = table.lookup(Slot::HashCode).expect("bound");
    assert!(found.ptr_eq(&second));
    assert!(!found.ptr_eq(&first));
}

#[test]
fn bindings_are_shared_across_adapters() {
    let table = Arc::new(BindingTable::new());
    let a = CloudEventsFunction::with_bindings(Arc::clone(&table));
    let b = CloudEventsFunction::with_bindings(Arc::clone(&table));

    table.bind(Binding::describe_with(|_| "shared".to_owned()));

    assert_eq!(a.describe(), "shared");
    assert_eq!(b.describe(), "shared");
}

#[test]
fn binding_after_construction_is_observed() {
    let table = Arc::new(BindingTable::new());
    let function = CloudEventsFunction::with_bindings(Arc::clone(&table));
    let before = function.hash_code();

    table.bind(Binding::hash_with(|_| 99));
    assert_eq!(function.hash_code(), 99);

    table.unbind(Slot::HashCode);
    assert_eq!(function.hash_code(), before);
}

#[test]
fn namespace_flows_into_qualified_names() {
    let table = BindingTable::with_namespace(SlotNamespace::new("clinvar", "Ingest"));
    assert_eq!(table.namespace().qualify(Slot::Clone), "clinvar/Ingest-clone");
}
