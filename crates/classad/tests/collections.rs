//! Integration tests for collections and multi-membership.

mod common;

use classad::eval::Evaluator;
use classad::{AdStore, AggregateOp, ClassAdError, Collection, Value};
use common::{init_tracing, record_from};

#[test]
fn test_multi_membership() {
    init_tracing();
    let mut store = AdStore::new();
    let id = store.insert(record_from("Name = \"slot1\"\nCpus = 8"));
    let mut idle = Collection::new();
    let mut claimed = Collection::new();

    idle.insert(&mut store, id).unwrap();
    claimed.insert(&mut store, id).unwrap();
    idle.delete(&mut store, id).unwrap();

    // Still reachable, unchanged, through the second collection.
    let (rhs, owner) = claimed.lookup(&store, "Cpus").unwrap().unwrap();
    assert_eq!(owner, id);
    assert_eq!(
        Evaluator::new(&claimed.view(&store)).eval(rhs),
        Value::Integer(8)
    );
    assert_eq!(store.get(id).unwrap().len(), 2);

    claimed.delete(&mut store, id).unwrap();
    assert!(matches!(store.get(id), Err(ClassAdError::DanglingRecord(_))));
    assert!(matches!(
        claimed.insert(&mut store, id),
        Err(ClassAdError::DanglingRecord(_))
    ));
}

#[test]
fn test_collection_context_uses_first_member() {
    let mut store = AdStore::new();
    let mut pool = Collection::new();
    for text in ["Name = \"a\"", "Name = \"b\"\nMemory = 512", "Memory = 1024"] {
        let id = store.insert(record_from(text));
        pool.insert(&mut store, id).unwrap();
    }

    let view = pool.view(&store);
    let eval = Evaluator::new(&view);
    assert_eq!(eval.eval_attribute("Name"), Value::from("a"));
    assert_eq!(eval.eval_attribute("Memory"), Value::Integer(512));
    assert_eq!(eval.eval_attribute("Disk"), Value::Undefined);
}

#[test]
fn test_members_chained_to_a_template() {
    let mut store = AdStore::new();
    let template = store.insert(record_from("Cpus = 1"));
    let mut pool = Collection::new().with_default_kind(AggregateOp::AggAdd);

    for text in ["Name = \"a\"", "Name = \"b\"\nCpus = 4"] {
        let id = store.insert(record_from(text));
        store.chain_to(id, template).unwrap();
        pool.insert(&mut store, id).unwrap();
    }

    assert_eq!(pool.aggregate_value(&store, "Cpus"), Some(Value::Integer(5)));
}

#[test]
fn test_aggregate_kinds() {
    let mut store = AdStore::new();
    let mut pool = Collection::new();
    for text in ["Arch = \"X86_64\", Load = 0.5", "Arch = \"X86_64\", Load = 1"] {
        let id = store.insert(record_from(text));
        pool.insert(&mut store, id).unwrap();
    }

    assert_eq!(pool.aggregate_kind("load"), AggregateOp::AggEq);
    assert_eq!(pool.aggregate_value(&store, "Load"), Some(Value::Null));
    assert_eq!(pool.aggregate_value(&store, "Arch"), Some(Value::from("X86_64")));

    pool.set_aggregate_kind(&store, "Load", AggregateOp::AggAdd)
        .unwrap();
    assert_eq!(pool.aggregate_value(&store, "Load"), Some(Value::Float(1.5)));
}

#[test]
fn test_cursor_sees_every_member() {
    let mut store = AdStore::new();
    let mut pool = Collection::new();
    for n in 0..5 {
        let id = store.insert(record_from(&format!("Slot = {}", n)));
        pool.insert(&mut store, id).unwrap();
    }

    let slots: Vec<i64> = pool
        .cursor(&store)
        .map(|ad| {
            let ad = ad.unwrap();
            classad::Scope::lookup_integer(&ad, "Slot").unwrap()
        })
        .collect();
    assert_eq!(slots, vec![0, 1, 2, 3, 4]);
}
