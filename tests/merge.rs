//! Shard merge scenarios against the in-memory store.

use serde_json::json;

use brokerstate::reconcile::{self, ReconcileError};
use brokerstate::store::{DryRun, MemoryStore, StateStore, StoreCall};

const PROJECT: &str = "proj-1";

/// Two state shards plus one unrelated shard; values x,y in the first and
/// z in the second.
fn duplicated_store() -> (MemoryStore, String, String) {
    let store = MemoryStore::new();
    let a = store.add_shard("broker-state");
    let b = store.add_shard("broker-state");
    let other = store.add_shard("unrelated-app");
    store.put_value(&a, "x", json!({ "plan_id": "p-x" }));
    store.put_value(&a, "y", json!({ "plan_id": "p-y" }));
    store.put_value(&b, "z", json!({ "plan_id": "p-z" }));
    store.put_value(&other, "x", json!({ "unrelated": true }));
    (store, a, b)
}

#[test]
fn merge_consolidates_all_values_into_the_target() {
    let (store, a, b) = duplicated_store();
    let backup_dir = tempfile::tempdir().expect("tempdir");

    let report =
        reconcile::merge_shards(&store, PROJECT, backup_dir.path()).expect("merge succeeds");

    // Smallest shard id wins, regardless of listing order.
    assert_eq!(report.target.as_deref(), Some(a.as_str()));
    assert_eq!(report.migrated_values, 1);
    assert_eq!(report.deleted_shards, 1);

    for name in ["x", "y", "z"] {
        assert!(
            store.value_by_name(&a, name).is_some(),
            "value {name} must live in the target"
        );
    }
    let remaining = store.shard_ids();
    assert!(!remaining.contains(&b), "source shard must be deleted");
    assert_eq!(remaining.len(), 2, "target and the unrelated shard remain");

    let backup = report.backup_path.expect("backup written");
    assert!(backup.exists(), "backup snapshot must exist on disk");
    let snapshot = brokerstate::backup::Snapshot::load(&backup).expect("load backup");
    assert_eq!(snapshot.len(), 3, "backup covers every state value");
}

#[test]
fn colliding_value_names_abort_before_any_mutation() {
    let store = MemoryStore::new();
    let a = store.add_shard("broker-state");
    let b = store.add_shard("broker-state");
    store.put_value(&a, "x", json!({ "plan_id": "in-a" }));
    store.put_value(&b, "x", json!({ "plan_id": "in-b" }));
    let backup_dir = tempfile::tempdir().expect("tempdir");

    let err = reconcile::merge_shards(&store, PROJECT, backup_dir.path())
        .expect_err("collision must abort");

    match err {
        ReconcileError::Collision {
            name,
            existing_shard,
            duplicate_shard,
            ..
        } => {
            assert_eq!(name, "x");
            assert_eq!(existing_shard, a);
            assert_eq!(duplicate_shard, b);
        }
        other => panic!("expected collision, got {other}"),
    }

    assert!(
        store.calls().is_empty(),
        "no mutation may be issued on collision"
    );
    assert!(store.shard_ids().contains(&b), "source shard must survive");
}

#[test]
fn single_state_shard_is_a_terminal_no_op() {
    let store = MemoryStore::new();
    let a = store.add_shard("broker-state");
    store.put_value(&a, "x", json!({ "plan_id": "p" }));
    let backup_dir = tempfile::tempdir().expect("tempdir");

    let report = reconcile::merge_shards(&store, PROJECT, backup_dir.path()).expect("no-op");

    assert_eq!(report.state_shards, 1);
    assert!(report.target.is_none());
    assert!(report.backup_path.is_none(), "no backup for a no-op");
    assert!(store.calls().is_empty());
}

#[test]
fn dry_run_plans_the_same_operations_a_live_run_applies() {
    let (live_store, _, _) = duplicated_store();
    let (rehearsal_store, _, _) = duplicated_store();
    let live_dir = tempfile::tempdir().expect("tempdir");
    let dry_dir = tempfile::tempdir().expect("tempdir");

    reconcile::merge_shards(&live_store, PROJECT, live_dir.path()).expect("live merge");

    let dry = DryRun::new(rehearsal_store);
    let dry_report = reconcile::merge_shards(&dry, PROJECT, dry_dir.path()).expect("dry merge");

    // The local snapshot is written in a dry run too: it is not a store
    // mutation and makes the rehearsal comparable with a live run.
    let dry_backup = dry_report.backup_path.expect("dry run writes a backup");
    assert!(dry_backup.exists());

    let live_ops: Vec<(String, String, String)> = live_store
        .calls()
        .into_iter()
        .map(|call| match call {
            StoreCall::CreateValue { shard, name } => ("create".to_string(), shard, name),
            StoreCall::DeleteValue { shard, value } => ("delete".to_string(), shard, value),
            StoreCall::DeleteShard { shard } => ("delete_shard".to_string(), shard, String::new()),
        })
        .collect();
    let planned_ops: Vec<(String, String, String)> = dry
        .planned()
        .into_iter()
        .map(|op| match op {
            brokerstate::store::PlannedOp::CreateValue { shard, name } => {
                ("create".to_string(), shard, name)
            }
            brokerstate::store::PlannedOp::DeleteValue { shard, value } => {
                ("delete".to_string(), shard, value)
            }
            brokerstate::store::PlannedOp::DeleteShard { shard } => {
                ("delete_shard".to_string(), shard, String::new())
            }
        })
        .collect();

    assert_eq!(planned_ops, live_ops, "dry run must plan the live sequence");
    assert!(
        dry.inner().calls().is_empty(),
        "dry run must not mutate the store"
    );

    // Reads still happen for real: the rehearsal store is untouched.
    let shards = dry.inner().list_shards(PROJECT).expect("list");
    assert_eq!(shards.len(), 3);
}
