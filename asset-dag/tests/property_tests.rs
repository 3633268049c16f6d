//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify:
//! - Replay: the current owner follows any valid transfer chain
//! - Tips: always exactly the nodes nobody references
//! - Rejection leaves state untouched (non-owner moves, double registration)
//! - Nodes survive a JSON round trip with their hash intact

use asset_dag::{
    types::{RECIPIENT_KEY, STAKING_AMOUNT_KEY},
    Action, AssetId, Dag, Ledger, Node, NodeId, Payload, UserId,
};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;

/// Strategy for generating user IDs
fn user_strategy() -> impl Strategy<Value = UserId> {
    "U[0-9]{1,2}".prop_map(UserId::new)
}

/// Strategy for generating asset IDs
fn asset_strategy() -> impl Strategy<Value = AssetId> {
    "A[0-9]{1,2}".prop_map(AssetId::new)
}

/// Strategy for generating small payloads
fn payload_strategy() -> impl Strategy<Value = Payload> {
    prop::collection::btree_map(
        "[a-z_]{1,8}",
        prop_oneof![
            any::<i64>().prop_map(|v| json!(v)),
            "[ -~]{0,16}".prop_map(|v| json!(v)),
            any::<bool>().prop_map(|v| json!(v)),
        ],
        0..4,
    )
}

/// One step of a random workload
#[derive(Debug, Clone)]
enum Op {
    Register(AssetId, UserId),
    Transfer(AssetId, UserId, UserId),
    Stake(AssetId, UserId, u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (asset_strategy(), user_strategy()).prop_map(|(a, u)| Op::Register(a, u)),
        (asset_strategy(), user_strategy(), user_strategy()).prop_map(|(a, f, t)| Op::Transfer(a, f, t)),
        (asset_strategy(), user_strategy(), 0u64..100).prop_map(|(a, u, n)| Op::Stake(a, u, n)),
    ]
}

fn build_node(dag: &Dag, op: &Op) -> Node {
    let references = dag.choose_references();
    match op {
        Op::Register(asset, user) => {
            Node::new(asset.clone(), Action::Register, user.clone(), references, Payload::new())
        }
        Op::Transfer(asset, from, to) => Node::new(
            asset.clone(),
            Action::Transfer,
            from.clone(),
            references,
            [(RECIPIENT_KEY.to_string(), json!(to.as_str()))].into_iter().collect(),
        ),
        Op::Stake(asset, user, amount) => Node::new(
            asset.clone(),
            Action::Stake,
            user.clone(),
            references,
            [(STAKING_AMOUNT_KEY.to_string(), json!(amount))].into_iter().collect(),
        ),
    }
}

/// Nodes that no stored node references
fn unreferenced(dag: &Dag) -> BTreeSet<NodeId> {
    let referenced: BTreeSet<NodeId> = dag
        .nodes()
        .iter()
        .flat_map(|n| n.references().iter().copied())
        .collect();
    dag.nodes()
        .iter()
        .map(|n| n.node_id())
        .filter(|id| !referenced.contains(id))
        .collect()
}

/// Create test ledger with temp directory
fn create_test_ledger() -> (Ledger, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::create_or_load(temp_dir.path().join("dag.json")).unwrap();
    (ledger, temp_dir)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: after a chain of transfers the last recipient owns the asset,
    /// and transfers attempted by anyone else change nothing
    #[test]
    fn prop_current_owner_follows_transfer_chain(
        first in user_strategy(),
        chain in prop::collection::vec((user_strategy(), user_strategy()), 1..12),
    ) {
        let (ledger, _temp) = create_test_ledger();
        let asset = AssetId::new("ASSET001");
        ledger.register(&asset, &first, Payload::new()).unwrap();

        let mut owner = first;
        let mut expected_history = vec![owner.clone()];

        for (actor, recipient) in chain {
            let len_before = ledger.len();
            let tips_before = ledger.tips();

            let result = ledger.transfer(&asset, &actor, &recipient);
            if actor == owner {
                prop_assert!(result.is_ok());
                owner = recipient;
                expected_history.push(owner.clone());
            } else {
                let err = result.unwrap_err();
                prop_assert_eq!(err.rejection().map(|r| r.kind()), Some("not-current-owner"));
                prop_assert_eq!(ledger.len(), len_before);
                prop_assert_eq!(ledger.tips(), tips_before.clone());

                // Staking is refused to the same non-owner
                let err = ledger.stake(&asset, &actor, 1).unwrap_err();
                prop_assert_eq!(err.rejection().map(|r| r.kind()), Some("not-current-owner"));
                prop_assert_eq!(ledger.len(), len_before);
                prop_assert_eq!(ledger.tips(), tips_before);
                prop_assert_eq!(ledger.staking_balance(&actor), 0);
            }
            prop_assert_eq!(ledger.current_owner(&asset), Some(owner.clone()));
        }

        let history: Vec<UserId> = ledger
            .ownership_history(&asset)
            .into_iter()
            .map(|r| r.owner)
            .collect();
        prop_assert_eq!(history, expected_history);
        prop_assert!(ledger.current_owner_check(&asset, &owner));
        prop_assert!(ledger.assets_owned_by(&owner).contains(&asset));
    }

    /// Property: tips are exactly the unreferenced nodes after any workload
    #[test]
    fn prop_tips_are_unreferenced_nodes(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut dag = Dag::new();

        for op in &ops {
            let node = build_node(&dag, op);
            let references = node.references().to_vec();
            let before = dag.len();

            match dag.admit(node) {
                Ok(_) => {
                    prop_assert_eq!(dag.len(), before + 1);
                    prop_assert!(references.len() <= 2);
                    for r in &references {
                        prop_assert!(!dag.tips().contains(r));
                    }
                }
                Err(_) => prop_assert_eq!(dag.len(), before),
            }

            prop_assert_eq!(dag.tips(), &unreferenced(&dag));
            if !dag.is_empty() {
                prop_assert!(!dag.tips().is_empty());
            }
        }

        prop_assert!(dag.verify_integrity().is_ok());
    }

    /// Property: a second registration is rejected and changes nothing
    #[test]
    fn prop_double_registration_is_noop(
        asset in asset_strategy(),
        first in user_strategy(),
        second in user_strategy(),
        metadata in payload_strategy(),
    ) {
        let (ledger, _temp) = create_test_ledger();
        ledger.register(&asset, &first, metadata.clone()).unwrap();

        let tips = ledger.tips();
        let stats = ledger.stats();

        let err = ledger.register(&asset, &second, Payload::new()).unwrap_err();
        prop_assert_eq!(err.rejection().map(|r| r.kind()), Some("duplicate-registration"));

        prop_assert_eq!(ledger.tips(), tips);
        prop_assert_eq!(ledger.stats(), stats);
        prop_assert_eq!(ledger.current_owner(&asset), Some(first));
        prop_assert_eq!(ledger.asset_metadata(&asset), Some(metadata));
    }

    /// Property: JSON round trip preserves a node and its hash
    #[test]
    fn prop_node_json_round_trip(
        asset in asset_strategy(),
        user in user_strategy(),
        payload in payload_strategy(),
        timestamp in 0.0f64..4_000_000_000.0,
        reference_count in 0usize..3,
    ) {
        let references: Vec<NodeId> = (0..reference_count).map(|_| NodeId::generate()).collect();
        let node = Node::with_timestamp(asset, Action::Register, user, references, payload, timestamp);

        let text = serde_json::to_string(&node).unwrap();
        let decoded: Node = serde_json::from_str(&text).unwrap();

        prop_assert_eq!(&decoded, &node);
        prop_assert!(decoded.verify_hash());
    }

    /// Property: staking balance is the sum of the user's accepted stakes
    #[test]
    fn prop_staking_balance_sums_stakes(amounts in prop::collection::vec(0u64..1_000, 1..10)) {
        let (ledger, _temp) = create_test_ledger();
        let asset = AssetId::new("A1");
        let user = UserId::new("U1");
        ledger.register(&asset, &user, Payload::new()).unwrap();

        for amount in &amounts {
            ledger.stake(&asset, &user, *amount).unwrap();
        }

        prop_assert_eq!(ledger.staking_balance(&user), amounts.iter().sum::<u64>());
        prop_assert_eq!(ledger.staking_balance(&UserId::new("U2")), 0);
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use asset_dag::{spawn_ledger_actor, Config};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_full_asset_lifecycle() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config::with_snapshot_path(temp_dir.path().join("data").join("dag.json"));
        let ledger = Arc::new(Ledger::open(config.clone()).unwrap());
        let handle = spawn_ledger_actor(ledger, config.actor.mailbox_capacity);

        let painting = AssetId::new("ASSET001");
        let mut metadata = Payload::new();
        metadata.insert("name".to_string(), json!("Valuable Painting"));
        metadata.insert("value".to_string(), json!(10000));

        // 1. Register
        handle
            .register(painting.clone(), UserId::new("USER001"), metadata.clone())
            .await
            .unwrap();

        // 2. Transfer
        handle
            .transfer(painting.clone(), UserId::new("USER001"), UserId::new("USER002"))
            .await
            .unwrap();

        // 3. Stake by new owner
        handle
            .stake(painting.clone(), UserId::new("USER002"), 100)
            .await
            .unwrap();

        // 4. Previous owner can no longer move it
        let err = handle
            .transfer(painting.clone(), UserId::new("USER001"), UserId::new("USER003"))
            .await
            .unwrap_err();
        assert_eq!(err.rejection().map(|r| r.kind()), Some("not-current-owner"));

        handle.shutdown().await.unwrap();

        // Reopen from disk
        let reopened = Ledger::open(config).unwrap();
        assert_eq!(reopened.len(), 3);
        assert!(reopened.verify_integrity().is_ok());
        assert_eq!(reopened.current_owner(&painting), Some(UserId::new("USER002")));
        assert_eq!(reopened.staking_balance(&UserId::new("USER002")), 100);
        assert_eq!(reopened.asset_metadata(&painting), Some(metadata));

        let stats = reopened.stats();
        assert_eq!(stats.action_counts.register, 1);
        assert_eq!(stats.action_counts.transfer, 1);
        assert_eq!(stats.action_counts.staking, 1);
        assert_eq!(stats.total_tips, 1);
    }
}
