//! Ownership projection
//!
//! Read-only functions that replay an asset's events into its ownership
//! history and derive current owner, owned assets and staking balance.
//!
//! Every query rescans the relevant nodes. `assets_owned_by` replays every
//! asset, so it grows with assets × nodes-per-asset; fine at the scale this
//! ledger targets, not beyond.

use crate::{
    dag::Dag,
    node::Node,
    types::{Action, AssetId, OwnershipRecord, Payload, UserId},
};
use std::collections::BTreeSet;

/// Ownership changes for an asset, oldest first.
///
/// Nodes are ordered by timestamp; equal timestamps keep admission order.
/// `Register` sets the owner to its actor, `Transfer` (with a recipient)
/// to the recipient; `Stake` nodes are skipped.
pub fn ownership_history(dag: &Dag, asset_id: &AssetId) -> Vec<OwnershipRecord> {
    let mut nodes: Vec<&Node> = dag.asset_nodes(asset_id).collect();
    nodes.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));

    nodes
        .into_iter()
        .filter_map(|node| {
            let owner = match node.action() {
                Action::Register => node.actor_id().clone(),
                Action::Transfer => node.recipient()?,
                Action::Stake => return None,
            };
            Some(OwnershipRecord {
                owner,
                timestamp: node.timestamp(),
                node_id: node.node_id(),
                action: node.action(),
            })
        })
        .collect()
}

/// Owner after replaying the whole history
pub fn current_owner(dag: &Dag, asset_id: &AssetId) -> Option<UserId> {
    ownership_history(dag, asset_id)
        .pop()
        .map(|record| record.owner)
}

/// Whether `user_id` currently owns the asset
pub fn is_current_owner(dag: &Dag, asset_id: &AssetId, user_id: &UserId) -> bool {
    current_owner(dag, asset_id).as_ref() == Some(user_id)
}

/// Assets whose current owner is `user_id`
pub fn assets_owned_by(dag: &Dag, user_id: &UserId) -> BTreeSet<AssetId> {
    dag.asset_ids()
        .filter(|asset_id| is_current_owner(dag, asset_id, user_id))
        .cloned()
        .collect()
}

/// Sum of staked amounts over the user's stake nodes.
///
/// Counts every stake the user ever made, including on assets they have
/// since transferred away.
pub fn staking_balance(dag: &Dag, user_id: &UserId) -> u64 {
    dag.nodes()
        .iter()
        .filter(|n| n.action() == Action::Stake && n.actor_id() == user_id)
        .fold(0u64, |total, n| total.saturating_add(n.staking_amount()))
}

/// Payload of the asset's register node
pub fn asset_metadata<'a>(dag: &'a Dag, asset_id: &AssetId) -> Option<&'a Payload> {
    dag.asset_nodes(asset_id)
        .find(|n| n.action() == Action::Register)
        .map(|n| n.payload())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeId, RECIPIENT_KEY, STAKING_AMOUNT_KEY};
    use serde_json::json;

    fn node(asset: &str, action: Action, actor: &str, payload: Payload, ts: f64) -> Node {
        Node::with_timestamp(
            AssetId::new(asset),
            action,
            UserId::new(actor),
            vec![],
            payload,
            ts,
        )
    }

    fn recipient(to: &str) -> Payload {
        [(RECIPIENT_KEY.to_string(), json!(to))].into_iter().collect()
    }

    fn dag_of(nodes: Vec<Node>) -> Dag {
        let tips: Vec<NodeId> = nodes.iter().map(|n| n.node_id()).collect();
        Dag::from_parts(nodes, tips)
    }

    #[test]
    fn test_history_replays_in_timestamp_order() {
        // Admission order differs from timestamp order
        let dag = dag_of(vec![
            node("A1", Action::Transfer, "U2", recipient("U3"), 30.0),
            node("A1", Action::Register, "U1", Payload::new(), 10.0),
            node("A1", Action::Stake, "U2", Payload::new(), 25.0),
            node("A1", Action::Transfer, "U1", recipient("U2"), 20.0),
        ]);

        let history = ownership_history(&dag, &AssetId::new("A1"));
        let owners: Vec<&str> = history.iter().map(|r| r.owner.as_str()).collect();
        assert_eq!(owners, vec!["U1", "U2", "U3"]);
        assert_eq!(current_owner(&dag, &AssetId::new("A1")), Some(UserId::new("U3")));
    }

    #[test]
    fn test_history_ties_keep_admission_order() {
        let dag = dag_of(vec![
            node("A1", Action::Register, "U1", Payload::new(), 5.0),
            node("A1", Action::Transfer, "U1", recipient("U2"), 7.0),
            node("A1", Action::Transfer, "U2", recipient("U3"), 7.0),
        ]);
        assert_eq!(current_owner(&dag, &AssetId::new("A1")), Some(UserId::new("U3")));
    }

    #[test]
    fn test_transfer_without_recipient_is_skipped() {
        let dag = dag_of(vec![
            node("A1", Action::Register, "U1", Payload::new(), 1.0),
            node("A1", Action::Transfer, "U1", Payload::new(), 2.0),
        ]);
        let history = ownership_history(&dag, &AssetId::new("A1"));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, Action::Register);
    }

    #[test]
    fn test_unknown_asset() {
        let dag = Dag::new();
        assert!(ownership_history(&dag, &AssetId::new("nope")).is_empty());
        assert_eq!(current_owner(&dag, &AssetId::new("nope")), None);
        assert!(!is_current_owner(&dag, &AssetId::new("nope"), &UserId::new("U1")));
    }

    #[test]
    fn test_assets_owned_by() {
        let dag = dag_of(vec![
            node("A1", Action::Register, "U1", Payload::new(), 1.0),
            node("A2", Action::Register, "U1", Payload::new(), 2.0),
            node("A3", Action::Register, "U2", Payload::new(), 3.0),
            node("A1", Action::Transfer, "U1", recipient("U2"), 4.0),
        ]);

        let u1: Vec<String> = assets_owned_by(&dag, &UserId::new("U1"))
            .into_iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(u1, vec!["A2"]);
        assert_eq!(assets_owned_by(&dag, &UserId::new("U2")).len(), 2);
        assert!(assets_owned_by(&dag, &UserId::new("U9")).is_empty());
    }

    #[test]
    fn test_staking_balance_survives_transfer() {
        let amount = |n: u64| -> Payload {
            [(STAKING_AMOUNT_KEY.to_string(), json!(n))].into_iter().collect()
        };
        let dag = dag_of(vec![
            node("A1", Action::Register, "U1", Payload::new(), 1.0),
            node("A1", Action::Stake, "U1", amount(3), 2.0),
            node("A1", Action::Stake, "U1", Payload::new(), 3.0),
            node("A1", Action::Transfer, "U1", recipient("U2"), 4.0),
            node("A1", Action::Stake, "U2", amount(5), 5.0),
        ]);

        assert_eq!(staking_balance(&dag, &UserId::new("U1")), 4);
        assert_eq!(staking_balance(&dag, &UserId::new("U2")), 5);
        assert_eq!(staking_balance(&dag, &UserId::new("U3")), 0);
    }

    #[test]
    fn test_asset_metadata() {
        let meta: Payload = [("name".to_string(), json!("Sculpture"))].into_iter().collect();
        let dag = dag_of(vec![
            node("A1", Action::Register, "U1", meta.clone(), 1.0),
            node("A1", Action::Transfer, "U1", recipient("U2"), 2.0),
        ]);
        assert_eq!(asset_metadata(&dag, &AssetId::new("A1")), Some(&meta));
        assert_eq!(asset_metadata(&dag, &AssetId::new("A2")), None);
    }
}
