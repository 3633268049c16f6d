//! In-memory DAG of ledger nodes
//!
//! Owns every admitted [`Node`] and the current tip set. Nodes are kept in
//! admission order (the tie-break for equal timestamps) with an id index and
//! a per-asset index on top; the indices never change observable ordering.
//!
//! # Invariants
//!
//! - Node ids are unique
//! - Every reference resolves to a node admitted earlier
//! - At most one `Register` node per asset (enforced on admission)
//! - `tips` holds exactly the nodes no other admitted node references
//!   (for stores built by admission; loaded snapshots are trusted as-is)

use crate::{
    error::{IntegrityViolation, Rejection},
    node::Node,
    ownership,
    types::{Action, AssetId, LedgerStats, NodeId},
};
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;

/// Maximum parent edges per node
pub const MAX_REFERENCES: usize = 2;

/// Node set plus frontier
#[derive(Debug, Clone, Default)]
pub struct Dag {
    /// Nodes in admission order
    nodes: Vec<Node>,

    /// node_id -> position in `nodes`
    index: HashMap<NodeId, usize>,

    /// asset_id -> positions in `nodes`, ascending
    by_asset: HashMap<AssetId, Vec<usize>>,

    /// Nodes not referenced by any other node
    tips: BTreeSet<NodeId>,
}

/// Undo record for one admission
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an admission must be kept to revert it if persistence fails"]
pub struct Admission {
    node_id: NodeId,
    consumed_tips: Vec<NodeId>,
}

impl Admission {
    /// Id of the admitted node
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }
}

impl Dag {
    /// Empty DAG
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted parts without re-validating anything.
    ///
    /// Nodes keep the given order. A repeated id keeps its first occurrence.
    pub fn from_parts(nodes: Vec<Node>, tips: impl IntoIterator<Item = NodeId>) -> Self {
        let mut dag = Self::new();

        for node in nodes {
            if dag.index.contains_key(&node.node_id()) {
                tracing::warn!(node_id = %node.node_id(), "Duplicate node in snapshot ignored");
                continue;
            }
            dag.insert(node);
        }
        dag.tips = tips.into_iter().collect();

        dag
    }

    /// Number of stored nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node is stored
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node
    pub fn get(&self, node_id: &NodeId) -> Option<&Node> {
        self.index.get(node_id).map(|&i| &self.nodes[i])
    }

    /// Whether a node id is stored
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.index.contains_key(node_id)
    }

    /// All nodes, admission order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Current tip set
    pub fn tips(&self) -> &BTreeSet<NodeId> {
        &self.tips
    }

    /// Nodes for one asset, admission order
    pub fn asset_nodes<'a>(&'a self, asset_id: &AssetId) -> impl Iterator<Item = &'a Node> + 'a {
        self.by_asset
            .get(asset_id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.nodes[i])
    }

    /// Every asset id seen so far
    pub fn asset_ids(&self) -> impl Iterator<Item = &AssetId> {
        self.by_asset.keys()
    }

    /// Whether the asset already has a register node
    pub fn is_registered(&self, asset_id: &AssetId) -> bool {
        self.asset_nodes(asset_id)
            .any(|n| n.action() == Action::Register)
    }

    /// Pick parents for a new node.
    ///
    /// Two distinct tips sampled uniformly when at least two exist,
    /// otherwise every tip there is (zero or one).
    pub fn choose_references(&self) -> Vec<NodeId> {
        let tips: Vec<NodeId> = self.tips.iter().copied().collect();

        if tips.len() < MAX_REFERENCES {
            return tips;
        }

        let mut rng = rand::thread_rng();
        tips.choose_multiple(&mut rng, MAX_REFERENCES)
            .copied()
            .collect()
    }

    /// Admission checks, in order; first failure wins
    pub fn validate(&self, node: &Node) -> Result<(), Rejection> {
        if self.contains(&node.node_id()) {
            return Err(Rejection::DuplicateId(node.node_id()));
        }

        if let Some(missing) = node.references().iter().find(|r| !self.contains(r)) {
            return Err(Rejection::DanglingReference(*missing));
        }

        if node.references().len() > MAX_REFERENCES {
            return Err(Rejection::TooManyReferences(node.references().len()));
        }

        match node.action() {
            Action::Register => {
                if self.is_registered(node.asset_id()) {
                    return Err(Rejection::DuplicateRegistration(node.asset_id().clone()));
                }
            }
            Action::Transfer => {
                self.check_owner(node)?;
                if node.recipient().is_none() {
                    return Err(Rejection::MissingRecipient);
                }
            }
            Action::Stake => {
                self.check_owner(node)?;
            }
        }

        Ok(())
    }

    fn check_owner(&self, node: &Node) -> Result<(), Rejection> {
        let owner = ownership::current_owner(self, node.asset_id())
            .ok_or_else(|| Rejection::AssetNotRegistered(node.asset_id().clone()))?;

        if &owner != node.actor_id() {
            return Err(Rejection::NotCurrentOwner {
                asset_id: node.asset_id().clone(),
                action: node.action().as_str(),
                actor: node.actor_id().clone(),
                owner,
            });
        }

        Ok(())
    }

    /// Validate and insert; on rejection nothing changes
    pub fn admit(&mut self, node: Node) -> Result<Admission, Rejection> {
        self.validate(&node)?;

        let node_id = node.node_id();
        let consumed_tips: Vec<NodeId> = node
            .references()
            .iter()
            .filter(|r| self.tips.remove(*r))
            .copied()
            .collect();

        self.insert(node);
        self.tips.insert(node_id);

        Ok(Admission {
            node_id,
            consumed_tips,
        })
    }

    /// Undo the most recent admission.
    ///
    /// Returns `false` (and changes nothing) if `admission` is not for the
    /// last inserted node.
    pub fn revert(&mut self, admission: Admission) -> bool {
        match self.nodes.last() {
            Some(last) if last.node_id() == admission.node_id => {}
            _ => return false,
        }

        let Some(node) = self.nodes.pop() else {
            return false;
        };
        self.index.remove(&admission.node_id);
        if let Some(positions) = self.by_asset.get_mut(node.asset_id()) {
            positions.pop();
            if positions.is_empty() {
                self.by_asset.remove(node.asset_id());
            }
        }

        self.tips.remove(&admission.node_id);
        self.tips.extend(admission.consumed_tips);

        true
    }

    fn insert(&mut self, node: Node) {
        let position = self.nodes.len();
        self.index.insert(node.node_id(), position);
        self.by_asset
            .entry(node.asset_id().clone())
            .or_default()
            .push(position);
        self.nodes.push(node);
    }

    /// Two passes: every reference resolves, then every hash recomputes.
    ///
    /// Reports the first violation in admission order. Detection only.
    pub fn verify_integrity(&self) -> Result<(), IntegrityViolation> {
        for node in &self.nodes {
            if let Some(missing) = node.references().iter().find(|r| !self.contains(r)) {
                return Err(IntegrityViolation::DanglingReference {
                    node_id: node.node_id(),
                    reference: *missing,
                });
            }
        }

        for node in &self.nodes {
            if !node.verify_hash() {
                return Err(IntegrityViolation::HashMismatch(node.node_id()));
            }
        }

        Ok(())
    }

    /// Node, tip, asset, user and per-action counts
    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats {
            total_nodes: self.nodes.len(),
            total_tips: self.tips.len(),
            unique_assets: self.by_asset.len(),
            ..Default::default()
        };

        let mut users = HashSet::new();
        for node in &self.nodes {
            users.insert(node.actor_id());
            stats.action_counts.record(node.action());
        }
        stats.unique_users = users.len();

        stats
    }

    /// Text listing, oldest first
    pub fn render(&self) -> String {
        if self.nodes.is_empty() {
            return "Empty DAG".to_string();
        }

        let mut sorted: Vec<&Node> = self.nodes.iter().collect();
        sorted.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));

        let mut out = String::new();
        for (i, node) in sorted.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = write!(
                out,
                "{}. [{}] {} - Asset: {} - User: {}",
                i + 1,
                node.node_id().short(),
                node.action(),
                node.asset_id(),
                node.actor_id()
            );
            if !node.references().is_empty() {
                let refs: Vec<String> = node
                    .references()
                    .iter()
                    .map(|r| format!("[{}]", r.short()))
                    .collect();
                let _ = write!(out, " - Refs: {}", refs.join(", "));
            }
        }

        out
    }
}
