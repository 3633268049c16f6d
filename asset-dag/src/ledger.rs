//! Main ledger orchestration layer
//!
//! This module ties together the DAG, the ownership projection and the
//! snapshot store into the API adapters call.
//!
//! All mutations go through one write lock: choose references, build the
//! node, validate, insert, write the snapshot. If the snapshot write fails
//! the insertion is reverted before the lock is released, so memory and
//! disk never disagree about an admitted node. Queries take the read lock
//! and run concurrently.
//!
//! # Example
//!
//! ```no_run
//! use asset_dag::{AssetId, Ledger, Payload, UserId};
//!
//! fn main() -> asset_dag::Result<()> {
//!     let ledger = Ledger::create_or_load("./data/asset_dag.json")?;
//!
//!     let asset = AssetId::new("ASSET001");
//!     ledger.register(&asset, &UserId::new("USER001"), Payload::new())?;
//!     ledger.transfer(&asset, &UserId::new("USER001"), &UserId::new("USER002"))?;
//!
//!     assert!(ledger.current_owner_check(&asset, &UserId::new("USER002")));
//!     Ok(())
//! }
//! ```

use crate::{
    dag::Dag,
    error::{Error, Result},
    metrics::Metrics,
    node::Node,
    ownership,
    storage::SnapshotStore,
    types::{
        Action, AssetId, LedgerStats, NodeId, OwnershipRecord, Payload, UserId, RECIPIENT_KEY,
        STAKING_AMOUNT_KEY,
    },
    Config,
};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Main ledger interface
pub struct Ledger {
    /// Node set and tips
    dag: RwLock<Dag>,

    /// Snapshot file
    store: SnapshotStore,

    /// Optional Prometheus collector
    metrics: Option<Metrics>,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration, loading the snapshot if present
    pub fn open(config: Config) -> Result<Self> {
        let store = SnapshotStore::new(config.snapshot_path.clone(), &config.storage);

        let dag = match store.load()? {
            Some(snapshot) => snapshot.into_dag(),
            None => Dag::new(),
        };

        tracing::info!(
            path = %store.path().display(),
            nodes = dag.len(),
            tips = dag.tips().len(),
            "Ledger opened"
        );

        Ok(Self {
            dag: RwLock::new(dag),
            store,
            metrics: None,
            config,
        })
    }

    /// Open the ledger backed by `path` with default settings
    pub fn create_or_load(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(Config::with_snapshot_path(path))
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        metrics.update_sizes(&self.dag.read().stats());
        self.metrics = Some(metrics);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshot location
    pub fn snapshot_path(&self) -> &Path {
        self.store.path()
    }

    // Mutations

    /// Register a new asset owned by `actor_id`
    pub fn register(&self, asset_id: &AssetId, actor_id: &UserId, metadata: Payload) -> Result<NodeId> {
        self.submit(asset_id, Action::Register, actor_id, metadata)
    }

    /// Transfer an asset from its current owner to `to_user`
    pub fn transfer(&self, asset_id: &AssetId, from_user: &UserId, to_user: &UserId) -> Result<NodeId> {
        let mut payload = Payload::new();
        payload.insert(RECIPIENT_KEY.to_string(), to_user.as_str().into());

        self.submit(asset_id, Action::Transfer, from_user, payload)
    }

    /// Stake an asset; only its current owner may
    pub fn stake(&self, asset_id: &AssetId, actor_id: &UserId, amount: u64) -> Result<NodeId> {
        let mut payload = Payload::new();
        payload.insert(STAKING_AMOUNT_KEY.to_string(), amount.into());

        self.submit(asset_id, Action::Stake, actor_id, payload)
    }

    /// Build a node on fresh references and admit it
    pub fn submit(
        &self,
        asset_id: &AssetId,
        action: Action,
        actor_id: &UserId,
        payload: Payload,
    ) -> Result<NodeId> {
        let mut dag = self.dag.write();

        let references = dag.choose_references();
        tracing::debug!(?references, %asset_id, %action, "References chosen");

        let node = Node::new(asset_id.clone(), action, actor_id.clone(), references, payload);
        self.admit_locked(&mut dag, node)
    }

    /// Admit a node built by the caller (see [`Ledger::choose_references`])
    pub fn admit(&self, node: Node) -> Result<NodeId> {
        let mut dag = self.dag.write();
        self.admit_locked(&mut dag, node)
    }

    fn admit_locked(&self, dag: &mut Dag, node: Node) -> Result<NodeId> {
        let started = Instant::now();
        let action = node.action();
        let asset_id = node.asset_id().clone();
        let actor_id = node.actor_id().clone();

        let admission = match dag.admit(node) {
            Ok(admission) => admission,
            Err(rejection) => {
                tracing::warn!(
                    %asset_id,
                    %action,
                    actor = %actor_id,
                    reason = rejection.kind(),
                    "Node rejected: {}",
                    rejection
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejection(rejection.kind());
                }
                return Err(rejection.into());
            }
        };
        let node_id = admission.node_id();

        if let Err(e) = self.store.save(dag) {
            let reverted = dag.revert(admission);
            tracing::error!(
                %node_id,
                %asset_id,
                reverted,
                "Snapshot write failed, admission rolled back: {}",
                e
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_snapshot_failure();
            }
            return Err(e);
        }

        tracing::info!(%node_id, %asset_id, %action, actor = %actor_id, "Node admitted");

        if let Some(metrics) = &self.metrics {
            metrics.record_admission(action);
            metrics.record_admit_duration(started.elapsed().as_secs_f64());
            metrics.update_sizes(&dag.stats());
        }

        Ok(node_id)
    }

    // Queries

    /// Parents a new node would get right now
    pub fn choose_references(&self) -> Vec<NodeId> {
        self.dag.read().choose_references()
    }

    /// Ownership changes for an asset, oldest first
    pub fn ownership_history(&self, asset_id: &AssetId) -> Vec<OwnershipRecord> {
        ownership::ownership_history(&self.dag.read(), asset_id)
    }

    /// Current owner of an asset
    pub fn current_owner(&self, asset_id: &AssetId) -> Option<UserId> {
        ownership::current_owner(&self.dag.read(), asset_id)
    }

    /// Whether `user_id` currently owns the asset
    pub fn current_owner_check(&self, asset_id: &AssetId, user_id: &UserId) -> bool {
        ownership::is_current_owner(&self.dag.read(), asset_id, user_id)
    }

    /// Assets currently owned by a user
    pub fn assets_owned_by(&self, user_id: &UserId) -> BTreeSet<AssetId> {
        ownership::assets_owned_by(&self.dag.read(), user_id)
    }

    /// Total staked by a user, across all stakes ever made
    pub fn staking_balance(&self, user_id: &UserId) -> u64 {
        ownership::staking_balance(&self.dag.read(), user_id)
    }

    /// Metadata recorded when the asset was registered
    pub fn asset_metadata(&self, asset_id: &AssetId) -> Option<Payload> {
        ownership::asset_metadata(&self.dag.read(), asset_id).cloned()
    }

    /// Check references and content hashes of every stored node
    pub fn verify_integrity(&self) -> Result<()> {
        let dag = self.dag.read();

        match dag.verify_integrity() {
            Ok(()) => {
                tracing::debug!(nodes = dag.len(), "DAG integrity verified");
                Ok(())
            }
            Err(violation) => {
                tracing::warn!(
                    node_id = %violation.node_id(),
                    reason = violation.kind(),
                    "Integrity check failed: {}",
                    violation
                );
                Err(Error::Integrity(violation))
            }
        }
    }

    /// Counts over the stored DAG
    pub fn stats(&self) -> LedgerStats {
        self.dag.read().stats()
    }

    /// Node by id
    pub fn get_node(&self, node_id: &NodeId) -> Option<Node> {
        self.dag.read().get(node_id).cloned()
    }

    /// Every node for an asset, admission order
    pub fn asset_nodes(&self, asset_id: &AssetId) -> Vec<Node> {
        self.dag.read().asset_nodes(asset_id).cloned().collect()
    }

    /// Every node a user initiated, admission order
    pub fn user_nodes(&self, user_id: &UserId) -> Vec<Node> {
        self.dag
            .read()
            .nodes()
            .iter()
            .filter(|n| n.actor_id() == user_id)
            .cloned()
            .collect()
    }

    /// Current tip ids
    pub fn tips(&self) -> Vec<NodeId> {
        self.dag.read().tips().iter().copied().collect()
    }

    /// Current tip nodes
    pub fn tip_nodes(&self) -> Vec<Node> {
        let dag = self.dag.read();
        dag.tips()
            .iter()
            .filter_map(|id| dag.get(id).cloned())
            .collect()
    }

    /// Number of stored nodes
    pub fn len(&self) -> usize {
        self.dag.read().len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.dag.read().is_empty()
    }

    /// Text listing of the DAG
    pub fn render(&self) -> String {
        self.dag.read().render()
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("snapshot_path", &self.store.path())
            .field("nodes", &self.len())
            .finish_non_exhaustive()
    }
}
