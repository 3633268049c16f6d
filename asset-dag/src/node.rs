//! Immutable ledger node
//!
//! A [`Node`] records one asset event. Fields are private and only readable
//! through accessors, so a node cannot change after construction; the
//! content hash is computed last and covers every other persisted field.

use crate::crypto::{self, NodeContent};
use crate::types::{
    now_timestamp, Action, AssetId, NodeId, Payload, UserId, DEFAULT_STAKING_AMOUNT,
    RECIPIENT_KEY, STAKING_AMOUNT_KEY,
};
use serde::{Deserialize, Serialize};

/// A single event in the DAG
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    node_id: NodeId,

    asset_id: AssetId,

    action: Action,

    #[serde(rename = "user_id")]
    actor_id: UserId,

    /// Seconds since Unix epoch, fractional
    timestamp: f64,

    /// Parent edges (0..=2)
    references: Vec<NodeId>,

    /// Simulated signature, see [`crypto::generate_signature`]
    signature: String,

    #[serde(rename = "hash")]
    content_hash: String,

    #[serde(rename = "data", default)]
    payload: Payload,
}

impl Node {
    /// Create a node stamped with the current time
    pub fn new(
        asset_id: AssetId,
        action: Action,
        actor_id: UserId,
        references: Vec<NodeId>,
        payload: Payload,
    ) -> Self {
        Self::with_timestamp(asset_id, action, actor_id, references, payload, now_timestamp())
    }

    /// Create a node with an explicit timestamp
    pub fn with_timestamp(
        asset_id: AssetId,
        action: Action,
        actor_id: UserId,
        references: Vec<NodeId>,
        payload: Payload,
        timestamp: f64,
    ) -> Self {
        let signature = crypto::generate_signature(&actor_id, timestamp);

        let mut node = Self {
            node_id: NodeId::generate(),
            asset_id,
            action,
            actor_id,
            timestamp,
            references,
            signature,
            content_hash: String::new(),
            payload,
        };

        // Computed last, after id/timestamp/signature are fixed
        node.content_hash = node.compute_hash();
        node
    }

    /// Borrowed view of the hashed fields
    pub fn content(&self) -> NodeContent<'_> {
        NodeContent {
            node_id: &self.node_id,
            asset_id: &self.asset_id,
            action: self.action,
            actor_id: &self.actor_id,
            timestamp: self.timestamp,
            references: &self.references,
            signature: &self.signature,
            payload: &self.payload,
        }
    }

    /// Recompute the content hash from the current fields
    pub fn compute_hash(&self) -> String {
        crypto::compute_hash(&self.content())
    }

    /// Whether the stored hash matches the fields
    pub fn verify_hash(&self) -> bool {
        self.content_hash == self.compute_hash()
    }

    /// Node id
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Asset acted on
    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    /// Event kind
    pub fn action(&self) -> Action {
        self.action
    }

    /// User who initiated the event
    pub fn actor_id(&self) -> &UserId {
        &self.actor_id
    }

    /// Creation time
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Parent ids
    pub fn references(&self) -> &[NodeId] {
        &self.references
    }

    /// Signature token
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Stored content hash (hex)
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Action data
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Transfer recipient, when the payload carries one as a string
    pub fn recipient(&self) -> Option<UserId> {
        self.payload
            .get(RECIPIENT_KEY)
            .and_then(|v| v.as_str())
            .map(UserId::new)
    }

    /// Staked amount; absent or non-integer values count as the default
    pub fn staking_amount(&self) -> u64 {
        self.payload
            .get(STAKING_AMOUNT_KEY)
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_STAKING_AMOUNT)
    }

    #[cfg(test)]
    pub(crate) fn tamper_hash(&mut self) {
        let mut bytes = self.content_hash.clone().into_bytes();
        bytes[0] = if bytes[0] == b'0' { b'1' } else { b'0' };
        self.content_hash = String::from_utf8(bytes).unwrap();
    }
}
