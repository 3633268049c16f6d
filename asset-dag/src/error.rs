//! Error types for the asset ledger

use crate::types::{AssetId, NodeId, UserId};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Candidate node failed admission checks
    #[error("Rejected: {0}")]
    Rejected(#[from] Rejection),

    /// Stored DAG failed an integrity pass
    #[error("Integrity violation: {0}")]
    Integrity(#[from] IntegrityViolation),

    /// Snapshot could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Snapshot could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The rejection reason, if this is a validation failure
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Error::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

/// Reason a candidate node was refused admission.
///
/// Checks run in a fixed order and the first failure wins, so a node with
/// both a dangling reference and too many references reports the former.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A node with this id is already stored
    #[error("node {0} already exists")]
    DuplicateId(NodeId),

    /// A reference points at a node that is not stored
    #[error("referenced node {0} does not exist")]
    DanglingReference(NodeId),

    /// More than two parents
    #[error("a node cannot have more than 2 references (got {0})")]
    TooManyReferences(usize),

    /// The asset already has a register node
    #[error("asset {0} is already registered")]
    DuplicateRegistration(AssetId),

    /// Transfer or stake on an asset with no ownership chain
    #[error("asset {0} is not registered")]
    AssetNotRegistered(AssetId),

    /// Transfer or stake requested by someone other than the owner
    #[error("{action} requested by {actor}, but asset {asset_id} is owned by {owner}")]
    NotCurrentOwner {
        /// Asset being acted on
        asset_id: AssetId,
        /// Action label ("transfer" / "staking")
        action: &'static str,
        /// Requesting user
        actor: UserId,
        /// Owner derived from the ownership history
        owner: UserId,
    },

    /// Transfer payload has no string `recipient_id`
    #[error("transfer must include a recipient_id in the payload")]
    MissingRecipient,
}

impl Rejection {
    /// Stable reason code for adapters
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::DuplicateId(_) => "duplicate-id",
            Rejection::DanglingReference(_) => "dangling-reference",
            Rejection::TooManyReferences(_) => "too-many-references",
            Rejection::DuplicateRegistration(_) => "duplicate-registration",
            Rejection::AssetNotRegistered(_) => "asset-not-registered",
            Rejection::NotCurrentOwner { .. } => "not-current-owner",
            Rejection::MissingRecipient => "missing-recipient",
        }
    }
}

/// First problem found by an integrity pass
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// A stored node references a node that is not stored
    #[error("node {node_id} references non-existent node {reference}")]
    DanglingReference {
        /// Node carrying the bad edge
        node_id: NodeId,
        /// Missing parent
        reference: NodeId,
    },

    /// Recomputed content hash differs from the stored one
    #[error("hash mismatch for node {0}")]
    HashMismatch(NodeId),
}

impl IntegrityViolation {
    /// Stable reason code for adapters
    pub fn kind(&self) -> &'static str {
        match self {
            IntegrityViolation::DanglingReference { .. } => "dangling-reference",
            IntegrityViolation::HashMismatch(_) => "hash-mismatch",
        }
    }

    /// Node the violation was found on
    pub fn node_id(&self) -> NodeId {
        match self {
            IntegrityViolation::DanglingReference { node_id, .. } => *node_id,
            IntegrityViolation::HashMismatch(node_id) => *node_id,
        }
    }
}
