//! Core types for the asset ledger
//!
//! Identifiers are newtypes so an asset id can never be passed where a user
//! id is expected. Everything here serializes to the snapshot layout used by
//! the persisted ledger file.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Payload key carrying the transfer recipient
pub const RECIPIENT_KEY: &str = "recipient_id";

/// Payload key carrying the staked amount
pub const STAKING_AMOUNT_KEY: &str = "staking_amount";

/// Staked amount assumed when a stake node carries none
pub const DEFAULT_STAKING_AMOUNT: u64 = 1;

/// Action-specific key/value data attached to a node.
///
/// A `BTreeMap` keeps keys sorted, which the content hash relies on.
pub type Payload = BTreeMap<String, serde_json::Value>;

/// Unique node identifier (random UUIDv4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First 8 hex characters, for display
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Asset identifier (NFC tag id, serial number, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Create new asset ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// User identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Ledger event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// First registration of an asset
    #[serde(rename = "register")]
    Register,
    /// Ownership handed to `recipient_id`
    #[serde(rename = "transfer")]
    Transfer,
    /// Owner stakes the asset
    #[serde(rename = "staking")]
    Stake,
}

impl Action {
    /// Wire label, also fed into the content hash
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Register => "register",
            Action::Transfer => "transfer",
            Action::Stake => "staking",
        }
    }

    /// All actions, in stats order
    pub const ALL: [Action; 3] = [Action::Register, Action::Transfer, Action::Stake];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ownership change in an asset's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipRecord {
    /// Owner after this event
    #[serde(rename = "user_id")]
    pub owner: UserId,

    /// Event timestamp (seconds since Unix epoch)
    pub timestamp: f64,

    /// Node that caused the change
    pub node_id: NodeId,

    /// `Register` or `Transfer`
    pub action: Action,
}

/// Per-action node counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    /// Register nodes
    pub register: usize,
    /// Transfer nodes
    pub transfer: usize,
    /// Stake nodes
    pub staking: usize,
}

impl ActionCounts {
    /// Bump the counter for `action`
    pub fn record(&mut self, action: Action) {
        match action {
            Action::Register => self.register += 1,
            Action::Transfer => self.transfer += 1,
            Action::Stake => self.staking += 1,
        }
    }
}

/// Summary of the stored DAG
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Stored nodes
    pub total_nodes: usize,
    /// Current frontier size
    pub total_tips: usize,
    /// Distinct asset ids
    pub unique_assets: usize,
    /// Distinct actors
    pub unique_users: usize,
    /// Nodes per action
    pub action_counts: ActionCounts,
}

/// Current wall-clock time as fractional seconds since the Unix epoch
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_labels() {
        assert_eq!(serde_json::to_string(&Action::Stake).unwrap(), "\"staking\"");
        assert_eq!(
            serde_json::from_str::<Action>("\"transfer\"").unwrap(),
            Action::Transfer
        );
        assert!(serde_json::from_str::<Action>("\"burn\"").is_err());
    }

    #[test]
    fn test_node_id_parse_and_short() {
        let id = NodeId::generate();
        let parsed: NodeId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.short().len(), 8);
        assert!(id.to_string().starts_with(&id.short()));
    }

    #[test]
    fn test_ownership_record_uses_user_id_key() {
        let record = OwnershipRecord {
            owner: UserId::new("U1"),
            timestamp: 1.5,
            node_id: NodeId::generate(),
            action: Action::Register,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["user_id"], "U1");
        assert_eq!(json["action"], "register");
    }

    #[test]
    fn test_now_timestamp_has_fraction() {
        let ts = now_timestamp();
        assert!(ts > 1_600_000_000.0);
    }
}
