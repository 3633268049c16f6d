//! Hashing and signature placeholder for ledger nodes
//!
//! This module provides:
//! - Canonical byte encoding of node content (fixed field order, sorted payload keys)
//! - SHA-256 content hashing
//! - A simulated signature token
//!
//! The signature is NOT a security control. It is a SHA-256 digest over the
//! actor, the timestamp and a random nonce; nothing can verify it against a
//! key and nothing in the ledger tries to.

use crate::types::{Action, AssetId, NodeId, Payload, UserId};
use sha2::{Digest, Sha256};

/// Borrowed view of every hashed node field
#[derive(Debug, Clone, Copy)]
pub struct NodeContent<'a> {
    /// Node id
    pub node_id: &'a NodeId,
    /// Asset acted on
    pub asset_id: &'a AssetId,
    /// Event kind
    pub action: Action,
    /// Initiating user
    pub actor_id: &'a UserId,
    /// Creation time (seconds)
    pub timestamp: f64,
    /// Parent edges, in order
    pub references: &'a [NodeId],
    /// Signature token
    pub signature: &'a str,
    /// Action data
    pub payload: &'a Payload,
}

/// Length-prefixed big-endian encoder (u64 lengths).
///
/// Every variable-length field carries its length, so two different field
/// sets can never encode to the same bytes.
#[derive(Debug, Default)]
struct CanonicalEncoder {
    buffer: Vec<u8>,
}

impl CanonicalEncoder {
    fn write_len(&mut self, len: usize) {
        // usize is at most 64 bits on every supported target
        self.buffer.extend_from_slice(&(len as u64).to_be_bytes());
    }

    fn write_string(&mut self, s: &str) {
        self.write_len(s.len());
        self.buffer.extend_from_slice(s.as_bytes());
    }

    fn write_f64(&mut self, n: f64) {
        self.buffer.extend_from_slice(&n.to_bits().to_be_bytes());
    }

    fn finalize(self) -> Vec<u8> {
        self.buffer
    }
}

/// Canonical bytes for a node's content
pub fn canonical_bytes(content: &NodeContent<'_>) -> Vec<u8> {
    let mut enc = CanonicalEncoder::default();

    enc.write_string(&content.node_id.to_string());
    enc.write_string(content.asset_id.as_str());
    enc.write_string(content.action.as_str());
    enc.write_string(content.actor_id.as_str());
    enc.write_f64(content.timestamp);

    enc.write_len(content.references.len());
    for reference in content.references {
        enc.write_string(&reference.to_string());
    }

    enc.write_string(content.signature);

    // BTreeMap iteration is key-sorted; nested objects render sorted too
    enc.write_len(content.payload.len());
    for (key, value) in content.payload {
        enc.write_string(key);
        enc.write_string(&value.to_string());
    }

    enc.finalize()
}

/// SHA-256 of the canonical content, hex encoded
pub fn compute_hash(content: &NodeContent<'_>) -> String {
    hex::encode(hash_bytes(&canonical_bytes(content)))
}

/// Simulated signature: `sha256("{actor}:{timestamp}:{nonce}")`, hex encoded
pub fn generate_signature(actor_id: &UserId, timestamp: f64) -> String {
    let nonce: u64 = rand::random();
    let base = format!("{}:{}:{}", actor_id, timestamp, nonce);
    hex::encode(hash_bytes(base.as_bytes()))
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
