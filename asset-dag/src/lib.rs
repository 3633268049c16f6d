//! Asset DAG Ledger
//!
//! Append-only DAG of asset events (register, transfer, stake) with
//! content hashes, ownership replay and whole-file JSON snapshots.
//!
//! # Architecture
//!
//! - **DAG**: Each node references up to two current tips; tips are nodes nobody references yet
//! - **Event Replay**: Ownership and staking are derived from the nodes, never stored
//! - **Single Writer**: Admission is serialized behind one lock (or the [`actor`] mailbox)
//! - **Snapshots**: Full JSON rewrite after every admission, atomic via rename
//!
//! # Invariants
//!
//! - Append-only: nodes are never modified or removed once admitted
//! - Every reference points at a node stored earlier
//! - A node's hash covers every other field, including its id
//! - An asset has exactly one register node, and only its current owner moves or stakes it
//! - The snapshot on disk always matches the in-memory DAG

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod crypto;
pub mod node;
pub mod dag;
pub mod ownership;
pub mod storage;
pub mod ledger;
pub mod error;
pub mod actor;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, IntegrityViolation, Rejection, Result};
pub use types::{
    Action, ActionCounts, AssetId, LedgerStats, NodeId, OwnershipRecord, Payload, UserId,
};
pub use node::Node;
pub use dag::Dag;
pub use ledger::Ledger;
pub use actor::{spawn_ledger_actor, LedgerHandle};
pub use config::Config;
pub use metrics::Metrics;
