//! Actor-based concurrency for the ledger
//!
//! Mutations can be funneled through a single Tokio task:
//! - One writer task owns admission, so callers never contend on the write lock
//! - Bounded mailbox gives backpressure
//! - Reads bypass the actor and go straight to the shared [`Ledger`]
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   validate → insert → snapshot (or roll back)        │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//!              Ledger (RwLock<Dag> + SnapshotStore)
//! ```

use crate::{
    node::Node,
    types::{AssetId, NodeId, Payload, UserId},
    Error, Ledger, Result,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Register a new asset
    Register {
        /// Asset to register
        asset_id: AssetId,
        /// Registrant, becomes the first owner
        actor_id: UserId,
        /// Register payload
        metadata: Payload,
        /// Reply channel
        response: oneshot::Sender<Result<NodeId>>,
    },

    /// Transfer an asset
    Transfer {
        /// Asset to move
        asset_id: AssetId,
        /// Current owner
        from_user: UserId,
        /// Recipient
        to_user: UserId,
        /// Reply channel
        response: oneshot::Sender<Result<NodeId>>,
    },

    /// Stake an asset
    Stake {
        /// Asset to stake
        asset_id: AssetId,
        /// Current owner
        actor_id: UserId,
        /// Staked amount
        amount: u64,
        /// Reply channel
        response: oneshot::Sender<Result<NodeId>>,
    },

    /// Admit a caller-built node
    Admit {
        /// Fully built node
        node: Box<Node>,
        /// Reply channel
        response: oneshot::Sender<Result<NodeId>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that applies ledger mutations one at a time
#[derive(Debug)]
pub struct LedgerActor {
    /// Shared ledger
    ledger: Arc<Ledger>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(ledger: Arc<Ledger>, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { ledger, mailbox }
    }

    /// Run the actor event loop until shutdown or every handle is dropped
    pub async fn run(mut self) {
        tracing::debug!("Ledger actor started");

        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                msg => self.handle_message(msg),
            }
        }

        tracing::debug!(nodes = self.ledger.len(), "Ledger actor stopped");
    }

    /// Handle a single message
    fn handle_message(&self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::Register {
                asset_id,
                actor_id,
                metadata,
                response,
            } => {
                let result = self.ledger.register(&asset_id, &actor_id, metadata);
                let _ = response.send(result);
            }

            LedgerMessage::Transfer {
                asset_id,
                from_user,
                to_user,
                response,
            } => {
                let result = self.ledger.transfer(&asset_id, &from_user, &to_user);
                let _ = response.send(result);
            }

            LedgerMessage::Stake {
                asset_id,
                actor_id,
                amount,
                response,
            } => {
                let result = self.ledger.stake(&asset_id, &actor_id, amount);
                let _ = response.send(result);
            }

            LedgerMessage::Admit { node, response } => {
                let result = self.ledger.admit(*node);
                let _ = response.send(result);
            }

            LedgerMessage::Shutdown => {
                // Handled in run loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
    ledger: Arc<Ledger>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>, ledger: Arc<Ledger>) -> Self {
        Self { sender, ledger }
    }

    /// Shared ledger, for queries
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<NodeId>>) -> LedgerMessage,
    ) -> Result<NodeId> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Register a new asset
    pub async fn register(&self, asset_id: AssetId, actor_id: UserId, metadata: Payload) -> Result<NodeId> {
        self.request(|response| LedgerMessage::Register {
            asset_id,
            actor_id,
            metadata,
            response,
        })
        .await
    }

    /// Transfer an asset
    pub async fn transfer(&self, asset_id: AssetId, from_user: UserId, to_user: UserId) -> Result<NodeId> {
        self.request(|response| LedgerMessage::Transfer {
            asset_id,
            from_user,
            to_user,
            response,
        })
        .await
    }

    /// Stake an asset
    pub async fn stake(&self, asset_id: AssetId, actor_id: UserId, amount: u64) -> Result<NodeId> {
        self.request(|response| LedgerMessage::Stake {
            asset_id,
            actor_id,
            amount,
            response,
        })
        .await
    }

    /// Admit a caller-built node
    pub async fn admit(&self, node: Node) -> Result<NodeId> {
        self.request(|response| LedgerMessage::Admit {
            node: Box::new(node),
            response,
        })
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(ledger: Arc<Ledger>, mailbox_capacity: usize) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
    let actor = LedgerActor::new(ledger.clone(), rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx, ledger)
}
