//! Single-writer actor for marketplace mutations
//!
//! Every mutating operation flows through one Tokio task, which collapses
//! both serialization domains (per-account for the ledger, per-request for
//! lifecycle transitions) into a single total order: two debits against one
//! account, or an accept racing a delete, can never interleave. Reads bypass
//! the actor and go straight to storage.
//!
//! The mailbox is bounded. A full mailbox or an expired operation timeout
//! surfaces as a `Conflict` error instead of blocking the caller forever.

use crate::{
    engine::{Engine, PostRequestParams},
    error::{Error, Result},
};
use market_core::{Contribution, Karma, Request, UserId};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Duration;
use uuid::Uuid;

/// Message sent to the marketplace actor
pub enum MarketMessage {
    /// Post a new bounty request
    Post {
        /// Posting user
        owner: UserId,
        /// Request parameters
        params: PostRequestParams,
        /// Response channel
        response: oneshot::Sender<Result<Request>>,
    },

    /// Submit a contribution
    Submit {
        /// Addressed request
        request_id: Uuid,
        /// Submitting user
        author: UserId,
        /// Reference to the uploaded material
        payload_ref: String,
        /// Response channel
        response: oneshot::Sender<Result<Contribution>>,
    },

    /// Accept a contribution
    Accept {
        /// Addressed request
        request_id: Uuid,
        /// Winning contribution
        contribution_id: Uuid,
        /// Acting user
        acting: UserId,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Reject and remove a contribution
    Reject {
        /// Addressed request
        request_id: Uuid,
        /// Contribution to remove
        contribution_id: Uuid,
        /// Acting user
        acting: UserId,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Delete a request
    Delete {
        /// Addressed request
        request_id: Uuid,
        /// Acting user
        acting: UserId,
        /// Response channel carrying the refund
        response: oneshot::Sender<Result<Karma>>,
    },

    /// Reopen a closed request
    Reopen {
        /// Addressed request
        request_id: Uuid,
        /// Acting user
        acting: UserId,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Count a view
    RecordView {
        /// Addressed request
        request_id: Uuid,
        /// Response channel carrying the new total
        response: oneshot::Sender<Result<u64>>,
    },

    /// Credit karma
    Credit {
        /// Recipient
        user: UserId,
        /// Amount
        amount: Karma,
        /// Response channel carrying the new balance
        response: oneshot::Sender<Result<Karma>>,
    },

    /// Debit karma
    Debit {
        /// Account to charge
        user: UserId,
        /// Amount
        amount: Karma,
        /// Response channel carrying the new balance
        response: oneshot::Sender<Result<Karma>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes marketplace messages
pub struct MarketActor {
    engine: Engine,
    mailbox: mpsc::Receiver<MarketMessage>,
}

impl MarketActor {
    /// Create new actor
    pub fn new(engine: Engine, mailbox: mpsc::Receiver<MarketMessage>) -> Self {
        Self { engine, mailbox }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if matches!(msg, MarketMessage::Shutdown) {
                break;
            }

            let started = Instant::now();
            self.handle_message(msg);
            self.engine
                .metrics()
                .record_op_duration(started.elapsed().as_secs_f64());
        }

        tracing::debug!("marketplace actor stopped");
    }

    /// Handle a single message
    fn handle_message(&self, msg: MarketMessage) {
        match msg {
            MarketMessage::Post {
                owner,
                params,
                response,
            } => {
                let _ = response.send(self.engine.post_request(&owner, params));
            }

            MarketMessage::Submit {
                request_id,
                author,
                payload_ref,
                response,
            } => {
                let _ = response.send(self.engine.submit_contribution(
                    request_id,
                    &author,
                    payload_ref,
                ));
            }

            MarketMessage::Accept {
                request_id,
                contribution_id,
                acting,
                response,
            } => {
                let _ = response.send(self.engine.accept_contribution(
                    request_id,
                    contribution_id,
                    &acting,
                ));
            }

            MarketMessage::Reject {
                request_id,
                contribution_id,
                acting,
                response,
            } => {
                let _ = response.send(self.engine.reject_contribution(
                    request_id,
                    contribution_id,
                    &acting,
                ));
            }

            MarketMessage::Delete {
                request_id,
                acting,
                response,
            } => {
                let _ = response.send(self.engine.delete_request(request_id, &acting));
            }

            MarketMessage::Reopen {
                request_id,
                acting,
                response,
            } => {
                let _ = response.send(self.engine.reopen_request(request_id, &acting));
            }

            MarketMessage::RecordView {
                request_id,
                response,
            } => {
                let _ = response.send(self.engine.record_view(request_id));
            }

            MarketMessage::Credit {
                user,
                amount,
                response,
            } => {
                let _ = response.send(self.engine.credit(&user, amount));
            }

            MarketMessage::Debit {
                user,
                amount,
                response,
            } => {
                let _ = response.send(self.engine.debit(&user, amount));
            }

            MarketMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct MarketHandle {
    sender: mpsc::Sender<MarketMessage>,
    op_timeout: Duration,
}

impl MarketHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<MarketMessage>, op_timeout: Duration) -> Self {
        Self { sender, op_timeout }
    }

    /// Send a message and await its reply, bounded by the operation timeout
    async fn deliver<T>(
        &self,
        msg: MarketMessage,
        receiver: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        let round_trip = async {
            self.sender
                .send(msg)
                .await
                .map_err(|_| Error::Conflict("writer mailbox closed".to_string()))?;

            receiver
                .await
                .map_err(|_| Error::Conflict("writer dropped the operation".to_string()))?
        };

        match tokio::time::timeout(self.op_timeout, round_trip).await {
            Ok(result) => result,
            Err(_) => Err(Error::Conflict(format!(
                "operation timed out after {:?}",
                self.op_timeout
            ))),
        }
    }

    /// Post a new bounty request
    pub async fn post(&self, owner: UserId, params: PostRequestParams) -> Result<Request> {
        let (tx, rx) = oneshot::channel();
        self.deliver(
            MarketMessage::Post {
                owner,
                params,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Submit a contribution
    pub async fn submit(
        &self,
        request_id: Uuid,
        author: UserId,
        payload_ref: String,
    ) -> Result<Contribution> {
        let (tx, rx) = oneshot::channel();
        self.deliver(
            MarketMessage::Submit {
                request_id,
                author,
                payload_ref,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Accept a contribution
    pub async fn accept(
        &self,
        request_id: Uuid,
        contribution_id: Uuid,
        acting: UserId,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.deliver(
            MarketMessage::Accept {
                request_id,
                contribution_id,
                acting,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Reject and remove a contribution
    pub async fn reject(
        &self,
        request_id: Uuid,
        contribution_id: Uuid,
        acting: UserId,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.deliver(
            MarketMessage::Reject {
                request_id,
                contribution_id,
                acting,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Delete a request, returning the refund
    pub async fn delete(&self, request_id: Uuid, acting: UserId) -> Result<Karma> {
        let (tx, rx) = oneshot::channel();
        self.deliver(
            MarketMessage::Delete {
                request_id,
                acting,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Reopen a closed request
    pub async fn reopen(&self, request_id: Uuid, acting: UserId) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.deliver(
            MarketMessage::Reopen {
                request_id,
                acting,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Count a view
    pub async fn record_view(&self, request_id: Uuid) -> Result<u64> {
        let (tx, rx) = oneshot::channel();
        self.deliver(
            MarketMessage::RecordView {
                request_id,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Credit karma
    pub async fn credit(&self, user: UserId, amount: Karma) -> Result<Karma> {
        let (tx, rx) = oneshot::channel();
        self.deliver(
            MarketMessage::Credit {
                user,
                amount,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Debit karma
    pub async fn debit(&self, user: UserId, amount: Karma) -> Result<Karma> {
        let (tx, rx) = oneshot::channel();
        self.deliver(
            MarketMessage::Debit {
                user,
                amount,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(MarketMessage::Shutdown)
            .await
            .map_err(|_| Error::Conflict("writer mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the marketplace actor
pub fn spawn_market_actor(
    engine: Engine,
    mailbox_capacity: usize,
    op_timeout: Duration,
) -> MarketHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let actor = MarketActor::new(engine, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    MarketHandle::new(tx, op_timeout)
}
