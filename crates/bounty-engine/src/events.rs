//! # Domain Events
//!
//! Events emitted at each lifecycle milestone for the notification
//! component to consume. Delivery guarantees are the consumer's concern;
//! the engine emits synchronously inside the operation that caused the
//! event.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use bounty_core::{Amount, DisputeId, UserId, WagerId};

use crate::wager::SettlementOutcome;

/// A domain event with a versioned kind string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WagerEvent {
    /// A wager was created and its stake escrowed.
    WagerCreated {
        wager_id: WagerId,
        creator: UserId,
        stake_amount: Amount,
        expires_at: DateTime<Utc>,
    },
    /// A wager was accepted.
    WagerAccepted {
        wager_id: WagerId,
        acceptor: UserId,
    },
    /// A result proof was submitted.
    ProofSubmitted {
        wager_id: WagerId,
        submitter: UserId,
        claimed_winner: UserId,
    },
    /// The claimed result was contested.
    DisputeOpened {
        wager_id: WagerId,
        dispute_id: DisputeId,
        disputer: UserId,
    },
    /// The wager settled: payout released and fee collected, or a full
    /// refund on void.
    WagerSettled {
        wager_id: WagerId,
        outcome: SettlementOutcome,
    },
}

impl WagerEvent {
    /// The versioned kind string for this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WagerCreated { .. } => "bounty.wager.created.v1",
            Self::WagerAccepted { .. } => "bounty.wager.accepted.v1",
            Self::ProofSubmitted { .. } => "bounty.proof.submitted.v1",
            Self::DisputeOpened { .. } => "bounty.dispute.opened.v1",
            Self::WagerSettled { .. } => "bounty.wager.settled.v1",
        }
    }

    /// The wager this event concerns.
    pub fn wager_id(&self) -> &WagerId {
        match self {
            Self::WagerCreated { wager_id, .. }
            | Self::WagerAccepted { wager_id, .. }
            | Self::ProofSubmitted { wager_id, .. }
            | Self::DisputeOpened { wager_id, .. }
            | Self::WagerSettled { wager_id, .. } => wager_id,
        }
    }
}

/// A consumer of domain events.
pub trait EventSink: Send + Sync {
    /// Handle one event. Must not block the engine.
    fn emit(&self, event: WagerEvent);
}

/// Sink that writes each event to the structured log. The default in
/// deployments where the notification component tails the log stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: WagerEvent) {
        tracing::info!(kind = event.kind(), wager = %event.wager_id(), "domain event");
    }
}

/// Sink that buffers events in memory for test introspection.
#[derive(Debug, Default)]
pub struct BufferingSink {
    events: Mutex<Vec<WagerEvent>>,
}

impl BufferingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of all buffered events in emission order.
    pub fn events(&self) -> Vec<WagerEvent> {
        self.events.lock().clone()
    }

    /// Drain the buffer.
    pub fn drain(&self) -> Vec<WagerEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for BufferingSink {
    fn emit(&self, event: WagerEvent) {
        self.events.lock().push(event);
    }
}
