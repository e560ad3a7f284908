//! Internal event bus.
//!
//! The bridge republishes what it learns from the peer on a broadcast
//! channel. Collaborators (drift monitor, chat context builder, auth UI)
//! subscribe; the bridge never waits on them.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

use crate::protocol::SelectionSnapshot;

// ============================================================================
// BridgeEvent
// ============================================================================

/// Event emitted by a [`BridgeSession`](super::BridgeSession).
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// Connection state flipped.
    PluginStatus {
        /// New state.
        connected: bool,
    },
    /// The peer pushed a new selection.
    SelectionUpdated(SelectionSnapshot),
    /// The peer asked for credentials; payload forwarded verbatim.
    CredentialsRequested(Value),
    /// The peer reported a successful sign-in; payload forwarded verbatim.
    AuthSuccess(Value),
}

impl BridgeEvent {
    /// Returns the event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PluginStatus { .. } => "plugin-status",
            Self::SelectionUpdated(_) => "selection-updated",
            Self::CredentialsRequested(_) => "credentials-requested",
            Self::AuthSuccess(_) => "auth-success",
        }
    }
}

// ============================================================================
// EventBus
// ============================================================================

/// Broadcast channel carrying [`BridgeEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Creates a bus buffering `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns a new receiver for events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event. Returns the number of subscribers reached.
    pub fn emit(&self, event: BridgeEvent) -> usize {
        let name = event.name();
        let reached = self.tx.send(event).unwrap_or(0);
        trace!(event = name, reached, "Event emitted");
        reached
    }
}

// ============================================================================
// Tests
// ============================================================================
