//! Request/response correlation.
//!
//! Every correlated call gets a fresh id and a pending entry. The entry is
//! removed exactly once, by whichever of the matching `response` or the
//! call's own timeout gets to the map first; the loser finds nothing to
//! remove and has no effect.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::{Instant, timeout};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{CorrelationId, CorrelationIdGenerator};
use crate::protocol::MessageType;

// ============================================================================
// Reply
// ============================================================================

/// Settled outcome of a correlated call.
///
/// A call never fails: a silent or lost peer is an ordinary variant here.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The peer answered with this `data` (`null` if it sent none).
    Data(Value),
    /// No answer within the call's timeout.
    TimedOut {
        /// Correlation id of the call.
        id: CorrelationId,
        /// Milliseconds waited.
        timeout_ms: u64,
    },
    /// The heartbeat was lost or the session shut down first.
    PeerLost {
        /// Correlation id of the call.
        id: CorrelationId,
    },
    /// Refused because too many calls were pending.
    Rejected {
        /// Pending calls at the time.
        pending: usize,
    },
}

impl Reply {
    fn timed_out(id: CorrelationId, after: Duration) -> Self {
        Self::TimedOut {
            id,
            timeout_ms: after.as_millis() as u64,
        }
    }

    /// Returns `true` if the peer answered.
    #[inline]
    #[must_use]
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    /// Returns `true` if the call timed out.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Borrows the answer, if any.
    #[inline]
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Data(value) => Some(value),
            _ => None,
        }
    }

    /// Converts into a `Result` for callers that prefer `?`.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestTimeout`] for [`Reply::TimedOut`]
    /// - [`Error::PeerLost`] for [`Reply::PeerLost`]
    /// - [`Error::Rejected`] for [`Reply::Rejected`]
    pub fn into_result(self) -> Result<Value> {
        match self {
            Self::Data(value) => Ok(value),
            Self::TimedOut { id, timeout_ms } => Err(Error::request_timeout(id, timeout_ms)),
            Self::PeerLost { id } => Err(Error::peer_lost(id)),
            Self::Rejected { pending } => Err(Error::Rejected { pending }),
        }
    }
}

// ============================================================================
// PendingRequest
// ============================================================================

/// A call awaiting its response.
struct PendingRequest {
    message_type: MessageType,
    created_at: Instant,
    resolver: oneshot::Sender<Reply>,
}

// ============================================================================
// Correlator
// ============================================================================

/// Pending request table.
pub struct Correlator {
    ids: CorrelationIdGenerator,
    pending: Mutex<FxHashMap<CorrelationId, PendingRequest>>,
    max_pending: usize,
}

impl Correlator {
    /// Creates an empty table holding at most `max_pending` entries.
    #[must_use]
    pub fn new(max_pending: usize) -> Self {
        Self {
            ids: CorrelationIdGenerator::new(),
            pending: Mutex::new(FxHashMap::default()),
            max_pending,
        }
    }

    /// Allocates an id and registers a pending entry for it.
    ///
    /// Returns `None` when the table is full. The entry is removed when the
    /// returned [`PendingCall`] settles or is dropped.
    pub fn register(&self, message_type: MessageType) -> Option<PendingCall<'_>> {
        let mut pending = self.pending.lock();
        if pending.len() >= self.max_pending {
            warn!(
                pending = pending.len(),
                max = self.max_pending,
                "Too many pending requests"
            );
            return None;
        }

        let id = self.ids.next_id();
        let (resolver, rx) = oneshot::channel();
        pending.insert(
            id,
            PendingRequest {
                message_type,
                created_at: Instant::now(),
                resolver,
            },
        );

        trace!(%id, message_type = message_type.as_str(), "Registered request");
        Some(PendingCall {
            correlator: self,
            id,
            rx,
        })
    }

    /// Settles `id` with the peer's answer.
    ///
    /// Returns `false` if `id` was not pending (already settled or unknown).
    pub fn resolve(&self, id: CorrelationId, data: Value) -> bool {
        let Some(entry) = self.pending.lock().remove(&id) else {
            warn!(%id, "Response for unknown request");
            return false;
        };

        debug!(
            %id,
            message_type = entry.message_type.as_str(),
            elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
            "Request resolved"
        );
        if entry.resolver.send(Reply::Data(data)).is_err() {
            trace!(%id, "Caller gone before response");
        }
        true
    }

    /// Removes `id` because its timeout fired.
    ///
    /// Returns `false` if `id` was already settled.
    pub fn expire(&self, id: CorrelationId) -> bool {
        self.pending.lock().remove(&id).is_some()
    }

    /// Settles every pending entry with [`Reply::PeerLost`].
    ///
    /// Returns the number of entries failed.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        let count = drained.len();

        for (id, entry) in drained {
            if entry.resolver.send(Reply::PeerLost { id }).is_err() {
                trace!(%id, "Caller gone before failure");
            }
        }

        if count > 0 {
            debug!(count, "Failed pending requests");
        }
        count
    }

    /// Number of pending entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// PendingCall
// ============================================================================

/// Caller's side of a registered request.
///
/// Dropping it before settlement removes the pending entry, so a cancelled
/// caller never holds a slot.
pub struct PendingCall<'a> {
    correlator: &'a Correlator,
    id: CorrelationId,
    rx: oneshot::Receiver<Reply>,
}

impl PendingCall<'_> {
    /// Correlation id to put on the wire.
    #[inline]
    #[must_use]
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    /// Waits for the call to settle, expiring it after `after`.
    pub async fn wait(mut self, after: Duration) -> Reply {
        let id = self.id;
        match timeout(after, &mut self.rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Reply::PeerLost { id },
            Err(_) => {
                if self.correlator.expire(id) {
                    debug!(%id, timeout_ms = after.as_millis() as u64, "Request timed out");
                    return Reply::timed_out(id, after);
                }
                // Settled between the timer firing and the removal.
                self.rx
                    .try_recv()
                    .unwrap_or_else(|_| Reply::timed_out(id, after))
            }
        }
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if self.correlator.expire(self.id) {
            debug!(id = %self.id, "Request abandoned by caller");
        }
    }
}

impl std::fmt::Debug for PendingCall<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall").field("id", &self.id).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
