//! Connection state machine.
//!
//! `postMessage` has no close event, so liveness is a lease: any valid
//! inbound envelope renews it, and a timer tick that finds it expired
//! demotes the peer to disconnected.
//!
//! ```text
//!                 any valid envelope
//!   ┌──────────────┐ ───────────────► ┌───────────┐
//!   │ Disconnected │                  │ Connected │
//!   └──────────────┘ ◄─────────────── └───────────┘
//!     tick: handshake   tick, lease     tick: ping
//!                       expired
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::Instant;

use crate::identifiers::WindowId;
use crate::transport::PeerWindow;

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Whether the peer is currently believed reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No traffic seen within the heartbeat timeout.
    Disconnected,
    /// Traffic seen recently.
    Connected,
}

// ============================================================================
// TickAction
// ============================================================================

/// What the timer callback must do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Still disconnected: retry the handshake.
    SendHandshake,
    /// Still connected: send a ping.
    SendPing,
    /// The lease just expired; state is now disconnected.
    PeerLost,
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Process-wide connection bookkeeping.
pub struct ConnectionState {
    status: ConnectionStatus,
    last_heartbeat_at: Option<Instant>,
    peer: Option<Weak<dyn PeerWindow>>,
    host_window: WindowId,
    heartbeat_timeout: Duration,
}

impl ConnectionState {
    /// Creates a disconnected state.
    ///
    /// `host_window` is never latched as the peer.
    #[must_use]
    pub fn new(host_window: WindowId, heartbeat_timeout: Duration) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            last_heartbeat_at: None,
            peer: None,
            host_window,
            heartbeat_timeout,
        }
    }

    /// Current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Time of the most recent valid inbound envelope.
    #[inline]
    #[must_use]
    pub fn last_heartbeat_at(&self) -> Option<Instant> {
        self.last_heartbeat_at
    }

    /// The latched peer window, if it is still alive.
    #[must_use]
    pub fn peer(&self) -> Option<Arc<dyn PeerWindow>> {
        self.peer.as_ref().and_then(Weak::upgrade)
    }

    /// Records a valid inbound envelope.
    ///
    /// Latches `source` as the peer unless it is the host's own window.
    /// Returns `true` if this observation moved the state to connected.
    pub fn observe(&mut self, now: Instant, source: Option<&Arc<dyn PeerWindow>>) -> bool {
        if let Some(window) = source
            && window.id() != self.host_window
        {
            self.peer = Some(Arc::downgrade(window));
        }

        self.last_heartbeat_at = Some(now);

        match self.status {
            ConnectionStatus::Disconnected => {
                self.status = ConnectionStatus::Connected;
                true
            }
            ConnectionStatus::Connected => false,
        }
    }

    /// Advances the timer.
    pub fn tick(&mut self, now: Instant) -> TickAction {
        match self.status {
            ConnectionStatus::Disconnected => TickAction::SendHandshake,
            ConnectionStatus::Connected => {
                let expired = self
                    .last_heartbeat_at
                    .is_none_or(|at| now.saturating_duration_since(at) > self.heartbeat_timeout);

                if expired {
                    self.status = ConnectionStatus::Disconnected;
                    self.peer = None;
                    TickAction::PeerLost
                } else {
                    TickAction::SendPing
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{HOST_WINDOW_ID, MockWindow};

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn state() -> ConnectionState {
        ConnectionState::new(WindowId::new(HOST_WINDOW_ID), TIMEOUT)
    }

    #[test]
    fn test_starts_disconnected_and_retries_handshake() {
        let mut state = state();
        let now = Instant::now();

        assert_eq!(state.status(), ConnectionStatus::Disconnected);
        assert_eq!(state.tick(now), TickAction::SendHandshake);
        assert_eq!(state.tick(now + TIMEOUT * 3), TickAction::SendHandshake);
    }

    #[test]
    fn test_first_observation_connects_once() {
        let mut state = state();
        let now = Instant::now();

        assert!(state.observe(now, None));
        assert!(!state.observe(now, None));
        assert_eq!(state.status(), ConnectionStatus::Connected);
        assert_eq!(state.last_heartbeat_at(), Some(now));
    }

    #[test]
    fn test_pings_while_lease_is_fresh() {
        let mut state = state();
        let start = Instant::now();
        state.observe(start, None);

        assert_eq!(state.tick(start + TIMEOUT), TickAction::SendPing);
    }

    #[test]
    fn test_lease_expiry_demotes_once() {
        let mut state = state();
        let start = Instant::now();
        let peer: Arc<dyn PeerWindow> = MockWindow::new(1);
        state.observe(start, Some(&peer));
        assert!(state.peer().is_some());

        let late = start + TIMEOUT + Duration::from_millis(1);
        assert_eq!(state.tick(late), TickAction::PeerLost);
        assert_eq!(state.status(), ConnectionStatus::Disconnected);
        assert!(state.peer().is_none());
        assert_eq!(state.tick(late), TickAction::SendHandshake);
    }

    #[test]
    fn test_host_window_is_not_latched() {
        let mut state = state();
        let host: Arc<dyn PeerWindow> = MockWindow::new(HOST_WINDOW_ID);

        state.observe(Instant::now(), Some(&host));
        assert!(state.peer().is_none());
    }

    #[test]
    fn test_dropped_peer_reads_as_absent() {
        let mut state = state();
        let peer: Arc<dyn PeerWindow> = MockWindow::new(1);
        state.observe(Instant::now(), Some(&peer));

        drop(peer);
        assert!(state.peer().is_none());
    }
}
