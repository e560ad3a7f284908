//! Fire-and-forget envelope delivery.
//!
//! The peer's location is the least reliable part of the protocol, so a
//! send walks an ordered fallback chain:
//!
//! | Tier | Target | Stops the chain |
//! |------|--------|-----------------|
//! | [`DeliveryTier::Direct`] | Latched peer window | On success |
//! | [`DeliveryTier::Located`] | Every window from the [`WindowLocator`] | No |
//! | [`DeliveryTier::Broadcast`] | The host's own `window` | No |
//!
//! Per-target failures are logged and swallowed; [`TransportSender::send`]
//! never fails.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::locator::WindowLocator;
use crate::protocol::Envelope;

use super::{HostContext, PeerWindow};

// ============================================================================
// DeliveryTier
// ============================================================================

/// One strategy in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTier {
    /// Post to the latched peer window.
    Direct,
    /// Post to every candidate window found under the host document.
    Located,
    /// Post to the host's own window.
    Broadcast,
}

/// Tiers in the order they are tried.
pub const DELIVERY_CHAIN: [DeliveryTier; 3] = [
    DeliveryTier::Direct,
    DeliveryTier::Located,
    DeliveryTier::Broadcast,
];

impl DeliveryTier {
    /// Returns `true` if a successful delivery on this tier ends the chain.
    #[inline]
    #[must_use]
    pub const fn ends_chain_on_success(self) -> bool {
        matches!(self, Self::Direct)
    }
}

// ============================================================================
// TierOutcome / DeliveryReport
// ============================================================================

/// Result of running a single tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierOutcome {
    /// Tier had nothing to post to.
    Skipped,
    /// At least one post succeeded.
    Delivered {
        /// Successful posts.
        targets: usize,
    },
    /// Every attempted post failed.
    Failed {
        /// Attempted posts.
        attempted: usize,
    },
}

impl TierOutcome {
    /// Returns `true` if at least one post succeeded.
    #[inline]
    #[must_use]
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    fn delivered_count(self) -> usize {
        match self {
            Self::Delivered { targets } => targets,
            _ => 0,
        }
    }
}

/// Summary of one [`TransportSender::send`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Delivered through the latched peer window.
    pub direct: bool,
    /// Candidate windows that accepted the message.
    pub located: usize,
    /// Delivered through the host window broadcast.
    pub broadcast: bool,
}

impl DeliveryReport {
    fn record(&mut self, tier: DeliveryTier, outcome: TierOutcome) {
        match tier {
            DeliveryTier::Direct => self.direct = outcome.is_delivered(),
            DeliveryTier::Located => self.located = outcome.delivered_count(),
            DeliveryTier::Broadcast => self.broadcast = outcome.is_delivered(),
        }
    }

    /// Returns `true` if any tier accepted the message.
    #[inline]
    #[must_use]
    pub fn any_delivered(&self) -> bool {
        self.direct || self.located > 0 || self.broadcast
    }
}

// ============================================================================
// TransportSender
// ============================================================================

/// Delivers envelopes through the fallback chain.
#[derive(Debug, Clone)]
pub struct TransportSender {
    host: HostContext,
    locator: WindowLocator,
}

impl TransportSender {
    /// Creates a sender for the given host page.
    #[inline]
    #[must_use]
    pub fn new(host: HostContext, locator: WindowLocator) -> Self {
        Self { host, locator }
    }

    /// Returns the host context.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &HostContext {
        &self.host
    }

    /// Sends an envelope. `peer` is the latched peer window, if any.
    pub fn send(&self, envelope: &Envelope, peer: Option<&Arc<dyn PeerWindow>>) -> DeliveryReport {
        let message = envelope.to_value();
        let mut report = DeliveryReport::default();

        for tier in DELIVERY_CHAIN {
            let outcome = self.attempt(tier, &message, peer);
            report.record(tier, outcome);

            if outcome.is_delivered() && tier.ends_chain_on_success() {
                break;
            }
        }

        trace!(
            message_type = envelope.message_type.as_str(),
            id = ?envelope.id,
            ?report,
            "Envelope sent"
        );
        report
    }

    /// Runs a single tier of the chain.
    pub fn attempt(
        &self,
        tier: DeliveryTier,
        message: &Value,
        peer: Option<&Arc<dyn PeerWindow>>,
    ) -> TierOutcome {
        match tier {
            DeliveryTier::Direct => match peer {
                None => TierOutcome::Skipped,
                Some(window) => post_all([Arc::clone(window)], message),
            },
            DeliveryTier::Located => {
                let host_id = self.host.window.id();
                let candidates = self
                    .locator
                    .locate(Arc::clone(&self.host.document))
                    .filter(|window| window.id() != host_id);
                post_all(candidates, message)
            }
            DeliveryTier::Broadcast => post_all([Arc::clone(&self.host.window)], message),
        }
    }
}

/// Posts to every target, swallowing failures.
fn post_all(
    targets: impl IntoIterator<Item = Arc<dyn PeerWindow>>,
    message: &Value,
) -> TierOutcome {
    let mut attempted = 0;
    let mut delivered = 0;

    for window in targets {
        attempted += 1;
        match window.post_message(message) {
            Ok(()) => delivered += 1,
            Err(e) => debug!(window = %window.id(), error = %e, "postMessage failed"),
        }
    }

    match (attempted, delivered) {
        (0, _) => TierOutcome::Skipped,
        (_, 0) => TierOutcome::Failed { attempted },
        (_, targets) => TierOutcome::Delivered { targets },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageType;
    use crate::testing::{MockFrame, MockHost, MockScope, MockWindow};

    fn sender(host: &MockHost) -> TransportSender {
        TransportSender::new(host.context.clone(), WindowLocator::default())
    }

    #[test]
    fn test_direct_path_skips_fallbacks() {
        let host = MockHost::new();
        let peer = host.peer_handle();

        let report = sender(&host).send(&Envelope::host(MessageType::Ping), Some(&peer));

        assert!(report.direct);
        assert_eq!(report.located, 0);
        assert!(!report.broadcast);
        assert_eq!(host.peer.posted_types(), vec!["ping"]);
        assert!(host.window.posted().is_empty());
    }

    #[test]
    fn test_no_peer_uses_locator_and_broadcast() {
        let host = MockHost::new();

        let report = sender(&host).send(&Envelope::host(MessageType::HandshakeAck), None);

        assert!(!report.direct);
        assert_eq!(report.located, 1);
        assert!(report.broadcast);
        assert_eq!(host.peer.posted_types(), vec!["handshake-ack"]);
        assert_eq!(host.window.posted_types(), vec!["handshake-ack"]);
    }

    #[test]
    fn test_stale_peer_falls_through() {
        let host = MockHost::new();
        let stale = MockWindow::new(42);
        stale.set_failing(true);
        let stale: Arc<dyn PeerWindow> = stale;

        let report = sender(&host).send(&Envelope::host(MessageType::Ping), Some(&stale));

        assert!(!report.direct);
        assert_eq!(report.located, 1);
        assert!(report.broadcast);
    }

    #[test]
    fn test_unreachable_peer_still_broadcasts() {
        let window = MockWindow::new(100);
        let context = HostContext::new(
            Arc::clone(&window) as Arc<dyn PeerWindow>,
            MockScope::new().into_scope(),
        );
        let sender = TransportSender::new(context, WindowLocator::default());

        let report = sender.send(&Envelope::host(MessageType::Ping), None);

        assert_eq!(report.located, 0);
        assert!(report.broadcast);
        assert!(report.any_delivered());
    }

    #[test]
    fn test_located_tier_swallows_per_target_failures() {
        let window = MockWindow::new(100);
        let broken = MockWindow::new(1);
        broken.set_failing(true);
        let healthy = MockWindow::new(2);
        let document = MockScope::new()
            .with_frame(MockFrame::cross_origin(broken))
            .with_frame(MockFrame::cross_origin(Arc::clone(&healthy)))
            .into_scope();
        let sender = TransportSender::new(
            HostContext::new(window as Arc<dyn PeerWindow>, document),
            WindowLocator::default(),
        );

        let message = Envelope::host(MessageType::Ping).to_value();
        let outcome = sender.attempt(DeliveryTier::Located, &message, None);

        assert_eq!(outcome, TierOutcome::Delivered { targets: 1 });
        assert_eq!(healthy.posted().len(), 1);
    }

    #[test]
    fn test_tiers_are_independent() {
        let host = MockHost::new();
        let message = Envelope::host(MessageType::Ping).to_value();
        let sender = sender(&host);

        assert_eq!(
            sender.attempt(DeliveryTier::Direct, &message, None),
            TierOutcome::Skipped
        );
        assert_eq!(
            sender.attempt(DeliveryTier::Broadcast, &message, None),
            TierOutcome::Delivered { targets: 1 }
        );

        host.window.set_failing(true);
        assert_eq!(
            sender.attempt(DeliveryTier::Broadcast, &message, None),
            TierOutcome::Failed { attempted: 1 }
        );
    }
}
