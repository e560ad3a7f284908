//! Bridge session and event loop.
//!
//! A [`BridgeSession`] is created once per content script and injected into
//! every collaborator that talks to the plugin.
//!
//! # Event Loop
//!
//! The session spawns one tokio task that handles:
//!
//! - Inbound `message` events handed over with [`BridgeSession::deliver`]
//! - The repeating heartbeat timer (handshake retry or ping)
//! - Shutdown, which fails every pending request
//!
//! Inbound handling and timer callbacks run one at a time on that task, so
//! each state mutation completes before the next one starts. Correlated
//! calls ([`BridgeSession::request`]) run on the caller's task and only
//! touch the pending table.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::locator::WindowLocator;
use crate::protocol::{Envelope, MessageType, SelectionSnapshot};
use crate::transport::{DeliveryReport, HostContext, InboundMessage, TransportSender};

use super::builder::BridgeBuilder;
use super::correlator::{Correlator, Reply};
use super::events::{BridgeEvent, EventBus};
use super::options::BridgeOptions;
use super::relay::SelectionRelay;
use super::state::{ConnectionState, ConnectionStatus, TickAction};

// ============================================================================
// SessionCommand
// ============================================================================

/// Internal commands for the event loop.
enum SessionCommand {
    /// Handle one inbound `message` event.
    Inbound(InboundMessage),
    /// Stop the loop.
    Shutdown,
}

// ============================================================================
// SessionInner
// ============================================================================

/// State shared between the session handles and the event loop.
pub(crate) struct SessionInner {
    options: BridgeOptions,
    sender: TransportSender,
    state: Mutex<ConnectionState>,
    correlator: Correlator,
    relay: SelectionRelay,
    events: EventBus,
}

impl SessionInner {
    pub(crate) fn new(host: HostContext, options: BridgeOptions) -> Self {
        let state = ConnectionState::new(host.window.id(), options.heartbeat_timeout());
        let sender = TransportSender::new(host, WindowLocator::new(options.max_depth));

        Self {
            sender,
            state: Mutex::new(state),
            correlator: Correlator::new(options.max_pending),
            relay: SelectionRelay::new(),
            events: EventBus::new(options.event_capacity),
            options,
        }
    }

    /// Sends through the fallback chain, using the latched peer if alive.
    fn send(&self, envelope: &Envelope) -> DeliveryReport {
        let peer = self.state.lock().peer();
        self.sender.send(envelope, peer.as_ref())
    }

    /// Handles one inbound `message` event.
    pub(crate) fn handle_inbound(&self, message: InboundMessage) {
        let Some(envelope) = Envelope::parse_inbound(&message.data) else {
            trace!("Ignoring foreign message");
            return;
        };

        let recovered = self
            .state
            .lock()
            .observe(Instant::now(), message.source.as_ref());

        if recovered {
            info!(
                via = envelope.message_type.as_str(),
                "Peer connected"
            );
            self.events.emit(BridgeEvent::PluginStatus { connected: true });
            self.send(&Envelope::host(MessageType::HandshakeAck));
        }

        self.dispatch(envelope);
    }

    /// Routes a valid peer envelope by type.
    fn dispatch(&self, envelope: Envelope) {
        match envelope.message_type {
            MessageType::Response => match envelope.id {
                Some(id) => {
                    self.correlator
                        .resolve(id, envelope.data.unwrap_or(Value::Null));
                }
                None => warn!("Response without id"),
            },

            MessageType::SelectionChanged => {
                if let Some(event) = self.relay.relay(envelope.data.as_ref()) {
                    self.events.emit(event);
                }
            }

            MessageType::RequestCredentials => {
                self.events.emit(BridgeEvent::CredentialsRequested(
                    envelope.data.unwrap_or(Value::Null),
                ));
            }

            MessageType::AuthSuccess => {
                self.events
                    .emit(BridgeEvent::AuthSuccess(envelope.data.unwrap_or(Value::Null)));
            }

            MessageType::PluginReady | MessageType::Pong => {
                trace!(message_type = envelope.message_type.as_str(), "Heartbeat");
            }

            other => {
                debug!(message_type = other.as_str(), "Ignoring host-bound message from peer");
            }
        }
    }

    /// Timer callback.
    pub(crate) fn on_tick(&self) {
        let action = self.state.lock().tick(Instant::now());

        match action {
            TickAction::SendHandshake => {
                self.send(&Envelope::host(MessageType::HandshakeAck));
            }
            TickAction::SendPing => {
                self.send(&Envelope::host(MessageType::Ping));
            }
            TickAction::PeerLost => {
                warn!(
                    timeout_ms = self.options.heartbeat_timeout().as_millis() as u64,
                    "Peer heartbeat lost"
                );
                self.events.emit(BridgeEvent::PluginStatus { connected: false });
                if self.options.fail_pending_on_disconnect {
                    self.correlator.fail_all();
                }
            }
        }
    }

    /// Registers, sends and awaits one correlated call.
    async fn request(&self, message_type: MessageType, data: Value, after: Duration) -> Reply {
        if !message_type.is_correlated() {
            warn!(message_type = message_type.as_str(), "Request with uncorrelated type");
        }

        let Some(call) = self.correlator.register(message_type) else {
            return Reply::Rejected {
                pending: self.correlator.len(),
            };
        };

        self.send(&Envelope::request(message_type, call.id(), data));
        call.wait(after).await
    }
}

// ============================================================================
// BridgeSession
// ============================================================================

/// Handle to the running bridge.
///
/// Cheap to clone; all clones share one event loop.
///
/// # Example
///
/// ```ignore
/// let session = BridgeSession::builder().host(host).spawn()?;
/// let mut events = session.subscribe();
///
/// // From the window "message" listener:
/// session.deliver(InboundMessage::from_window(data, source))?;
///
/// let reply = session.request(MessageType::GetSelection, json!({})).await;
/// ```
#[derive(Clone)]
pub struct BridgeSession {
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for BridgeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSession")
            .field("status", &self.status())
            .field("pending", &self.pending_count())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl BridgeSession {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Starts the event loop. Must run inside a tokio runtime.
    pub(crate) fn spawn(host: HostContext, options: BridgeOptions) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(SessionInner::new(host, options));

        tokio::spawn(Self::run_event_loop(Arc::clone(&inner), command_rx));

        Self { command_tx, inner }
    }

    /// Hands one inbound `message` event to the event loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] after [`shutdown`](Self::shutdown).
    pub fn deliver(&self, message: InboundMessage) -> Result<()> {
        self.command_tx
            .send(SessionCommand::Inbound(message))
            .map_err(|_| Error::SessionClosed)
    }

    /// Sends a correlated call with its configured timeout.
    pub async fn request(&self, message_type: MessageType, data: Value) -> Reply {
        let after = self.inner.options.timeout_for(message_type);
        self.inner.request(message_type, data, after).await
    }

    /// Sends a correlated call with an explicit timeout.
    pub async fn request_with_timeout(
        &self,
        message_type: MessageType,
        data: Value,
        after: Duration,
    ) -> Reply {
        self.inner.request(message_type, data, after).await
    }

    /// Subscribes to bridge events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.inner.events.subscribe()
    }

    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.lock().status()
    }

    /// Returns `true` if the peer is believed reachable.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Latest selection pushed by the peer.
    #[must_use]
    pub fn current_selection(&self) -> Option<SelectionSnapshot> {
        self.inner.relay.current()
    }

    /// Number of calls awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.correlator.len()
    }

    /// Session options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &BridgeOptions {
        &self.inner.options
    }

    /// Stops the event loop and fails pending calls.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(SessionCommand::Shutdown);
    }

    /// Event loop: inbound messages and heartbeat ticks.
    async fn run_event_loop(
        inner: Arc<SessionInner>,
        mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    ) {
        let mut ticker = interval(inner.options.heartbeat_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => inner.on_tick(),

                command = command_rx.recv() => match command {
                    Some(SessionCommand::Inbound(message)) => inner.handle_inbound(message),
                    Some(SessionCommand::Shutdown) => {
                        debug!("Shutdown command received");
                        break;
                    }
                    None => {
                        debug!("Command channel closed");
                        break;
                    }
                },
            }
        }

        inner.correlator.fail_all();
        debug!("Event loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================
