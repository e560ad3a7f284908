//! Peer Bridge - host side of a `postMessage` bridge to a sandboxed plugin iframe.
//!
//! A browser extension's content script (the host) has no direct handle on
//! the plugin UI iframe (the peer) that a third-party web application
//! embeds. The only channel is `postMessage`, broadcast into a DOM the host
//! does not control. This crate turns that channel into a connection with
//! liveness detection, correlated request/response calls and a live
//! selection stream.
//!
//! # Architecture
//!
//! - **Window locator**: finds candidate peer windows through iframes,
//!   shadow roots and same-origin frames, bounded by a depth cap
//! - **Transport sender**: direct → located → global broadcast fallback chain
//! - **Connection state machine**: handshake while disconnected, ping while
//!   connected, demote on silence
//! - **Correlator**: monotonic ids, every call settles (answer, timeout or
//!   peer lost), never hangs
//! - **Selection relay**: normalizes selection pushes onto the event bus
//!
//! The browser is reached only through the [`PeerWindow`],
//! [`DomScope`](locator::DomScope) and [`FrameElement`](locator::FrameElement)
//! traits, implemented by the host binding.
//!
//! # Quick Start
//!
//! ```ignore
//! use peer_bridge::{BridgeEvent, BridgeSession, HostContext, InboundMessage, Result};
//!
//! async fn run(host: HostContext) -> Result<()> {
//!     let session = BridgeSession::builder().host(host).spawn()?;
//!     let mut events = session.subscribe();
//!
//!     // window.addEventListener("message", ...) forwards here:
//!     // session.deliver(InboundMessage::from_window(event_data, event_source))?;
//!
//!     while let Ok(event) = events.recv().await {
//!         if let BridgeEvent::PluginStatus { connected: true } = event {
//!             let selection = session.get_selection().await?;
//!             println!("{} nodes selected", selection.nodes.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`BridgeSession`], state machine, correlator, events |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`locator`] | Candidate window discovery |
//! | [`protocol`] | Envelope and selection types |
//! | [`transport`] | Host seams and fallback delivery |

// ============================================================================
// Modules
// ============================================================================

/// Bridge session: connection state, correlation and event relay.
pub mod bridge;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Candidate window discovery.
pub mod locator;

/// Wire protocol types.
pub mod protocol;

/// `postMessage` transport layer.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{
    BridgeBuilder, BridgeEvent, BridgeOptions, BridgeSession, ConnectionStatus, ExecuteOutcome,
    Reply,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CorrelationId, WindowId};

// Locator types
pub use locator::{DomScope, FrameElement, WindowLocator};

// Protocol types
pub use protocol::{
    Envelope, MessageSource, MessageType, PreviewImage, SelectionNode, SelectionSnapshot,
};

// Transport types
pub use transport::{
    DeliveryReport, DeliveryTier, HostContext, InboundMessage, PeerWindow, TransportSender,
};
