//! Bridge wire protocol.
//!
//! This module defines the envelope exchanged with the plugin iframe over
//! `postMessage`, and the selection payload the plugin pushes.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `handshake-ack` | Host → Peer | Announce presence, retried while disconnected |
//! | `ping` / `pong` | Host → Peer / Peer → Host | Liveness heartbeat |
//! | `plugin-ready` | Peer → Host | Peer finished booting |
//! | `get-selection`, `notify`, ... | Host → Peer | Correlated RPC call |
//! | `response` | Peer → Host | Reply carrying the call's `id` |
//! | `selection-changed` | Peer → Host | Live selection push |
//! | `request-credentials`, `auth-success` | Peer → Host | Side-channel notifications |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Envelope, source tag and message catalog |
//! | `selection` | Selection snapshot normalization |

// ============================================================================
// Submodules
// ============================================================================

/// Envelope and message catalog.
pub mod envelope;

/// Selection snapshot types.
pub mod selection;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::{Direction, Envelope, MessageSource, MessageType};
pub use selection::{PreviewImage, SelectionNode, SelectionSnapshot};
