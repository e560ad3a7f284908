//! `postMessage` transport layer.
//!
//! This module holds the seams to the browser (`PeerWindow`, `HostContext`)
//! and the sender that turns one envelope into a set of `postMessage`
//! calls.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                             ┌──────────────────┐
//! │  Content script  │        postMessage          │  Plugin iframe   │
//! │  (host)          │ ──────────────────────────► │  (peer)          │
//! │                  │  direct / located / global  │                  │
//! │  BridgeSession   │ ◄────────────────────────── │                  │
//! │                  │    window "message" event   │                  │
//! └──────────────────┘                             └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `sender` | Fallback delivery chain |
//! | `window` | Host environment seams |

// ============================================================================
// Submodules
// ============================================================================

/// Fallback delivery chain.
pub mod sender;

/// Host environment seams.
pub mod window;

// ============================================================================
// Re-exports
// ============================================================================

pub use sender::{DELIVERY_CHAIN, DeliveryReport, DeliveryTier, TierOutcome, TransportSender};
pub use window::{HostContext, InboundMessage, PeerWindow};
