//! Bridge session: connection state, correlation and event relay.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `api` | Typed RPC helpers |
//! | `builder` | Session builder |
//! | `correlator` | Pending request table and [`Reply`] |
//! | `events` | Event bus |
//! | `options` | Session tunables |
//! | `relay` | Selection relay |
//! | `session` | [`BridgeSession`] and its event loop |
//! | `state` | Connection state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Typed RPC helpers.
pub mod api;

/// Session builder.
pub mod builder;

/// Request/response correlation.
pub mod correlator;

/// Event bus.
pub mod events;

/// Session configuration.
pub mod options;

/// Selection relay.
pub mod relay;

/// Session handle and event loop.
pub mod session;

/// Connection state machine.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::ExecuteOutcome;
pub use builder::BridgeBuilder;
pub use correlator::{Correlator, PendingCall, Reply};
pub use events::{BridgeEvent, EventBus};
pub use options::BridgeOptions;
pub use relay::SelectionRelay;
pub use session::BridgeSession;
pub use state::{ConnectionState, ConnectionStatus, TickAction};
