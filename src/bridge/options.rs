//! Bridge session configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use peer_bridge::{BridgeOptions, MessageType};
//!
//! let options = BridgeOptions::new()
//!     .with_heartbeat_interval(Duration::from_secs(3))
//!     .with_timeout(MessageType::GetSelection, Duration::from_secs(5))
//!     .with_max_depth(4);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::locator::DEFAULT_MAX_DEPTH;
use crate::protocol::MessageType;

// ============================================================================
// Constants
// ============================================================================

/// Default period of the handshake/ping timer.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Heartbeat timeout as a multiple of the heartbeat interval.
pub const HEARTBEAT_TIMEOUT_FACTOR: u32 = 5;

/// Maximum pending requests before new ones are rejected.
pub const DEFAULT_MAX_PENDING: usize = 100;

/// Buffered events per subscriber before it starts lagging.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

// ============================================================================
// BridgeOptions
// ============================================================================

/// Tunables of a [`BridgeSession`](super::BridgeSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Period of the single repeating timer (handshake retry or ping).
    pub heartbeat_interval: Duration,

    /// Silence after which a connected peer is declared lost.
    /// `None` means [`HEARTBEAT_TIMEOUT_FACTOR`] × interval.
    pub heartbeat_timeout: Option<Duration>,

    /// Depth cap of the window locator.
    pub max_depth: usize,

    /// Per-type reply timeout overrides.
    pub timeouts: FxHashMap<MessageType, Duration>,

    /// Fail in-flight requests as soon as the heartbeat is lost.
    pub fail_pending_on_disconnect: bool,

    /// Pending request cap.
    pub max_pending: usize,

    /// Event bus capacity.
    pub event_capacity: usize,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl BridgeOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: None,
            max_depth: DEFAULT_MAX_DEPTH,
            timeouts: FxHashMap::default(),
            fail_pending_on_disconnect: true,
            max_pending: DEFAULT_MAX_PENDING,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeOptions {
    /// Sets the heartbeat timer period.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets an explicit heartbeat timeout.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = Some(timeout);
        self
    }

    /// Sets the window locator depth cap.
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Overrides the reply timeout of one message type.
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, message_type: MessageType, timeout: Duration) -> Self {
        self.timeouts.insert(message_type, timeout);
        self
    }

    /// Leaves in-flight requests to their own timeouts on heartbeat loss.
    #[inline]
    #[must_use]
    pub fn without_eager_failure(mut self) -> Self {
        self.fail_pending_on_disconnect = false;
        self
    }

    /// Sets the pending request cap.
    #[inline]
    #[must_use]
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    /// Sets the event bus capacity.
    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl BridgeOptions {
    /// Effective heartbeat timeout.
    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
            .unwrap_or(self.heartbeat_interval * HEARTBEAT_TIMEOUT_FACTOR)
    }

    /// Effective reply timeout for a message type.
    #[must_use]
    pub fn timeout_for(&self, message_type: MessageType) -> Duration {
        self.timeouts
            .get(&message_type)
            .copied()
            .unwrap_or_else(|| message_type.default_timeout())
    }

    /// Checks the options for values the session can not run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(Error::config("heartbeat interval must be non-zero"));
        }
        if self.heartbeat_timeout() <= self.heartbeat_interval {
            return Err(Error::config(format!(
                "heartbeat timeout ({:?}) must exceed the heartbeat interval ({:?})",
                self.heartbeat_timeout(),
                self.heartbeat_interval
            )));
        }
        if self.max_pending == 0 {
            return Err(Error::config("max pending requests must be non-zero"));
        }
        if self.event_capacity == 0 {
            return Err(Error::config("event capacity must be non-zero"));
        }
        for (message_type, timeout) in &self.timeouts {
            if !message_type.is_correlated() {
                return Err(Error::config(format!(
                    "{} is not a correlated call",
                    message_type.as_str()
                )));
            }
            if timeout.is_zero() {
                return Err(Error::config(format!(
                    "timeout for {} must be non-zero",
                    message_type.as_str()
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
