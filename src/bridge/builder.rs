//! Builder pattern for session configuration.
//!
//! # Example
//!
//! ```ignore
//! use peer_bridge::{BridgeOptions, BridgeSession};
//!
//! let session = BridgeSession::builder()
//!     .host(host_context)
//!     .options(BridgeOptions::new().with_max_depth(4))
//!     .spawn()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use tokio::runtime::Handle;
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::HostContext;

use super::options::BridgeOptions;
use super::session::BridgeSession;

// ============================================================================
// BridgeBuilder
// ============================================================================

/// Builder for a [`BridgeSession`].
///
/// Use [`BridgeSession::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct BridgeBuilder {
    /// Host page window and document.
    host: Option<HostContext>,
    /// Session tunables.
    options: BridgeOptions,
}

impl BridgeBuilder {
    /// Creates a builder with default options and no host.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host page context.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: HostContext) -> Self {
        self.host = Some(host);
        self
    }

    /// Replaces the session options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates the configuration and starts the session event loop.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no host context was set
    /// - [`Error::Config`] if the options are invalid
    /// - [`Error::Config`] if called outside a tokio runtime
    pub fn spawn(self) -> Result<BridgeSession> {
        let host = self
            .host
            .ok_or_else(|| Error::config("host context is required"))?;
        self.options.validate()?;

        if Handle::try_current().is_err() {
            return Err(Error::config("bridge session must be spawned inside a tokio runtime"));
        }

        debug!(
            heartbeat_interval_ms = self.options.heartbeat_interval.as_millis() as u64,
            max_depth = self.options.max_depth,
            "Spawning bridge session"
        );
        Ok(BridgeSession::spawn(host, self.options))
    }
}

// ============================================================================
// Tests
// ============================================================================
