//! Error types for the peer bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! Almost nothing in the bridge is fatal: transport and DOM failures are
//! caught at the branch where they happen and only logged. These variants
//! exist so the seams ([`PeerWindow`](crate::transport::PeerWindow),
//! [`DomScope`](crate::locator::DomScope)) can report what went wrong, and
//! so callers who prefer `?` can convert a [`Reply`](crate::bridge::Reply).
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Transport | [`Error::PostFailed`], [`Error::SessionClosed`] |
//! | DOM access | [`Error::DomAccess`], [`Error::CrossOrigin`] |
//! | Protocol | [`Error::Protocol`], [`Error::InvalidArgument`] |
//! | Request | [`Error::RequestTimeout`], [`Error::PeerLost`], [`Error::Rejected`] |
//! | External | [`Error::Json`], [`Error::Base64`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::{CorrelationId, WindowId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when bridge options are invalid or the host context is missing.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Posting to a window failed.
    ///
    /// Returned by [`PeerWindow::post_message`](crate::transport::PeerWindow::post_message)
    /// when the window is detached, navigated away or otherwise unusable.
    #[error("postMessage to window {window} failed: {message}")]
    PostFailed {
        /// Target window.
        window: WindowId,
        /// Description of the failure.
        message: String,
    },

    /// The session event loop is no longer running.
    #[error("Bridge session closed")]
    SessionClosed,

    // ========================================================================
    // DOM Access Errors
    // ========================================================================
    /// Touching a DOM node failed (detached node, access denied).
    #[error("DOM access failed: {message}")]
    DomAccess {
        /// Description of the failure.
        message: String,
    },

    /// Script access into a cross-origin frame was denied.
    #[error("Cross-origin frame access denied")]
    CrossOrigin,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected payload.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Invalid argument passed to an RPC helper.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Request Errors
    // ========================================================================
    /// Correlated request timed out.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: CorrelationId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Peer was lost while the request was in flight.
    #[error("Peer lost while request {request_id} was pending")]
    PeerLost {
        /// The request ID that was failed.
        request_id: CorrelationId,
    },

    /// Request refused because too many requests are pending.
    #[error("Too many pending requests: {pending}")]
    Rejected {
        /// Number of pending requests at the time of the call.
        pending: usize,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error.
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a post failure error.
    #[inline]
    pub fn post_failed(window: WindowId, message: impl Into<String>) -> Self {
        Self::PostFailed {
            window,
            message: message.into(),
        }
    }

    /// Creates a DOM access error.
    #[inline]
    pub fn dom_access(message: impl Into<String>) -> Self {
        Self::DomAccess {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: CorrelationId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a peer lost error.
    #[inline]
    pub fn peer_lost(request_id: CorrelationId) -> Self {
        Self::PeerLost { request_id }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this error came from the transport or the DOM walk.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::PostFailed { .. } | Self::DomAccess { .. } | Self::CrossOrigin
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed once the peer is reachable again.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RequestTimeout { .. }
                | Self::PeerLost { .. }
                | Self::Rejected { .. }
                | Self::PostFailed { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
