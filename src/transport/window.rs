//! Host environment seams for `postMessage`.
//!
//! The browser binding implements [`PeerWindow`] for real `Window` objects
//! and hands the bridge a [`HostContext`] at startup plus one
//! [`InboundMessage`] per `message` event.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::identifiers::WindowId;
use crate::locator::DomScope;

// ============================================================================
// PeerWindow
// ============================================================================

/// A window that can receive `postMessage`.
pub trait PeerWindow: Send + Sync {
    /// Stable identity of the browsing context.
    fn id(&self) -> WindowId;

    /// Posts a message with target origin `*`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PostFailed`](crate::Error::PostFailed) if the window is
    /// detached or no longer accepts messages.
    fn post_message(&self, message: &Value) -> Result<()>;
}

impl fmt::Debug for dyn PeerWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerWindow").field("id", &self.id()).finish()
    }
}

// ============================================================================
// HostContext
// ============================================================================

/// The content script's own window and document.
#[derive(Clone)]
pub struct HostContext {
    /// The host page's `window`, used for the global broadcast.
    pub window: Arc<dyn PeerWindow>,

    /// Root document searched for candidate frames.
    pub document: Arc<dyn DomScope>,
}

impl HostContext {
    /// Creates a host context.
    #[inline]
    #[must_use]
    pub fn new(window: Arc<dyn PeerWindow>, document: Arc<dyn DomScope>) -> Self {
        Self { window, document }
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("window", &self.window.id())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// InboundMessage
// ============================================================================

/// One `message` event as seen by the host's listener.
#[derive(Clone)]
pub struct InboundMessage {
    /// `event.data`.
    pub data: Value,

    /// `event.source`, if the binding could capture it.
    pub source: Option<Arc<dyn PeerWindow>>,
}

impl InboundMessage {
    /// Creates an inbound message without a source window.
    #[inline]
    #[must_use]
    pub fn new(data: Value) -> Self {
        Self { data, source: None }
    }

    /// Creates an inbound message with its source window.
    #[inline]
    #[must_use]
    pub fn from_window(data: Value, source: Arc<dyn PeerWindow>) -> Self {
        Self {
            data,
            source: Some(source),
        }
    }
}

impl fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundMessage")
            .field("data", &self.data)
            .field("source", &self.source.as_ref().map(|w| w.id()))
            .finish()
    }
}
