//! Envelope and message catalog.
//!
//! The broadcast channel is shared with whatever else the host page posts,
//! so inbound parsing checks the `source` tag before looking at anything
//! else.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::identifiers::CorrelationId;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for control calls answered without model inference.
pub const CONTROL_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for calls that may run a model inference or user code on the peer.
pub const INFERENCE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// MessageSource
// ============================================================================

/// Tag naming the side that authored an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageSource {
    /// Content script side.
    #[serde(rename = "bridge-host")]
    Host,
    /// Plugin iframe side.
    #[serde(rename = "bridge-peer")]
    Peer,
}

impl MessageSource {
    /// Returns the wire tag.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "bridge-host",
            Self::Peer => "bridge-peer",
        }
    }
}

// ============================================================================
// Direction
// ============================================================================

/// Which way a message type travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by the host.
    HostToPeer,
    /// Sent by the peer.
    PeerToHost,
}

// ============================================================================
// MessageType
// ============================================================================

/// Closed set of message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    HandshakeAck,
    Ping,
    Pong,
    PluginReady,
    GetSelection,
    Notify,
    UpdateNode,
    InstantiateComponent,
    CreateAnnotation,
    AiRequest,
    Execute,
    ShowMedia,
    GetConsoleLogs,
    Response,
    SelectionChanged,
    RequestCredentials,
    AuthSuccess,
}

impl MessageType {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HandshakeAck => "handshake-ack",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::PluginReady => "plugin-ready",
            Self::GetSelection => "get-selection",
            Self::Notify => "notify",
            Self::UpdateNode => "update-node",
            Self::InstantiateComponent => "instantiate-component",
            Self::CreateAnnotation => "create-annotation",
            Self::AiRequest => "ai-request",
            Self::Execute => "execute",
            Self::ShowMedia => "show-media",
            Self::GetConsoleLogs => "get-console-logs",
            Self::Response => "response",
            Self::SelectionChanged => "selection-changed",
            Self::RequestCredentials => "request-credentials",
            Self::AuthSuccess => "auth-success",
        }
    }

    /// Returns which side sends this message type.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Pong
            | Self::PluginReady
            | Self::Response
            | Self::SelectionChanged
            | Self::RequestCredentials
            | Self::AuthSuccess => Direction::PeerToHost,
            _ => Direction::HostToPeer,
        }
    }

    /// Returns `true` for RPC calls the peer answers with a `response`.
    #[must_use]
    pub const fn is_correlated(self) -> bool {
        matches!(
            self,
            Self::GetSelection
                | Self::Notify
                | Self::UpdateNode
                | Self::InstantiateComponent
                | Self::CreateAnnotation
                | Self::AiRequest
                | Self::Execute
                | Self::ShowMedia
                | Self::GetConsoleLogs
        )
    }

    /// Default reply timeout for a correlated call of this type.
    #[must_use]
    pub const fn default_timeout(self) -> Duration {
        match self {
            Self::AiRequest | Self::Execute => INFERENCE_TIMEOUT,
            _ => CONTROL_TIMEOUT,
        }
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// The unit exchanged over `postMessage`.
///
/// # Format
///
/// ```json
/// { "source": "bridge-host", "type": "get-selection", "id": 7, "data": {} }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Authoring side.
    pub source: MessageSource,

    /// Message kind.
    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Correlation id, present on request/response pairs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,

    /// Payload, shape defined per type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// Creates an uncorrelated host envelope with no payload.
    #[inline]
    #[must_use]
    pub fn host(message_type: MessageType) -> Self {
        Self {
            source: MessageSource::Host,
            message_type,
            id: None,
            data: None,
        }
    }

    /// Creates a correlated host request.
    #[inline]
    #[must_use]
    pub fn request(message_type: MessageType, id: CorrelationId, data: Value) -> Self {
        Self {
            source: MessageSource::Host,
            message_type,
            id: Some(id),
            data: Some(data),
        }
    }

    /// Creates a peer envelope. Used by host bindings that simulate the peer.
    #[inline]
    #[must_use]
    pub fn peer(message_type: MessageType, id: Option<CorrelationId>, data: Option<Value>) -> Self {
        Self {
            source: MessageSource::Peer,
            message_type,
            id,
            data,
        }
    }

    /// Parses a raw inbound message.
    ///
    /// Returns `None` when `source` is missing or is not the peer tag; the
    /// rest of the object is not looked at in that case. Envelopes with an
    /// unknown `type` or a non-numeric `id` are malformed and also yield
    /// `None`.
    #[must_use]
    pub fn parse_inbound(raw: &Value) -> Option<Self> {
        let source = raw.get("source").and_then(Value::as_str);
        if source != Some(MessageSource::Peer.as_str()) {
            return None;
        }

        match Self::deserialize(raw) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                trace!(error = %e, "Dropping malformed peer envelope");
                None
            }
        }
    }

    /// Serializes to the JSON value handed to `postMessage`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        // Every field is a plain enum, integer or Value.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Tests
// ============================================================================
