//! Typed RPC helpers.
//!
//! Thin wrappers over [`BridgeSession::request`] that build the payload for
//! each catalog entry and interpret the peer's answer.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{MessageType, SelectionSnapshot};

use super::{BridgeSession, Reply};

// ============================================================================
// Constants
// ============================================================================

/// URL schemes the peer can render in its media viewer.
const MEDIA_SCHEMES: &[&str] = &["http", "https", "data", "blob"];

// ============================================================================
// ExecuteOutcome
// ============================================================================

/// Result of running code on the peer.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteOutcome {
    /// Code ran; its return value.
    Success(Value),
    /// Code threw, or the peer did not answer.
    Failure(String),
}

/// `{ success, result | error }` as sent by the peer.
#[derive(Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl ExecuteOutcome {
    fn from_reply(reply: Reply) -> Self {
        let data = match reply.into_result() {
            Ok(data) => data,
            Err(e) => return Self::Failure(e.to_string()),
        };

        match ExecuteResponse::deserialize(&data) {
            Ok(ExecuteResponse {
                success: true,
                result,
                ..
            }) => Self::Success(result.unwrap_or(Value::Null)),
            Ok(ExecuteResponse { error, .. }) => {
                Self::Failure(error.unwrap_or_else(|| "execution failed".to_string()))
            }
            Err(e) => Self::Failure(format!("malformed execute response: {e}")),
        }
    }

    /// Returns `true` if the code ran.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

// ============================================================================
// BridgeSession - RPC
// ============================================================================

impl BridgeSession {
    /// Shows a toast in the plugin UI.
    pub async fn notify(&self, message: impl Into<String>) -> Reply {
        self.request(MessageType::Notify, json!({ "message": message.into() }))
            .await
    }

    /// Asks the peer for its current selection.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestTimeout`] / [`Error::PeerLost`] if the peer did not answer
    /// - [`Error::Json`] if the answer is not a selection payload
    pub async fn get_selection(&self) -> Result<SelectionSnapshot> {
        let data = self
            .request(MessageType::GetSelection, json!({}))
            .await
            .into_result()?;
        SelectionSnapshot::from_payload(Some(&data))
    }

    /// Applies property updates to a node.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `node_id` is empty or `updates` is not an object
    /// - [`Error::RequestTimeout`] / [`Error::PeerLost`] if the peer did not answer
    pub async fn update_node(&self, node_id: &str, updates: Value) -> Result<Value> {
        if node_id.is_empty() {
            return Err(Error::invalid_argument("node id must not be empty"));
        }
        if !updates.is_object() {
            return Err(Error::invalid_argument("node updates must be a JSON object"));
        }

        self.request(
            MessageType::UpdateNode,
            json!({ "nodeId": node_id, "updates": updates }),
        )
        .await
        .into_result()
    }

    /// Runs plugin-API code on the peer.
    ///
    /// Never fails; a silent peer is reported as [`ExecuteOutcome::Failure`].
    pub async fn execute(&self, code: &str) -> ExecuteOutcome {
        let reply = self
            .request(MessageType::Execute, json!({ "code": code }))
            .await;
        let outcome = ExecuteOutcome::from_reply(reply);
        debug!(success = outcome.is_success(), "Execute finished");
        outcome
    }

    /// Places an instance of a library component.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `component_key` is empty
    /// - [`Error::RequestTimeout`] / [`Error::PeerLost`] if the peer did not answer
    pub async fn instantiate_component(
        &self,
        component_key: &str,
        position: Option<(f64, f64)>,
    ) -> Result<Value> {
        if component_key.is_empty() {
            return Err(Error::invalid_argument("component key must not be empty"));
        }

        let mut data = json!({ "componentKey": component_key });
        if let Some((x, y)) = position {
            data["position"] = json!({ "x": x, "y": y });
        }

        self.request(MessageType::InstantiateComponent, data)
            .await
            .into_result()
    }

    /// Attaches an annotation to a node.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `node_id` is empty
    /// - [`Error::RequestTimeout`] / [`Error::PeerLost`] if the peer did not answer
    pub async fn create_annotation(&self, node_id: &str, label: &str) -> Result<Value> {
        if node_id.is_empty() {
            return Err(Error::invalid_argument("node id must not be empty"));
        }

        self.request(
            MessageType::CreateAnnotation,
            json!({ "nodeId": node_id, "label": label }),
        )
        .await
        .into_result()
    }

    /// Forwards a model request to the peer, which owns the credentials.
    pub async fn ai_request(&self, payload: Value) -> Reply {
        self.request(MessageType::AiRequest, payload).await
    }

    /// Opens media in the plugin's viewer.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if `url` does not parse
    /// - [`Error::InvalidArgument`] for schemes the viewer can not load
    /// - [`Error::RequestTimeout`] / [`Error::PeerLost`] if the peer did not answer
    pub async fn show_media(&self, url: &str, caption: Option<&str>) -> Result<Value> {
        let parsed = Url::parse(url)?;
        if !MEDIA_SCHEMES.contains(&parsed.scheme()) {
            return Err(Error::invalid_argument(format!(
                "unsupported media scheme: {}",
                parsed.scheme()
            )));
        }

        let mut data = json!({ "url": parsed.as_str() });
        if let Some(caption) = caption {
            data["caption"] = Value::String(caption.to_string());
        }

        self.request(MessageType::ShowMedia, data).await.into_result()
    }

    /// Fetches console output captured inside the plugin.
    ///
    /// Accepts a bare array or `{ "logs": [...] }`.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestTimeout`] / [`Error::PeerLost`] if the peer did not answer
    /// - [`Error::Protocol`] if the answer holds no log list
    pub async fn get_console_logs(&self) -> Result<Vec<Value>> {
        let data = self
            .request(MessageType::GetConsoleLogs, json!({}))
            .await
            .into_result()?;

        match data {
            Value::Array(logs) => Ok(logs),
            Value::Object(mut map) => match map.remove("logs") {
                Some(Value::Array(logs)) => Ok(logs),
                _ => Err(Error::protocol("No logs in response")),
            },
            Value::Null => Ok(Vec::new()),
            _ => Err(Error::protocol("No logs in response")),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
