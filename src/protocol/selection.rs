//! Selection snapshot pushed by the peer.
//!
//! Older peers post the node list bare, newer ones wrap it in an object
//! next to a preview image. Both shapes are folded into one
//! [`SelectionSnapshot`] here and nowhere else.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// SelectionNode
// ============================================================================

/// Simplified descriptor of one selected node, kept exactly as the peer
/// sent it.
///
/// The accessors read the well-known fields without requiring them to be
/// present or well-typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionNode(Value);

impl SelectionNode {
    /// Wraps a raw node descriptor.
    #[inline]
    #[must_use]
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    /// Node id, e.g. `"1:1"`. Numeric ids are rendered as strings.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// Node type, e.g. `"FRAME"`.
    #[must_use]
    pub fn node_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Any other descriptor field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The descriptor as received.
    #[inline]
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

// ============================================================================
// PreviewImage
// ============================================================================

/// Preview image as sent by the peer: a `data:` URL or bare base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewImage(String);

impl PreviewImage {
    /// Wraps a raw preview string.
    #[inline]
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the MIME type of a `data:` URL, e.g. `image/png`.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        let header = self.0.strip_prefix("data:")?.split(',').next()?;
        let mime = header.split(';').next()?;
        (!mime.is_empty()).then_some(mime)
    }

    /// Decodes the image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Base64`](crate::Error::Base64) if the payload is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let payload = match self.0.split_once(',') {
            Some((header, body)) if header.starts_with("data:") => body,
            _ => self.0.as_str(),
        };
        Ok(STANDARD.decode(payload.trim())?)
    }
}

// ============================================================================
// SelectionSnapshot
// ============================================================================

/// Normalized selection state relayed to downstream consumers.
///
/// Replaced wholesale on every push; snapshots are never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionSnapshot {
    /// Selected nodes in peer order.
    pub nodes: Vec<SelectionNode>,

    /// Id of the first selected node, if it has a usable one.
    #[serde(rename = "selectedId", skip_serializing_if = "Option::is_none")]
    pub selected_id: Option<String>,

    /// Optional preview of the selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<PreviewImage>,
}

/// Payload shapes the peer has used over time.
#[derive(Deserialize)]
#[serde(untagged)]
enum SelectionPayload {
    Bare(Vec<SelectionNode>),
    Wrapped {
        #[serde(default)]
        nodes: Vec<SelectionNode>,
        #[serde(default, alias = "image")]
        preview: Option<PreviewImage>,
    },
}

impl SelectionSnapshot {
    /// Builds a snapshot from nodes and an optional preview.
    #[must_use]
    pub fn new(nodes: Vec<SelectionNode>, preview: Option<PreviewImage>) -> Self {
        let selected_id = nodes.first().and_then(SelectionNode::id);
        Self {
            nodes,
            selected_id,
            preview,
        }
    }

    /// Normalizes a `selection-changed` (or `get-selection` reply) payload.
    ///
    /// A missing or `null` payload is an empty selection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the payload matches
    /// neither accepted shape.
    pub fn from_payload(data: Option<&Value>) -> Result<Self> {
        let payload = match data {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(value) => SelectionPayload::deserialize(value)?,
        };

        Ok(match payload {
            SelectionPayload::Bare(nodes) => Self::new(nodes, None),
            SelectionPayload::Wrapped { nodes, preview } => Self::new(nodes, preview),
        })
    }

    /// Returns `true` if nothing is selected.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_bare_array() {
        let data = json!([{ "id": "1:1", "name": "Frame", "type": "FRAME" }]);
        let snapshot = SelectionSnapshot::from_payload(Some(&data)).expect("parse");

        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.selected_id.as_deref(), Some("1:1"));
        assert_eq!(snapshot.nodes[0].node_type(), Some("FRAME"));
        assert_eq!(snapshot.nodes[0].name(), Some("Frame"));
        assert!(snapshot.preview.is_none());
    }

    #[test]
    fn test_wrapped_object_with_image_alias() {
        let data = json!({
            "nodes": [{ "id": "2:5", "width": 120 }],
            "image": "data:image/png;base64,aGVsbG8="
        });
        let snapshot = SelectionSnapshot::from_payload(Some(&data)).expect("parse");

        assert_eq!(snapshot.selected_id.as_deref(), Some("2:5"));
        assert_eq!(snapshot.nodes[0].get("width"), Some(&json!(120)));

        let preview = snapshot.preview.expect("preview");
        assert_eq!(preview.mime_type(), Some("image/png"));
        assert_eq!(preview.decode().expect("decode"), b"hello");
    }

    #[test]
    fn test_missing_or_null_is_empty() {
        assert!(SelectionSnapshot::from_payload(None).expect("none").is_empty());
        assert!(
            SelectionSnapshot::from_payload(Some(&Value::Null))
                .expect("null")
                .is_empty()
        );

        let empty = SelectionSnapshot::from_payload(Some(&json!({ "nodes": [] }))).expect("empty");
        assert!(empty.is_empty());
        assert!(empty.selected_id.is_none());
    }

    #[test]
    fn test_odd_node_fields_pass_through() {
        let data = json!({
            "nodes": [
                { "id": null, "name": null, "type": 7 },
                { "id": 42, "name": "Numeric" }
            ]
        });
        let snapshot = SelectionSnapshot::from_payload(Some(&data)).expect("parse");

        assert_eq!(snapshot.nodes.len(), 2);
        assert!(snapshot.selected_id.is_none());
        assert!(snapshot.nodes[0].node_type().is_none());
        assert_eq!(snapshot.nodes[1].id().as_deref(), Some("42"));

        let round = serde_json::to_value(&snapshot).expect("serialize");
        assert_eq!(round["nodes"], data["nodes"]);
    }

    #[test]
    fn test_numeric_first_id_is_selected() {
        let data = json!([{ "id": 3 }, { "id": "1:1" }]);
        let snapshot = SelectionSnapshot::from_payload(Some(&data)).expect("parse");

        assert_eq!(snapshot.selected_id.as_deref(), Some("3"));
    }

    #[test]
    fn test_unrecognized_shape_is_error() {
        assert!(SelectionSnapshot::from_payload(Some(&json!(42))).is_err());
        assert!(SelectionSnapshot::from_payload(Some(&json!("1:1"))).is_err());
    }

    #[test]
    fn test_bare_base64_preview() {
        let preview = PreviewImage::new("aGVsbG8=");
        assert!(preview.mime_type().is_none());
        assert_eq!(preview.decode().expect("decode"), b"hello");
        assert!(PreviewImage::new("data:image/png;base64,@@@").decode().is_err());
    }

    proptest! {
        #[test]
        fn prop_both_shapes_agree(ids in proptest::collection::vec("[0-9]{1,3}:[0-9]{1,3}", 0..8)) {
            let nodes: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
            let bare = SelectionSnapshot::from_payload(Some(&Value::Array(nodes.clone())))
                .expect("bare");
            let wrapped = SelectionSnapshot::from_payload(Some(&json!({ "nodes": nodes })))
                .expect("wrapped");

            prop_assert_eq!(&bare, &wrapped);
            prop_assert_eq!(bare.selected_id, ids.first().cloned());
        }
    }
}
