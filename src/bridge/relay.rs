//! Selection relay.
//!
//! Normalizes each `selection-changed` push and keeps only the latest
//! snapshot.

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::protocol::SelectionSnapshot;

use super::BridgeEvent;

/// Holds the current selection.
#[derive(Debug, Default)]
pub struct SelectionRelay {
    current: Mutex<Option<SelectionSnapshot>>,
}

impl SelectionRelay {
    /// Creates an empty relay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes a pushed payload, replaces the current snapshot and
    /// returns the event to publish.
    ///
    /// Payloads matching no known shape are dropped and yield `None`.
    pub fn relay(&self, data: Option<&Value>) -> Option<BridgeEvent> {
        let snapshot = match SelectionSnapshot::from_payload(data) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Dropping unrecognized selection payload");
                return None;
            }
        };

        debug!(
            nodes = snapshot.nodes.len(),
            selected_id = ?snapshot.selected_id,
            preview = snapshot.preview.is_some(),
            "Selection changed"
        );
        *self.current.lock() = Some(snapshot.clone());
        Some(BridgeEvent::SelectionUpdated(snapshot))
    }

    /// Latest snapshot, if the peer pushed one.
    #[must_use]
    pub fn current(&self) -> Option<SelectionSnapshot> {
        self.current.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_replaces_wholesale() {
        let relay = SelectionRelay::new();

        relay.relay(Some(&json!({ "nodes": [{ "id": "1:1" }] })));
        let event = relay.relay(Some(&json!({ "nodes": [] }))).expect("event");

        assert_eq!(event, BridgeEvent::SelectionUpdated(SelectionSnapshot::default()));
        assert!(relay.current().expect("current").is_empty());
    }

    #[test]
    fn test_node_without_id_still_relayed() {
        let relay = SelectionRelay::new();
        relay.relay(Some(&json!([{ "id": "1:1" }])));

        let event = relay
            .relay(Some(&json!({ "nodes": [{ "id": null }] })))
            .expect("event");

        let BridgeEvent::SelectionUpdated(snapshot) = event else {
            panic!("unexpected event: {event:?}");
        };
        assert_eq!(snapshot.nodes.len(), 1);
        assert!(snapshot.selected_id.is_none());
        assert_eq!(relay.current(), Some(snapshot));
    }

    #[test]
    fn test_bad_payload_keeps_previous() {
        let relay = SelectionRelay::new();
        relay.relay(Some(&json!([{ "id": "1:1" }])));

        assert!(relay.relay(Some(&json!(17))).is_none());
        assert_eq!(
            relay.current().and_then(|s| s.selected_id).as_deref(),
            Some("1:1")
        );
    }
}
