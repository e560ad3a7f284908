//! In-memory host environment used by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};
use crate::identifiers::WindowId;
use crate::locator::{DomScope, FrameElement};
use crate::transport::{HostContext, PeerWindow};

/// Installs a test subscriber once; honours `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MockWindow
// ============================================================================

/// Window that records every message posted to it.
#[derive(Debug)]
pub(crate) struct MockWindow {
    id: WindowId,
    posted: Mutex<Vec<Value>>,
    failing: AtomicBool,
}

impl MockWindow {
    pub(crate) fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id: WindowId::new(id),
            posted: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        })
    }

    /// Makes subsequent posts fail like a torn-down iframe.
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn posted(&self) -> Vec<Value> {
        self.posted.lock().clone()
    }

    /// `type` field of every posted envelope.
    pub(crate) fn posted_types(&self) -> Vec<String> {
        self.posted
            .lock()
            .iter()
            .filter_map(|v| v.get("type").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.posted.lock().clear();
    }
}

impl PeerWindow for MockWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn post_message(&self, message: &Value) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::post_failed(self.id, "window detached"));
        }
        self.posted.lock().push(message.clone());
        Ok(())
    }
}

// ============================================================================
// MockFrame
// ============================================================================

pub(crate) struct MockFrame {
    window: Option<Arc<MockWindow>>,
    document: Option<Arc<MockScope>>,
    detached: bool,
}

impl MockFrame {
    /// Opaque frame: message target only.
    pub(crate) fn cross_origin(window: Arc<MockWindow>) -> Self {
        Self {
            window: Some(window),
            document: None,
            detached: false,
        }
    }

    /// Frame whose document is searchable.
    pub(crate) fn same_origin(window: Arc<MockWindow>, document: MockScope) -> Self {
        Self {
            window: Some(window),
            document: Some(Arc::new(document)),
            detached: false,
        }
    }

    /// Frame whose every access throws.
    pub(crate) fn detached() -> Self {
        Self {
            window: None,
            document: None,
            detached: true,
        }
    }
}

impl FrameElement for MockFrame {
    fn content_window(&self) -> Result<Option<Arc<dyn PeerWindow>>> {
        if self.detached {
            return Err(Error::dom_access("detached iframe"));
        }
        Ok(self
            .window
            .as_ref()
            .map(|w| Arc::clone(w) as Arc<dyn PeerWindow>))
    }

    fn content_document(&self) -> Result<Option<Arc<dyn DomScope>>> {
        if self.detached {
            return Err(Error::dom_access("detached iframe"));
        }
        match &self.document {
            Some(document) => Ok(Some(Arc::clone(document) as Arc<dyn DomScope>)),
            None => Err(Error::CrossOrigin),
        }
    }
}

// ============================================================================
// MockScope
// ============================================================================

#[derive(Default)]
pub(crate) struct MockScope {
    frames: Vec<Arc<MockFrame>>,
    shadow_roots: Vec<Arc<MockScope>>,
    failing: bool,
}

impl MockScope {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Scope whose queries throw.
    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub(crate) fn with_frame(mut self, frame: MockFrame) -> Self {
        self.frames.push(Arc::new(frame));
        self
    }

    pub(crate) fn with_shadow_root(mut self, root: MockScope) -> Self {
        self.shadow_roots.push(Arc::new(root));
        self
    }

    pub(crate) fn into_scope(self) -> Arc<dyn DomScope> {
        Arc::new(self)
    }

    /// `len` same-origin frames nested inside each other. The window of the
    /// frame found in the scope at depth `d` has id `d`.
    pub(crate) fn frame_chain(len: usize) -> Arc<dyn DomScope> {
        let mut scope = MockScope::new();
        for depth in (0..len).rev() {
            let window = MockWindow::new(depth as u64);
            scope = MockScope::new().with_frame(MockFrame::same_origin(window, scope));
        }
        scope.into_scope()
    }
}

impl DomScope for MockScope {
    fn iframes(&self) -> Result<Vec<Arc<dyn FrameElement>>> {
        if self.failing {
            return Err(Error::dom_access("querySelectorAll threw"));
        }
        Ok(self
            .frames
            .iter()
            .map(|f| Arc::clone(f) as Arc<dyn FrameElement>)
            .collect())
    }

    fn shadow_roots(&self) -> Result<Vec<Arc<dyn DomScope>>> {
        if self.failing {
            return Err(Error::dom_access("tree walker threw"));
        }
        Ok(self
            .shadow_roots
            .iter()
            .map(|r| Arc::clone(r) as Arc<dyn DomScope>)
            .collect())
    }
}

// ============================================================================
// MockHost
// ============================================================================

/// Host page with one cross-origin plugin iframe.
pub(crate) struct MockHost {
    pub(crate) window: Arc<MockWindow>,
    pub(crate) peer: Arc<MockWindow>,
    pub(crate) context: HostContext,
}

/// Id of the host page's own window in [`MockHost`].
pub(crate) const HOST_WINDOW_ID: u64 = 100;

/// Id of the plugin iframe window in [`MockHost`].
pub(crate) const PEER_WINDOW_ID: u64 = 1;

impl MockHost {
    pub(crate) fn new() -> Self {
        let window = MockWindow::new(HOST_WINDOW_ID);
        let peer = MockWindow::new(PEER_WINDOW_ID);
        let document = MockScope::new()
            .with_frame(MockFrame::cross_origin(Arc::clone(&peer)))
            .into_scope();
        let context = HostContext::new(Arc::clone(&window) as Arc<dyn PeerWindow>, document);

        Self {
            window,
            peer,
            context,
        }
    }

    pub(crate) fn peer_handle(&self) -> Arc<dyn PeerWindow> {
        Arc::clone(&self.peer) as Arc<dyn PeerWindow>
    }
}
