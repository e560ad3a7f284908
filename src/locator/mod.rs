//! Window locator.
//!
//! Enumerates every window reachable from the host document that might be
//! the plugin iframe: `<iframe>` elements, iframes inside shadow roots, and
//! iframes nested inside same-origin frames. The enumeration is recomputed
//! on every send because the page mutates its DOM continuously.
//!
//! # Traversal
//!
//! Breadth-first over an explicit worklist of `(scope, depth)` pairs. The
//! root document is depth 0; a shadow root or a same-origin frame document
//! sits one level below the scope it was found in. Scopes deeper than
//! `max_depth` are not expanded, which bounds the walk against runaway or
//! cyclic embedding.
//!
//! Any DOM error (cross-origin access, detached node) drops that branch
//! only. Cross-origin frames still contribute their `contentWindow` as a
//! message target; they are never searched.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::error::Result;
use crate::identifiers::WindowId;
use crate::transport::PeerWindow;

// ============================================================================
// Constants
// ============================================================================

/// Default maximum scope depth searched.
pub const DEFAULT_MAX_DEPTH: usize = 8;

// ============================================================================
// DOM Seams
// ============================================================================

/// A searchable subtree: a document or a shadow root.
pub trait DomScope: Send + Sync {
    /// Every `<iframe>` directly in this scope (not inside nested shadow
    /// roots or frames).
    ///
    /// # Errors
    ///
    /// Returns [`Error::DomAccess`](crate::Error::DomAccess) if the scope can
    /// not be queried.
    fn iframes(&self) -> Result<Vec<Arc<dyn FrameElement>>>;

    /// Shadow roots attached to elements in this scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DomAccess`](crate::Error::DomAccess) if the tree walk
    /// fails.
    fn shadow_roots(&self) -> Result<Vec<Arc<dyn DomScope>>>;
}

/// An `<iframe>` element.
pub trait FrameElement: Send + Sync {
    /// The frame's `contentWindow`, if it has one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DomAccess`](crate::Error::DomAccess) for detached elements.
    fn content_window(&self) -> Result<Option<Arc<dyn PeerWindow>>>;

    /// The frame's `contentDocument`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CrossOrigin`](crate::Error::CrossOrigin) when script
    /// access is denied.
    fn content_document(&self) -> Result<Option<Arc<dyn DomScope>>>;
}

// ============================================================================
// WindowLocator
// ============================================================================

/// Finds candidate peer windows under a root scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLocator {
    max_depth: usize,
}

impl Default for WindowLocator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl WindowLocator {
    /// Creates a locator with the given depth cap.
    #[inline]
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Returns the depth cap.
    #[inline]
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Starts a lazy enumeration of candidate windows under `root`.
    ///
    /// Call again to restart; nothing is cached between enumerations.
    #[must_use]
    pub fn locate(&self, root: Arc<dyn DomScope>) -> Candidates {
        let mut scopes = VecDeque::new();
        scopes.push_back((root, 0));

        Candidates {
            scopes,
            ready: VecDeque::new(),
            seen: FxHashSet::default(),
            max_depth: self.max_depth,
        }
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// Lazy iterator over candidate windows, de-duplicated by [`WindowId`].
pub struct Candidates {
    scopes: VecDeque<(Arc<dyn DomScope>, usize)>,
    ready: VecDeque<Arc<dyn PeerWindow>>,
    seen: FxHashSet<WindowId>,
    max_depth: usize,
}

impl Candidates {
    /// Expands one scope: queues its frame windows and its child scopes.
    fn expand(&mut self, scope: &dyn DomScope, depth: usize) {
        match scope.iframes() {
            Ok(frames) => {
                for frame in frames {
                    self.visit_frame(frame.as_ref(), depth);
                }
            }
            Err(e) => trace!(depth, error = %e, "Skipping unreadable scope"),
        }

        match scope.shadow_roots() {
            Ok(roots) => {
                self.scopes
                    .extend(roots.into_iter().map(|root| (root, depth + 1)));
            }
            Err(e) => trace!(depth, error = %e, "Skipping shadow root walk"),
        }
    }

    fn visit_frame(&mut self, frame: &dyn FrameElement, depth: usize) {
        match frame.content_window() {
            Ok(Some(window)) => {
                if self.seen.insert(window.id()) {
                    self.ready.push_back(window);
                }
            }
            Ok(None) => {}
            Err(e) => trace!(depth, error = %e, "Frame has no usable window"),
        }

        match frame.content_document() {
            Ok(Some(document)) => self.scopes.push_back((document, depth + 1)),
            Ok(None) => {}
            Err(e) => trace!(depth, error = %e, "Not searching frame document"),
        }
    }
}

impl Iterator for Candidates {
    type Item = Arc<dyn PeerWindow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(window) = self.ready.pop_front() {
                return Some(window);
            }

            let (scope, depth) = self.scopes.pop_front()?;
            if depth > self.max_depth {
                trace!(depth, max_depth = self.max_depth, "Depth cap reached");
                continue;
            }
            self.expand(scope.as_ref(), depth);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFrame, MockScope, MockWindow};
    use proptest::prelude::*;

    fn ids(candidates: Candidates) -> Vec<u64> {
        candidates.map(|w| w.id().as_u64()).collect()
    }

    #[test]
    fn test_top_level_iframes() {
        let root = MockScope::new()
            .with_frame(MockFrame::cross_origin(MockWindow::new(1)))
            .with_frame(MockFrame::cross_origin(MockWindow::new(2)));

        let found = ids(WindowLocator::default().locate(root.into_scope()));
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn test_iframe_inside_shadow_root() {
        let shadow = MockScope::new().with_frame(MockFrame::cross_origin(MockWindow::new(5)));
        let root = MockScope::new().with_shadow_root(shadow);

        let found = ids(WindowLocator::default().locate(root.into_scope()));
        assert_eq!(found, vec![5]);
    }

    #[test]
    fn test_same_origin_frame_is_searched() {
        let inner = MockScope::new().with_frame(MockFrame::cross_origin(MockWindow::new(11)));
        let root = MockScope::new().with_frame(MockFrame::same_origin(MockWindow::new(10), inner));

        let found = ids(WindowLocator::default().locate(root.into_scope()));
        assert_eq!(found, vec![10, 11]);
    }

    #[test]
    fn test_failing_branches_yield_partial_results() {
        let broken = MockScope::failing();
        let root = MockScope::new()
            .with_shadow_root(broken)
            .with_frame(MockFrame::detached())
            .with_frame(MockFrame::cross_origin(MockWindow::new(3)));

        let found = ids(WindowLocator::default().locate(root.into_scope()));
        assert_eq!(found, vec![3]);
    }

    #[test]
    fn test_duplicate_windows_are_yielded_once() {
        let window = MockWindow::new(4);
        let shadow = MockScope::new().with_frame(MockFrame::cross_origin(window.clone()));
        let root = MockScope::new()
            .with_frame(MockFrame::cross_origin(window))
            .with_shadow_root(shadow);

        let found = ids(WindowLocator::default().locate(root.into_scope()));
        assert_eq!(found, vec![4]);
    }

    #[test]
    fn test_depth_cap_on_long_chain() {
        let locator = WindowLocator::default();
        let root = MockScope::frame_chain(DEFAULT_MAX_DEPTH + 5);

        let found = ids(locator.locate(root));
        assert_eq!(found.len(), DEFAULT_MAX_DEPTH + 1);
        assert_eq!(found.last(), Some(&(DEFAULT_MAX_DEPTH as u64)));
    }

    #[test]
    fn test_enumeration_is_restartable() {
        let root = MockScope::new()
            .with_frame(MockFrame::cross_origin(MockWindow::new(1)))
            .into_scope();
        let locator = WindowLocator::default();

        assert_eq!(ids(locator.locate(Arc::clone(&root))), vec![1]);
        assert_eq!(ids(locator.locate(root)), vec![1]);
    }

    proptest! {
        #[test]
        fn prop_depth_bound(chain in 0usize..24, max_depth in 0usize..12) {
            let locator = WindowLocator::new(max_depth);
            let found = ids(locator.locate(MockScope::frame_chain(chain)));

            // Window `d` lives in the scope at depth `d`.
            prop_assert_eq!(found.len(), chain.min(max_depth + 1));
            prop_assert!(found.iter().all(|&d| d as usize <= max_depth));
        }
    }
}
