//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing a correlation id with a window id at
//! compile time.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`CorrelationId`] | Pairs a request envelope with its `response` |
//! | [`WindowId`] | Identity of a message target window |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// CorrelationId
// ============================================================================

/// Correlation id carried in the envelope `id` field.
///
/// Allocated by [`CorrelationIdGenerator`], monotonically increasing for
/// the lifetime of a session and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CorrelationIdGenerator
// ============================================================================

/// Monotonic source of [`CorrelationId`]s. The first id handed out is `1`.
#[derive(Debug, Default)]
pub struct CorrelationIdGenerator {
    last: AtomicU64,
}

impl CorrelationIdGenerator {
    /// Creates a generator starting at `1`.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Allocates the next id.
    #[inline]
    pub fn next_id(&self) -> CorrelationId {
        CorrelationId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

// ============================================================================
// WindowId
// ============================================================================

/// Identity of a window reachable through `postMessage`.
///
/// Assigned by the host binding. Two handles with the same id refer to the
/// same browsing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(u64);

impl WindowId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_is_monotonic() {
        let generator = CorrelationIdGenerator::new();
        let ids: Vec<_> = (0..5).map(|_| generator.next_id()).collect();

        assert_eq!(ids.first(), Some(&CorrelationId::new(1)));
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_correlation_id_serializes_as_number() {
        let json = serde_json::to_string(&CorrelationId::new(42)).expect("serialize");
        assert_eq!(json, "42");
    }

    #[test]
    fn test_window_id_display() {
        assert_eq!(WindowId::new(9).to_string(), "9");
    }
}
