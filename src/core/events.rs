//! Event Queue for Lifecycle Notifications
//!
//! A double-buffered queue: events written during frame N become readable
//! during frame N+1. The scene uses it to announce entities being promoted,
//! torn down, or orphaned at the sync point, so behaviours can react without
//! holding references into the registry.
//!
//! # Design Principles
//!
//! - **Type Safety**: Events are strongly typed values, not strings
//! - **Double Buffering**: Readers never observe a half-written frame
//! - **Reuse**: Both buffers keep their allocation across swaps
//!
//! # Example
//!
//! ```ignore
//! // In a behaviour's update
//! for event in ctx.scene.events().iter() {
//!     if let SceneEvent::Destroyed { entity } = event {
//!         self.targets.retain(|t| t != entity);
//!     }
//! }
//! ```

use std::collections::VecDeque;

use hecs::Entity;

// ============================================================================
// Event Types
// ============================================================================

/// Structural changes applied at a sync point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SceneEvent {
    /// An entity was promoted from pending-add to live.
    Spawned {
        /// The promoted entity
        entity: Entity,
    },

    /// An entity was torn down; its handle is now dangling.
    Destroyed {
        /// The destroyed entity
        entity: Entity,
    },

    /// A child lost its parent because the parent was destroyed.
    Orphaned {
        /// The child, now at the root level
        entity: Entity,
        /// The destroyed parent
        former_parent: Entity,
    },
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue for frame-consistent event processing.
///
/// # Performance
///
/// - Push: O(1) amortized
/// - Iteration: O(n)
/// - Swap: O(1)
#[derive(Debug)]
pub struct EventQueue<E> {
    /// Events being written this frame
    pending: VecDeque<E>,
    /// Events from previous frame, ready for processing
    processing: VecDeque<E>,
}

impl<E> EventQueue<E> {
    /// Default initial capacity for event queues.
    const DEFAULT_CAPACITY: usize = 64;

    /// Create a new event queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a new event queue with specified initial capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event to be processed next frame.
    #[inline]
    pub fn push(&mut self, event: E) {
        self.pending.push_back(event);
    }

    /// Swap the pending and processing queues.
    ///
    /// Called once per frame before the update phase. Events that were not
    /// read during the previous frame are dropped.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over events from the previous frame.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.processing.iter()
    }

    /// Drain all events from the previous frame.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = E> + '_ {
        self.processing.drain(..)
    }

    /// Check if there are any events to process.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Get the number of events ready for processing.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Get the number of events pending for next frame.
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear all events (both pending and processing).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
