//! Priority ordering for pending load tasks.
//!
//! Tasks are ordered by priority (higher values first), then by enqueue
//! order (FIFO within the same priority level). This ensures:
//!
//! 1. Thumbnails preempt full-quality work in a shared queue
//! 2. Medium variants are admitted before speculative high variants
//! 3. Tasks at the same priority are processed in submission order
//!
//! # Example
//!
//! ```ignore
//! use gallerystream::queue::{PendingQueue, Priority};
//!
//! let mut queue = PendingQueue::new();
//! queue.push(Priority::ORIGINAL, "original");
//! queue.push(Priority::MEDIUM, "medium");
//!
//! // MEDIUM comes out first despite being pushed second
//! assert_eq!(queue.pop().unwrap().payload, "medium");
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// Task priority. Higher values are admitted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(pub i32);

impl Priority {
    /// Thumbnail placeholders; the scene looks empty without them.
    pub const THUMBNAIL: Priority = Priority(100);

    /// Medium variants for nearby planes.
    pub const MEDIUM: Priority = Priority(50);

    /// Original-resolution variants. Speculative or interactive, so lowest.
    pub const ORIGINAL: Priority = Priority(10);

    /// Creates a new priority with the given value.
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the numeric priority value.
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::THUMBNAIL => write!(f, "THUMBNAIL"),
            Self::MEDIUM => write!(f, "MEDIUM"),
            Self::ORIGINAL => write!(f, "ORIGINAL"),
            Self(value) => write!(f, "{}", value),
        }
    }
}

// =============================================================================
// Pending entry
// =============================================================================

/// A payload waiting for admission.
pub struct Pending<P> {
    /// Scheduling priority.
    pub priority: Priority,

    /// Sequence number for FIFO ordering within a priority level.
    sequence: u64,

    /// When the entry was enqueued.
    pub enqueued_at: Instant,

    /// The queued work.
    pub payload: P,
}

impl<P> Pending<P> {
    /// Returns how long this entry has been waiting.
    pub fn wait_time(&self) -> Duration {
        self.enqueued_at.elapsed()
    }

    /// Returns the arrival sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl<P> std::fmt::Debug for Pending<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending")
            .field("priority", &self.priority)
            .field("sequence", &self.sequence)
            .finish()
    }
}

// Ordering for BinaryHeap: higher priority first, then lower sequence (older) first
impl<P> PartialEq for Pending<P> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl<P> Eq for Pending<P> {}

impl<P> PartialOrd for Pending<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for Pending<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so we want:
        // 1. Higher priority first (natural ordering)
        // 2. Lower sequence first (reverse ordering) for FIFO within priority
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            other_ordering => other_ordering,
        }
    }
}

// =============================================================================
// Pending queue
// =============================================================================

/// Priority queue of pending work.
///
/// Ordered by priority (descending), then enqueue order (ascending).
/// Not thread-safe; the load queue wraps it in a mutex.
pub struct PendingQueue<P> {
    heap: BinaryHeap<Pending<P>>,
    next_sequence: u64,
}

impl<P> PendingQueue<P> {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    /// Adds a payload with the given priority.
    pub fn push(&mut self, priority: Priority, payload: P) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(Pending {
            priority,
            sequence,
            enqueued_at: Instant::now(),
            payload,
        });
    }

    /// Removes and returns the highest-priority entry.
    pub fn pop(&mut self) -> Option<Pending<P>> {
        self.heap.pop()
    }

    /// Returns the highest-priority entry without removing it.
    pub fn peek(&self) -> Option<&Pending<P>> {
        self.heap.peek()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Removes every pending entry, returning them in no particular order.
    pub fn drain(&mut self) -> Vec<Pending<P>> {
        self.heap.drain().collect()
    }
}

impl<P> Default for PendingQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}
