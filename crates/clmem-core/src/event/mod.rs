//! Priority event bus (spec §4.7): publishers push [`Event`]s into
//! subscribers' priority queues, ordered by `(priority, timestamp,
//! insertion order)` so that same-priority events still drain FIFO.

pub mod future_list;
pub mod publisher;
pub mod subscriber;
pub mod topic;

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Instant;

pub use future_list::ControlledListFuture;
pub use publisher::{
    AsyncPublisher, BatchPublisher, ConditionalPublisher, DelayedPublisher, PeriodicPublisher,
    SilentTimeoutPublisher, SyncPublisher,
};
pub use subscriber::{AsyncEventHandler, AsyncSubscriber, Subscription, SyncSubscriber};
pub use topic::Topic;

/// Coarse scheduling priority. Ordered `Low < Medium < High` so that, as a
/// max-heap key, `High` events drain first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    Medium,
    High,
}

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_sequence() -> u64 {
    SEQUENCE.fetch_add(1, AtomicOrdering::Relaxed)
}

/// A published value together with its topic, priority, and the clock/
/// insertion-order tie-breakers the queue orders by.
#[derive(Clone, Debug)]
pub struct Event<T> {
    pub topic: String,
    pub payload: T,
    pub priority: Priority,
    pub timestamp: Instant,
    pub sequence: u64,
}

impl<T> Event<T> {
    pub fn new(topic: impl Into<String>, payload: T, priority: Priority) -> Self {
        Self {
            topic: topic.into(),
            payload,
            priority,
            timestamp: Instant::now(),
            sequence: next_sequence(),
        }
    }
}

/// Wraps an [`Event`] with the total order a priority queue needs: higher
/// priority first, then earlier timestamp, then earlier insertion order.
#[derive(Clone, Debug)]
pub(crate) struct QueuedEvent<T>(pub Event<T>);

impl<T> PartialEq for QueuedEvent<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.priority == other.0.priority
            && self.0.timestamp == other.0.timestamp
            && self.0.sequence == other.0.sequence
    }
}
impl<T> Eq for QueuedEvent<T> {}

impl<T> PartialOrd for QueuedEvent<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueuedEvent<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .priority
            .cmp(&other.0.priority)
            .then_with(|| other.0.timestamp.cmp(&self.0.timestamp))
            .then_with(|| other.0.sequence.cmp(&self.0.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn higher_priority_drains_first() {
        let mut heap = BinaryHeap::new();
        heap.push(QueuedEvent(Event::new("t", 1, Priority::Low)));
        heap.push(QueuedEvent(Event::new("t", 2, Priority::High)));
        heap.push(QueuedEvent(Event::new("t", 3, Priority::Medium)));
        let order: Vec<i32> = std::iter::from_fn(|| heap.pop().map(|q| q.0.payload)).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn same_priority_drains_fifo() {
        let mut heap = BinaryHeap::new();
        for i in 0..5 {
            heap.push(QueuedEvent(Event::new("t", i, Priority::Medium)));
        }
        let order: Vec<i32> = std::iter::from_fn(|| heap.pop().map(|q| q.0.payload)).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }
}
