//! Subscriber-side queues. A [`Subscription`] is the handle a
//! [`super::Topic`] registers on a subscriber's behalf — it can push an
//! event and report whether the subscriber closed, without knowing whether
//! the consumer drains synchronously or runs a dedicated async worker. A
//! single subscriber can hand out its `Subscription` to more than one topic
//! tag, i.e. own a set of subscriptions keyed by event-type tag (spec §4.7).

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::EventBusError;

use super::{Event, QueuedEvent};

struct Shared<T> {
    queue: Mutex<BinaryHeap<QueuedEvent<T>>>,
    closed: AtomicBool,
    notify: Notify,
    error_count: AtomicU64,
}

impl<T> Shared<T> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(BinaryHeap::new()),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
            error_count: AtomicU64::new(0),
        })
    }
}

/// A publisher-facing handle onto one subscriber's queue.
#[derive(Clone)]
pub struct Subscription<T>(Arc<Shared<T>>);

impl<T> Subscription<T> {
    pub fn is_closed(&self) -> bool {
        self.0.closed.load(Ordering::Acquire)
    }

    pub fn unsubscribe(&self) {
        self.0.closed.store(true, Ordering::Release);
        self.0.notify.notify_waiters();
    }

    pub(crate) fn push(&self, event: Event<T>) -> Result<(), EventBusError> {
        if self.is_closed() {
            return Err(EventBusError::SubscriberClosed);
        }
        self.0.queue.lock().push(QueuedEvent(event));
        self.0.notify.notify_waiters();
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.0.queue.lock().len()
    }
}

/// Drains its queue on whatever thread calls [`SyncSubscriber::drain`] — no
/// dedicated worker thread, matching spec §4.7's single-thread-drain model.
pub struct SyncSubscriber<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Default for SyncSubscriber<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncSubscriber<T> {
    pub fn new() -> Self {
        Self { shared: Shared::new() }
    }

    pub fn subscription(&self) -> Subscription<T> {
        Subscription(self.shared.clone())
    }

    /// Pops every currently-queued event in priority order, invoking
    /// `handler` for each. Returns how many were processed.
    pub fn drain(&self, mut handler: impl FnMut(Event<T>)) -> usize {
        let mut count = 0;
        loop {
            let next = self.shared.queue.lock().pop();
            match next {
                Some(QueuedEvent(event)) => {
                    handler(event);
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

/// Invoked by an [`AsyncSubscriber`]'s worker task for each drained event. A
/// handler that fails does not stop the worker — it increments the
/// subscriber's observable error count instead (spec §4.7's
/// `getTotalErrorCount()`, surfaced here as [`AsyncSubscriber::total_error_count`]).
#[async_trait]
pub trait AsyncEventHandler<T>: Send + Sync {
    type Error: Send + 'static;

    async fn handle(&self, event: Event<T>) -> Result<(), Self::Error>;
}

/// Owns a dedicated tokio worker task that drains its queue in priority
/// order and awaits an [`AsyncEventHandler`] for each event.
pub struct AsyncSubscriber<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> AsyncSubscriber<T> {
    pub fn spawn<H>(handler: H) -> Self
    where
        H: AsyncEventHandler<T> + 'static,
    {
        let shared = Shared::new();
        let worker_shared = shared.clone();
        tokio::spawn(async move {
            loop {
                let next = worker_shared.queue.lock().pop();
                match next {
                    Some(QueuedEvent(event)) => {
                        if handler.handle(event).await.is_err() {
                            worker_shared.error_count.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    None => {
                        if worker_shared.closed.load(Ordering::Acquire) {
                            break;
                        }
                        worker_shared.notify.notified().await;
                    }
                }
            }
        });
        Self { shared }
    }

    pub fn subscription(&self) -> Subscription<T> {
        Subscription(self.shared.clone())
    }

    /// Total number of events for which the handler returned `Err`, across
    /// the subscriber's whole lifetime.
    pub fn total_error_count(&self) -> u64 {
        self.shared.error_count.load(Ordering::Relaxed)
    }

    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Priority;

    #[test]
    fn sync_drain_processes_in_priority_order() {
        let sub = SyncSubscriber::new();
        let subscription = sub.subscription();
        subscription.push(Event::new("t", 1, Priority::Low)).unwrap();
        subscription.push(Event::new("t", 2, Priority::High)).unwrap();

        let mut seen = Vec::new();
        let count = sub.drain(|event| seen.push(event.payload));
        assert_eq!(count, 2);
        assert_eq!(seen, vec![2, 1]);
    }

    #[test]
    fn push_after_unsubscribe_fails() {
        let sub = SyncSubscriber::<i32>::new();
        let subscription = sub.subscription();
        subscription.unsubscribe();
        let err = subscription.push(Event::new("t", 1, Priority::Low)).unwrap_err();
        assert_eq!(err, EventBusError::SubscriberClosed);
    }
}
