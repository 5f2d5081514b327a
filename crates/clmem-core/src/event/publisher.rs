//! The seven publisher shapes (spec §4.7), all delivering through a shared
//! [`Topic`] so a single publish fans out to every subscriber registered
//! for the event's topic tag. They differ only in when, and under what
//! condition, that delivery actually happens.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::AbortHandle;

use crate::error::EventBusError;

use super::topic::Topic;
use super::{Event, Priority};

/// Delivers immediately, on the caller's thread.
pub struct SyncPublisher<T> {
    bus: Arc<Topic<T>>,
}

impl<T: Clone + Send + 'static> SyncPublisher<T> {
    pub fn new(bus: Arc<Topic<T>>) -> Self {
        Self { bus }
    }

    pub fn publish(&self, event: Event<T>) -> Result<usize, EventBusError> {
        self.bus.deliver(event)
    }
}

/// Delivers from an `async fn`, so the caller can await other work around
/// it; the delivery itself is still a cheap, non-blocking set of queue
/// inserts.
pub struct AsyncPublisher<T> {
    bus: Arc<Topic<T>>,
}

impl<T: Clone + Send + 'static> AsyncPublisher<T> {
    pub fn new(bus: Arc<Topic<T>>) -> Self {
        Self { bus }
    }

    pub async fn publish(&self, event: Event<T>) -> Result<usize, EventBusError> {
        self.bus.deliver(event)
    }
}

/// Buffers events locally until [`flush`](Self::flush). [`shutdown`](Self::shutdown)
/// intentionally discards whatever is still buffered instead of flushing it —
/// a deliberate "last call wins, don't surprise-deliver stale events on
/// teardown" contract, not an oversight.
pub struct BatchPublisher<T> {
    bus: Arc<Topic<T>>,
    buffered: Mutex<Vec<Event<T>>>,
}

impl<T: Clone + Send + 'static> BatchPublisher<T> {
    pub fn new(bus: Arc<Topic<T>>) -> Self {
        Self {
            bus,
            buffered: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, event: Event<T>) {
        self.buffered.lock().push(event);
    }

    pub fn buffered_len(&self) -> usize {
        self.buffered.lock().len()
    }

    /// Delivers every buffered event in order and clears the buffer. Stops
    /// at the first delivery failure, leaving the rest buffered.
    pub fn flush(&self) -> Result<usize, EventBusError> {
        let mut buffered = self.buffered.lock();
        let mut flushed = 0;
        while let Some(event) = buffered.first().cloned() {
            self.bus.deliver(event)?;
            buffered.remove(0);
            flushed += 1;
        }
        Ok(flushed)
    }

    /// Discards every buffered event without delivering it.
    pub fn shutdown(&self) {
        self.buffered.lock().clear();
    }
}

/// Delivers a single event once a delay elapses.
pub struct DelayedPublisher<T> {
    bus: Arc<Topic<T>>,
}

impl<T: Clone + Send + 'static> DelayedPublisher<T> {
    pub fn new(bus: Arc<Topic<T>>) -> Self {
        Self { bus }
    }

    /// Spawns a task that sleeps `delay` then delivers `event`. The handle
    /// can be aborted to cancel before it fires.
    pub fn publish_after(&self, event: Event<T>, delay: Duration) -> AbortHandle {
        let bus = self.bus.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = bus.deliver(event);
        });
        handle.abort_handle()
    }
}

/// Delivers repeatedly on an interval. A second `schedule` under the same
/// `id` cancels and replaces whatever was already running for that id.
pub struct PeriodicPublisher<T> {
    bus: Arc<Topic<T>>,
    tasks: DashMap<String, AbortHandle>,
}

impl<T: Clone + Send + 'static> PeriodicPublisher<T> {
    pub fn new(bus: Arc<Topic<T>>) -> Self {
        Self {
            bus,
            tasks: DashMap::new(),
        }
    }

    /// `factory` is called fresh on every tick so each event gets its own
    /// timestamp and sequence number.
    pub fn schedule<F>(&self, id: impl Into<String>, interval: Duration, priority: Priority, topic: impl Into<String>, factory: F)
    where
        F: Fn() -> T + Send + 'static,
    {
        let id = id.into();
        let topic = topic.into();
        let bus = self.bus.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let event = Event::new(topic.clone(), factory(), priority);
                if bus.deliver(event).is_err() {
                    break;
                }
            }
        });
        if let Some((_, old)) = self.tasks.remove(&id) {
            old.abort();
        }
        self.tasks.insert(id, handle.abort_handle());
    }

    pub fn cancel(&self, id: &str) -> bool {
        if let Some((_, handle)) = self.tasks.remove(id) {
            handle.abort();
            true
        } else {
            false
        }
    }

    pub fn cancel_all(&self) {
        for entry in self.tasks.iter() {
            entry.value().abort();
        }
        self.tasks.clear();
    }
}

/// Delivers only if a predicate, evaluated at publish time, holds.
pub struct ConditionalPublisher<T> {
    bus: Arc<Topic<T>>,
}

impl<T: Clone + Send + 'static> ConditionalPublisher<T> {
    pub fn new(bus: Arc<Topic<T>>) -> Self {
        Self { bus }
    }

    pub fn publish_if(
        &self,
        event: Event<T>,
        predicate: impl FnOnce() -> bool,
    ) -> Result<bool, EventBusError> {
        if !predicate() {
            return Ok(false);
        }
        self.bus.deliver(event)?;
        Ok(true)
    }
}

/// Attempts a delivery but swallows a timeout instead of surfacing an error —
/// for best-effort signals (heartbeats, metrics ticks) where a missed
/// delivery is never worth failing the caller over.
pub struct SilentTimeoutPublisher<T> {
    bus: Arc<Topic<T>>,
}

impl<T: Clone + Send + 'static> SilentTimeoutPublisher<T> {
    pub fn new(bus: Arc<Topic<T>>) -> Self {
        Self { bus }
    }

    /// Never surfaces an error; a closed subscriber or the timeout elapsing
    /// are both treated as "silently dropped", matching spec §4.7's naming
    /// of this publisher.
    pub async fn publish(&self, event: Event<T>, timeout: Duration) {
        let bus = self.bus.clone();
        let push = async move {
            let _ = bus.deliver(event);
        };
        let _ = tokio::time::timeout(timeout, push).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SyncSubscriber;

    fn topic_with_subscriber<T>(tag: &str, sub: &SyncSubscriber<T>) -> Arc<Topic<T>> {
        let topic = Arc::new(Topic::new());
        topic.subscribe(tag, sub.subscription());
        topic
    }

    #[test]
    fn batch_shutdown_discards_without_flushing() {
        let sub = SyncSubscriber::new();
        let bus = topic_with_subscriber("t", &sub);
        let publisher = BatchPublisher::new(bus);
        publisher.queue(Event::new("t", 1, Priority::Low));
        publisher.queue(Event::new("t", 2, Priority::Low));
        assert_eq!(publisher.buffered_len(), 2);

        publisher.shutdown();
        assert_eq!(publisher.buffered_len(), 0);

        let drained = sub.drain(|_| panic!("shutdown must not deliver buffered events"));
        assert_eq!(drained, 0);
    }

    #[test]
    fn batch_flush_delivers_in_order() {
        let sub = SyncSubscriber::new();
        let bus = topic_with_subscriber("t", &sub);
        let publisher = BatchPublisher::new(bus);
        publisher.queue(Event::new("t", 1, Priority::Low));
        publisher.queue(Event::new("t", 2, Priority::Low));
        let flushed = publisher.flush().unwrap();
        assert_eq!(flushed, 2);

        let mut seen = Vec::new();
        sub.drain(|event| seen.push(event.payload));
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn conditional_skips_when_predicate_false() {
        let sub = SyncSubscriber::new();
        let bus = topic_with_subscriber("t", &sub);
        let publisher = ConditionalPublisher::new(bus);
        let delivered = publisher.publish_if(Event::new("t", 1, Priority::Low), || false).unwrap();
        assert!(!delivered);
        assert_eq!(sub.subscription().pending(), 0);
    }

    #[test]
    fn sync_publisher_fans_out_to_every_subscriber_on_the_tag() {
        let a = SyncSubscriber::new();
        let b = SyncSubscriber::new();
        let bus = Arc::new(Topic::new());
        bus.subscribe("jobs", a.subscription());
        bus.subscribe("jobs", b.subscription());
        let publisher = SyncPublisher::new(bus);

        let delivered = publisher.publish(Event::new("jobs", 1, Priority::Low)).unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(a.subscription().pending(), 1);
        assert_eq!(b.subscription().pending(), 1);
    }
}
