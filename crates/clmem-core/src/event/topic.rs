//! Fan-out registry mapping event-type tags to the subscriptions listening
//! on them (spec §4.7: "Subscriber — owns a set of subscriptions keyed by
//! event-type tag"; "Publisher — the strategy that delivers an event to all
//! matching subscribers").

use dashmap::DashMap;

use crate::error::EventBusError;

use super::{Event, Subscription};

/// Shared by every publisher that targets this topic. Multiple subscribers
/// can register under the same tag; a publish fans out to all of them and
/// prunes whichever have closed.
pub struct Topic<T> {
    subscriptions: DashMap<String, Vec<Subscription<T>>>,
}

impl<T> Default for Topic<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Topic<T> {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
        }
    }

    /// Registers `subscription` to receive every event published under `tag`.
    pub fn subscribe(&self, tag: impl Into<String>, subscription: Subscription<T>) {
        self.subscriptions.entry(tag.into()).or_default().push(subscription);
    }

    /// How many subscriptions are currently registered under `tag`.
    pub fn subscriber_count(&self, tag: &str) -> usize {
        self.subscriptions.get(tag).map(|entry| entry.len()).unwrap_or(0)
    }
}

impl<T: Clone> Topic<T> {
    /// Delivers `event` to every subscription registered under
    /// `event.topic`, pruning any that have closed. `Ok(n)` reports how many
    /// subscribers actually received it; a tag with no registered
    /// subscribers at all is a silent no-op (`Ok(0)`). `SubscriberClosed` is
    /// returned only when the tag had subscribers and every one of them
    /// turned out to be closed.
    pub(crate) fn deliver(&self, event: Event<T>) -> Result<usize, EventBusError> {
        let Some(mut entry) = self.subscriptions.get_mut(&event.topic) else {
            return Ok(0);
        };
        let had_subscribers = !entry.is_empty();
        let mut delivered = 0usize;
        entry.retain(|subscription| {
            if subscription.push(event.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                false
            }
        });
        if had_subscribers && delivered == 0 {
            return Err(EventBusError::SubscriberClosed);
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Priority, SyncSubscriber};

    #[test]
    fn delivers_to_every_subscriber_on_the_same_tag() {
        let topic = Topic::new();
        let a = SyncSubscriber::new();
        let b = SyncSubscriber::new();
        topic.subscribe("jobs", a.subscription());
        topic.subscribe("jobs", b.subscription());

        let delivered = topic.deliver(Event::new("jobs", 1, Priority::Low)).unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(a.subscription().pending(), 1);
        assert_eq!(b.subscription().pending(), 1);
    }

    #[test]
    fn untagged_topic_is_a_silent_no_op() {
        let topic: Topic<i32> = Topic::new();
        let delivered = topic.deliver(Event::new("nobody-listening", 1, Priority::Low)).unwrap();
        assert_eq!(delivered, 0);
    }

    #[test]
    fn closed_subscriber_is_pruned_and_reported() {
        let topic = Topic::new();
        let a = SyncSubscriber::new();
        topic.subscribe("jobs", a.subscription());
        a.subscription().unsubscribe();

        let err = topic.deliver(Event::new("jobs", 1, Priority::Low)).unwrap_err();
        assert_eq!(err, EventBusError::SubscriberClosed);
        assert_eq!(topic.subscriber_count("jobs"), 0);
    }
}
