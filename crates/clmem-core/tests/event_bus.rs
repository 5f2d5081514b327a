//! Integration coverage for the priority event bus (spec §4.7): publishers
//! and subscribers wired together through a shared [`Topic`], fan-out to
//! multiple subscribers on the same tag, and the supervised future list.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clmem_core::event::*;

#[test]
fn sync_publisher_to_sync_subscriber_drains_by_priority() {
    let sub = SyncSubscriber::new();
    let bus = Arc::new(Topic::new());
    bus.subscribe("jobs", sub.subscription());
    let publisher = SyncPublisher::new(bus);

    publisher.publish(Event::new("jobs", "low", Priority::Low)).unwrap();
    publisher.publish(Event::new("jobs", "high", Priority::High)).unwrap();
    publisher.publish(Event::new("jobs", "medium", Priority::Medium)).unwrap();

    let mut seen = Vec::new();
    let count = sub.drain(|event| seen.push(event.payload));
    assert_eq!(count, 3);
    assert_eq!(seen, vec!["high", "medium", "low"]);
}

#[test]
fn publish_fans_out_to_every_subscriber_registered_on_the_same_tag() {
    let first = SyncSubscriber::new();
    let second = SyncSubscriber::new();
    let third = SyncSubscriber::new();
    let bus = Arc::new(Topic::new());
    bus.subscribe("jobs", first.subscription());
    bus.subscribe("jobs", second.subscription());
    bus.subscribe("jobs", third.subscription());
    assert_eq!(bus.subscriber_count("jobs"), 3);
    let publisher = SyncPublisher::new(bus);

    let delivered = publisher.publish(Event::new("jobs", 7, Priority::Low)).unwrap();
    assert_eq!(delivered, 3);

    for sub in [&first, &second, &third] {
        let mut seen = Vec::new();
        sub.drain(|event| seen.push(event.payload));
        assert_eq!(seen, vec![7]);
    }
}

#[test]
fn publish_only_reaches_subscribers_registered_on_the_matching_tag() {
    let jobs_subscriber = SyncSubscriber::new();
    let metrics_subscriber = SyncSubscriber::new();
    let bus = Arc::new(Topic::new());
    bus.subscribe("jobs", jobs_subscriber.subscription());
    bus.subscribe("metrics", metrics_subscriber.subscription());
    let publisher = SyncPublisher::new(bus);

    publisher.publish(Event::new("jobs", 1, Priority::Low)).unwrap();

    assert_eq!(jobs_subscriber.subscription().pending(), 1);
    assert_eq!(metrics_subscriber.subscription().pending(), 0);
}

#[test]
fn publish_after_unsubscribe_is_rejected() {
    let sub = SyncSubscriber::<i32>::new();
    let bus = Arc::new(Topic::new());
    bus.subscribe("t", sub.subscription());
    let publisher = SyncPublisher::new(bus);
    sub.subscription().unsubscribe();

    let err = publisher.publish(Event::new("t", 1, Priority::Low)).unwrap_err();
    assert_eq!(err, clmem_core::error::EventBusError::SubscriberClosed);
}

#[tokio::test]
async fn async_subscriber_worker_processes_pushed_events() {
    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl AsyncEventHandler<i32> for CountingHandler {
        type Error = ();

        async fn handle(&self, event: Event<i32>) -> Result<(), ()> {
            self.0.fetch_add(event.payload as usize, Ordering::SeqCst);
            Ok(())
        }
    }

    let total = Arc::new(AtomicUsize::new(0));
    let subscriber = AsyncSubscriber::spawn(CountingHandler(total.clone()));
    let bus = Arc::new(Topic::new());
    bus.subscribe("t", subscriber.subscription());
    let publisher = AsyncPublisher::new(bus);

    publisher.publish(Event::new("t", 1, Priority::Low)).await.unwrap();
    publisher.publish(Event::new("t", 2, Priority::High)).await.unwrap();
    publisher.publish(Event::new("t", 3, Priority::Medium)).await.unwrap();

    // give the worker task a chance to drain
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(total.load(Ordering::SeqCst), 6);
    assert_eq!(subscriber.total_error_count(), 0);

    subscriber.close();
}

#[tokio::test]
async fn async_subscriber_tracks_handler_errors() {
    struct FlakyHandler;

    #[async_trait]
    impl AsyncEventHandler<i32> for FlakyHandler {
        type Error = &'static str;

        async fn handle(&self, event: Event<i32>) -> Result<(), &'static str> {
            if event.payload < 0 {
                Err("negative payload")
            } else {
                Ok(())
            }
        }
    }

    let subscriber = AsyncSubscriber::spawn(FlakyHandler);
    let bus = Arc::new(Topic::new());
    bus.subscribe("t", subscriber.subscription());
    let publisher = AsyncPublisher::new(bus);

    publisher.publish(Event::new("t", -1, Priority::Low)).await.unwrap();
    publisher.publish(Event::new("t", 1, Priority::Low)).await.unwrap();
    publisher.publish(Event::new("t", -2, Priority::Low)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(subscriber.total_error_count(), 2);

    subscriber.close();
}

#[tokio::test]
async fn delayed_publisher_fires_after_the_delay_and_not_before() {
    let sub = SyncSubscriber::new();
    let bus = Arc::new(Topic::new());
    bus.subscribe("t", sub.subscription());
    let publisher = DelayedPublisher::new(bus);
    publisher.publish_after(Event::new("t", 1, Priority::Low), Duration::from_millis(30));

    assert_eq!(sub.subscription().pending(), 0);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(sub.subscription().pending(), 1);
}

#[tokio::test]
async fn delayed_publisher_abort_prevents_delivery() {
    let sub = SyncSubscriber::new();
    let bus = Arc::new(Topic::new());
    bus.subscribe("t", sub.subscription());
    let publisher = DelayedPublisher::new(bus);
    let handle = publisher.publish_after(Event::new("t", 1, Priority::Low), Duration::from_millis(30));
    handle.abort();

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(sub.subscription().pending(), 0);
}

#[tokio::test]
async fn periodic_publisher_rescheduling_under_the_same_id_replaces_the_task() {
    let sub = SyncSubscriber::new();
    let bus = Arc::new(Topic::new());
    bus.subscribe("ticks", sub.subscription());
    let publisher = PeriodicPublisher::new(bus);

    publisher.schedule("tick", Duration::from_millis(10), Priority::Low, "ticks", || 1);
    tokio::time::sleep(Duration::from_millis(35)).await;
    let first_round = sub.subscription().pending();
    assert!(first_round >= 2, "expected several ticks, got {first_round}");

    // reschedule under the same id: old task must stop, new one takes over
    publisher.schedule("tick", Duration::from_secs(3600), Priority::Low, "ticks", || 2);
    sub.drain(|_| {});
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(sub.subscription().pending(), 0, "replaced task should not have ticked yet");

    publisher.cancel_all();
}

#[tokio::test]
async fn silent_timeout_publisher_never_errors_on_timeout_or_closed_subscriber() {
    let sub = SyncSubscriber::<i32>::new();
    let bus = Arc::new(Topic::new());
    bus.subscribe("t", sub.subscription());
    sub.subscription().unsubscribe();
    let publisher = SilentTimeoutPublisher::new(bus);
    // closed subscriber: would normally error, but this publisher swallows it
    publisher.publish(Event::new("t", 1, Priority::Low), Duration::from_millis(50)).await;
}

#[tokio::test]
async fn controlled_list_future_stop_control_leaves_tracked_tasks_running() {
    let controller = Arc::new(ControlledListFuture::new());
    controller.start_sweep(Duration::from_millis(5)).unwrap();

    let ran = Arc::new(AtomicUsize::new(0));
    let ran_clone = ran.clone();
    controller
        .push(async move {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    tokio::time::sleep(Duration::from_millis(40)).await;
    let tracked = controller.stop_control().unwrap();
    // sweep stopped, but the already-finished task should have run once and
    // been swept before we stopped control.
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert!(tracked.is_empty());
}
