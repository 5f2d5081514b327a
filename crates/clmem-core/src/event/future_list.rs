//! A supervised, cancellable list of spawned futures (spec §4.7): tracked
//! tasks can be aborted individually or in bulk, and a background sweep
//! periodically forgets entries that have already finished so the tracking
//! map doesn't grow without bound.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::EventBusError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ControllerState {
    Running,
    Stopped,
}

/// Tracks spawned futures by id and can sweep, cancel, or shut the whole
/// thing down.
pub struct ControlledListFuture {
    tasks: DashMap<u64, JoinHandle<()>>,
    next_id: AtomicU64,
    state: Mutex<ControllerState>,
    sweep: Mutex<Option<JoinHandle<()>>>,
}

impl Default for ControlledListFuture {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlledListFuture {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
            next_id: AtomicU64::new(1),
            state: Mutex::new(ControllerState::Running),
            sweep: Mutex::new(None),
        }
    }

    /// Spawns `future` as a tracked task, returning an id usable with
    /// [`cancel`](Self::cancel). Rejected once the controller has been
    /// shut down via [`stop_control_and_shutdown`](Self::stop_control_and_shutdown).
    pub fn push<F>(&self, future: F) -> Result<u64, EventBusError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if *self.state.lock() == ControllerState::Stopped {
            return Err(EventBusError::ControllerStopped);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = tokio::spawn(future);
        self.tasks.insert(id, handle);
        Ok(id)
    }

    fn is_stopped(&self) -> bool {
        *self.state.lock() == ControllerState::Stopped
    }

    pub fn cancel(&self, id: u64) -> Result<bool, EventBusError> {
        if self.is_stopped() {
            return Err(EventBusError::ControllerStopped);
        }
        Ok(self.cancel_unchecked(id))
    }

    fn cancel_unchecked(&self, id: u64) -> bool {
        if let Some((_, handle)) = self.tasks.remove(&id) {
            handle.abort();
            true
        } else {
            false
        }
    }

    pub fn active_count(&self) -> Result<usize, EventBusError> {
        if self.is_stopped() {
            return Err(EventBusError::ControllerStopped);
        }
        Ok(self.tasks.len())
    }

    /// Ids of every future currently tracked (spec §8 property 10: a
    /// completed-and-swept future becomes absent from this list).
    pub fn get_futures(&self) -> Result<Vec<u64>, EventBusError> {
        if self.is_stopped() {
            return Err(EventBusError::ControllerStopped);
        }
        Ok(self.tasks.iter().map(|entry| *entry.key()).collect())
    }

    /// Removes entries whose task has already completed, without touching
    /// anything still running.
    fn sweep_finished(&self) {
        self.tasks.retain(|_, handle| !handle.is_finished());
    }

    /// Starts a background task that calls [`sweep_finished`](Self::sweep_finished)
    /// on `interval`. Replaces any sweep already running.
    pub fn start_sweep(self: &std::sync::Arc<Self>, interval: Duration) -> Result<(), EventBusError> {
        if self.is_stopped() {
            return Err(EventBusError::ControllerStopped);
        }
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                this.sweep_finished();
            }
        });
        if let Some(old) = self.sweep.lock().replace(handle) {
            old.abort();
        }
        Ok(())
    }

    /// Aborts every tracked future and clears the list. The controller
    /// remains usable — further `push` calls still succeed.
    pub fn stop_all(&self) -> Result<(), EventBusError> {
        if self.is_stopped() {
            return Err(EventBusError::ControllerStopped);
        }
        self.stop_all_unchecked();
        Ok(())
    }

    fn stop_all_unchecked(&self) {
        for entry in self.tasks.iter() {
            entry.value().abort();
        }
        self.tasks.clear();
    }

    /// Halts the background sweep and returns the ids still tracked (spec
    /// §4.7: "halts sweeping and returns the list"). Tracked futures keep
    /// running.
    pub fn stop_control(&self) -> Result<Vec<u64>, EventBusError> {
        if self.is_stopped() {
            return Err(EventBusError::ControllerStopped);
        }
        Ok(self.stop_control_unchecked())
    }

    fn stop_control_unchecked(&self) -> Vec<u64> {
        if let Some(handle) = self.sweep.lock().take() {
            handle.abort();
        }
        self.tasks.iter().map(|entry| *entry.key()).collect()
    }

    /// Stops the sweep, aborts every tracked future, and marks the
    /// controller shut down so no further read/mutate operation is accepted
    /// (spec §5). Idempotent.
    pub fn stop_control_and_shutdown(&self) {
        self.stop_control_unchecked();
        self.stop_all_unchecked();
        *self.state.lock() = ControllerState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn push_after_shutdown_is_rejected() {
        let controller = Arc::new(ControlledListFuture::new());
        controller.stop_control_and_shutdown();
        let err = controller.push(async {}).unwrap_err();
        assert_eq!(err, EventBusError::ControllerStopped);
    }

    #[tokio::test]
    async fn stop_all_aborts_tracked_tasks() {
        let controller = ControlledListFuture::new();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        controller
            .push(async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                ran_clone.store(true, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(controller.active_count().unwrap(), 1);
        controller.stop_all().unwrap();
        assert_eq!(controller.active_count().unwrap(), 0);
        tokio::task::yield_now().await;
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn get_futures_lists_tracked_ids_and_drops_swept_ones() {
        let controller = Arc::new(ControlledListFuture::new());
        let id = controller.push(async {}).unwrap();
        assert_eq!(controller.get_futures().unwrap(), vec![id]);

        controller.start_sweep(Duration::from_millis(5)).unwrap();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(controller.get_futures().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_control_returns_the_tracked_list_and_leaves_tasks_running() {
        let controller = Arc::new(ControlledListFuture::new());
        let id = controller
            .push(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            })
            .unwrap();
        controller.start_sweep(Duration::from_millis(5)).unwrap();

        let tracked = controller.stop_control().unwrap();
        assert_eq!(tracked, vec![id]);
        assert_eq!(controller.active_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn every_op_fails_closed_once_stopped() {
        let controller = ControlledListFuture::new();
        controller.push(async {}).unwrap();
        controller.stop_control_and_shutdown();

        assert_eq!(controller.push(async {}).unwrap_err(), EventBusError::ControllerStopped);
        assert_eq!(controller.cancel(1).unwrap_err(), EventBusError::ControllerStopped);
        assert_eq!(controller.active_count().unwrap_err(), EventBusError::ControllerStopped);
        assert_eq!(controller.get_futures().unwrap_err(), EventBusError::ControllerStopped);
        assert_eq!(controller.stop_all().unwrap_err(), EventBusError::ControllerStopped);
        assert_eq!(controller.stop_control().unwrap_err(), EventBusError::ControllerStopped);

        let arc = Arc::new(ControlledListFuture::new());
        arc.stop_control_and_shutdown();
        assert_eq!(arc.start_sweep(Duration::from_millis(5)).unwrap_err(), EventBusError::ControllerStopped);

        // shutdown itself stays idempotent even though every checked op now errors.
        controller.stop_control_and_shutdown();
    }
}
