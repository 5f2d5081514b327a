//! Per-context buffer registry (spec §4.3): tracks every buffer created
//! against a [`crate::context::Context`] so `Context::destroy` can tear them
//! all down. Name uniqueness is advisory, not enforced — a second
//! `register` under an existing name simply replaces the registry's
//! reference to it; both buffers keep working, only one is reachable by
//! `lookup` afterwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::buffer::BufferLifecycle;

/// Maps buffer name to its type-erased lifecycle handle. Not a hot path —
/// registration happens once per buffer at `init()`, lookups are
/// diagnostic/management operations.
pub struct BufferRegistry {
    entries: DashMap<String, Arc<dyn BufferLifecycle>>,
    generated_counter: AtomicU64,
}

impl BufferRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
            generated_counter: AtomicU64::new(1),
        }
    }

    /// Returns a name guaranteed not to collide with another
    /// registry-generated default (user-supplied names are never checked).
    pub fn next_generated_name(&self) -> String {
        format!("generated-{}", self.generated_counter.fetch_add(1, Ordering::Relaxed))
    }

    pub fn register(&self, name: String, buffer: Arc<dyn BufferLifecycle>) {
        self.entries.insert(name, buffer);
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn BufferLifecycle>> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }

    /// Drops the registry's reference without touching the buffer's
    /// lifecycle. Used when a buffer tears itself down and just needs to
    /// stop being tracked.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn BufferLifecycle>> {
        self.entries.remove(name).map(|(_, buffer)| buffer)
    }

    /// Destroys the named buffer, then stops tracking it.
    pub fn release(&self, name: &str) {
        if let Some((_, buffer)) = self.entries.remove(name) {
            buffer.destroy();
        }
    }

    /// Destroys every tracked buffer and clears the registry. Called once
    /// from `Context::destroy`; individual buffer destroy failures are
    /// swallowed by the buffer itself and never reach here.
    pub fn release_all(&self) {
        for entry in self.entries.iter() {
            entry.value().destroy();
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
