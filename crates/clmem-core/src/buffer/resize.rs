//! Crash-safe dynamic resize engine (spec §4.6): allocate the new handle
//! before touching the old one, copy live bytes across, and only release the
//! old handle once the new one is fully in place. Any failure before the
//! final release leaves the buffer exactly as it was.

use crate::codec::Codec;
use crate::driver::{AccessFlags, MemHandle};
use crate::error::BufferError;

use super::{BufferCore, Inner};

/// Growth/shrink policy knobs for a [`Dynamic`](super::capability::Dynamic)
/// buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DynamicPolicy {
    /// Applied when a write overruns capacity: `new_capacity = ceil(needed * multiplier)`.
    pub capacity_multiplier: f64,
    /// Capacity is never raised or lowered below this floor.
    pub min_capacity: usize,
    /// A `remove` shrinks capacity when `capacity > size * shrink_factor`.
    pub shrink_factor: f64,
}

impl Default for DynamicPolicy {
    fn default() -> Self {
        Self {
            capacity_multiplier: 1.5,
            min_capacity: 10,
            shrink_factor: 4.0,
        }
    }
}

/// Performs the full grow-or-shrink sequence against `core`, leaving
/// `core.inner` and `core.staging` consistent on both success and failure.
pub(super) fn resize<C: Codec>(core: &BufferCore<C>, requested_capacity: usize) -> Result<(), BufferError> {
    let policy = *core.dynamic_policy.lock();
    let new_capacity = requested_capacity.max(policy.min_capacity);

    let mut inner = core.inner.write();
    if inner.capacity == new_capacity {
        return Ok(());
    }
    let old_capacity = inner.capacity;
    let old_handle = inner.device_handle;
    let size_struct = core.size_struct();
    let context = inner
        .context
        .clone()
        .ok_or(BufferError::NotRunning)?;
    let driver = context.driver().clone();

    let access = AccessFlags {
        device: core.device_access(),
        host: core.host_access(),
    };

    let new_handle = if core.capabilities.global {
        match driver.create_buffer(context.handle(), access, new_capacity * size_struct, None) {
            Ok(handle) => Some(handle),
            Err(cause) => return Err(BufferError::DeviceOOM(cause)),
        }
    } else {
        None
    };

    if let (Some(old), Some(new)) = (old_handle, new_handle) {
        let live_bytes = inner.size.min(old_capacity).min(new_capacity) * size_struct;
        if live_bytes > 0 {
            let queue = context.queue();
            if let Err(cause) = driver.enqueue_copy_buffer(queue, old, new, 0, 0, live_bytes) {
                // roll back: release the handle we just allocated, leave the old one untouched.
                let _ = driver.release_mem_object(new);
                return Err(BufferError::Copy(cause));
            }
        }
    }

    let mut new_staging = inner.staging.as_ref().map(|_| vec![0u8; new_capacity * size_struct]);
    if let (Some(old_bytes), Some(new_bytes)) = (inner.staging.as_ref(), new_staging.as_mut()) {
        let live = old_bytes.len().min(new_bytes.len());
        new_bytes[..live].copy_from_slice(&old_bytes[..live]);
    }

    // Past this point every fallible step has already succeeded; commit.
    if let Some(old) = old_handle {
        if let Err(cause) = driver.release_mem_object(old) {
            tracing::warn!(error = %cause, "failed to release pre-resize device handle, continuing");
        }
    }
    inner.capacity = new_capacity;
    inner.size = inner.size.min(new_capacity);
    inner.device_handle = new_handle;
    if new_staging.is_some() {
        inner.staging = new_staging;
    }
    drop(inner);

    core.rebind_all()
}

pub(super) fn maybe_shrink_after_remove<C: Codec>(core: &BufferCore<C>, inner: &Inner<C>) -> Option<usize> {
    if !core.capabilities.dynamic {
        return None;
    }
    let policy = *core.dynamic_policy.lock();
    if inner.capacity as f64 > inner.size as f64 * policy.shrink_factor {
        Some((inner.size as f64 * policy.capacity_multiplier).ceil() as usize)
    } else {
        None
    }
}

#[allow(dead_code)]
pub(super) type NewHandle = MemHandle;
