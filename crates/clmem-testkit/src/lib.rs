//! In-memory [`Driver`] double for exercising `clmem-core` without a real
//! OpenCL-family device: every call is an ordinary in-process bookkeeping
//! operation, and any call can be told to fail on demand for the crash-path
//! tests in `clmem-core`'s `tests/` tree.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clmem_core::driver::{
    AccessFlags, ContextHandle, ContextProperties, Driver, KernelHandle, MemHandle, QueueHandle,
};
use clmem_core::error::{DriverError, DriverErrorCode};
use dashmap::DashMap;
use parking_lot::Mutex;

#[derive(Clone, Copy, Debug)]
enum FailureMode {
    Once(DriverErrorCode),
    Always(DriverErrorCode),
}

/// A fully in-memory [`Driver`]. Every "device" buffer is just a
/// byte-length record; reads/writes/copies move real bytes through a shared
/// host-side store so round-trips are actually observable in assertions.
pub struct MockDriver {
    next_handle: AtomicU64,
    contexts: DashMap<u64, ()>,
    queues: DashMap<u64, ()>,
    mem: DashMap<u64, Mutex<Vec<u8>>>,
    kernel_args: DashMap<(u64, u32), KernelArgRecord>,
    failures: DashMap<&'static str, FailureMode>,
}

/// What was last bound to a given `(kernel, arg_index)` slot. Exposed so
/// tests can assert a rebind actually happened after a resize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelArgRecord {
    Mem(MemHandle),
    Bytes(Vec<u8>),
    Local(usize),
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            contexts: DashMap::new(),
            queues: DashMap::new(),
            mem: DashMap::new(),
            kernel_args: DashMap::new(),
            failures: DashMap::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn next(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    /// Makes the next call to `call` (by the method name strings used
    /// below, e.g. `"create_buffer"`) fail with `code`, then behave
    /// normally again.
    pub fn fail_next(&self, call: &'static str, code: DriverErrorCode) {
        self.failures.insert(call, FailureMode::Once(code));
    }

    /// Makes every future call to `call` fail with `code` until
    /// [`clear_failure`](Self::clear_failure).
    pub fn fail_always(&self, call: &'static str, code: DriverErrorCode) {
        self.failures.insert(call, FailureMode::Always(code));
    }

    pub fn clear_failure(&self, call: &'static str) {
        self.failures.remove(call);
    }

    fn check_failure(&self, call: &'static str) -> Result<(), DriverError> {
        let mode = self.failures.get(call).map(|entry| *entry.value());
        match mode {
            Some(FailureMode::Always(code)) => Err(DriverError::new(call, code)),
            Some(FailureMode::Once(code)) => {
                self.failures.remove(call);
                Err(DriverError::new(call, code))
            }
            None => Ok(()),
        }
    }

    pub fn live_mem_count(&self) -> usize {
        self.mem.len()
    }

    pub fn live_context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn kernel_arg(&self, kernel: KernelHandle, index: u32) -> Option<KernelArgRecord> {
        self.kernel_args.get(&(kernel.0, index)).map(|entry| entry.value().clone())
    }
}

impl Driver for MockDriver {
    fn create_context(&self, _device_version_at_least_2_0: bool) -> Result<ContextHandle, DriverError> {
        self.check_failure("create_context")?;
        let id = self.next();
        self.contexts.insert(id, ());
        Ok(ContextHandle(id))
    }

    fn create_command_queue(
        &self,
        _ctx: ContextHandle,
        _properties: &ContextProperties,
        _device_version_at_least_2_0: bool,
    ) -> Result<QueueHandle, DriverError> {
        self.check_failure("create_command_queue")?;
        let id = self.next();
        self.queues.insert(id, ());
        Ok(QueueHandle(id))
    }

    fn create_device_queue(&self, _ctx: ContextHandle, _size: usize) -> Result<QueueHandle, DriverError> {
        self.check_failure("create_device_queue")?;
        let id = self.next();
        self.queues.insert(id, ());
        Ok(QueueHandle(id))
    }

    fn create_buffer(
        &self,
        _ctx: ContextHandle,
        _access: AccessFlags,
        bytes: usize,
        host_init: Option<&[u8]>,
    ) -> Result<MemHandle, DriverError> {
        self.check_failure("create_buffer")?;
        let id = self.next();
        let mut backing = vec![0u8; bytes];
        if let Some(init) = host_init {
            let live = init.len().min(backing.len());
            backing[..live].copy_from_slice(&init[..live]);
        }
        self.mem.insert(id, Mutex::new(backing));
        Ok(MemHandle(id))
    }

    fn enqueue_read_buffer(
        &self,
        _queue: QueueHandle,
        buf: MemHandle,
        offset_bytes: usize,
        dst: &mut [u8],
    ) -> Result<(), DriverError> {
        self.check_failure("enqueue_read_buffer")?;
        let entry = self
            .mem
            .get(&buf.0)
            .ok_or_else(|| DriverError::new("enqueue_read_buffer", DriverErrorCode::InvalidMemObject))?;
        let backing = entry.value().lock();
        dst.copy_from_slice(&backing[offset_bytes..offset_bytes + dst.len()]);
        Ok(())
    }

    fn enqueue_write_buffer(
        &self,
        _queue: QueueHandle,
        buf: MemHandle,
        offset_bytes: usize,
        src: &[u8],
    ) -> Result<(), DriverError> {
        self.check_failure("enqueue_write_buffer")?;
        let entry = self
            .mem
            .get(&buf.0)
            .ok_or_else(|| DriverError::new("enqueue_write_buffer", DriverErrorCode::InvalidMemObject))?;
        let mut backing = entry.value().lock();
        backing[offset_bytes..offset_bytes + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn enqueue_copy_buffer(
        &self,
        _queue: QueueHandle,
        src: MemHandle,
        dst: MemHandle,
        src_offset_bytes: usize,
        dst_offset_bytes: usize,
        bytes: usize,
    ) -> Result<(), DriverError> {
        self.check_failure("enqueue_copy_buffer")?;
        if src.0 == dst.0 {
            let entry = self
                .mem
                .get(&src.0)
                .ok_or_else(|| DriverError::new("enqueue_copy_buffer", DriverErrorCode::InvalidMemObject))?;
            let mut backing = entry.value().lock();
            backing.copy_within(src_offset_bytes..src_offset_bytes + bytes, dst_offset_bytes);
        } else {
            let src_entry = self
                .mem
                .get(&src.0)
                .ok_or_else(|| DriverError::new("enqueue_copy_buffer", DriverErrorCode::InvalidMemObject))?;
            let chunk = src_entry.value().lock()[src_offset_bytes..src_offset_bytes + bytes].to_vec();
            drop(src_entry);
            let dst_entry = self
                .mem
                .get(&dst.0)
                .ok_or_else(|| DriverError::new("enqueue_copy_buffer", DriverErrorCode::InvalidMemObject))?;
            dst_entry.value().lock()[dst_offset_bytes..dst_offset_bytes + bytes].copy_from_slice(&chunk);
        }
        Ok(())
    }

    fn set_kernel_arg_mem(&self, kernel: KernelHandle, index: u32, value: MemHandle) -> Result<(), DriverError> {
        self.check_failure("set_kernel_arg_mem")?;
        self.kernel_args.insert((kernel.0, index), KernelArgRecord::Mem(value));
        Ok(())
    }

    fn set_kernel_arg_bytes(&self, kernel: KernelHandle, index: u32, value: &[u8]) -> Result<(), DriverError> {
        self.check_failure("set_kernel_arg_bytes")?;
        self.kernel_args
            .insert((kernel.0, index), KernelArgRecord::Bytes(value.to_vec()));
        Ok(())
    }

    fn set_kernel_arg_local(&self, kernel: KernelHandle, index: u32, size_bytes: usize) -> Result<(), DriverError> {
        self.check_failure("set_kernel_arg_local")?;
        self.kernel_args.insert((kernel.0, index), KernelArgRecord::Local(size_bytes));
        Ok(())
    }

    fn release_mem_object(&self, handle: MemHandle) -> Result<(), DriverError> {
        self.check_failure("release_mem_object")?;
        self.mem.remove(&handle.0);
        Ok(())
    }

    fn release_command_queue(&self, handle: QueueHandle) -> Result<(), DriverError> {
        self.check_failure("release_command_queue")?;
        self.queues.remove(&handle.0);
        Ok(())
    }

    fn release_context(&self, handle: ContextHandle) -> Result<(), DriverError> {
        self.check_failure("release_context")?;
        self.contexts.remove(&handle.0);
        Ok(())
    }
}

/// Builds a `Context` over a fresh [`MockDriver`], for tests that don't care
/// about driver failures.
pub fn running_context() -> (Arc<MockDriver>, clmem_core::context::Context) {
    let driver = MockDriver::shared();
    let context = clmem_core::context::ContextBuilder::new(driver.clone())
        .create()
        .expect("mock driver never fails a fresh context");
    (driver, context)
}
