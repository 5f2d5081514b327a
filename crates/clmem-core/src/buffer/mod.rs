//! Capability-typed device buffer core (spec §4.4–§4.5): a three-state
//! lifecycle (`Ready` → `Running` → `Closed`) shared by every concrete buffer
//! flavor in [`flavors`], and the orthogonal capability traits in
//! [`capability`] that each flavor opts into.

pub mod capability;
pub mod flavors;
mod resize;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::codec::Codec;
use crate::context::{Context, ContextStatus};
use crate::driver::{AccessFlags, DeviceAccess, HostAccess, KernelHandle, MemHandle};
use crate::error::{BufferError, ConfigError, DestroyWarning, InitError};

pub use capability::{Dynamic, HasCore, HostShadowed, KernelBindable, Readable, Writable};
pub use resize::DynamicPolicy;

static DEFAULT_NAME_COUNTER: AtomicU64 = AtomicU64::new(1);

fn generate_default_name() -> String {
    format!("buffer-{}", DEFAULT_NAME_COUNTER.fetch_add(1, Ordering::Relaxed))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferStatus {
    Ready,
    Running,
    Closed,
}

/// Which orthogonal capabilities a concrete flavor composes. Set once at
/// construction, read by [`BufferCore`] to decide which init/destroy hooks
/// and transfer paths apply — the capability *traits* a flavor implements
/// are the compile-time half of this; this is the runtime half the hooks
/// branch on.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct CapabilitySet {
    pub global: bool,
    pub local: bool,
    pub parameter: bool,
    pub dynamic: bool,
    pub readable: bool,
    pub writable: bool,
    pub kernel_bindable: bool,
    pub host_shadowed: bool,
}

struct Inner<C: Codec> {
    status: BufferStatus,
    capacity: usize,
    size: usize,
    context: Option<Context>,
    device_handle: Option<MemHandle>,
    staging: Option<Vec<u8>>,
    init_size: Option<usize>,
    copy_native: bool,
    copy_host: Option<Vec<u8>>,
    device_access: DeviceAccess,
    host_access: HostAccess,
    _codec: std::marker::PhantomData<C>,
}

/// Object-safe handle stored by [`crate::registry::BufferRegistry`], letting
/// it destroy and enumerate buffers without knowing their codec type.
pub trait BufferLifecycle: Send + Sync {
    fn name(&self) -> String;
    fn status(&self) -> BufferStatus;
    fn destroy(&self);
}

/// The shared engine behind every concrete buffer flavor. Application code
/// never names this type directly — it interacts through a flavor in
/// [`flavors`] and the capability traits that flavor implements.
pub struct BufferCore<C: Codec> {
    name: RwLock<String>,
    inner: RwLock<Inner<C>>,
    access: RwLock<AccessFlags>,
    kernel_bindings: DashMap<u64, u32>,
    dynamic_policy: Mutex<DynamicPolicy>,
    capabilities: CapabilitySet,
    device_version_at_least_1_2: bool,
    self_weak: Weak<BufferCore<C>>,
}

impl<C: Codec> BufferCore<C> {
    pub(crate) fn new_arc(capabilities: CapabilitySet) -> Arc<Self> {
        Self::new_arc_for_device(capabilities, true)
    }

    pub(crate) fn new_arc_for_device(capabilities: CapabilitySet, device_version_at_least_1_2: bool) -> Arc<Self> {
        Arc::new_cyclic(|weak| BufferCore {
            name: RwLock::new(generate_default_name()),
            inner: RwLock::new(Inner {
                status: BufferStatus::Ready,
                capacity: 0,
                size: 0,
                context: None,
                device_handle: None,
                staging: None,
                init_size: None,
                copy_native: false,
                copy_host: None,
                device_access: DeviceAccess::default(),
                host_access: HostAccess::default(),
                _codec: std::marker::PhantomData,
            }),
            access: RwLock::new(AccessFlags {
                device: DeviceAccess::default(),
                host: HostAccess::default(),
            }),
            kernel_bindings: DashMap::new(),
            dynamic_policy: Mutex::new(DynamicPolicy::default()),
            capabilities,
            device_version_at_least_1_2,
            self_weak: weak.clone(),
        })
    }

    fn require_ready(&self) -> Result<parking_lot::RwLockWriteGuard<'_, Inner<C>>, BufferError> {
        let inner = self.inner.write();
        if inner.status != BufferStatus::Ready {
            return Err(BufferError::AlreadyInitiated);
        }
        Ok(inner)
    }

    pub fn with_name(&self, name: impl Into<String>) -> Result<(), BufferError> {
        let inner = self.require_ready()?;
        *self.name.write() = name.into();
        drop(inner);
        Ok(())
    }

    pub fn with_context(&self, context: Context) -> Result<(), BufferError> {
        let mut inner = self.require_ready()?;
        inner.context = Some(context);
        Ok(())
    }

    pub fn with_init_size(&self, size: usize) -> Result<(), BufferError> {
        let mut inner = self.require_ready()?;
        if self.capabilities.parameter && size != 1 {
            return Err(InitError::Config(ConfigError::InvalidCapacity(size)).into());
        }
        inner.init_size = Some(size);
        Ok(())
    }

    pub fn with_copy_native(&self, enabled: bool) -> Result<(), BufferError> {
        let mut inner = self.require_ready()?;
        inner.copy_native = enabled;
        Ok(())
    }

    pub fn with_copy_host(&self, bytes: Vec<u8>) -> Result<(), BufferError> {
        let mut inner = self.require_ready()?;
        inner.copy_host = Some(bytes);
        Ok(())
    }

    pub fn with_device_access(&self, access: DeviceAccess) -> Result<(), BufferError> {
        let mut inner = self.require_ready()?;
        inner.device_access = access;
        Ok(())
    }

    pub fn with_host_access(&self, access: HostAccess) -> Result<(), BufferError> {
        let mut inner = self.require_ready()?;
        inner.host_access = access;
        Ok(())
    }

    /// Validates configuration, acquires device/host resources, and flips
    /// the buffer Running — with full rollback on any failure (spec §4.4).
    pub fn init(&self) -> Result<(), BufferError> {
        let mut inner = self.inner.write();
        match inner.status {
            BufferStatus::Running => return Err(BufferError::AlreadyInitiated),
            BufferStatus::Closed => return Err(BufferError::Closed),
            BufferStatus::Ready => {}
        }

        let name = self.name.read().clone();
        if name.trim().is_empty() {
            return Err(InitError::Config(ConfigError::EmptyName).into());
        }
        let context = inner
            .context
            .clone()
            .ok_or(InitError::Config(ConfigError::MissingContext))?;
        if context.status() != ContextStatus::Running {
            return Err(InitError::Config(ConfigError::ContextNotRunning).into());
        }
        if inner.copy_host.is_some() && !self.capabilities.readable {
            return Err(InitError::Config(ConfigError::CopyHostRequiresReadable).into());
        }

        let size_struct = C::SIZE_STRUCT;

        let mut capacity = inner.init_size.unwrap_or(0);
        if capacity == 0 {
            if let Some(host_bytes) = inner.copy_host.as_ref() {
                capacity = host_bytes.len() / size_struct;
            }
        }
        if self.capabilities.parameter {
            capacity = 1;
        } else if self.capabilities.dynamic {
            capacity = capacity.max(self.dynamic_policy.lock().min_capacity);
        }
        // Unconditional: every flavor must reach Running with capacity >= 1
        // (spec §3), regardless of which of init_size/copy_host/dynamic/
        // parameter supplied it.
        if capacity == 0 {
            return Err(InitError::Config(ConfigError::InvalidCapacity(capacity)).into());
        }

        let device_access = inner.device_access;
        let host_access = inner
            .host_access
            .degrade_for_legacy_device(self.device_version_at_least_1_2);
        *self.access.write() = AccessFlags {
            device: device_access,
            host: host_access,
        };

        let arc_self: Arc<dyn BufferLifecycle> = self
            .self_weak
            .upgrade()
            .expect("buffer core outlives its own init() call");
        context.registry().register(name.clone(), arc_self);

        macro_rules! rollback {
            ($err:expr) => {{
                context.registry().remove(&name);
                inner.status = BufferStatus::Ready;
                inner.device_handle = None;
                inner.staging = None;
                return Err($err.into());
            }};
        }

        if self.capabilities.global {
            let host_init = inner.copy_host.as_deref().filter(|_| inner.copy_native);
            match context.driver().create_buffer(
                context.handle(),
                AccessFlags {
                    device: device_access,
                    host: host_access,
                },
                capacity * size_struct,
                host_init,
            ) {
                Ok(mem) => inner.device_handle = Some(mem),
                Err(cause) => rollback!(InitError::DeviceHandle(cause)),
            }
        }

        if self.capabilities.host_shadowed || self.capabilities.parameter || self.capabilities.dynamic {
            let mut staging = vec![0u8; capacity * size_struct];
            if let Some(host_bytes) = inner.copy_host.as_deref() {
                let live = host_bytes.len().min(staging.len());
                staging[..live].copy_from_slice(&host_bytes[..live]);
            }
            inner.staging = Some(staging);
        }

        inner.capacity = capacity;
        inner.size = inner
            .copy_host
            .as_ref()
            .map(|bytes| bytes.len() / size_struct)
            .unwrap_or(0)
            .min(capacity);
        inner.status = BufferStatus::Running;
        inner.init_size = None;
        inner.copy_host = None;
        Ok(())
    }

    /// Idempotent teardown, reversing the init hook order. Never fails —
    /// sub-failures are logged and swallowed (spec §4.4, §8 property 1).
    pub fn destroy(&self) {
        let mut inner = self.inner.write();
        if inner.status == BufferStatus::Closed {
            return;
        }
        let was_running = inner.status == BufferStatus::Running;
        inner.status = BufferStatus::Closed;
        if !was_running {
            return;
        }

        self.kernel_bindings.clear();
        inner.staging = None;

        let context = inner.context.clone();
        if let (Some(context), Some(handle)) = (context.clone(), inner.device_handle.take()) {
            if let Err(cause) = context.driver().release_mem_object(handle) {
                let warning = DestroyWarning {
                    step: "release_mem_object",
                    cause,
                };
                tracing::warn!(buffer = %self.name.read(), %warning, "buffer teardown step failed, continuing");
            }
        }
        drop(inner);

        if let Some(context) = context {
            context.registry().remove(&self.name.read());
        }
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub fn status(&self) -> BufferStatus {
        self.inner.read().status
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity
    }

    pub fn size(&self) -> usize {
        self.inner.read().size
    }

    pub(crate) fn device_access(&self) -> DeviceAccess {
        self.access.read().device
    }

    pub(crate) fn host_access(&self) -> HostAccess {
        self.access.read().host
    }

    pub(crate) fn size_struct(&self) -> usize {
        C::SIZE_STRUCT
    }

    pub(crate) fn bindings_len(&self) -> usize {
        self.kernel_bindings.len()
    }

    pub(crate) fn read(&self, offset: usize, len: usize, out: &mut Vec<C::Element>) -> Result<(), BufferError> {
        let inner = self.inner.read();
        match inner.status {
            BufferStatus::Closed => return Err(BufferError::Closed),
            BufferStatus::Ready => return Err(BufferError::NotRunning),
            BufferStatus::Running => {}
        }
        if offset + len > inner.capacity {
            return Err(BufferError::OutOfBounds {
                offset,
                len,
                capacity: inner.capacity,
            });
        }
        if offset + len > inner.size {
            tracing::warn!(
                buffer = %self.name.read(),
                offset,
                len,
                size = inner.size,
                "read range extends past populated size"
            );
        }

        let size_struct = C::SIZE_STRUCT;
        let byte_offset = offset * size_struct;
        let byte_len = len * size_struct;
        let mut bytes = vec![0u8; byte_len];

        if self.capabilities.global {
            let context = inner.context.clone().ok_or(BufferError::NotRunning)?;
            let handle = inner.device_handle.ok_or(BufferError::NotRunning)?;
            let queue = context.queue();
            context
                .driver()
                .enqueue_read_buffer(queue, handle, byte_offset, &mut bytes)
                .map_err(BufferError::Transfer)?;
        } else if let Some(staging) = inner.staging.as_ref() {
            let end = (byte_offset + byte_len).min(staging.len());
            if end > byte_offset {
                bytes[..end - byte_offset].copy_from_slice(&staging[byte_offset..end]);
            }
        }

        C::default().decode(&bytes, len, out).map_err(BufferError::from)
    }

    pub(crate) fn read_bytes(&self) -> Result<Vec<u8>, BufferError> {
        if !(self.capabilities.dynamic || self.capabilities.host_shadowed) {
            return Err(BufferError::NotHostShadowed);
        }
        let inner = self.inner.read();
        if inner.status != BufferStatus::Running {
            return Err(BufferError::NotRunning);
        }
        Ok(inner.staging.clone().unwrap_or_default())
    }

    pub(crate) fn write(&self, values: &[C::Element], offset: usize) -> Result<(), BufferError> {
        let codec = C::default();
        let count = codec.size_of(values);
        let needed = offset + count;

        if needed > self.capacity() {
            if self.capabilities.dynamic {
                let policy = *self.dynamic_policy.lock();
                let target = (needed as f64 * policy.capacity_multiplier).ceil() as usize;
                self.resize(target)?;
            } else {
                return Err(BufferError::CapacityExceeded {
                    requested: needed,
                    capacity: self.capacity(),
                });
            }
        }

        let size_struct = C::SIZE_STRUCT;
        let byte_offset = offset * size_struct;
        let byte_len = count * size_struct;
        let mut scratch = vec![0u8; byte_len];
        codec.encode(&mut scratch, values)?;

        let mut inner = self.inner.write();
        match inner.status {
            BufferStatus::Closed => return Err(BufferError::Closed),
            BufferStatus::Ready => return Err(BufferError::NotRunning),
            BufferStatus::Running => {}
        }
        if byte_offset + byte_len > inner.capacity * size_struct {
            return Err(BufferError::OutOfBounds {
                offset,
                len: count,
                capacity: inner.capacity,
            });
        }

        if let Some(staging) = inner.staging.as_mut() {
            staging[byte_offset..byte_offset + byte_len].copy_from_slice(&scratch);
        }

        if self.capabilities.global {
            let context = inner.context.clone().ok_or(BufferError::NotRunning)?;
            let handle = inner.device_handle.ok_or(BufferError::NotRunning)?;
            let queue = context.queue();
            context
                .driver()
                .enqueue_write_buffer(queue, handle, byte_offset, &scratch)
                .map_err(BufferError::Transfer)?;
        }

        inner.size = inner.size.max(offset + count);
        Ok(())
    }

    pub(crate) fn remove(&self, index: usize, num: usize) -> Result<(), BufferError> {
        let size_struct = C::SIZE_STRUCT;
        let (context, handle, tail_len) = {
            let inner = self.inner.read();
            match inner.status {
                BufferStatus::Closed => return Err(BufferError::Closed),
                BufferStatus::Ready => return Err(BufferError::NotRunning),
                BufferStatus::Running => {}
            }
            if index + num > inner.size {
                return Err(BufferError::OutOfBounds {
                    offset: index,
                    len: num,
                    capacity: inner.size,
                });
            }
            (inner.context.clone(), inner.device_handle, inner.size - index - num)
        };

        if tail_len > 0 && self.capabilities.global {
            let context = context.clone().ok_or(BufferError::NotRunning)?;
            let handle = handle.ok_or(BufferError::NotRunning)?;
            let queue = context.queue();
            let src_offset = (index + num) * size_struct;
            let dst_offset = index * size_struct;
            context
                .driver()
                .enqueue_copy_buffer(queue, handle, handle, src_offset, dst_offset, tail_len * size_struct)
                .map_err(BufferError::Copy)?;
        }

        let mut inner = self.inner.write();
        if let Some(staging) = inner.staging.as_mut() {
            let src_offset = (index + num) * size_struct;
            let dst_offset = index * size_struct;
            staging.copy_within(src_offset..src_offset + tail_len * size_struct, dst_offset);
        }
        inner.size -= num;

        let shrink_target = resize::maybe_shrink_after_remove(self, &inner);
        drop(inner);
        if let Some(target) = shrink_target {
            self.resize(target)?;
        }
        Ok(())
    }

    pub(crate) fn resize(&self, new_capacity: usize) -> Result<(), BufferError> {
        if !self.capabilities.dynamic {
            return Err(BufferError::NotDynamic);
        }
        resize::resize(self, new_capacity)
    }

    pub(crate) fn increase(&self, new_capacity: usize) -> Result<(), BufferError> {
        if new_capacity <= self.capacity() {
            return Ok(());
        }
        self.resize(new_capacity)
    }

    pub(crate) fn decrease(&self, new_capacity: usize) -> Result<(), BufferError> {
        if new_capacity >= self.capacity() {
            return Ok(());
        }
        self.resize(new_capacity)
    }

    pub(crate) fn policy(&self) -> DynamicPolicy {
        *self.dynamic_policy.lock()
    }

    pub(crate) fn configure_dynamic_policy(&self, policy: DynamicPolicy) -> Result<(), BufferError> {
        *self.dynamic_policy.lock() = policy;
        Ok(())
    }

    pub(crate) fn bind(&self, kernel: KernelHandle, arg_index: u32) -> Result<(), BufferError> {
        if !kernel.is_valid() {
            return Err(BufferError::InvalidKernelHandle);
        }
        let inner = self.inner.read();
        match inner.status {
            BufferStatus::Closed => return Err(BufferError::Closed),
            BufferStatus::Ready => return Err(BufferError::NotRunning),
            BufferStatus::Running => {}
        }
        self.set_kernel_arg(&inner, kernel, arg_index)?;
        self.kernel_bindings.insert(kernel.0, arg_index);
        Ok(())
    }

    pub(crate) fn unbind(&self, kernel: KernelHandle) -> bool {
        self.kernel_bindings.remove(&kernel.0).is_some()
    }

    pub(crate) fn rebind_all(&self) -> Result<(), BufferError> {
        let inner = self.inner.read();
        if inner.status != BufferStatus::Running {
            return Ok(());
        }
        let entries: Vec<(u64, u32)> = self
            .kernel_bindings
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        for (kernel_raw, arg_index) in entries {
            self.set_kernel_arg(&inner, KernelHandle(kernel_raw), arg_index)?;
        }
        Ok(())
    }

    fn set_kernel_arg(&self, inner: &Inner<C>, kernel: KernelHandle, arg_index: u32) -> Result<(), BufferError> {
        let context = inner.context.clone().ok_or(BufferError::NotRunning)?;
        if self.capabilities.global {
            let handle = inner.device_handle.ok_or(BufferError::NotRunning)?;
            context
                .driver()
                .set_kernel_arg_mem(kernel, arg_index, handle)
                .map_err(BufferError::Transfer)
        } else if self.capabilities.local {
            context
                .driver()
                .set_kernel_arg_local(kernel, arg_index, inner.capacity * C::SIZE_STRUCT)
                .map_err(BufferError::Transfer)
        } else {
            let bytes = inner.staging.as_deref().unwrap_or(&[]);
            context
                .driver()
                .set_kernel_arg_bytes(kernel, arg_index, bytes)
                .map_err(BufferError::Transfer)
        }
    }
}

impl<C: Codec> BufferLifecycle for BufferCore<C> {
    fn name(&self) -> String {
        self.name()
    }

    fn status(&self) -> BufferStatus {
        self.status()
    }

    fn destroy(&self) {
        self.destroy()
    }
}
