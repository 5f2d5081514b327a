//! The external driver surface the core mediates. Platform/device discovery,
//! kernel compilation and launch, and numeric payload semantics are all out
//! of scope (see spec §1) — this module only describes the calls the core
//! itself issues, so that a real OpenCL-family binding or a test double can
//! implement [`Driver`] and plug in underneath [`crate::context::Context`].

use std::fmt;

use crate::error::{DriverError, DriverErrorCode};

/// Opaque device-side memory object handle. Never inspected, only moved
/// around and eventually passed back to [`Driver::release_mem_object`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemHandle(pub u64);

/// Opaque driver context handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u64);

/// Opaque command queue handle (host or device-side).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueueHandle(pub u64);

/// Opaque kernel handle. A value of `0` is never legal for binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KernelHandle(pub u64);

impl KernelHandle {
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Device-side memory access flags requested for a [`Global`](crate::buffer::capability)
/// buffer's device handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DeviceAccess {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

/// Host-side access flags. Degraded to `ReadWrite` on devices whose OpenCL
/// version predates 1.2, per spec §6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HostAccess {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
    NoAccess,
}

impl HostAccess {
    /// Degrades any non-`ReadWrite` value when the device predates OpenCL 1.2.
    pub fn degrade_for_legacy_device(self, device_version_at_least_1_2: bool) -> Self {
        if device_version_at_least_1_2 {
            self
        } else {
            Self::ReadWrite
        }
    }
}

/// Combined access flags passed to [`Driver::create_buffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessFlags {
    pub device: DeviceAccess,
    pub host: HostAccess,
}

/// Priority/throttle hint, applied only when the device advertises the
/// matching extension (spec §6); otherwise the driver call omits it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriorityHint {
    Low,
    Medium,
    High,
}

/// Properties passed to context/queue creation. `device_queue_size` is
/// `Some` only when an on-device command queue was requested and the device
/// advertises `cl_khr_device_enqueue` (or equivalent).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextProperties {
    pub out_of_order: bool,
    pub profiling: bool,
    pub priority: Option<PriorityHint>,
    pub throttle: Option<PriorityHint>,
    pub device_queue_size: Option<usize>,
}

/// A list of prior commands a blocking call must wait on. The core always
/// issues blocking transfers (§5), so in practice this is empty, but the
/// signature is kept general for drivers that want to fold in fences.
pub type WaitList = [QueueHandle];

/// The opaque driver surface. Implementors talk to the real device driver
/// (or, in tests, a mock that can be told to fail on a specific call).
///
/// All methods are blocking with respect to the device, matching the
/// `clEnqueue*(..., blocking = true, ...)` discipline the core relies on
/// instead of inserting its own synchronization barriers (spec §5).
pub trait Driver: Send + Sync + 'static {
    fn create_context(&self, device_version_at_least_2_0: bool) -> Result<ContextHandle, DriverError>;

    fn create_command_queue(
        &self,
        ctx: ContextHandle,
        properties: &ContextProperties,
        device_version_at_least_2_0: bool,
    ) -> Result<QueueHandle, DriverError>;

    fn create_device_queue(
        &self,
        ctx: ContextHandle,
        size: usize,
    ) -> Result<QueueHandle, DriverError>;

    fn create_buffer(
        &self,
        ctx: ContextHandle,
        access: AccessFlags,
        bytes: usize,
        host_init: Option<&[u8]>,
    ) -> Result<MemHandle, DriverError>;

    fn enqueue_read_buffer(
        &self,
        queue: QueueHandle,
        buf: MemHandle,
        offset_bytes: usize,
        dst: &mut [u8],
    ) -> Result<(), DriverError>;

    fn enqueue_write_buffer(
        &self,
        queue: QueueHandle,
        buf: MemHandle,
        offset_bytes: usize,
        src: &[u8],
    ) -> Result<(), DriverError>;

    fn enqueue_copy_buffer(
        &self,
        queue: QueueHandle,
        src: MemHandle,
        dst: MemHandle,
        src_offset_bytes: usize,
        dst_offset_bytes: usize,
        bytes: usize,
    ) -> Result<(), DriverError>;

    fn set_kernel_arg_mem(
        &self,
        kernel: KernelHandle,
        index: u32,
        value: MemHandle,
    ) -> Result<(), DriverError>;

    fn set_kernel_arg_bytes(
        &self,
        kernel: KernelHandle,
        index: u32,
        value: &[u8],
    ) -> Result<(), DriverError>;

    fn set_kernel_arg_local(
        &self,
        kernel: KernelHandle,
        index: u32,
        size_bytes: usize,
    ) -> Result<(), DriverError>;

    fn release_mem_object(&self, handle: MemHandle) -> Result<(), DriverError>;
    fn release_command_queue(&self, handle: QueueHandle) -> Result<(), DriverError>;
    fn release_context(&self, handle: ContextHandle) -> Result<(), DriverError>;
}

impl fmt::Display for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.device, self.host)
    }
}

/// Maps a raw driver error code onto the closed [`DriverErrorCode`] enum.
/// Kept here (not per-call) because the mapping is shared across every
/// `Driver` method.
pub fn map_driver_error_code(raw: i32) -> DriverErrorCode {
    match raw {
        -1 => DriverErrorCode::DeviceNotAvailable,
        -6 => DriverErrorCode::OutOfHostMemory,
        -4 => DriverErrorCode::MemObjectAllocationFailure,
        -34 => DriverErrorCode::InvalidContext,
        -36 => DriverErrorCode::InvalidCommandQueue,
        -38 => DriverErrorCode::InvalidMemObject,
        -48 => DriverErrorCode::InvalidKernel,
        -52 => DriverErrorCode::InvalidKernelArgs,
        -30 => DriverErrorCode::InvalidValue,
        -59 => DriverErrorCode::InvalidOperation,
        -23 => DriverErrorCode::MemCopyOverlap,
        other => DriverErrorCode::Unknown(other),
    }
}
