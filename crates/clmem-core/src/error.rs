//! Error taxonomy for the buffer/context/event-bus core.
//!
//! Every fallible driver call is mapped into a [`DriverError`] with a closed
//! [`DriverErrorCode`]; the core never continues past a failed acquire. The
//! higher-level kinds below ([`ContextError`], [`InitError`], [`BufferError`],
//! [`CodecError`], [`EventBusError`]) are what application code matches on.
//! `destroy()` paths collect [`DestroyWarning`]s instead of propagating them —
//! see [`BufferCore::destroy`](crate::buffer::BufferCore::destroy).

use std::fmt;

/// Closed enumeration of driver-side failure reasons. New variants must not
/// be added without a corresponding entry in `Display`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverErrorCode {
    DeviceNotAvailable,
    OutOfHostMemory,
    MemObjectAllocationFailure,
    InvalidContext,
    InvalidCommandQueue,
    InvalidMemObject,
    InvalidKernel,
    InvalidKernelArgs,
    InvalidValue,
    InvalidOperation,
    MemCopyOverlap,
    Unknown(i32),
}

impl fmt::Display for DriverErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceNotAvailable => write!(f, "device not available"),
            Self::OutOfHostMemory => write!(f, "out of host memory"),
            Self::MemObjectAllocationFailure => write!(f, "mem object allocation failure"),
            Self::InvalidContext => write!(f, "invalid context"),
            Self::InvalidCommandQueue => write!(f, "invalid command queue"),
            Self::InvalidMemObject => write!(f, "invalid mem object"),
            Self::InvalidKernel => write!(f, "invalid kernel"),
            Self::InvalidKernelArgs => write!(f, "invalid kernel args"),
            Self::InvalidValue => write!(f, "invalid value"),
            Self::InvalidOperation => write!(f, "invalid operation"),
            Self::MemCopyOverlap => write!(f, "mem copy overlap"),
            Self::Unknown(code) => write!(f, "unknown driver error ({code})"),
        }
    }
}

/// A failed driver call, carrying the call site for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("driver call `{call}` failed: {code}")]
pub struct DriverError {
    pub call: &'static str,
    pub code: DriverErrorCode,
}

impl DriverError {
    pub fn new(call: &'static str, code: DriverErrorCode) -> Self {
        Self { call, code }
    }
}

/// Codec-level failures. Never retried by the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("codec slot type does not match the requested element kind")]
    TypeMismatch,
    #[error("encode/decode size disagreement: expected {expected} bytes, got {actual}")]
    Capacity { expected: usize, actual: usize },
}

/// Invalid buffer builder configuration, surfaced at `init()`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("buffer name must be non-empty")]
    EmptyName,
    #[error("buffer codec was not configured")]
    MissingCodec,
    #[error("buffer context was not configured")]
    MissingContext,
    #[error("buffer capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),
    #[error("context is not in the Running state")]
    ContextNotRunning,
    #[error("`copy_host` requires the buffer to implement Readable")]
    CopyHostRequiresReadable,
}

/// Failures during `Buffer::init()`. The buffer is guaranteed to have been
/// rolled back to a clean, un-registered, handle-free state before this is
/// returned (see property 5 in the spec: no leak on init failure).
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to default-construct the configured codec")]
    CodecInstantiation,
    #[error("failed to acquire a device handle: {0}")]
    DeviceHandle(DriverError),
    #[error("failed to allocate pinned host staging: {0}")]
    StagingAlloc(DriverError),
}

/// Failures during context creation. Each variant records the rollback that
/// already happened before it was returned.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("failed to acquire a device context: {0}")]
    Create(DriverError),
    #[error("failed to acquire a command queue: {0}")]
    QueueCreate(DriverError),
    #[error("failed to acquire a device-side command queue: {0}")]
    DeviceQueueCreate(DriverError),
}

/// Failures observable by application code while a buffer is Running.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("operation is not legal once the buffer is Closed")]
    Closed,
    #[error("configuration method is only legal before init()")]
    AlreadyInitiated,
    #[error("operation requires the buffer to be Running")]
    NotRunning,
    #[error("offset {offset} + len {len} exceeds capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },
    #[error("write of {requested} elements at current size exceeds static capacity {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },
    #[error("device allocation failed during resize: {0}")]
    DeviceOOM(DriverError),
    #[error("device-to-device copy failed during resize: {0}")]
    Copy(DriverError),
    #[error("host<->device transfer failed: {0}")]
    Transfer(DriverError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Init(#[from] InitError),
    #[error("kernel handle must be non-zero")]
    InvalidKernelHandle,
    #[error("kernel argument index must be non-negative")]
    InvalidArgIndex,
    #[error("operation requires the buffer's Dynamic capability")]
    NotDynamic,
    #[error("operation requires the buffer's HostShadowed capability")]
    NotHostShadowed,
}

/// Raised when `publish`/`subscribe` is attempted after shutdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EventBusError {
    #[error("publisher has been shut down")]
    PublisherClosed,
    #[error("subscriber has been shut down")]
    SubscriberClosed,
    #[error("controller has been stopped")]
    ControllerStopped,
}

/// A release failure observed during `destroy()`. These are logged via
/// `tracing::warn!` and never propagated — destroy is infallible by contract.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cleanup step `{step}` failed and was swallowed: {cause}")]
pub struct DestroyWarning {
    pub step: &'static str,
    pub cause: DriverError,
}

pub type Result<T, E = BufferError> = std::result::Result<T, E>;
