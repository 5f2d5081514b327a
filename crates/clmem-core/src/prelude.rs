//! Re-exports covering the common path through this crate: build a
//! [`Context`], create a buffer flavor, configure it, `init()`, use its
//! capability traits, `destroy()`.

pub use crate::buffer::capability::{Dynamic, HasCore, HostShadowed, KernelBindable, Readable, Writable};
pub use crate::buffer::flavors::{
    GlobalDynamicReadOnlyBuffer, GlobalDynamicReadWriteBuffer, GlobalDynamicWriteOnlyBuffer,
    GlobalStaticReadOnlyBuffer, GlobalStaticReadWriteBuffer, GlobalStaticWriteOnlyBuffer, LocalBuffer,
    ParameterBuffer,
};
pub use crate::buffer::{BufferLifecycle, BufferStatus, DynamicPolicy};
pub use crate::codec::{BoolCodec, Char16Codec, Codec, F32Codec, F64Codec, I8Codec, I32Codec, I64Codec};
pub use crate::context::{Context, ContextBuilder, ContextId, ContextStatus};
pub use crate::driver::{
    AccessFlags, ContextHandle, ContextProperties, DeviceAccess, Driver, HostAccess, KernelHandle,
    MemHandle, PriorityHint, QueueHandle,
};
pub use crate::error::{BufferError, CodecError, ConfigError, ContextError, EventBusError, InitError};
pub use crate::event::{
    AsyncEventHandler, AsyncPublisher, AsyncSubscriber, BatchPublisher, ConditionalPublisher,
    ControlledListFuture, DelayedPublisher, Event, PeriodicPublisher, Priority, SilentTimeoutPublisher,
    Subscription, SyncPublisher, SyncSubscriber, Topic,
};
pub use crate::registry::BufferRegistry;
