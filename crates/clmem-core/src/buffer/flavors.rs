//! Concrete buffer types. Each is nothing more than a declaration of which
//! capabilities it composes — the shared engine and orthogonal traits do all
//! the work (spec §4.5's hook-order table, §9 "deep inheritance chain").

use std::sync::Arc;

use crate::codec::Codec;
use crate::context::Context;
use crate::driver::{DeviceAccess, HostAccess};
use crate::error::BufferError;

use super::capability::{Dynamic, HasCore, HostShadowed, KernelBindable, Readable, Writable};
use super::{BufferCore, BufferStatus, CapabilitySet};

macro_rules! define_buffer_flavor {
    ($name:ident, $caps:expr, $doc:expr) => {
        #[doc = $doc]
        pub struct $name<C: Codec>(Arc<BufferCore<C>>);

        impl<C: Codec> Clone for $name<C> {
            fn clone(&self) -> Self {
                Self(self.0.clone())
            }
        }

        impl<C: Codec> Default for $name<C> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<C: Codec> $name<C> {
            pub fn new() -> Self {
                Self(BufferCore::new_arc($caps))
            }

            pub fn with_name(&self, name: impl Into<String>) -> Result<(), BufferError> {
                self.0.with_name(name)
            }

            pub fn with_context(&self, context: Context) -> Result<(), BufferError> {
                self.0.with_context(context)
            }

            pub fn with_init_size(&self, size: usize) -> Result<(), BufferError> {
                self.0.with_init_size(size)
            }

            pub fn with_copy_native(&self, enabled: bool) -> Result<(), BufferError> {
                self.0.with_copy_native(enabled)
            }

            pub fn with_copy_host(&self, bytes: Vec<u8>) -> Result<(), BufferError> {
                self.0.with_copy_host(bytes)
            }

            pub fn with_device_access(&self, access: DeviceAccess) -> Result<(), BufferError> {
                self.0.with_device_access(access)
            }

            pub fn with_host_access(&self, access: HostAccess) -> Result<(), BufferError> {
                self.0.with_host_access(access)
            }

            pub fn init(&self) -> Result<(), BufferError> {
                self.0.init()
            }

            pub fn destroy(&self) {
                self.0.destroy()
            }

            pub fn name(&self) -> String {
                self.0.name()
            }

            pub fn status(&self) -> BufferStatus {
                self.0.status()
            }

            pub fn capacity(&self) -> usize {
                self.0.capacity()
            }

            pub fn size(&self) -> usize {
                self.0.size()
            }
        }

        impl<C: Codec> crate::sealed::Sealed for $name<C> {}

        impl<C: Codec> HasCore<C> for $name<C> {
            fn core(&self) -> &BufferCore<C> {
                &self.0
            }
        }
    };
}

define_buffer_flavor!(
    GlobalStaticReadOnlyBuffer,
    CapabilitySet {
        global: true,
        readable: true,
        kernel_bindable: true,
        ..CapabilitySet::default()
    },
    "A fixed-capacity device buffer the kernel only reads from; the host may read it back."
);
impl<C: Codec> KernelBindable<C> for GlobalStaticReadOnlyBuffer<C> {}
impl<C: Codec> Readable<C> for GlobalStaticReadOnlyBuffer<C> {}

define_buffer_flavor!(
    GlobalStaticWriteOnlyBuffer,
    CapabilitySet {
        global: true,
        writable: true,
        kernel_bindable: true,
        ..CapabilitySet::default()
    },
    "A fixed-capacity device buffer the host writes into and the kernel consumes."
);
impl<C: Codec> KernelBindable<C> for GlobalStaticWriteOnlyBuffer<C> {}
impl<C: Codec> Writable<C> for GlobalStaticWriteOnlyBuffer<C> {}

define_buffer_flavor!(
    GlobalStaticReadWriteBuffer,
    CapabilitySet {
        global: true,
        readable: true,
        writable: true,
        kernel_bindable: true,
        ..CapabilitySet::default()
    },
    "A fixed-capacity device buffer both host and kernel may read and write."
);
impl<C: Codec> KernelBindable<C> for GlobalStaticReadWriteBuffer<C> {}
impl<C: Codec> Readable<C> for GlobalStaticReadWriteBuffer<C> {}
impl<C: Codec> Writable<C> for GlobalStaticReadWriteBuffer<C> {}

define_buffer_flavor!(
    GlobalDynamicReadOnlyBuffer,
    CapabilitySet {
        global: true,
        dynamic: true,
        readable: true,
        kernel_bindable: true,
        host_shadowed: true,
        ..CapabilitySet::default()
    },
    "A growable/shrinkable device buffer the kernel only reads from."
);
impl<C: Codec> KernelBindable<C> for GlobalDynamicReadOnlyBuffer<C> {}
impl<C: Codec> Readable<C> for GlobalDynamicReadOnlyBuffer<C> {}
impl<C: Codec> Dynamic<C> for GlobalDynamicReadOnlyBuffer<C> {}
impl<C: Codec> HostShadowed<C> for GlobalDynamicReadOnlyBuffer<C> {}

define_buffer_flavor!(
    GlobalDynamicWriteOnlyBuffer,
    CapabilitySet {
        global: true,
        dynamic: true,
        writable: true,
        kernel_bindable: true,
        host_shadowed: true,
        ..CapabilitySet::default()
    },
    "A growable/shrinkable device buffer the host appends/removes elements from."
);
impl<C: Codec> KernelBindable<C> for GlobalDynamicWriteOnlyBuffer<C> {}
impl<C: Codec> Writable<C> for GlobalDynamicWriteOnlyBuffer<C> {}
impl<C: Codec> Dynamic<C> for GlobalDynamicWriteOnlyBuffer<C> {}
impl<C: Codec> HostShadowed<C> for GlobalDynamicWriteOnlyBuffer<C> {}

define_buffer_flavor!(
    GlobalDynamicReadWriteBuffer,
    CapabilitySet {
        global: true,
        dynamic: true,
        readable: true,
        writable: true,
        kernel_bindable: true,
        host_shadowed: true,
        ..CapabilitySet::default()
    },
    "A growable/shrinkable device buffer both host and kernel read and write (the common case in spec §8's scenarios)."
);
impl<C: Codec> KernelBindable<C> for GlobalDynamicReadWriteBuffer<C> {}
impl<C: Codec> Readable<C> for GlobalDynamicReadWriteBuffer<C> {}
impl<C: Codec> Writable<C> for GlobalDynamicReadWriteBuffer<C> {}
impl<C: Codec> Dynamic<C> for GlobalDynamicReadWriteBuffer<C> {}
impl<C: Codec> HostShadowed<C> for GlobalDynamicReadWriteBuffer<C> {}

define_buffer_flavor!(
    LocalBuffer,
    CapabilitySet {
        local: true,
        kernel_bindable: true,
        ..CapabilitySet::default()
    },
    "Device-local scratch space with no host-visible representation; \
     `setKernelArg` passes only its byte size."
);
impl<C: Codec> KernelBindable<C> for LocalBuffer<C> {}

define_buffer_flavor!(
    ParameterBuffer,
    CapabilitySet {
        parameter: true,
        readable: true,
        writable: true,
        kernel_bindable: true,
        host_shadowed: true,
        ..CapabilitySet::default()
    },
    "A host-resident byte payload passed to the kernel by value \
     (`setKernelArg` with no device allocation); capacity is fixed at 1 \
     (spec §4.5) — it is not `Dynamic`, and a write past that single slot \
     is rejected the same way any other static buffer rejects an overflow."
);
impl<C: Codec> KernelBindable<C> for ParameterBuffer<C> {}
impl<C: Codec> Readable<C> for ParameterBuffer<C> {}
impl<C: Codec> Writable<C> for ParameterBuffer<C> {}
impl<C: Codec> HostShadowed<C> for ParameterBuffer<C> {}
