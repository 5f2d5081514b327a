//! Orthogonal capability traits (spec §4.5). Each trait has a blanket
//! default implementation built on [`HasCore`]; a concrete buffer flavor
//! picks up a capability simply by writing an empty `impl Trait for Flavor
//! {}` — there is no inheritance chain, only which traits a type declares.

use crate::codec::Codec;
use crate::driver::KernelHandle;
use crate::error::BufferError;

use super::resize::DynamicPolicy;
use super::BufferCore;

/// Gives capability traits access to the shared engine without repeating
/// every delegation method on each flavor by hand. Sealed: only the flavor
/// types in [`super::flavors`] construct a `BufferCore`, so only they can
/// implement this.
pub trait HasCore<C: Codec>: crate::sealed::Sealed {
    fn core(&self) -> &BufferCore<C>;
}

/// Owns a `kernel_id -> arg_index` map and can push its device representation
/// into a kernel argument slot.
pub trait KernelBindable<C: Codec>: HasCore<C> {
    /// Validates `kernel != 0` and the buffer is Running, calls the concrete
    /// `setKernelArg`, and records the binding.
    fn bind(&self, kernel: KernelHandle, arg_index: u32) -> Result<(), BufferError> {
        self.core().bind(kernel, arg_index)
    }

    fn unbind(&self, kernel: KernelHandle) -> bool {
        self.core().unbind(kernel)
    }

    /// Re-invokes `setKernelArg` for every recorded entry — used after a
    /// resize changed the device handle (spec §8 property 3).
    fn rebind_all(&self) -> Result<(), BufferError> {
        self.core().rebind_all()
    }

    fn bindings_len(&self) -> usize {
        self.core().bindings_len()
    }
}

/// Requires the codec implement `decode`.
pub trait Readable<C: Codec>: HasCore<C> {
    /// Enqueues a blocking device→host transfer of `len` elements starting
    /// at `offset`, decoding into `out`. `offset + len > capacity` is
    /// `OutOfBounds`; `offset + len > size` only warns.
    fn read(&self, offset: usize, len: usize, out: &mut Vec<C::Element>) -> Result<(), BufferError> {
        self.core().read(offset, len, out)
    }

    /// `read(offset, size - offset)` — the corrected semantics from spec §9
    /// (the source computed length as `size`, which overruns whenever
    /// `offset > 0`; this crate uses `size - offset`).
    fn read_from(&self, offset: usize, out: &mut Vec<C::Element>) -> Result<(), BufferError> {
        let size = self.core().size();
        let len = size.saturating_sub(offset);
        self.core().read(offset, len, out)
    }

    fn read_all(&self, out: &mut Vec<C::Element>) -> Result<(), BufferError> {
        self.core().read(0, self.core().size(), out)
    }

    /// Exposes the raw staging buffer. Only legal on buffers that own
    /// persistent staging (`Dynamic` or `HostShadowed`).
    fn read_bytes(&self) -> Result<Vec<u8>, BufferError> {
        self.core().read_bytes()
    }
}

/// Requires the codec implement `encode`.
pub trait Writable<C: Codec>: HasCore<C> {
    /// Encodes `values` into staging and enqueues a blocking host→device
    /// transfer at `offset`, growing a `Dynamic` buffer if needed.
    fn write(&self, values: &[C::Element], offset: usize) -> Result<(), BufferError> {
        self.core().write(values, offset)
    }

    fn append(&self, values: &[C::Element]) -> Result<(), BufferError> {
        let offset = self.core().size();
        self.core().write(values, offset)
    }

    /// Compacts `[index + num .. size)` down to `[index ..)` and updates
    /// `size`; may trigger a shrink on `Dynamic` buffers.
    fn remove(&self, index: usize, num: usize) -> Result<(), BufferError> {
        self.core().remove(index, num)
    }
}

/// Crash-safe grow/shrink (spec §4.6). Policy knobs default to
/// `capacity_multiplier = 1.5`, `min_capacity = 10`, `shrink_factor = 4.0`.
pub trait Dynamic<C: Codec>: HasCore<C> {
    fn resize(&self, new_capacity: usize) -> Result<(), BufferError> {
        self.core().resize(new_capacity)
    }

    fn increase(&self, new_capacity: usize) -> Result<(), BufferError> {
        self.core().increase(new_capacity)
    }

    fn decrease(&self, new_capacity: usize) -> Result<(), BufferError> {
        self.core().decrease(new_capacity)
    }

    /// `resize(size)` — shrinks capacity down to exactly the populated size.
    fn compact(&self) -> Result<(), BufferError> {
        let size = self.core().size();
        self.core().resize(size)
    }

    fn policy(&self) -> DynamicPolicy {
        self.core().policy()
    }

    fn set_policy(&self, policy: DynamicPolicy) -> Result<(), BufferError> {
        self.core().configure_dynamic_policy(policy)
    }
}

/// Maintains a pinned host staging buffer reused across transfers instead of
/// allocating per call.
pub trait HostShadowed<C: Codec>: HasCore<C> {
    fn shadow_bytes(&self) -> Result<Vec<u8>, BufferError> {
        self.core().read_bytes()
    }
}
