//! Value↔byte-sequence conversion. A [`Codec`] describes *one* element kind;
//! buffers are generic over their codec and never inspect the bytes it
//! produces — they only call [`Codec::size_struct`], [`Codec::encode`],
//! [`Codec::decode`] and [`Codec::new_slot`] (spec §4.1).

mod builtin;
mod registry;

pub use builtin::{BoolCodec, Char16Codec, F32Codec, F64Codec, I8Codec, I32Codec, I64Codec};
pub use registry::{CodecRegistry, ElementKind, ErasedCodecMeta};

use crate::error::CodecError;

/// A strategy converting between a slice of host values and a packed byte
/// sequence, for one fixed element kind.
///
/// Implementations must uphold: `encode` writes exactly
/// `size_of(values) * size_struct()` bytes and never overruns `dst`; `decode`
/// consumes exactly `count * size_struct()` bytes from `src`.
pub trait Codec: Default + Send + Sync + std::fmt::Debug + 'static {
    /// The host-side element type this codec moves to and from the device.
    type Element: Copy + Send + Sync + 'static;

    /// Fixed per-element byte width. Must be > 0.
    const SIZE_STRUCT: usize;

    fn size_struct(&self) -> usize {
        Self::SIZE_STRUCT
    }

    /// Element count represented by `values`.
    fn size_of(&self, values: &[Self::Element]) -> usize {
        values.len()
    }

    /// Writes `values` into `dst`. `dst.len()` must equal
    /// `size_of(values) * size_struct()`.
    fn encode(&self, dst: &mut [u8], values: &[Self::Element]) -> Result<(), CodecError>;

    /// Reads `count` elements from `src` into `out`, replacing its contents.
    /// `src.len()` must equal `count * size_struct()`.
    fn decode(&self, src: &[u8], count: usize, out: &mut Vec<Self::Element>) -> Result<(), CodecError>;

    /// Allocates a host-side slot able to hold `count` elements.
    fn new_slot(&self, count: usize) -> Vec<Self::Element> {
        Vec::with_capacity(count)
    }
}
