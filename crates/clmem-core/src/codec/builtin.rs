//! The closed set of built-in element codecs (spec §4.1): one byte-oriented
//! codec per scalar kind the core ships. Application crates may add their own
//! by implementing [`super::Codec`] directly; nothing here is reflection- or
//! registry-dependent to instantiate.

use super::Codec;
use crate::error::CodecError;

fn check_len(dst_or_src_len: usize, count: usize, size_struct: usize) -> Result<(), CodecError> {
    let expected = count * size_struct;
    if dst_or_src_len != expected {
        return Err(CodecError::Capacity {
            expected,
            actual: dst_or_src_len,
        });
    }
    Ok(())
}

macro_rules! scalar_codec {
    ($name:ident, $elem:ty, $size:expr, $to_bytes:ident, $from_bytes:ident) => {
        #[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
        pub struct $name;

        impl Codec for $name {
            type Element = $elem;
            const SIZE_STRUCT: usize = $size;

            fn encode(&self, dst: &mut [u8], values: &[Self::Element]) -> Result<(), CodecError> {
                check_len(dst.len(), values.len(), $size)?;
                for (chunk, value) in dst.chunks_exact_mut($size).zip(values) {
                    chunk.copy_from_slice(&value.$to_bytes());
                }
                Ok(())
            }

            fn decode(
                &self,
                src: &[u8],
                count: usize,
                out: &mut Vec<Self::Element>,
            ) -> Result<(), CodecError> {
                check_len(src.len(), count, $size)?;
                out.clear();
                out.reserve(count);
                for chunk in src.chunks_exact($size) {
                    let mut bytes = [0u8; $size];
                    bytes.copy_from_slice(chunk);
                    out.push(<$elem>::$from_bytes(bytes));
                }
                Ok(())
            }
        }
    };
}

scalar_codec!(I32Codec, i32, 4, to_le_bytes, from_le_bytes);
scalar_codec!(F32Codec, f32, 4, to_le_bytes, from_le_bytes);
scalar_codec!(I64Codec, i64, 8, to_le_bytes, from_le_bytes);
scalar_codec!(F64Codec, f64, 8, to_le_bytes, from_le_bytes);
scalar_codec!(Char16Codec, u16, 2, to_le_bytes, from_le_bytes);

/// One byte per boolean; `0` is false, any other byte is true on decode but
/// encode always writes canonical `0`/`1`.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct BoolCodec;

impl Codec for BoolCodec {
    type Element = bool;
    const SIZE_STRUCT: usize = 1;

    fn encode(&self, dst: &mut [u8], values: &[bool]) -> Result<(), CodecError> {
        check_len(dst.len(), values.len(), 1)?;
        for (byte, value) in dst.iter_mut().zip(values) {
            *byte = u8::from(*value);
        }
        Ok(())
    }

    fn decode(&self, src: &[u8], count: usize, out: &mut Vec<bool>) -> Result<(), CodecError> {
        check_len(src.len(), count, 1)?;
        out.clear();
        out.extend(src.iter().map(|&b| b != 0));
        Ok(())
    }
}

/// Signed 8-bit integer codec.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct I8Codec;

impl Codec for I8Codec {
    type Element = i8;
    const SIZE_STRUCT: usize = 1;

    fn encode(&self, dst: &mut [u8], values: &[i8]) -> Result<(), CodecError> {
        check_len(dst.len(), values.len(), 1)?;
        for (byte, value) in dst.iter_mut().zip(values) {
            *byte = *value as u8;
        }
        Ok(())
    }

    fn decode(&self, src: &[u8], count: usize, out: &mut Vec<i8>) -> Result<(), CodecError> {
        check_len(src.len(), count, 1)?;
        out.clear();
        out.extend(src.iter().map(|&b| b as i8));
        Ok(())
    }
}
