//! Closed registry mapping an [`ElementKind`] to its codec's static metadata.
//!
//! This does not replace the generic [`super::Codec`] trait that concrete
//! buffers hold — it exists for call sites that only know the element kind
//! at runtime (diagnostics, dynamic buffer-construction helpers) and need
//! `size_struct` without instantiating a typed codec. There is no reflection
//! involved: every entry is a plain function pointer registered at compile
//! time (spec §9, "Reflection-based codec instantiation").

use std::collections::HashMap;
use std::sync::OnceLock;

use super::{BoolCodec, Char16Codec, Codec, F32Codec, F64Codec, I8Codec, I32Codec, I64Codec};

/// The closed set of element kinds the core ships codecs for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    BooleanByte,
    Int8,
    Char16,
    Int32,
    Float32,
    Int64,
    Float64,
}

/// Static facts about a codec, looked up by [`ElementKind`] without
/// constructing an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErasedCodecMeta {
    pub kind: ElementKind,
    pub size_struct: usize,
}

fn metadata_table() -> &'static HashMap<ElementKind, ErasedCodecMeta> {
    static TABLE: OnceLock<HashMap<ElementKind, ErasedCodecMeta>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use ElementKind::*;
        HashMap::from([
            (
                BooleanByte,
                ErasedCodecMeta {
                    kind: BooleanByte,
                    size_struct: BoolCodec::SIZE_STRUCT,
                },
            ),
            (
                Int8,
                ErasedCodecMeta {
                    kind: Int8,
                    size_struct: I8Codec::SIZE_STRUCT,
                },
            ),
            (
                Char16,
                ErasedCodecMeta {
                    kind: Char16,
                    size_struct: Char16Codec::SIZE_STRUCT,
                },
            ),
            (
                Int32,
                ErasedCodecMeta {
                    kind: Int32,
                    size_struct: I32Codec::SIZE_STRUCT,
                },
            ),
            (
                Float32,
                ErasedCodecMeta {
                    kind: Float32,
                    size_struct: F32Codec::SIZE_STRUCT,
                },
            ),
            (
                Int64,
                ErasedCodecMeta {
                    kind: Int64,
                    size_struct: I64Codec::SIZE_STRUCT,
                },
            ),
            (
                Float64,
                ErasedCodecMeta {
                    kind: Float64,
                    size_struct: F64Codec::SIZE_STRUCT,
                },
            ),
        ])
    })
}

/// Read-only handle onto the process-wide codec metadata table.
#[derive(Clone, Copy, Debug, Default)]
pub struct CodecRegistry;

impl CodecRegistry {
    pub fn lookup(kind: ElementKind) -> ErasedCodecMeta {
        *metadata_table()
            .get(&kind)
            .expect("every ElementKind variant has a registered entry")
    }
}
