//! Exercises codec-typed buffers end to end through the [`Readable`]/
//! [`Writable`] capability traits rather than calling [`Codec`] directly —
//! the built-in codecs themselves already have unit coverage in
//! `clmem-core::codec::builtin`.

use clmem_core::prelude::*;
use clmem_testkit::running_context;

#[test]
fn i32_buffer_write_then_read_all_round_trips() {
    let (_driver, ctx) = running_context();
    let buf = GlobalStaticReadWriteBuffer::<I32Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(8).unwrap();
    buf.init().unwrap();

    buf.write(&[1, 2, 3, 4], 0).unwrap();
    let mut out = Vec::new();
    buf.read_all(&mut out).unwrap();
    assert_eq!(out, vec![1, 2, 3, 4]);
}

#[test]
fn f64_buffer_partial_read_respects_offset() {
    let (_driver, ctx) = running_context();
    let buf = GlobalStaticReadWriteBuffer::<F64Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(4).unwrap();
    buf.init().unwrap();

    buf.write(&[1.5, 2.5, 3.5, 4.5], 0).unwrap();
    let mut out = Vec::new();
    buf.read(1, 2, &mut out).unwrap();
    assert_eq!(out, vec![2.5, 3.5]);
}

#[test]
fn bool_buffer_round_trips_canonical_bytes() {
    let (_driver, ctx) = running_context();
    let buf = GlobalStaticReadWriteBuffer::<BoolCodec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(3).unwrap();
    buf.init().unwrap();

    buf.write(&[true, false, true], 0).unwrap();
    let mut out = Vec::new();
    buf.read_all(&mut out).unwrap();
    assert_eq!(out, vec![true, false, true]);
}

#[test]
fn char16_buffer_round_trips() {
    let (_driver, ctx) = running_context();
    let buf = GlobalStaticReadWriteBuffer::<Char16Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(3).unwrap();
    buf.init().unwrap();

    buf.write(&[b'h' as u16, b'i' as u16, b'!' as u16], 0).unwrap();
    let mut out = Vec::new();
    buf.read_all(&mut out).unwrap();
    assert_eq!(out, vec![b'h' as u16, b'i' as u16, b'!' as u16]);
}

#[test]
fn read_from_offset_reads_the_remaining_tail() {
    let (_driver, ctx) = running_context();
    let buf = GlobalStaticReadWriteBuffer::<I64Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(5).unwrap();
    buf.init().unwrap();

    buf.write(&[10, 20, 30, 40, 50], 0).unwrap();
    let mut out = Vec::new();
    buf.read_from(2, &mut out).unwrap();
    assert_eq!(out, vec![30, 40, 50]);
}

#[test]
fn append_grows_size_and_preserves_prior_contents() {
    let (_driver, ctx) = running_context();
    let buf = GlobalDynamicReadWriteBuffer::<I32Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(2).unwrap();
    buf.init().unwrap();

    buf.write(&[1, 2], 0).unwrap();
    buf.append(&[3, 4]).unwrap();

    let mut out = Vec::new();
    buf.read_all(&mut out).unwrap();
    assert_eq!(out, vec![1, 2, 3, 4]);
}

#[test]
fn write_only_buffer_does_not_implement_readable() {
    let (_driver, ctx) = running_context();
    let buf = GlobalStaticWriteOnlyBuffer::<I32Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(4).unwrap();
    buf.init().unwrap();

    buf.write(&[7, 8], 0).unwrap();
    // `buf.read(...)` would not compile here: GlobalStaticWriteOnlyBuffer
    // never implements Readable<I32Codec>, which is the point.
}
