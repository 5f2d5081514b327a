//! Crash-safe dynamic resize coverage (spec §4.6, §8 properties 3-4): growth
//! preserves live bytes, a mid-resize driver failure leaves the buffer
//! completely untouched, and kernel bindings are refreshed after a resize.

use clmem_core::error::DriverErrorCode;
use clmem_core::prelude::*;
use clmem_testkit::running_context;

#[test]
fn write_past_capacity_grows_and_preserves_prior_contents() {
    let (_driver, ctx) = running_context();
    let buf = GlobalDynamicReadWriteBuffer::<I32Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(2).unwrap();
    buf.set_policy(DynamicPolicy {
        capacity_multiplier: 2.0,
        min_capacity: 2,
        shrink_factor: 4.0,
    })
    .unwrap();
    buf.init().unwrap();

    buf.write(&[1, 2], 0).unwrap();
    assert_eq!(buf.capacity(), 2);

    buf.write(&[3, 4], 2).unwrap();
    assert!(buf.capacity() >= 4);

    let mut out = Vec::new();
    buf.read_all(&mut out).unwrap();
    assert_eq!(out, vec![1, 2, 3, 4]);
}

#[test]
fn explicit_resize_reallocates_device_handle_and_keeps_bytes() {
    let (driver, ctx) = running_context();
    let buf = GlobalDynamicReadWriteBuffer::<I32Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(4).unwrap();
    buf.init().unwrap();
    buf.write(&[1, 2, 3, 4], 0).unwrap();

    assert_eq!(driver.live_mem_count(), 1);
    buf.resize(10).unwrap();
    assert_eq!(buf.capacity(), 10);
    // old handle released, new one allocated: still exactly one live mem object
    assert_eq!(driver.live_mem_count(), 1);

    let mut out = Vec::new();
    buf.read_all(&mut out).unwrap();
    assert_eq!(out, vec![1, 2, 3, 4]);
}

#[test]
fn resize_failure_leaves_original_state_untouched() {
    let (driver, ctx) = running_context();
    let buf = GlobalDynamicReadWriteBuffer::<I32Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(4).unwrap();
    buf.init().unwrap();
    buf.write(&[1, 2, 3, 4], 0).unwrap();

    driver.fail_next("create_buffer", DriverErrorCode::MemObjectAllocationFailure);
    let err = buf.resize(20).unwrap_err();
    assert!(matches!(err, BufferError::DeviceOOM(_)));

    // Capacity, size, and live bytes are exactly as before the failed resize.
    assert_eq!(buf.capacity(), 4);
    assert_eq!(buf.size(), 4);
    assert_eq!(driver.live_mem_count(), 1);
    let mut out = Vec::new();
    buf.read_all(&mut out).unwrap();
    assert_eq!(out, vec![1, 2, 3, 4]);
}

#[test]
fn resize_failure_mid_copy_does_not_leak_the_new_handle() {
    let (driver, ctx) = running_context();
    let buf = GlobalDynamicReadWriteBuffer::<I32Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(4).unwrap();
    buf.init().unwrap();
    buf.write(&[1, 2, 3, 4], 0).unwrap();

    driver.fail_next("enqueue_copy_buffer", DriverErrorCode::MemCopyOverlap);
    let err = buf.resize(20).unwrap_err();
    assert!(matches!(err, BufferError::Copy(_)));

    // the new handle allocated before the failed copy must have been released
    assert_eq!(driver.live_mem_count(), 1);
    assert_eq!(buf.capacity(), 4);
}

#[test]
fn resize_rebinds_kernel_args_to_the_new_handle() {
    let (driver, ctx) = running_context();
    let buf = GlobalDynamicReadWriteBuffer::<I32Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(4).unwrap();
    buf.init().unwrap();
    buf.bind(KernelHandle(3), 0).unwrap();

    let clmem_testkit::KernelArgRecord::Mem(original_handle) = driver.kernel_arg(KernelHandle(3), 0).unwrap() else {
        panic!("expected a Mem kernel-arg record after bind");
    };

    buf.resize(20).unwrap();

    let clmem_testkit::KernelArgRecord::Mem(rebound_handle) = driver.kernel_arg(KernelHandle(3), 0).unwrap() else {
        panic!("expected a Mem kernel-arg record after resize");
    };
    // the rebound handle must be the new (not the original) device handle.
    assert_ne!(rebound_handle.0, original_handle.0);
}

#[test]
fn remove_past_shrink_threshold_shrinks_capacity() {
    let (_driver, ctx) = running_context();
    let buf = GlobalDynamicReadWriteBuffer::<I32Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.with_init_size(2).unwrap();
    buf.set_policy(DynamicPolicy {
        capacity_multiplier: 1.5,
        min_capacity: 2,
        shrink_factor: 2.0,
    })
    .unwrap();
    buf.init().unwrap();

    buf.write(&[1, 2, 3, 4, 5, 6, 7, 8], 0).unwrap();
    let grown_capacity = buf.capacity();
    assert!(grown_capacity >= 8);

    buf.remove(0, 7).unwrap();
    assert_eq!(buf.size(), 1);
    assert!(buf.capacity() < grown_capacity, "capacity should shrink once size * shrink_factor < capacity");
}

#[test]
fn parameter_buffer_has_fixed_capacity_one_and_never_allocates_a_device_handle() {
    let (driver, ctx) = running_context();
    let buf = ParameterBuffer::<I32Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.init().unwrap();

    assert_eq!(buf.capacity(), 1, "spec §4.5: Parameter flavor capacity is always exactly 1");
    assert_eq!(driver.live_mem_count(), 0, "parameter buffers never allocate a device handle");

    buf.write(&[9], 0).unwrap();
    let mut out = Vec::new();
    buf.read_all(&mut out).unwrap();
    assert_eq!(out, vec![9]);

    // writing past the single slot is rejected, not grown.
    let err = buf.write(&[1, 2], 0).unwrap_err();
    assert!(matches!(err, BufferError::CapacityExceeded { .. }));
    assert_eq!(buf.capacity(), 1);
}

#[test]
fn parameter_buffer_rejects_an_explicit_init_size_other_than_one() {
    let (_driver, ctx) = running_context();
    let buf = ParameterBuffer::<I32Codec>::new();
    buf.with_context(ctx).unwrap();
    let err = buf.with_init_size(4).unwrap_err();
    assert!(matches!(err, BufferError::Init(_)));
}

#[test]
fn parameter_buffer_is_not_dynamic() {
    let (_driver, ctx) = running_context();
    let buf = ParameterBuffer::<I32Codec>::new();
    buf.with_context(ctx).unwrap();
    buf.init().unwrap();

    // `buf.resize(4)` would not compile here: ParameterBuffer never
    // implements Dynamic<I32Codec>, which is the point — its capacity is
    // fixed at 1 by construction, not merely rejected at runtime.
    assert_eq!(buf.capacity(), 1);
}
