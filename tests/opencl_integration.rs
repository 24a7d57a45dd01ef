//! OpenCL Backend Integration Tests
//!
//! Run with: `cargo test --features opencl`

#![cfg(feature = "opencl")]

mod common;

use common::{approx_eq, init_logger};
use harp_vex::opencl::{OpenCLBackend, OpenCLDevice};
use harp_vex::prelude::*;
use std::f64::consts::PI;

type Vector<T> = DistributedVector<T, OpenCLBackend>;

fn setup_opencl() -> Option<OpenCLDevice> {
    init_logger();
    match OpenCLDevice::new() {
        Ok(device) => Some(device),
        Err(e) => {
            eprintln!("OpenCL device not available: {:?}", e);
            None
        }
    }
}

#[test]
fn test_opencl_fill() {
    let Some(device) = setup_opencl() else {
        return;
    };
    let queues = vec![device.queue().unwrap()];

    let x = Vector::<f32>::with_size(&queues, 1000).unwrap();
    x.fill(2.5).unwrap();
    assert!(x.to_vec().unwrap().iter().all(|&v| v == 2.5));
}

#[test]
fn test_opencl_element_index_two_queues() {
    let Some(device) = setup_opencl() else {
        return;
    };
    let queues = vec![device.queue().unwrap(), device.queue().unwrap()];

    let x = Vector::<i32>::with_size(&queues, 1001).unwrap();
    x.assign(element_index() * 3 - 1).unwrap();
    x.finish().unwrap();

    let expected: Vec<i32> = (0..1001).map(|i| i * 3 - 1).collect();
    assert_eq!(x.to_vec().unwrap(), expected);
}

#[test]
fn test_opencl_trigonometric_identity() {
    let Some(device) = setup_opencl() else {
        return;
    };
    if !device.supports_f64() {
        println!("Device has no double precision support, skipping test");
        return;
    }
    let queues = vec![device.queue().unwrap(), device.queue().unwrap()];

    let x = Vector::<f64>::with_size(&queues, 4096).unwrap();
    let y = Vector::<f64>::with_size(&queues, 4096).unwrap();
    x.assign(2.0 * PI * element_index()).unwrap();
    y.assign(pow(sin(&x), 2) + pow(cos(&x), 2)).unwrap();

    assert!(y.to_vec().unwrap().iter().all(|&v| approx_eq(v, 1.0)));
}

#[test]
fn test_opencl_arithmetic_matches_host() {
    let Some(device) = setup_opencl() else {
        return;
    };
    let queues = vec![device.queue().unwrap()];
    let a: Vec<f32> = (0..512).map(|i| i as f32 * 0.25).collect();
    let b: Vec<f32> = (0..512).map(|i| 1.0 + i as f32).collect();

    let x = Vector::from_slice(&queues, &a).unwrap();
    let y = Vector::from_slice(&queues, &b).unwrap();
    x.assign(&x * &y + 1.0f32).unwrap();

    let host = x.to_vec().unwrap();
    for i in 0..512 {
        let expected = a[i] * b[i] + 1.0;
        assert!((host[i] - expected).abs() <= expected.abs() * 1e-6);
    }
}

#[test]
fn test_opencl_kernel_cache() {
    let Some(device) = setup_opencl() else {
        return;
    };
    let queues = vec![device.queue().unwrap(), device.queue().unwrap()];
    let x = Vector::<f32>::with_size(&queues, 256).unwrap();

    x.fill(1.0).unwrap();
    x.fill(2.0).unwrap();
    x.assign(&x * 4.0f32).unwrap();

    let stats = device.context().kernel_cache().stats();
    assert_eq!(stats.compiles, 2);
    assert_eq!(stats.entries, 2);
    assert_eq!(x.get(255).unwrap(), 8.0);
}

#[test]
fn test_opencl_copy_and_resize() {
    let Some(device) = setup_opencl() else {
        return;
    };
    let queues = vec![device.queue().unwrap(), device.queue().unwrap()];
    let host: Vec<u32> = (0..100).collect();

    let x = Vector::from_slice(&queues, &host).unwrap();
    let mut y = x.try_clone().unwrap();
    assert_eq!(y.to_vec().unwrap(), host);

    y.set(50, 7).unwrap();
    assert_eq!(y.get(50).unwrap(), 7);
    assert_eq!(x.get(50).unwrap(), 50);

    y.resize(&queues, 10).unwrap();
    assert_eq!(y.size(), 10);
}
