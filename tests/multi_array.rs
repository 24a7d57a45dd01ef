//! Multi-dimensional arrays backed by distributed vectors

mod common;

use common::{approx_eq, host_queues};
use harp_vex::host::HostBackend;
use harp_vex::prelude::*;
use ndarray::{ArrayD, IxDyn};
use std::f64::consts::PI;

type Array<T, const NDIM: usize> = MultiArray<T, HostBackend, NDIM>;

#[test]
fn test_create() {
    let (_device, queues) = host_queues(2);

    let x = Array::<f64, 2>::new(&queues, &[1024, 1024]).unwrap();
    assert_eq!(x.size(), 1024 * 1024);

    let y = Array::<f64, 3>::new(&queues, &[32, 32, 32]).unwrap();
    assert_eq!(y.size(), 32768);
    assert_eq!(y.lengths(), &[32, 32, 32]);
}

#[test]
fn test_wrong_ndim() {
    let (_device, queues) = host_queues(1);

    let err = Array::<f64, 3>::new(&queues, &[32, 32]).unwrap_err();
    assert!(matches!(err, VexError::InvalidSize(_)));

    let err = Array::<f64, 1>::new(&queues, &[]).unwrap_err();
    assert!(matches!(err, VexError::InvalidSize(_)));
}

#[test]
fn test_trigonometric_identity() {
    let (_device, queues) = host_queues(3);
    let n = 32768;

    let x = DistributedVector::<f64, HostBackend>::with_size(&queues, n).unwrap();
    let y = Array::<f64, 3>::new(&queues, &[32, 32, 32]).unwrap();

    x.assign(2.0 * PI * element_index()).unwrap();
    y.assign(pow(sin(&x), 2) + pow(cos(&x), 2)).unwrap();

    let host = y.to_vec().unwrap();
    assert_eq!(host.len(), n);
    assert!(host.iter().all(|&v| approx_eq(v, 1.0)));
}

#[test]
fn test_multi_array_operand_rejected() {
    let (_device, queues) = host_queues(2);
    let a = Array::<f32, 2>::new(&queues, &[8, 8]).unwrap();
    let b = Array::<f32, 2>::new(&queues, &[8, 8]).unwrap();
    b.fill(3.0).unwrap();

    let err = b.assign(&a * 2.0f32).unwrap_err();
    assert!(matches!(err, VexError::UnsupportedOperand(_)));

    // Nothing was dispatched
    assert!(b.to_vec().unwrap().iter().all(|&v| v == 3.0));

    // The flat vector of the same array is accepted
    a.fill(1.5).unwrap();
    b.assign(a.vector() * 2.0f32).unwrap();
    assert!(b.to_vec().unwrap().iter().all(|&v| v == 3.0));
}

#[test]
fn test_ndarray_round_trip() {
    let (_device, queues) = host_queues(2);
    let host = ArrayD::from_shape_fn(IxDyn(&[4, 3, 2]), |ix| {
        (ix[0] * 100 + ix[1] * 10 + ix[2]) as i32
    });

    let a = Array::<i32, 3>::from_ndarray(&queues, &host).unwrap();
    assert_eq!(a.size(), 24);
    assert_eq!(a.to_ndarray().unwrap(), host);
    assert_eq!(a.vector().get(23).unwrap(), 321);
}

#[test]
fn test_element_index_is_flat() {
    let (_device, queues) = host_queues(3);
    let a = Array::<u64, 2>::new(&queues, &[5, 7]).unwrap();
    a.assign(element_index()).unwrap();

    let grid = a.to_ndarray().unwrap();
    assert_eq!(grid.shape(), &[5, 7]);
    assert_eq!(grid[&[2usize, 3][..]], 2 * 7 + 3);
}
