//! Common test utilities for the integration tests

#![allow(dead_code)]

use harp_vex::host::{HostDevice, HostQueue};
use harp_vex::{Backend, DistributedVector, Scalar};
use rand::Rng;
use rand::distributions::{Distribution, Standard};

pub const EPSILON: f64 = 1e-8;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// `n` queues on one host device
pub fn host_queues(n: usize) -> (HostDevice, Vec<HostQueue>) {
    init_logger();
    let device = HostDevice::new();
    let queues = (0..n).map(|_| device.queue()).collect();
    (device, queues)
}

pub fn random_vector<T>(n: usize) -> Vec<T>
where
    Standard: Distribution<T>,
{
    let mut rng = rand::thread_rng();
    (0..n).map(|_| rng.r#gen()).collect()
}

/// Check a few elements of `x`: both ends plus random positions
pub fn check_sample<T: Scalar, B: Backend>(
    x: &DistributedVector<T, B>,
    mut check: impl FnMut(usize, T),
) {
    if x.is_empty() {
        return;
    }

    let mut rng = rand::thread_rng();
    let mut indices = vec![0, x.size() - 1];
    indices.extend((0..16).map(|_| rng.gen_range(0..x.size())));
    for i in indices {
        check(i, x.get(i).expect("failed to read element"));
    }
}
