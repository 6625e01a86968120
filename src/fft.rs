//! Square 2D FFT over row-major complex arrays
//!
//! The transforms are unnormalized, a forward followed by an inverse
//! transform scales the data by `n*n`.

use rayon::prelude::*;
use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use std::sync::Arc;

/// 2D FFT plans for `n x n` arrays
#[derive(Clone)]
pub struct Fft2 {
    n: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}
impl std::fmt::Debug for Fft2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fft2").field("n", &self.n).finish()
    }
}
impl Fft2 {
    /// Plans the forward and inverse transforms of `n x n` arrays
    pub fn new(n: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            n,
            forward: planner.plan_fft_forward(n),
            inverse: planner.plan_fft_inverse(n),
        }
    }
    /// In-place forward transform
    pub fn forward(&self, data: &mut [Complex64]) {
        self.process(&self.forward, data);
    }
    /// In-place inverse transform
    pub fn inverse(&self, data: &mut [Complex64]) {
        self.process(&self.inverse, data);
    }
    fn process(&self, fft: &Arc<dyn Fft<f64>>, data: &mut [Complex64]) {
        let n = self.n;
        assert_eq!(data.len(), n * n, "expected a {n}x{n} array");
        data.par_chunks_mut(n).for_each(|row| fft.process(row));
        transpose(data, n);
        data.par_chunks_mut(n).for_each(|row| fft.process(row));
        transpose(data, n);
    }
}

fn transpose<T>(data: &mut [T], n: usize) {
    for i in 0..n {
        for j in i + 1..n {
            data.swap(i * n + j, j * n + i);
        }
    }
}

/// Sample frequencies of a `n` points transform with sample spacing `d`
///
/// Zero frequency first, then the positive and finally the negative frequencies.
pub fn fftfreq(n: usize, d: f64) -> Vec<f64> {
    let scale = 1.0 / (n as f64 * d);
    (0..n)
        .map(|i| {
            if i <= (n - 1) / 2 {
                i as f64 * scale
            } else {
                (i as f64 - n as f64) * scale
            }
        })
        .collect()
}

/// Moves the zero frequency of a `n x n` array to index `(n/2,n/2)`
pub fn fftshift<T: Copy>(data: &[T], n: usize) -> Vec<T> {
    let h = n / 2;
    let mut shifted = Vec::with_capacity(n * n);
    for i in 0..n {
        let ii = (i + n - h) % n;
        for j in 0..n {
            let jj = (j + n - h) % n;
            shifted.push(data[ii * n + jj]);
        }
    }
    shifted
}
