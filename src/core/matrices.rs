//! Dense-matrix helpers shared by the layer and network code.
//!
//! Most functions are pure and allocate their result; they serve
//! construction and one-off computations. The `_into` variants write into an
//! existing buffer instead, for the training hot path where the per-layer
//! scratch state is reused across calls.

use ndarray::{Array2, Zip};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

pub fn add(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    a + b
}

pub fn sub(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    a - b
}

/// Element-wise (Hadamard) product.
pub fn hadamard(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    a * b
}

/// Element-wise product computed into `output`.
pub fn hadamard_into(a: &Array2<f64>, b: &Array2<f64>, output: &mut Array2<f64>) {
    Zip::from(output)
        .and(a)
        .and(b)
        .for_each(|output, &a, &b| *output = a * b);
}

pub fn scale(factor: f64, a: &Array2<f64>) -> Array2<f64> {
    a * factor
}

/// Matrix product, ideal for `Wx + b` compositions.
pub fn product(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    a.dot(b)
}

pub fn fill(rows: usize, columns: usize, value: f64) -> Array2<f64> {
    Array2::from_elem((rows, columns), value)
}

pub fn fill_column(rows: usize, value: f64) -> Array2<f64> {
    fill(rows, 1, value)
}

/// Independent uniform samples in `[-|cap|, +|cap|]`.
pub fn noise(rows: usize, columns: usize, cap: f64) -> Array2<f64> {
    let cap = cap.abs();
    Array2::random((rows, columns), Uniform::new_inclusive(-cap, cap))
}

pub fn noise_column(rows: usize, cap: f64) -> Array2<f64> {
    noise(rows, 1, cap)
}
