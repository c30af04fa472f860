//! Interpolator trait for sampling values at continuous coordinates.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Interpolator trait for sampling values at continuous coordinates.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate every channel of a volume at continuous voxel indices.
    ///
    /// # Arguments
    /// * `data` - The source volume `[C, H, W, D]`
    /// * `indices` - Voxel coordinates `[N, 3]`, each row `(h, w, d)`
    ///
    /// # Returns
    /// Sampled values `[C, N]`
    fn interpolate(&self, data: &Tensor<B, 4>, indices: Tensor<B, 2>) -> Tensor<B, 2>;
}
