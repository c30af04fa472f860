//! Metric trait for evaluating a displacement field.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use mindreg_core::DisplacementField;

/// Dissimilarity between a fixed volume and a moving volume resampled
/// through a displacement field.
///
/// Lower values indicate better alignment.
pub trait Metric<B: Backend> {
    /// Calculate the loss between `fixed` and `moving` warped by `field`.
    ///
    /// # Arguments
    /// * `fixed` - The fixed volume, `[H, W, D]`
    /// * `moving` - The moving volume, `[H, W, D]`
    /// * `field` - Voxel displacements on the fixed grid, `[3, H, W, D]`
    ///
    /// # Returns
    /// Scalar tensor holding the loss
    fn forward(&self, fixed: &Tensor<B, 3>, moving: &Tensor<B, 3>, field: &DisplacementField<B>) -> Tensor<B, 1>;

    /// Get the name of this metric.
    fn name(&self) -> &'static str;
}

/// Warp a scalar volume through a field, `[H, W, D]` in and out.
pub(crate) fn warp_scalar<B: Backend, I: mindreg_core::interpolation::Interpolator<B>>(
    volume: &Tensor<B, 3>,
    field: &DisplacementField<B>,
    interpolator: &I,
) -> Tensor<B, 3> {
    let [h, w, d] = volume.dims();
    let [fh, fw, fd] = field.shape();
    field
        .warp(&volume.clone().reshape([1, h, w, d]), interpolator)
        .reshape([fh, fw, fd])
}
