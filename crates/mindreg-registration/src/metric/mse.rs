//! Mean Squared Error metric implementation.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use mindreg_core::interpolation::LinearInterpolator;
use mindreg_core::DisplacementField;

use super::trait_::{warp_scalar, Metric};
use crate::error::{RegistrationError, Result};

/// Mean squared intensity difference of two volumes on the same grid.
pub fn mean_squared_error<B: Backend>(a: &Tensor<B, 3>, b: &Tensor<B, 3>) -> Result<Tensor<B, 1>> {
    if a.dims() != b.dims() {
        return Err(RegistrationError::shape_mismatch(&a.dims(), &b.dims()));
    }
    Ok((a.clone() - b.clone()).powf_scalar(2.0).mean())
}

/// Mean Squared Error Metric.
///
/// Computes the mean squared difference between voxel intensities:
/// MSE = (1/N) * sum((Fixed(x) - Moving(x + u(x)))^2)
#[derive(Debug, Clone, Default)]
pub struct MeanSquaredError {
    interpolator: LinearInterpolator,
}

impl MeanSquaredError {
    /// Create a new MSE metric.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: Backend> Metric<B> for MeanSquaredError {
    fn forward(&self, fixed: &Tensor<B, 3>, moving: &Tensor<B, 3>, field: &DisplacementField<B>) -> Tensor<B, 1> {
        let warped = warp_scalar(moving, field, &self.interpolator);
        (warped - fixed.clone()).powf_scalar(2.0).mean()
    }

    fn name(&self) -> &'static str {
        "MeanSquaredError"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;
    use mindreg_core::filter::shift_replicate;

    type B = NdArray<f32>;

    fn gradient(shape: [usize; 3]) -> Tensor<B, 3> {
        let device = Default::default();
        let [h, w, d] = shape;
        let mut values = Vec::with_capacity(h * w * d);
        for i in 0..h {
            for j in 0..w {
                for k in 0..d {
                    values.push((i + 2 * j + 3 * k) as f32);
                }
            }
        }
        Tensor::from_data(TensorData::new(values, Shape::new(shape)), &device)
    }

    #[test]
    fn test_mse_identity() {
        let device = Default::default();
        let volume = gradient([5, 5, 5]);
        let field = DisplacementField::<B>::zeros([5, 5, 5], &device);

        let loss = MeanSquaredError::new().forward(&volume, &volume, &field).into_scalar();
        assert!(loss < 1e-5, "MSE should be 0 for identical volumes, got {}", loss);
    }

    #[test]
    fn test_mse_recovers_shift() {
        let device = Default::default();
        let fixed = gradient([6, 6, 6]);
        // moving(x) = fixed(x - e_h)  =>  fixed(x) = moving(x + e_h)
        let moving = shift_replicate(fixed.clone().reshape([1, 6, 6, 6]), [-1, 0, 0]).reshape([6, 6, 6]);

        let unaligned = mean_squared_error(&fixed, &moving).unwrap().into_scalar();
        assert!(unaligned > 0.5);

        let mut shift = vec![0.0f32; 3 * 216];
        shift[..216].fill(1.0);
        let field = DisplacementField::<B>::new(Tensor::from_data(
            TensorData::new(shift, Shape::new([3, 6, 6, 6])),
            &device,
        ));
        // The last row reads past the border, so only compare the rest.
        let warped = warp_scalar(&moving, &field, &LinearInterpolator::new());
        let diff = (warped.slice([0..5, 0..6, 0..6]) - fixed.slice([0..5, 0..6, 0..6]))
            .abs()
            .max()
            .into_scalar();
        assert!(diff < 1e-4);
    }

    #[test]
    fn test_shape_mismatch() {
        let a = gradient([4, 4, 4]);
        let b = gradient([4, 4, 3]);
        assert!(matches!(
            mean_squared_error(&a, &b),
            Err(RegistrationError::ShapeMismatch { .. })
        ));
    }
}
