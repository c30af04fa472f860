//! Trilinear interpolation implementation.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use serde::{Deserialize, Serialize};

use super::trait_::Interpolator;

/// Linear Interpolator.
///
/// Performs trilinear interpolation with border clamping: corner indices
/// are clamped into the volume while the weights come from the unclamped
/// coordinate, so any position outside reads the nearest border value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Create a new linear interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate(&self, data: &Tensor<B, 4>, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let [c, d0, d1, d2] = data.dims();
        let batch_size = indices.dims()[0];
        let device = indices.device();

        // indices: [Batch, 3] -> (h, w, d)
        let x = indices.clone().narrow(1, 0, 1).squeeze::<1>(1);
        let y = indices.clone().narrow(1, 1, 1).squeeze::<1>(1);
        let z = indices.narrow(1, 2, 1).squeeze::<1>(1);

        let x0 = x.clone().floor();
        let y0 = y.clone().floor();
        let z0 = z.clone().floor();

        let wx = (x - x0.clone()).reshape([1, batch_size]);
        let wy = (y - y0.clone()).reshape([1, batch_size]);
        let wz = (z - z0.clone()).reshape([1, batch_size]);

        let x1 = x0.clone() + 1.0;
        let y1 = y0.clone() + 1.0;
        let z1 = z0.clone() + 1.0;

        let x0_i = x0.clamp(0.0, (d0 - 1) as f64).int();
        let y0_i = y0.clamp(0.0, (d1 - 1) as f64).int();
        let z0_i = z0.clamp(0.0, (d2 - 1) as f64).int();
        let x1_i = x1.clamp(0.0, (d0 - 1) as f64).int();
        let y1_i = y1.clamp(0.0, (d1 - 1) as f64).int();
        let z1_i = z1.clamp(0.0, (d2 - 1) as f64).int();

        let stride_x = (d1 * d2) as i32;
        let stride_y = d2 as i32;
        let flat = data.clone().reshape([c, d0 * d1 * d2]);

        let gather = |xi: &Tensor<B, 1, Int>, yi: &Tensor<B, 1, Int>, zi: &Tensor<B, 1, Int>| {
            let idx = xi.clone() * stride_x + yi.clone() * stride_y + zi.clone();
            flat.clone().select(1, idx)
        };

        let c000 = gather(&x0_i, &y0_i, &z0_i);
        let c001 = gather(&x0_i, &y0_i, &z1_i);
        let c010 = gather(&x0_i, &y1_i, &z0_i);
        let c011 = gather(&x0_i, &y1_i, &z1_i);
        let c100 = gather(&x1_i, &y0_i, &z0_i);
        let c101 = gather(&x1_i, &y0_i, &z1_i);
        let c110 = gather(&x1_i, &y1_i, &z0_i);
        let c111 = gather(&x1_i, &y1_i, &z1_i);

        let one = Tensor::<B, 2>::ones([1, batch_size], &device);
        let one_minus_wx = one.clone() - wx.clone();
        let one_minus_wy = one.clone() - wy.clone();
        let one_minus_wz = one - wz.clone();

        // Interpolate along D
        let c00 = c000 * one_minus_wz.clone() + c001 * wz.clone();
        let c01 = c010 * one_minus_wz.clone() + c011 * wz.clone();
        let c10 = c100 * one_minus_wz.clone() + c101 * wz.clone();
        let c11 = c110 * one_minus_wz + c111 * wz;

        // Interpolate along W
        let c0 = c00 * one_minus_wy.clone() + c01 * wy.clone();
        let c1 = c10 * one_minus_wy + c11 * wy;

        // Interpolate along H
        c0 * one_minus_wx + c1 * wx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn cube() -> Tensor<TestBackend, 4> {
        let device = Default::default();
        // value = 100*h + 10*w + d
        let data_vec = vec![0.0, 1.0, 10.0, 11.0, 100.0, 101.0, 110.0, 111.0];
        Tensor::from_data(TensorData::new(data_vec, Shape::new([1, 2, 2, 2])), &device)
    }

    #[test]
    fn test_linear_interpolator_axes() {
        let device = Default::default();
        let indices = Tensor::<TestBackend, 2>::from_floats(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            &device,
        );
        let result = LinearInterpolator::new().interpolate(&cube(), indices);
        assert_eq!(result.dims(), [1, 4]);

        let values = result.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![0.0, 100.0, 10.0, 1.0]);
    }

    #[test]
    fn test_linear_interpolator_center_and_fraction() {
        let device = Default::default();
        let indices = Tensor::<TestBackend, 2>::from_floats([[0.5, 0.5, 0.5], [0.25, 0.0, 0.75]], &device);
        let values = LinearInterpolator::new()
            .interpolate(&cube(), indices)
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        assert!((values[0] - 55.5).abs() < 1e-4);
        assert!((values[1] - 25.75).abs() < 1e-4);
    }

    #[test]
    fn test_linear_interpolator_clamps_outside() {
        let device = Default::default();
        let indices = Tensor::<TestBackend, 2>::from_floats([[-3.0, 0.0, 0.0], [1.0, 5.0, 1.5]], &device);
        let values = LinearInterpolator::new()
            .interpolate(&cube(), indices)
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        assert!((values[0] - 0.0).abs() < 1e-5);
        assert!((values[1] - 111.0).abs() < 1e-5);
    }

    #[test]
    fn test_linear_interpolator_channels_independent() {
        let device = Default::default();
        let data = Tensor::cat(vec![cube(), cube().mul_scalar(-1.0)], 0);
        let indices = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.5, 0.0]], &device);
        let values = LinearInterpolator::new()
            .interpolate(&data, indices)
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        assert_eq!(values.len(), 2);
        assert!((values[0] - 105.0).abs() < 1e-5);
        assert!((values[1] + 105.0).abs() < 1e-5);
    }
}
