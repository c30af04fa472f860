//! Nearest neighbor interpolation implementation.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use super::trait_::Interpolator;

/// Nearest Neighbor Interpolator.
///
/// Rounds to the nearest voxel and clamps it into the volume.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NearestNeighborInterpolator;

impl NearestNeighborInterpolator {
    /// Create a new nearest neighbor interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for NearestNeighborInterpolator {
    fn interpolate(&self, data: &Tensor<B, 4>, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let [c, d0, d1, d2] = data.dims();

        let x = indices.clone().narrow(1, 0, 1).squeeze::<1>(1);
        let y = indices.clone().narrow(1, 1, 1).squeeze::<1>(1);
        let z = indices.narrow(1, 2, 1).squeeze::<1>(1);

        let xi = x.round().clamp(0.0, (d0 - 1) as f64).int();
        let yi = y.round().clamp(0.0, (d1 - 1) as f64).int();
        let zi = z.round().clamp(0.0, (d2 - 1) as f64).int();

        let idx = xi * (d1 * d2) as i32 + yi * d2 as i32 + zi;
        data.clone().reshape([c, d0 * d1 * d2]).select(1, idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_nearest_neighbor_rounds_and_clamps() {
        let device = Default::default();
        let data_vec = vec![0.0, 1.0, 10.0, 11.0, 100.0, 101.0, 110.0, 111.0];
        let data = Tensor::<TestBackend, 4>::from_data(TensorData::new(data_vec, Shape::new([1, 2, 2, 2])), &device);

        let indices = Tensor::<TestBackend, 2>::from_floats(
            [[0.2, 0.9, 0.4], [0.7, -2.0, 1.2], [4.0, 4.0, 4.0]],
            &device,
        );
        let values = NearestNeighborInterpolator::new()
            .interpolate(&data, indices)
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        assert_eq!(values, vec![10.0, 101.0, 111.0]);
    }
}
