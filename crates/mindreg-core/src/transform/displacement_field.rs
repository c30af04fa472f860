//! Displacement field transform implementation.
//!
//! This module provides a dense displacement field where each voxel has its
//! own displacement vector. The field is stored `[3, H, W, D]` in voxel units
//! with channels in `(h, w, d)` order: fixed voxel `x` corresponds to moving
//! position `x + d(x)`.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::trait_::Transform;
use crate::filter::{resize_trilinear, GridAlignment};
use crate::interpolation::{Interpolator, LinearInterpolator};
use crate::volume::generate_grid_3d;

/// Number of points sampled per interpolation call when warping.
const CHUNK_SIZE: usize = 32768;

/// Dense displacement field for 3D volumes.
///
/// # Type Parameters
/// * `B` - The Burn backend
#[derive(Debug, Clone)]
pub struct DisplacementField<B: Backend> {
    /// Displacement vectors, `[3, H, W, D]`, voxel units.
    data: Tensor<B, 4>,
}

impl<B: Backend> DisplacementField<B> {
    /// Create a displacement field from a `[3, H, W, D]` tensor in voxel units.
    ///
    /// # Panics
    /// If the leading dimension is not 3.
    pub fn new(data: Tensor<B, 4>) -> Self {
        assert_eq!(data.dims()[0], 3, "Displacement field must have 3 channels");
        Self { data }
    }

    /// Create a zero displacement field for the given spatial shape.
    pub fn zeros(shape: [usize; 3], device: &B::Device) -> Self {
        Self::new(Tensor::zeros([3, shape[0], shape[1], shape[2]], device))
    }

    /// Create a field from a `[H, W, D, 3]` channel-last tensor in voxel units.
    pub fn from_channels_last(data: Tensor<B, 4>) -> Self {
        Self::new(data.permute([3, 0, 1, 2]))
    }

    /// Create a field from normalized `[-1, 1]` offsets stored in `(d, w, h)`
    /// channel order, as used by volumetric grid samplers.
    pub fn from_normalized(data: Tensor<B, 4>) -> Self {
        let [_, h, w, d] = data.dims();
        let device = data.device();
        let voxel = data.flip([0]) * Self::axis_scale([h, w, d], &device, false);
        Self::new(voxel)
    }

    /// Get the displacement tensor `[3, H, W, D]`.
    pub fn data(&self) -> &Tensor<B, 4> {
        &self.data
    }

    /// Consume the field and return its tensor.
    pub fn into_data(self) -> Tensor<B, 4> {
        self.data
    }

    /// Spatial shape `[H, W, D]`.
    pub fn shape(&self) -> [usize; 3] {
        let [_, h, w, d] = self.data.dims();
        [h, w, d]
    }

    pub fn device(&self) -> B::Device {
        self.data.device()
    }

    /// Export as `[H, W, D, 3]` in voxel units.
    pub fn to_channels_last(&self) -> Tensor<B, 4> {
        self.data.clone().permute([1, 2, 3, 0])
    }

    /// Convert to normalized `[-1, 1]` offsets in `(d, w, h)` channel order.
    ///
    /// Uses the align-corners convention: one voxel along an axis of size
    /// `n` spans `2 / (n - 1)` normalized units.
    pub fn to_normalized(&self) -> Tensor<B, 4> {
        let scale = Self::axis_scale(self.shape(), &self.device(), true);
        (self.data.clone() * scale).flip([0])
    }

    /// Multiply each channel by a constant.
    pub fn scale(&self, factors: [f32; 3]) -> Self {
        let device = self.device();
        let factors = Tensor::<B, 1>::from_floats(factors.as_slice(), &device).reshape([3, 1, 1, 1]);
        Self::new(self.data.clone() * factors)
    }

    /// Displacement vectors sampled at continuous positions `[N, 3]`,
    /// trilinear with border clamping. Returns `[3, N]`.
    pub fn sample(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        LinearInterpolator::new().interpolate(&self.data, points)
    }

    /// Absolute sampling positions `x + d(x)` for every voxel, `[N, 3]`.
    pub fn sampling_points(&self) -> Tensor<B, 2> {
        let shape = self.shape();
        let n: usize = shape.iter().product();
        let grid = generate_grid_3d::<B>(shape, &self.device());
        grid + self.data.clone().reshape([3, n]).transpose()
    }

    /// Resample a `[C, H', W', D']` volume through the field.
    ///
    /// `out[x] = volume(x + d(x))`; the output has the field's spatial shape
    /// and positions outside `volume` read its border.
    pub fn warp<I: Interpolator<B>>(&self, volume: &Tensor<B, 4>, interpolator: &I) -> Tensor<B, 4> {
        let [h, w, d] = self.shape();
        let channels = volume.dims()[0];
        let points = self.sampling_points();
        let total = h * w * d;

        let mut chunks = Vec::with_capacity(total.div_ceil(CHUNK_SIZE));
        let mut start = 0;
        while start < total {
            let len = CHUNK_SIZE.min(total - start);
            let chunk = points.clone().narrow(0, start, len);
            chunks.push(interpolator.interpolate(volume, chunk));
            start += len;
        }

        if chunks.is_empty() {
            return Tensor::zeros([channels, h, w, d], &self.device());
        }
        Tensor::cat(chunks, 1).reshape([channels, h, w, d])
    }

    /// Compose two fields: the result maps `x` to `x + second(x) +
    /// first(x + second(x))`, i.e. `second` is applied before `first`.
    ///
    /// # Panics
    /// If the fields have different shapes.
    pub fn compose(first: &Self, second: &Self) -> Self {
        assert_eq!(first.shape(), second.shape(), "Composed fields must share a grid");
        let pulled = second.warp(&first.data, &LinearInterpolator::new());
        Self::new(second.data.clone() + pulled)
    }

    /// Resize a field measured in grid cells of `spacing` voxels to `shape`
    /// with half-pixel trilinear interpolation, converting it to voxel units.
    ///
    /// The vectors are scaled by `spacing`, not by the size ratio, so
    /// volumes that are not a multiple of the spacing keep one cell equal
    /// to `spacing` voxels.
    pub fn upsample(&self, shape: [usize; 3], spacing: usize) -> Self {
        let resized = resize_trilinear(self.data.clone(), shape, GridAlignment::Centers);
        let factor = spacing as f32;
        Self::new(resized.mul_scalar(factor))
    }

    /// Per-channel factor `2 / (n - 1)` (or its inverse), shaped `[3, 1, 1, 1]`.
    fn axis_scale(shape: [usize; 3], device: &B::Device, to_normalized: bool) -> Tensor<B, 4> {
        let factors: Vec<f32> = shape
            .iter()
            .map(|&n| {
                let span = (n.max(2) - 1) as f32;
                if to_normalized {
                    2.0 / span
                } else {
                    span / 2.0
                }
            })
            .collect();
        Tensor::<B, 1>::from_floats(factors.as_slice(), device).reshape([3, 1, 1, 1])
    }
}

impl<B: Backend> Transform<B> for DisplacementField<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let offsets = self.sample(points.clone()).transpose();
        points + offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::NearestNeighborInterpolator;
    use crate::volume::voxel_grid;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn constant_field(shape: [usize; 3], offset: [f32; 3]) -> DisplacementField<TestBackend> {
        let device = Default::default();
        let ones = DisplacementField::<TestBackend>::new(Tensor::ones([3, shape[0], shape[1], shape[2]], &device));
        ones.scale(offset)
    }

    fn ramp_volume(shape: [usize; 3]) -> Tensor<TestBackend, 4> {
        let device = Default::default();
        let [h, w, d] = shape;
        let values: Vec<f32> = (0..h * w * d).map(|v| v as f32).collect();
        Tensor::from_data(TensorData::new(values, Shape::new([1, h, w, d])), &device)
    }

    #[test]
    fn test_displacement_field_zeros() {
        let device = Default::default();
        let field = DisplacementField::<TestBackend>::zeros([4, 5, 6], &device);
        assert_eq!(field.shape(), [4, 5, 6]);
        assert_eq!(field.to_channels_last().dims(), [4, 5, 6, 3]);
    }

    #[test]
    fn test_normalized_round_trip_and_order() {
        let field = constant_field([5, 3, 9], [2.0, 1.0, -4.0]);
        let normalized = field.to_normalized();

        // Channel 0 now holds the d offset: -4 voxels over a span of 8.
        let first = normalized.clone().slice([0..1, 0..1, 0..1, 0..1]).into_scalar();
        let last = normalized.clone().slice([2..3, 0..1, 0..1, 0..1]).into_scalar();
        assert!((first + 1.0).abs() < 1e-6);
        assert!((last - 1.0).abs() < 1e-6);

        let back = DisplacementField::from_normalized(normalized);
        let diff = (back.into_data() - field.into_data()).abs().max().into_scalar();
        assert!(diff < 1e-5);
    }

    #[test]
    fn test_warp_integer_shift_with_nearest() {
        let field = constant_field([4, 4, 4], [1.0, 0.0, 0.0]);
        let volume = ramp_volume([4, 4, 4]);
        let warped = field.warp(&volume, &NearestNeighborInterpolator::new());

        // Interior rows read the next H slice, the last one clamps.
        let row0 = warped.clone().slice([0..1, 0..1, 0..4, 0..4]);
        let expected0 = volume.clone().slice([0..1, 1..2, 0..4, 0..4]);
        assert_eq!((row0 - expected0).abs().max().into_scalar(), 0.0);

        let row3 = warped.slice([0..1, 3..4, 0..4, 0..4]);
        let expected3 = volume.slice([0..1, 3..4, 0..4, 0..4]);
        assert_eq!((row3 - expected3).abs().max().into_scalar(), 0.0);
    }

    #[test]
    fn test_compose_constant_fields_adds() {
        let a = constant_field([6, 6, 6], [0.5, 0.0, 1.0]);
        let b = constant_field([6, 6, 6], [-1.0, 2.0, 0.0]);
        let composed = DisplacementField::compose(&a, &b);

        let expected = constant_field([6, 6, 6], [-0.5, 2.0, 1.0]);
        let diff = (composed.into_data() - expected.into_data()).abs().max().into_scalar();
        assert!(diff < 1e-5);
    }

    #[test]
    fn test_upsample_scales_vectors() {
        let field = constant_field([4, 4, 4], [1.0, -1.0, 0.5]);
        let up = field.upsample([8, 8, 8], 2);
        assert_eq!(up.shape(), [8, 8, 8]);

        let expected = constant_field([8, 8, 8], [2.0, -2.0, 1.0]);
        let diff = (up.into_data() - expected.into_data()).abs().max().into_scalar();
        assert!(diff < 1e-5);
    }

    #[test]
    fn test_upsample_uneven_shape_scales_by_spacing() {
        // 34 voxels pooled by 4 leave 8 cells; one cell is still 4 voxels.
        let field = constant_field([8, 8, 8], [1.0, 1.0, -1.0]);
        let up = field.upsample([34, 34, 34], 4);
        assert_eq!(up.shape(), [34, 34, 34]);

        let centre = up.data().clone().slice([0..3, 17..18, 17..18, 17..18]).reshape([3]);
        let values = centre.into_data().to_vec::<f32>().unwrap();
        assert!((values[0] - 4.0).abs() < 1e-4, "got {}", values[0]);
        assert!((values[1] - 4.0).abs() < 1e-4);
        assert!((values[2] + 4.0).abs() < 1e-4);

        let expected = constant_field([34, 34, 34], [4.0, 4.0, -4.0]);
        let diff = (up.into_data() - expected.into_data()).abs().max().into_scalar();
        assert!(diff < 1e-4);
    }

    #[test]
    fn test_transform_points_identity_grid() {
        let device = Default::default();
        let shape = [3, 3, 3];
        let field = constant_field(shape, [0.0, 0.0, 2.0]);
        let points = generate_grid_3d::<TestBackend>(shape, &device);
        let moved = field.transform_points(points.clone());
        let shift = (moved - points).slice([0..27, 2..3]).mean().into_scalar();
        assert!((shift - 2.0).abs() < 1e-6);

        // The identity grid in channel form is consistent with the point list.
        let grid = voxel_grid::<TestBackend>(shape, &device).reshape([3, 27]).transpose();
        let listed = generate_grid_3d::<TestBackend>(shape, &device);
        assert_eq!((grid - listed).abs().max().into_scalar(), 0.0);
    }
}
