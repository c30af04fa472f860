//! Dense MIND-SSC descriptor extraction.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Int, Tensor};
use mindreg_core::filter::{shift_replicate, BoxFilter, Padding};

use super::neighbourhood::{comparison_pairs, CHANNEL_PERMUTATION, DESCRIPTOR_CHANNELS, SIX_NEIGHBOURHOOD};
use crate::error::Result;

/// Bounds of the per-voxel variance relative to its volume mean.
const VARIANCE_CLAMP: (f32, f32) = (0.001, 1000.0);

/// MIND-SSC descriptor extractor.
///
/// Turns a scalar `[H, W, D]` volume into a `[12, H, W, D]` descriptor
/// volume. Each channel is a patch distance between two shifted copies of
/// the volume, normalized per voxel and mapped through `exp(-x)`, which
/// makes the result invariant to affine intensity changes.
#[derive(Debug, Clone, Copy)]
pub struct MindSsc {
    radius: usize,
    dilation: usize,
}

impl MindSsc {
    /// Create an extractor.
    ///
    /// # Arguments
    /// * `radius` - Patch radius `r`; patches span `(2r+1)^3` voxels
    /// * `dilation` - Spacing between the stencil points
    pub fn new(radius: usize, dilation: usize) -> Self {
        Self { radius, dilation }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn dilation(&self) -> usize {
        self.dilation
    }

    /// Compute the descriptor volume.
    ///
    /// Non-finite input values propagate into the output.
    pub fn compute<B: Backend>(&self, volume: &Tensor<B, 3>) -> Result<Tensor<B, 4>> {
        let [h, w, d] = volume.dims();
        let device = volume.device();
        let input = volume.clone().reshape([1, h, w, d]);
        let dilation = self.dilation as i64;

        // Replicate-clamped copies of the volume at the six stencil points.
        let shifted: Vec<Tensor<B, 4>> = SIX_NEIGHBOURHOOD
            .iter()
            .map(|p| {
                let offset = [0, 1, 2].map(|axis| dilation * (p[axis] - 1));
                shift_replicate(input.clone(), offset)
            })
            .collect();

        let squared: Vec<Tensor<B, 4>> = comparison_pairs::<B>(&device)?
            .into_iter()
            .map(|(i, j)| (shifted[i].clone() - shifted[j].clone()).powf_scalar(2.0))
            .collect();
        let ssd = BoxFilter::new(self.radius)
            .with_padding(Padding::Replicate)
            .apply(Tensor::cat(squared, 0));

        let mind = ssd.clone() - ssd.min_dim(0);
        let variance = mind.clone().mean_dim(0);
        let mean_variance = variance.clone().mean().into_scalar().elem::<f32>().max(f32::EPSILON);
        let variance = variance.clamp(mean_variance * VARIANCE_CLAMP.0, mean_variance * VARIANCE_CLAMP.1);

        let descriptor = (mind / variance).neg().exp();

        let order: Vec<i32> = CHANNEL_PERMUTATION.iter().map(|&c| c as i32).collect();
        let order = Tensor::<B, 1, Int>::from_ints(order.as_slice(), &device);
        let descriptor = descriptor.select(0, order);

        debug_assert_eq!(descriptor.dims()[0], DESCRIPTOR_CHANNELS);
        Ok(descriptor)
    }
}
