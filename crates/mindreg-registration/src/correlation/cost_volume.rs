//! Dense cost volume over the displacement lattice.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use mindreg_core::filter::{pad_zero, BoxFilter};

use super::lattice::DisplacementLattice;
use crate::error::{RegistrationError, Result};

/// Per-cell label into a [`DisplacementLattice`], `[H, W, D]`.
#[derive(Debug, Clone)]
pub struct LabelField<B: Backend> {
    labels: Tensor<B, 3, Int>,
}

impl<B: Backend> LabelField<B> {
    pub fn new(labels: Tensor<B, 3, Int>) -> Self {
        Self { labels }
    }

    /// Get the label tensor.
    pub fn labels(&self) -> &Tensor<B, 3, Int> {
        &self.labels
    }

    pub fn into_labels(self) -> Tensor<B, 3, Int> {
        self.labels
    }

    /// Grid shape `[H, W, D]`.
    pub fn shape(&self) -> [usize; 3] {
        self.labels.dims()
    }

    /// Lattice offsets selected by the labels, `[3, H, W, D]` in grid cells.
    pub fn displacements(&self, lattice_coordinates: &Tensor<B, 2>) -> Tensor<B, 4> {
        let [h, w, d] = self.shape();
        let flat = self.labels.clone().reshape([h * w * d]);
        lattice_coordinates
            .clone()
            .select(1, flat)
            .reshape([3, h, w, d])
    }
}

/// Smoothed descriptor distances, `[L, H, W, D]`.
///
/// Channel `k` at cell `x` is the distance between the fixed descriptor at
/// `x` and the moving descriptor at `x + offset(k)`. All entries are
/// non-negative.
#[derive(Debug, Clone)]
pub struct CostVolume<B: Backend> {
    data: Tensor<B, 4>,
    lattice: DisplacementLattice,
}

impl<B: Backend> CostVolume<B> {
    /// Wrap a cost tensor whose channel count matches the lattice.
    pub fn new(data: Tensor<B, 4>, lattice: DisplacementLattice) -> Result<Self> {
        let labels = data.dims()[0];
        if labels != lattice.len() {
            return Err(RegistrationError::shape_mismatch(&[lattice.len()], &[labels]));
        }
        Ok(Self { data, lattice })
    }

    pub fn data(&self) -> &Tensor<B, 4> {
        &self.data
    }

    pub fn into_data(self) -> Tensor<B, 4> {
        self.data
    }

    pub fn lattice(&self) -> &DisplacementLattice {
        &self.lattice
    }

    /// Grid shape `[H, W, D]`.
    pub fn shape(&self) -> [usize; 3] {
        let [_, h, w, d] = self.data.dims();
        [h, w, d]
    }

    /// Zero the cost of every cell where `mask` (`[H, W, D]`, 0 or 1) is 0.
    pub fn masked(self, mask: &Tensor<B, 3>) -> Result<Self> {
        let shape = self.shape();
        if mask.dims() != shape {
            return Err(RegistrationError::shape_mismatch(&shape, &mask.dims()));
        }
        let [h, w, d] = shape;
        let data = self.data * mask.clone().reshape([1, h, w, d]);
        Ok(Self {
            data,
            lattice: self.lattice,
        })
    }

    /// Cost of one row along the first grid axis, `[L, 1, W, D]`.
    pub fn row(&self, index: usize) -> Tensor<B, 4> {
        self.data.clone().narrow(1, index, 1)
    }

    /// Per-cell argmin over the lattice.
    ///
    /// `tie_break` times the squared offset length is added before the
    /// argmin, so exact ties resolve toward the zero displacement.
    pub fn argmin(&self, tie_break: f32) -> LabelField<B> {
        let [labels, h, w, d] = self.data.dims();
        let norms = self
            .lattice
            .squared_norms::<B>(&self.data.device())
            .reshape([labels, 1, 1, 1]);
        let biased = self.data.clone() + norms.mul_scalar(tie_break);
        LabelField::new(biased.argmin(0).reshape([h, w, d]))
    }
}

/// Builds cost volumes from two descriptor volumes on the same grid.
///
/// The moving descriptor is zero-padded by the lattice half-width, each
/// shifted window is compared with the fixed descriptor by the squared L2
/// distance over channels, and every `(d, w)` slab of `s^2` candidates is
/// smoothed by chained zero-padded 3x3x3 box filters.
#[derive(Debug, Clone, Copy)]
pub struct CostVolumeBuilder {
    lattice: DisplacementLattice,
    smoothing_passes: usize,
}

impl CostVolumeBuilder {
    /// Create a builder for the given lattice half-width.
    pub fn new(disp_hw: usize) -> Self {
        Self {
            lattice: DisplacementLattice::new(disp_hw),
            smoothing_passes: 2,
        }
    }

    /// Set the number of 3x3x3 box passes applied to the raw distances.
    pub fn with_smoothing_passes(mut self, passes: usize) -> Self {
        self.smoothing_passes = passes;
        self
    }

    pub fn lattice(&self) -> &DisplacementLattice {
        &self.lattice
    }

    /// Compute the cost volume of two `[C, H, W, D]` descriptor volumes.
    pub fn build<B: Backend>(&self, fixed: &Tensor<B, 4>, moving: &Tensor<B, 4>) -> Result<CostVolume<B>> {
        let fixed_dims = fixed.dims();
        let moving_dims = moving.dims();
        if fixed_dims != moving_dims {
            return Err(RegistrationError::shape_mismatch(&fixed_dims, &moving_dims));
        }

        let [_, h, w, d] = fixed_dims;
        let hw = self.lattice.half_width();
        let s = self.lattice.side();
        let padded = pad_zero(moving.clone(), [hw; 3]);
        let smoother = BoxFilter::new(1);

        let mut slabs = Vec::with_capacity(s);
        for i_d in 0..s {
            let window_d = padded.clone().narrow(3, i_d, d);
            let mut costs = Vec::with_capacity(s * s);
            for i_w in 0..s {
                let window_w = window_d.clone().narrow(2, i_w, w);
                for i_h in 0..s {
                    let window = window_w.clone().narrow(1, i_h, h);
                    costs.push((fixed.clone() - window).powf_scalar(2.0).sum_dim(0));
                }
            }

            let mut slab = Tensor::cat(costs, 0);
            for _ in 0..self.smoothing_passes {
                slab = smoother.apply(slab);
            }
            slabs.push(slab);
        }

        tracing::debug!(
            "Cost volume: {} labels over grid {}x{}x{}",
            self.lattice.len(),
            h,
            w,
            d
        );
        CostVolume::new(Tensor::cat(slabs, 0), self.lattice)
    }
}
