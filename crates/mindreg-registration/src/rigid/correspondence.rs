//! Point correspondences sampled from a displacement field.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use mindreg_core::DisplacementField;
use nalgebra::Point3;

use crate::error::{RegistrationError, Result};
use crate::readback::to_vec_f32;

/// Paired fixed and moving points in voxel coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCorrespondenceSet {
    fixed: Vec<Point3<f64>>,
    moving: Vec<Point3<f64>>,
}

impl PointCorrespondenceSet {
    /// Pair two point lists of equal length.
    pub fn new(fixed: Vec<Point3<f64>>, moving: Vec<Point3<f64>>) -> Result<Self> {
        if fixed.len() != moving.len() {
            return Err(RegistrationError::shape_mismatch(&[fixed.len(), 3], &[moving.len(), 3]));
        }
        Ok(Self { fixed, moving })
    }

    /// Correspondences at the centres of the selected grid cells.
    ///
    /// Cell `i` of a grid with spacing `g` is centred at `i * g + (g - 1) / 2`
    /// in full-resolution voxels. Its moving point is that centre displaced by
    /// `field` (full resolution, voxel units), sampled trilinearly. Cells
    /// where `cells` (`[H/g, W/g, D/g]`, 0 or 1) is 0 are skipped.
    pub fn from_field<B: Backend>(
        field: &DisplacementField<B>,
        cells: &Tensor<B, 3>,
        grid_spacing: usize,
    ) -> Result<Self> {
        let [gh, gw, gd] = cells.dims();
        let selected = to_vec_f32(cells.clone())?;
        let g = grid_spacing as f64;
        let half = (g - 1.0) / 2.0;

        let mut fixed = Vec::new();
        for i in 0..gh {
            for j in 0..gw {
                for k in 0..gd {
                    if selected[(i * gw + j) * gd + k] > 0.5 {
                        fixed.push(Point3::new(i as f64 * g + half, j as f64 * g + half, k as f64 * g + half));
                    }
                }
            }
        }
        if fixed.is_empty() {
            return Ok(Self::default());
        }

        let n = fixed.len();
        let coords: Vec<f32> = fixed.iter().flat_map(|p| [p.x as f32, p.y as f32, p.z as f32]).collect();
        let points = Tensor::<B, 2>::from_data(TensorData::new(coords, [n, 3]), &field.device());
        let sampled = to_vec_f32(field.sample(points))?;

        let moving = fixed
            .iter()
            .enumerate()
            .map(|(idx, p)| {
                Point3::new(
                    p.x + sampled[idx] as f64,
                    p.y + sampled[n + idx] as f64,
                    p.z + sampled[2 * n + idx] as f64,
                )
            })
            .collect();

        Ok(Self { fixed, moving })
    }

    pub fn fixed(&self) -> &[Point3<f64>] {
        &self.fixed
    }

    pub fn moving(&self) -> &[Point3<f64>] {
        &self.moving
    }

    pub fn len(&self) -> usize {
        self.fixed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty()
    }

    /// The pairs at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> (Vec<Point3<f64>>, Vec<Point3<f64>>) {
        indices
            .iter()
            .map(|&i| (self.fixed[i], self.moving[i]))
            .unzip()
    }
}
