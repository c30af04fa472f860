//! Thin-plate spline interpolation of sparse vector values.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use mindreg_core::distance::pairwise_distance;
use mindreg_core::filter::{resize_trilinear, GridAlignment};
use mindreg_core::DisplacementField;
use nalgebra::{DMatrix, Point3, Vector3};

use super::coords::voxel_to_normalized;
use crate::config::DEFAULT_TPS_CHUNK;
use crate::error::{RegistrationError, Result};
use crate::rigid::MIN_CORRESPONDENCES;

/// Kernel offset keeping `log` finite at `r = 0`.
const KERNEL_EPSILON: f64 = 1e-6;

/// Relative singular value below which the affine part is degenerate.
const RANK_TOLERANCE: f64 = 1e-9;

fn kernel(r: f64) -> f64 {
    r * r * (r + KERNEL_EPSILON).ln()
}

/// A fitted thin-plate spline `R^3 -> R^3`.
///
/// `f(x) = a_0 + a_1 x + a_2 y + a_3 z + sum_i w_i U(|x - c_i|)` with
/// `U(r) = r^2 log r`, interpolating (or, with `lambda > 0`, smoothing)
/// the values at the control points.
#[derive(Debug, Clone)]
pub struct ThinPlateSpline {
    control: Vec<Point3<f64>>,
    /// Kernel weights, `[N, 3]`.
    weights: DMatrix<f64>,
    /// Affine coefficients, `[4, 3]`.
    affine: DMatrix<f64>,
}

impl ThinPlateSpline {
    /// Fit a spline through `values` at `control`.
    ///
    /// Solves `[[K + lambda I, P], [P^T, 0]] [w; a] = [v; 0]` with
    /// `P = [1, x, y, z]`. Coplanar or duplicated control points (with
    /// `lambda = 0`) make the system singular.
    pub fn fit(control: &[Point3<f64>], values: &[Vector3<f64>], lambda: f64) -> Result<Self> {
        let n = control.len();
        if values.len() != n {
            return Err(RegistrationError::shape_mismatch(&[n, 3], &[values.len(), 3]));
        }
        if n < MIN_CORRESPONDENCES {
            return Err(RegistrationError::InsufficientCorrespondences {
                required: MIN_CORRESPONDENCES,
                actual: n,
            });
        }

        let affine_basis = DMatrix::from_fn(n, 4, |i, j| if j == 0 { 1.0 } else { control[i][j - 1] });
        let singular_values = affine_basis.clone().svd(false, false).singular_values;
        if singular_values.min() <= RANK_TOLERANCE * singular_values.max() {
            return Err(RegistrationError::singular_system(
                "Thin-plate control points are coplanar",
            ));
        }

        let size = n + 4;
        let mut system = DMatrix::<f64>::zeros(size, size);
        for i in 0..n {
            for j in 0..n {
                system[(i, j)] = kernel((control[i] - control[j]).norm());
            }
            system[(i, i)] += lambda;
        }
        system.view_mut((0, n), (n, 4)).copy_from(&affine_basis);
        system.view_mut((n, 0), (4, n)).copy_from(&affine_basis.transpose());

        let mut rhs = DMatrix::<f64>::zeros(size, 3);
        for (i, v) in values.iter().enumerate() {
            for c in 0..3 {
                rhs[(i, c)] = v[c];
            }
        }

        let solution = system
            .lu()
            .solve(&rhs)
            .filter(|s| s.iter().all(|x| x.is_finite()))
            .ok_or_else(|| RegistrationError::singular_system("Thin-plate system is singular"))?;

        Ok(Self {
            control: control.to_vec(),
            weights: solution.rows(0, n).into_owned(),
            affine: solution.rows(n, 4).into_owned(),
        })
    }

    pub fn control_points(&self) -> &[Point3<f64>] {
        &self.control
    }

    /// Evaluate at a single point on the host.
    pub fn evaluate_point(&self, point: &Point3<f64>) -> Vector3<f64> {
        let mut out = Vector3::new(self.affine[(0, 0)], self.affine[(0, 1)], self.affine[(0, 2)]);
        for c in 0..3 {
            out[c] += self.affine[(1, c)] * point.x + self.affine[(2, c)] * point.y + self.affine[(3, c)] * point.z;
        }
        for (i, control) in self.control.iter().enumerate() {
            let u = kernel((point - control).norm());
            for c in 0..3 {
                out[c] += self.weights[(i, c)] * u;
            }
        }
        out
    }

    /// Evaluate at `[M, 3]` points on the device, returning `[M, 3]`.
    pub fn evaluate<B: Backend>(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        let [m, _] = points.dims();
        let n = self.control.len();

        let control = to_tensor::<B>(n, 3, |i, j| self.control[i][j], &device);
        let weights = to_tensor::<B>(n, 3, |i, j| self.weights[(i, j)], &device);
        let affine = to_tensor::<B>(4, 3, |i, j| self.affine[(i, j)], &device);

        let r = pairwise_distance(points.clone(), control);
        let u = r.clone().powf_scalar(2.0) * r.add_scalar(KERNEL_EPSILON).log();
        let homogeneous = Tensor::cat(vec![Tensor::ones([m, 1], &device), points], 1);

        u.matmul(weights) + homogeneous.matmul(affine)
    }
}

fn to_tensor<B: Backend>(
    rows: usize,
    cols: usize,
    value: impl Fn(usize, usize) -> f64,
    device: &B::Device,
) -> Tensor<B, 2> {
    let mut data = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        for j in 0..cols {
            data.push(value(i, j) as f32);
        }
    }
    Tensor::from_data(TensorData::new(data, [rows, cols]), device)
}

/// Dense displacement fields from sparse keypoint displacements.
///
/// The spline is fitted in normalized coordinates, evaluated on a grid
/// `step` times coarser than the target (corner aligned, in chunks of
/// `chunk` points), then trilinearly resized to the full grid.
#[derive(Debug, Clone, Copy)]
pub struct ThinPlateDensifier {
    step: usize,
    chunk: usize,
    lambda: f64,
}

impl Default for ThinPlateDensifier {
    fn default() -> Self {
        Self {
            step: 4,
            chunk: DEFAULT_TPS_CHUNK,
            lambda: 0.0,
        }
    }
}

impl ThinPlateDensifier {
    pub fn new(step: usize) -> Self {
        Self {
            step,
            ..Self::default()
        }
    }

    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }

    /// Set the smoothing weight added to the kernel diagonal.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// Densify displacements given at voxel keypoints of a grid of `shape`.
    ///
    /// `keypoints` are voxel positions and `displacements` voxel offsets;
    /// the result is a `[3, H, W, D]` field in voxel units.
    pub fn densify<B: Backend>(
        &self,
        keypoints: &[Point3<f64>],
        displacements: &[Vector3<f64>],
        shape: [usize; 3],
        device: &B::Device,
    ) -> Result<DisplacementField<B>> {
        if self.step == 0 || self.chunk == 0 {
            return Err(RegistrationError::invalid_configuration(
                "Thin-plate step and chunk size must be positive",
            ));
        }
        if shape.iter().any(|&n| n == 0) {
            return Err(RegistrationError::invalid_configuration("Target grid is empty"));
        }

        let control = voxel_to_normalized(keypoints, shape);
        let spline = ThinPlateSpline::fit(&control, displacements, self.lambda)?;

        let coarse = shape.map(|n| (n / self.step).max(1));
        let total: usize = coarse.iter().product();
        let points = normalized_grid::<B>(coarse, device);

        let mut chunks = Vec::with_capacity(total.div_ceil(self.chunk));
        let mut start = 0;
        while start < total {
            let len = self.chunk.min(total - start);
            chunks.push(spline.evaluate(points.clone().narrow(0, start, len)));
            start += len;
        }

        let [ch, cw, cd] = coarse;
        let values = Tensor::cat(chunks, 0).transpose().reshape([3, ch, cw, cd]);
        tracing::debug!(
            "Thin-plate densification: {} keypoints, coarse grid {:?}, target {:?}",
            keypoints.len(),
            coarse,
            shape
        );
        Ok(DisplacementField::new(resize_trilinear(values, shape, GridAlignment::Corners)))
    }
}

/// Corner-aligned normalized coordinates of every voxel, `[N, 3]`.
fn normalized_grid<B: Backend>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 2> {
    let axis = |i: usize, n: usize| {
        if n <= 1 {
            0.0
        } else {
            2.0 * i as f32 / (n - 1) as f32 - 1.0
        }
    };
    let [h, w, d] = shape;
    let mut data = Vec::with_capacity(h * w * d * 3);
    for i in 0..h {
        for j in 0..w {
            for k in 0..d {
                data.extend([axis(i, h), axis(j, w), axis(k, d)]);
            }
        }
    }
    Tensor::from_data(TensorData::new(data, [h * w * d, 3]), device)
}
