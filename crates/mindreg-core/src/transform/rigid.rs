//! Rigid transform implementation.
//!
//! This module provides a rigid transform (rotation + translation) held as a
//! homogeneous 4x4 matrix on the host.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use super::displacement_field::DisplacementField;
use super::trait_::Transform;
use crate::volume::generate_grid_3d;

/// Rigid Transform (Rotation + Translation).
///
/// `T(x) = R x + t`, with `x` a voxel position `(h, w, d)` of the fixed
/// volume and `T(x)` the corresponding position in the moving volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    matrix: Matrix4<f64>,
}

impl RigidTransform {
    /// Create an identity rigid transform (no rotation, no translation).
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Wrap a homogeneous matrix. The linear block is taken as given.
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// Create a rigid transform from a rotation matrix and translation.
    pub fn from_parts(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        Self { matrix }
    }

    /// Create a rigid transform from Euler angles and a translation.
    ///
    /// # Arguments
    /// * `angles` - Rotation about the three axes in radians, applied as
    ///   `R = R_2(angles[2]) * R_1(angles[1]) * R_0(angles[0])`
    /// * `translation` - Translation in voxels
    pub fn from_euler(angles: [f64; 3], translation: Vector3<f64>) -> Self {
        let rotation = Rotation3::from_euler_angles(angles[0], angles[1], angles[2]);
        Self::from_parts(*rotation.matrix(), translation)
    }

    /// Create a pure translation.
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::from_parts(Matrix3::identity(), translation)
    }

    /// Get the homogeneous matrix.
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Get the rotation block.
    pub fn rotation(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Get the translation vector.
    pub fn translation(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Map a single point.
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.matrix.transform_point(point)
    }

    /// Inverse transform `x = R^T (y - t)`.
    pub fn inverse(&self) -> Self {
        let rotation_t = self.rotation().transpose();
        Self::from_parts(rotation_t, -(rotation_t * self.translation()))
    }

    /// Apply `self` first, then `other`.
    pub fn then(&self, other: &RigidTransform) -> Self {
        Self {
            matrix: other.matrix * self.matrix,
        }
    }

    /// Express the transform in world coordinates.
    ///
    /// With `A_f`, `A_m` the voxel-to-world affines of the fixed and moving
    /// volumes, returns `A_m * T * A_f^-1`, or `None` when `A_f` is singular.
    pub fn to_world(&self, fixed_affine: &Matrix4<f64>, moving_affine: &Matrix4<f64>) -> Option<Matrix4<f64>> {
        fixed_affine
            .try_inverse()
            .map(|fixed_inverse| moving_affine * self.matrix * fixed_inverse)
    }

    /// Materialize the transform as a dense field `d(x) = T(x) - x` over a
    /// grid of the given shape.
    pub fn to_displacement_field<B: Backend>(&self, shape: [usize; 3], device: &B::Device) -> DisplacementField<B> {
        let [h, w, d] = shape;
        let points = generate_grid_3d::<B>(shape, device);
        let moved = self.transform_points(points.clone());
        let field = (moved - points).transpose().reshape([3, h, w, d]);
        DisplacementField::new(field)
    }

    fn linear_tensors<B: Backend>(&self, device: &B::Device) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let rotation_t = self.rotation().transpose();
        let translation = self.translation();

        let r_t: Vec<f32> = (0..3)
            .flat_map(|i| (0..3).map(move |j| rotation_t[(i, j)] as f32))
            .collect();
        let t: Vec<f32> = translation.iter().map(|&v| v as f32).collect();

        let r_t = Tensor::<B, 2>::from_data(TensorData::new(r_t, [3, 3]), device);
        let t = Tensor::<B, 2>::from_data(TensorData::new(t, [1, 3]), device);
        (r_t, t)
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl<B: Backend> Transform<B> for RigidTransform {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        // Row-vector form: Y = X R^T + t
        let (r_t, t) = self.linear_tensors::<B>(&points.device());
        points.matmul(r_t) + t
    }
}
