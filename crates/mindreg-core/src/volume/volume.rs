//! Scalar volume with its voxel-to-world affine.
//!
//! The registration engine only ever reads voxel data; the affine travels
//! with the volume so that results expressed in voxel units can be mapped
//! into world space by whoever writes them out.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::{Matrix4, Point3};

/// Scalar 3-D volume.
///
/// # Type Parameters
/// * `B` - The backend (CPU or GPU) for tensor operations
///
/// # Axis order
/// The data tensor is indexed `[H, W, D]`. Voxel coordinates used anywhere
/// in this workspace follow the same `(h, w, d)` order.
///
/// # Examples
/// ```rust
/// use mindreg_core::Volume;
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let data = Tensor::<Backend, 3>::zeros([10, 12, 14], &device);
/// let volume = Volume::from_data(data);
/// assert_eq!(volume.shape(), [10, 12, 14]);
/// ```
#[derive(Debug, Clone)]
pub struct Volume<B: Backend> {
    /// Voxel intensities, `[H, W, D]`.
    data: Tensor<B, 3>,
    /// Homogeneous voxel-to-world matrix.
    affine: Matrix4<f64>,
}

impl<B: Backend> Volume<B> {
    /// Create a volume from its data and voxel-to-world affine.
    pub fn new(data: Tensor<B, 3>, affine: Matrix4<f64>) -> Self {
        Self { data, affine }
    }

    /// Create a volume whose world space coincides with voxel space.
    pub fn from_data(data: Tensor<B, 3>) -> Self {
        Self::new(data, Matrix4::identity())
    }

    /// Create a volume from a host buffer laid out `[H, W, D]` row-major.
    ///
    /// # Panics
    /// If `values.len()` differs from the product of `shape`.
    pub fn from_vec(values: Vec<f32>, shape: [usize; 3], device: &B::Device) -> Self {
        assert_eq!(
            values.len(),
            shape[0] * shape[1] * shape[2],
            "Buffer length does not match volume shape"
        );
        let data = Tensor::<B, 3>::from_data(TensorData::new(values, Shape::new(shape)), device);
        Self::from_data(data)
    }

    /// Get the voxel data.
    pub fn data(&self) -> &Tensor<B, 3> {
        &self.data
    }

    /// Consume the volume and return its voxel data.
    pub fn into_data(self) -> Tensor<B, 3> {
        self.data
    }

    /// Get the voxel-to-world affine.
    pub fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    /// Replace the voxel data while keeping the affine.
    ///
    /// Used for derived volumes (warped, masked) that live on the same grid.
    pub fn with_data(&self, data: Tensor<B, 3>) -> Self {
        Self::new(data, self.affine)
    }

    /// Get the volume shape `[H, W, D]`.
    pub fn shape(&self) -> [usize; 3] {
        self.data.dims()
    }

    /// Number of voxels.
    pub fn len(&self) -> usize {
        let [h, w, d] = self.shape();
        h * w * d
    }

    /// Whether the volume holds no voxels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map a continuous voxel index to world space.
    pub fn index_to_world(&self, index: &Point3<f64>) -> Point3<f64> {
        self.affine.transform_point(index)
    }

    /// Map a world point to a continuous voxel index.
    ///
    /// Returns `None` when the affine is singular.
    pub fn world_to_index(&self, point: &Point3<f64>) -> Option<Point3<f64>> {
        self.affine
            .try_inverse()
            .map(|inverse| inverse.transform_point(point))
    }

    /// Batch map continuous voxel indices `[N, 3]` to world points `[N, 3]`.
    ///
    /// Row-vector form: `P = I @ A^T + t`, with `A` the linear part of the
    /// affine and `t` its translation column.
    pub fn index_to_world_tensor(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = indices.device();

        let mut linear = Vec::with_capacity(9);
        for r in 0..3 {
            for c in 0..3 {
                // Transposed: row r of the matmul operand is column r of A.
                linear.push(self.affine[(c, r)] as f32);
            }
        }
        let linear = Tensor::<B, 2>::from_data(TensorData::new(linear, Shape::new([3, 3])), &device);

        let translation: Vec<f32> = (0..3).map(|r| self.affine[(r, 3)] as f32).collect();
        let translation =
            Tensor::<B, 2>::from_data(TensorData::new(translation, Shape::new([1, 3])), &device);

        indices.matmul(linear) + translation
    }
}
