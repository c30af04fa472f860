use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

/// Generate the list of voxel indices of a 3D grid.
///
/// Returns a tensor of shape `[N, 3]` where N is the total number of voxels.
/// Rows follow row-major voxel order and each row is `(h, w, d)`.
///
/// # Arguments
/// * `shape` - The grid shape `[H, W, D]`
/// * `device` - The device to create the tensor on
pub fn generate_grid_3d<B>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 2>
where
    B: Backend,
{
    let [h, w, d] = shape;
    let total = h * w * d;

    let mut grid = Vec::with_capacity(total * 3);
    for i in 0..h {
        for j in 0..w {
            for k in 0..d {
                grid.push(i as f32);
                grid.push(j as f32);
                grid.push(k as f32);
            }
        }
    }

    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([total * 3])), device)
        .reshape([total, 3])
}

/// Generate the identity coordinate field of a 3D grid.
///
/// Returns a tensor of shape `[3, H, W, D]` whose channel `c` holds the
/// voxel index along axis `c`. Adding a displacement field in voxel units
/// gives the absolute sampling positions of that field.
pub fn voxel_grid<B>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 4>
where
    B: Backend,
{
    let [h, w, d] = shape;
    let total = h * w * d;

    let mut grid = vec![0.0f32; 3 * total];
    let (gh, rest) = grid.split_at_mut(total);
    let (gw, gd) = rest.split_at_mut(total);
    let mut idx = 0;
    for i in 0..h {
        for j in 0..w {
            for k in 0..d {
                gh[idx] = i as f32;
                gw[idx] = j as f32;
                gd[idx] = k as f32;
                idx += 1;
            }
        }
    }

    Tensor::<B, 4>::from_data(TensorData::new(grid, Shape::new([3, h, w, d])), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    #[test]
    fn test_generate_grid_order() {
        let device = Default::default();
        let grid = generate_grid_3d::<Backend>([2, 2, 3], &device);
        assert_eq!(grid.dims(), [12, 3]);

        let values = grid.into_data().to_vec::<f32>().unwrap();
        // Row 0 is the origin, row 1 steps along the last axis.
        assert_eq!(&values[0..6], &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        // Row 3 is (0, 1, 0).
        assert_eq!(&values[9..12], &[0.0, 1.0, 0.0]);
        // Last row is (1, 1, 2).
        assert_eq!(&values[33..36], &[1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_voxel_grid_channels() {
        let device = Default::default();
        let grid = voxel_grid::<Backend>([2, 3, 4], &device);
        assert_eq!(grid.dims(), [3, 2, 3, 4]);

        let h = grid.clone().slice([0..1, 1..2, 2..3, 3..4]).into_scalar();
        let w = grid.clone().slice([1..2, 1..2, 2..3, 3..4]).into_scalar();
        let d = grid.slice([2..3, 1..2, 2..3, 3..4]).into_scalar();
        assert_eq!((h, w, d), (1.0, 2.0, 3.0));
    }
}
