//! Separable trilinear resizing of spatial tensors.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

/// How output voxel positions map onto input voxel positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAlignment {
    /// First and last voxel centres of input and output coincide.
    Corners,
    /// Voxels are cells; the output cell centres are mapped into the input
    /// cells (`src = (i + 0.5) * n_in / n_out - 0.5`, clamped at zero).
    Centers,
}

impl GridAlignment {
    /// Source coordinate of output index `i` along an axis.
    pub fn source_coordinate(&self, i: usize, n_in: usize, n_out: usize) -> f32 {
        match self {
            GridAlignment::Corners => {
                if n_out <= 1 {
                    0.0
                } else {
                    i as f32 * (n_in as f32 - 1.0) / (n_out as f32 - 1.0)
                }
            }
            GridAlignment::Centers => {
                let scale = n_in as f32 / n_out as f32;
                ((i as f32 + 0.5) * scale - 0.5).max(0.0)
            }
        }
    }
}

/// Resize the spatial axes of a `[C, H, W, D]` tensor to `size` with
/// trilinear interpolation. Positions beyond the last voxel clamp to it.
pub fn resize_trilinear<B: Backend>(
    input: Tensor<B, 4>,
    size: [usize; 3],
    alignment: GridAlignment,
) -> Tensor<B, 4> {
    let mut data = input;
    for (axis, &n_out) in size.iter().enumerate() {
        let dim = axis + 1;
        if data.dims()[dim] == n_out {
            continue;
        }
        data = resize_axis(data, dim, n_out, alignment);
    }
    data
}

fn resize_axis<B: Backend>(
    input: Tensor<B, 4>,
    dim: usize,
    n_out: usize,
    alignment: GridAlignment,
) -> Tensor<B, 4> {
    let n_in = input.dims()[dim];
    let device = input.device();

    let mut lo = Vec::with_capacity(n_out);
    let mut hi = Vec::with_capacity(n_out);
    let mut frac = Vec::with_capacity(n_out);
    for i in 0..n_out {
        let src = alignment.source_coordinate(i, n_in, n_out);
        let l = (src.floor() as usize).min(n_in - 1);
        let h = (l + 1).min(n_in - 1);
        lo.push(l as i32);
        hi.push(h as i32);
        frac.push((src - l as f32).clamp(0.0, 1.0));
    }

    let lo = Tensor::<B, 1, Int>::from_ints(lo.as_slice(), &device);
    let hi = Tensor::<B, 1, Int>::from_ints(hi.as_slice(), &device);

    let mut weight_shape = [1usize; 4];
    weight_shape[dim] = n_out;
    let weight = Tensor::<B, 1>::from_floats(frac.as_slice(), &device).reshape(weight_shape);

    let low = input.clone().select(dim, lo);
    let high = input.select(dim, hi);
    low.clone() + (high - low) * weight
}
