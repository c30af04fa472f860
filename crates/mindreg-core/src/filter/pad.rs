//! Border handling for spatial tensors.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

/// Replicate-pad the spatial axes of a `[C, H, W, D]` tensor.
///
/// `pad[i]` voxels are added on both sides of spatial axis `i`, each copying
/// the nearest edge value.
pub fn pad_replicate<B: Backend>(input: Tensor<B, 4>, pad: [usize; 3]) -> Tensor<B, 4> {
    let mut data = input;
    for (axis, &p) in pad.iter().enumerate() {
        if p == 0 {
            continue;
        }
        let dim = axis + 1;
        let n = data.dims()[dim] as i64;
        let p = p as i64;
        let indices: Vec<i64> = (-p..n + p).collect();
        data = select_clamped(data, dim, &indices);
    }
    data
}

/// Zero-pad the spatial axes of a `[C, H, W, D]` tensor.
pub fn pad_zero<B: Backend>(input: Tensor<B, 4>, pad: [usize; 3]) -> Tensor<B, 4> {
    let [c, h, w, d] = input.dims();
    let [ph, pw, pd] = pad;
    let device = input.device();

    Tensor::<B, 4>::zeros([c, h + 2 * ph, w + 2 * pw, d + 2 * pd], &device)
        .slice_assign([0..c, ph..ph + h, pw..pw + w, pd..pd + d], input)
}

/// Shift the spatial axes of a `[C, H, W, D]` tensor with edge replication.
///
/// `out[x] = input[clamp(x + offset)]`, so boundary voxels reuse edge values
/// instead of reading out of range.
pub fn shift_replicate<B: Backend>(input: Tensor<B, 4>, offset: [i64; 3]) -> Tensor<B, 4> {
    let mut data = input;
    for (axis, &o) in offset.iter().enumerate() {
        if o == 0 {
            continue;
        }
        let dim = axis + 1;
        let n = data.dims()[dim] as i64;
        let indices: Vec<i64> = (0..n).map(|x| x + o).collect();
        data = select_clamped(data, dim, &indices);
    }
    data
}

fn select_clamped<B: Backend>(input: Tensor<B, 4>, dim: usize, indices: &[i64]) -> Tensor<B, 4> {
    let n = input.dims()[dim] as i64;
    let device = input.device();
    let clamped: Vec<i32> = indices.iter().map(|&i| i.clamp(0, n - 1) as i32).collect();
    let indices = Tensor::<B, 1, Int>::from_ints(clamped.as_slice(), &device);
    input.select(dim, indices)
}
