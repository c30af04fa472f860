use burn::tensor::backend::Backend;
use burn::tensor::ops::ConvOptions;
use burn::tensor::{Shape, Tensor};

use super::pad::pad_replicate;

/// Border policy of the box filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Out-of-range voxels count as zero; the divisor stays `(2r+1)^3`.
    Zero,
    /// Out-of-range voxels repeat the nearest edge value.
    Replicate,
}

/// Stride-1 box (moving average) filter over the spatial axes.
///
/// Applies separable 1D convolutions with a flat kernel of width `2r+1`
/// along each spatial axis of a `[C, H, W, D]` tensor. The output has the
/// input shape.
#[derive(Debug, Clone, Copy)]
pub struct BoxFilter {
    radius: usize,
    padding: Padding,
}

impl BoxFilter {
    /// Create a zero-padded box filter of the given radius.
    pub fn new(radius: usize) -> Self {
        Self {
            radius,
            padding: Padding::Zero,
        }
    }

    /// Set the border policy.
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Kernel width along each axis.
    pub fn width(&self) -> usize {
        2 * self.radius + 1
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Apply the filter to a `[C, H, W, D]` tensor.
    pub fn apply<B: Backend>(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        if self.radius == 0 {
            return input;
        }

        let width = self.width();
        let device = input.device();
        let weights = vec![1.0f32 / width as f32; width];
        let kernel = Tensor::<B, 1>::from_floats(weights.as_slice(), &device);

        let (mut data, conv_padding) = match self.padding {
            Padding::Zero => (input, self.radius),
            Padding::Replicate => (pad_replicate(input, [self.radius; 3]), 0),
        };

        for dim in 1..4 {
            data = convolve_1d(data, kernel.clone(), dim, conv_padding);
        }
        data
    }
}

/// Convolve a tensor with a 1D kernel along one axis.
///
/// The target axis is permuted last, every other axis is folded into the
/// batch of a `conv1d` call, and the result is unfolded back.
fn convolve_1d<B: Backend, const D: usize>(
    input: Tensor<B, D>,
    kernel: Tensor<B, 1>,
    dim: usize,
    padding: usize,
) -> Tensor<B, D> {
    let dims: [usize; D] = input.dims();

    // 1. Permute target dimension to the last
    let mut permute_indices = [0isize; D];
    let mut idx = 0;
    for i in 0..D {
        if i != dim {
            permute_indices[idx] = i as isize;
            idx += 1;
        }
    }
    permute_indices[D - 1] = dim as isize;
    let permuted = input.permute(permute_indices);

    // 2. Flatten other dimensions into batch: [Batch, 1, Length]
    let length = dims[dim];
    let batch_size: usize = (0..D).filter(|&i| i != dim).map(|i| dims[i]).product();
    let reshaped = permuted.reshape([batch_size, 1, length]);

    let kernel_size = kernel.dims()[0];
    let kernel = kernel.reshape([1, 1, kernel_size]);

    let options = ConvOptions::new([1], [padding], [1], 1);
    let output = burn::tensor::module::conv1d(reshaped, kernel, None, options);
    let out_length = output.dims()[2];

    // 3. Reshape back and inverse permute
    let mut permuted_shape = [0usize; D];
    let mut p_idx = 0;
    for i in 0..D {
        if i != dim {
            permuted_shape[p_idx] = dims[i];
            p_idx += 1;
        }
    }
    permuted_shape[D - 1] = out_length;
    let output = output.reshape(Shape::new(permuted_shape));

    let mut inv_permute_indices = [0isize; D];
    for (new_pos, &old_pos) in permute_indices.iter().enumerate() {
        inv_permute_indices[old_pos as usize] = new_pos as isize;
    }
    output.permute(inv_permute_indices)
}
