//! Pairwise distances between point sets.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Squared Euclidean distance between every row of `a` and every row of `b`.
///
/// # Arguments
/// * `a` - Points `[N, K]`
/// * `b` - Points `[M, K]`
///
/// # Returns
/// Distances `[N, M]`. Computed through the expansion
/// `|a|^2 + |b|^2 - 2 a.b`, so cancellation can produce tiny negatives or
/// NaN for non-finite inputs; both are mapped to zero.
pub fn pairwise_squared_distance<B: Backend>(a: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 2> {
    let [m, _] = b.dims();

    let aa = a.clone().powf_scalar(2.0).sum_dim(1); // [N, 1]
    let bb = b.clone().powf_scalar(2.0).sum_dim(1).reshape([1, m]); // [1, M]
    let ab = a.matmul(b.transpose()); // [N, M]

    let dist = aa + bb - ab.mul_scalar(2.0);
    let nan = dist.clone().is_nan();
    dist.mask_fill(nan, 0.0).clamp_min(0.0)
}

/// Euclidean distance between every row of `a` and every row of `b`.
pub fn pairwise_distance<B: Backend>(a: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 2> {
    pairwise_squared_distance(a, b).sqrt()
}
