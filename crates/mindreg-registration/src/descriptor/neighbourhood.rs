//! Sampling pattern of the self-similarity descriptor.
//!
//! The descriptor compares patches around six points of a 3x3x3 stencil.
//! Only pairs of points at squared distance 2 are compared, and of each
//! mirrored pair only the one whose first index is larger is kept, which
//! gives exactly [`DESCRIPTOR_CHANNELS`] comparisons. Downstream channel
//! order depends on this table and on [`CHANNEL_PERMUTATION`].

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use mindreg_core::distance::pairwise_squared_distance;

use crate::error::Result;
use crate::readback::to_vec_f32;

/// Number of descriptor channels.
pub const DESCRIPTOR_CHANNELS: usize = 12;

/// Stencil points as `(h, w, d)` indices into a 3x3x3 block centred at (1, 1, 1).
pub const SIX_NEIGHBOURHOOD: [[i64; 3]; 6] = [
    [0, 1, 1],
    [1, 1, 0],
    [1, 0, 1],
    [1, 1, 2],
    [2, 1, 1],
    [1, 2, 1],
];

/// Final channel order of the descriptor.
pub const CHANNEL_PERMUTATION: [usize; DESCRIPTOR_CHANNELS] = [6, 8, 1, 11, 2, 10, 0, 7, 9, 4, 5, 3];

/// Squared distance between compared stencil points.
const PAIR_DISTANCE: f32 = 2.0;

/// Stencil index pairs `(i, j)` compared by the descriptor, in channel order
/// before permutation.
///
/// Pairs are enumerated row-major over `(i, j)` and kept when `i > j` and
/// the squared distance between the two stencil points is 2.
pub fn comparison_pairs<B: Backend>(device: &B::Device) -> Result<Vec<(usize, usize)>> {
    let n = SIX_NEIGHBOURHOOD.len();
    let coords: Vec<f32> = SIX_NEIGHBOURHOOD
        .iter()
        .flat_map(|p| p.iter().map(|&v| v as f32))
        .collect();
    let points = Tensor::<B, 2>::from_data(TensorData::new(coords, [n, 3]), device);

    let dist = to_vec_f32(pairwise_squared_distance(points.clone(), points))?;

    let mut pairs = Vec::with_capacity(DESCRIPTOR_CHANNELS);
    for i in 0..n {
        for j in 0..i {
            if (dist[i * n + j] - PAIR_DISTANCE).abs() < 0.5 {
                pairs.push((i, j));
            }
        }
    }
    Ok(pairs)
}
