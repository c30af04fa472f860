//! Dense-array kernels on `[C, H, W, D]` tensors.
//!
//! Every filter here treats axis 0 as an independent channel/batch axis and
//! operates on the three trailing spatial axes.

pub mod pad;
pub mod box_filter;
pub mod downsample;
pub mod resample;

pub use pad::{pad_replicate, pad_zero, shift_replicate};
pub use box_filter::{BoxFilter, Padding};
pub use downsample::{foreground_mask, AveragePool};
pub use resample::{resize_trilinear, GridAlignment};
