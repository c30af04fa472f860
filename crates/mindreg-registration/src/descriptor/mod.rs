//! Modality independent self-similarity descriptor (MIND-SSC).

pub mod neighbourhood;
pub mod mind_ssc;

pub use neighbourhood::{comparison_pairs, CHANNEL_PERMUTATION, DESCRIPTOR_CHANNELS, SIX_NEIGHBOURHOOD};
pub use mind_ssc::MindSsc;
