//! Candidate displacements of the discrete search.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use serde::{Deserialize, Serialize};

/// The cube of integer offsets `[-hw, hw]^3`, in grid cells.
///
/// Labels are ordered with the `d` offset slowest and the `h` offset
/// fastest: label `k = (i_d * s + i_w) * s + i_h` with `s = 2hw + 1` is the
/// offset `(i_h - hw, i_w - hw, i_d - hw)` in `(h, w, d)` order. The cost
/// volume channels and every label field follow this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplacementLattice {
    half_width: usize,
}

impl DisplacementLattice {
    /// Create the lattice of half-width `half_width`.
    pub fn new(half_width: usize) -> Self {
        Self { half_width }
    }

    pub fn half_width(&self) -> usize {
        self.half_width
    }

    /// Candidates per axis, `2hw + 1`.
    pub fn side(&self) -> usize {
        2 * self.half_width + 1
    }

    /// Number of labels, `(2hw + 1)^3`.
    pub fn len(&self) -> usize {
        self.side().pow(3)
    }

    /// A lattice always holds at least the zero offset.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Offset `(h, w, d)` of a label.
    ///
    /// # Panics
    /// If `label` is out of range.
    pub fn offset(&self, label: usize) -> [i64; 3] {
        assert!(label < self.len(), "Label {label} out of range");
        let s = self.side();
        let hw = self.half_width as i64;
        let i_h = (label % s) as i64;
        let i_w = ((label / s) % s) as i64;
        let i_d = (label / (s * s)) as i64;
        [i_h - hw, i_w - hw, i_d - hw]
    }

    /// Label of an offset `(h, w, d)`, if it lies in the lattice.
    pub fn label_of(&self, offset: [i64; 3]) -> Option<usize> {
        let hw = self.half_width as i64;
        if offset.iter().any(|o| o.abs() > hw) {
            return None;
        }
        let s = self.side();
        let [i_h, i_w, i_d] = offset.map(|o| (o + hw) as usize);
        Some((i_d * s + i_w) * s + i_h)
    }

    /// Label of the zero offset.
    pub fn zero_label(&self) -> usize {
        (self.len() - 1) / 2
    }

    /// All offsets in label order.
    pub fn offsets(&self) -> Vec<[i64; 3]> {
        (0..self.len()).map(|k| self.offset(k)).collect()
    }

    /// Offsets as a `[3, L]` float tensor, channel `c` holding axis `c`.
    pub fn coordinates<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let n = self.len();
        let offsets = self.offsets();
        let mut values = vec![0.0f32; 3 * n];
        for (k, o) in offsets.iter().enumerate() {
            for c in 0..3 {
                values[c * n + k] = o[c] as f32;
            }
        }
        Tensor::from_data(TensorData::new(values, [3, n]), device)
    }

    /// Squared offset lengths as a `[L]` tensor.
    pub fn squared_norms<B: Backend>(&self, device: &B::Device) -> Tensor<B, 1> {
        let values: Vec<f32> = self
            .offsets()
            .iter()
            .map(|o| o.iter().map(|&v| (v * v) as f32).sum())
            .collect();
        Tensor::from_floats(values.as_slice(), device)
    }
}
