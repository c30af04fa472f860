use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Non-overlapping average pooling.
///
/// Reduces every spatial axis of a `[C, H, W, D]` tensor by an integer
/// factor `g`, averaging each `g x g x g` cell. Trailing voxels that do not
/// fill a whole cell are dropped, so the output is `[C, H/g, W/g, D/g]`.
#[derive(Debug, Clone, Copy)]
pub struct AveragePool {
    factor: usize,
}

impl AveragePool {
    /// Create a pooling filter.
    ///
    /// # Arguments
    /// * `factor` - Cell edge length (must be >= 1).
    pub fn new(factor: usize) -> Self {
        assert!(factor >= 1, "Pooling factor must be at least 1");
        Self { factor }
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Output spatial shape for an input spatial shape.
    pub fn output_shape(&self, shape: [usize; 3]) -> [usize; 3] {
        shape.map(|n| n / self.factor)
    }

    /// Apply the filter to a `[C, H, W, D]` tensor.
    pub fn apply<B: Backend>(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let g = self.factor;
        if g == 1 {
            return input;
        }

        let [c, h, w, d] = input.dims();
        let [h2, w2, d2] = self.output_shape([h, w, d]);
        let cropped = input.slice([0..c, 0..h2 * g, 0..w2 * g, 0..d2 * g]);

        // Split each axis into (cells, g) and average the inner part, one axis at a time.
        let pooled_h = cropped
            .reshape([c, h2, g, w2 * g * d2 * g])
            .mean_dim(2)
            .reshape([c, h2, w2 * g, d2 * g]);
        let pooled_w = pooled_h
            .reshape([c * h2, w2, g, d2 * g])
            .mean_dim(2)
            .reshape([c, h2, w2, d2 * g]);
        pooled_w
            .reshape([c * h2 * w2, d2, g])
            .mean_dim(2)
            .reshape([c, h2, w2, d2])
    }
}

/// Foreground mask of a volume on a pooled grid.
///
/// A cell is foreground when more than half of its voxels exceed
/// `threshold`. Returns a `[H/g, W/g, D/g]` tensor of zeros and ones.
pub fn foreground_mask<B: Backend>(volume: &Tensor<B, 3>, threshold: f32, factor: usize) -> Tensor<B, 3> {
    let [h, w, d] = volume.dims();
    let inside = volume.clone().greater_elem(threshold).float().reshape([1, h, w, d]);
    let pooled = AveragePool::new(factor).apply(inside);
    let [_, h2, w2, d2] = pooled.dims();
    pooled.greater_elem(0.5).float().reshape([h2, w2, d2])
}
