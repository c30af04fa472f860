use burn::tensor::{Shape, Tensor, TensorData};
use burn_ndarray::NdArray;
use mindreg_core::filter::{resize_trilinear, AveragePool, BoxFilter, GridAlignment, Padding};
use proptest::prelude::*;

type B = NdArray<f32>;

fn tensor(values: Vec<f32>, shape: [usize; 4]) -> Tensor<B, 4> {
    Tensor::from_data(TensorData::new(values, Shape::new(shape)), &Default::default())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn box_filter_preserves_the_mean_of_replicated_constants(
        value in -100.0f32..100.0,
        radius in 0usize..3,
    ) {
        let input = tensor(vec![value; 2 * 5 * 6 * 7], [2, 5, 6, 7]);
        let output = BoxFilter::new(radius).with_padding(Padding::Replicate).apply(input);
        let max = output.sub_scalar(value).abs().max().into_scalar();
        prop_assert!(max <= 1e-4 * value.abs().max(1.0));
    }

    #[test]
    fn box_filter_stays_within_input_range(values in prop::collection::vec(-5.0f32..5.0, 4 * 4 * 4)) {
        let lo = values.iter().cloned().fold(f32::INFINITY, f32::min);
        let hi = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let output = BoxFilter::new(1).with_padding(Padding::Replicate).apply(tensor(values, [1, 4, 4, 4]));
        prop_assert!(output.clone().min().into_scalar() >= lo - 1e-4);
        prop_assert!(output.max().into_scalar() <= hi + 1e-4);
    }

    #[test]
    fn corner_resize_reproduces_linear_ramps(
        slope in -3.0f32..3.0,
        n_in in 2usize..6,
        n_out in 2usize..12,
    ) {
        let values: Vec<f32> = (0..n_in).map(|i| slope * i as f32).collect();
        let output = resize_trilinear(tensor(values, [1, n_in, 1, 1]), [n_out, 1, 1], GridAlignment::Corners);
        let data = output.into_data().to_vec::<f32>().unwrap();
        for (i, v) in data.iter().enumerate() {
            let position = i as f32 * (n_in - 1) as f32 / (n_out - 1) as f32;
            prop_assert!((v - slope * position).abs() < 1e-4);
        }
    }
}

#[test]
fn test_pooling_then_centre_resize_keeps_cell_means() {
    // Piecewise-constant cells survive a pool and a half-pixel resize back
    // at the cell centres.
    let mut values = vec![0.0f32; 8 * 4 * 4];
    for i in 0..8 {
        for j in 0..4 {
            for k in 0..4 {
                values[(i * 4 + j) * 4 + k] = (i / 2) as f32;
            }
        }
    }
    let input = tensor(values, [1, 8, 4, 4]);
    let pooled = AveragePool::new(2).apply(input);
    assert_eq!(pooled.dims(), [1, 4, 2, 2]);

    let data = pooled.clone().into_data().to_vec::<f32>().unwrap();
    for i in 0..4 {
        assert_eq!(data[i * 4], i as f32);
    }

    let resized = resize_trilinear(pooled, [8, 4, 4], GridAlignment::Centers);
    let data = resized.into_data().to_vec::<f32>().unwrap();
    // Output voxel 0 maps to source -0.25 (clamped to 0), voxel 7 to 3.25.
    assert_eq!(data[0], 0.0);
    assert_eq!(data[7 * 16], 3.0);
    // Voxel 3 maps to source 1.25.
    assert!((data[3 * 16] - 1.25).abs() < 1e-6);
}
