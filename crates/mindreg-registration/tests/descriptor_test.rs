use burn::tensor::{Shape, Tensor, TensorData};
use burn_ndarray::NdArray;
use mindreg_registration::descriptor::{MindSsc, CHANNEL_PERMUTATION, DESCRIPTOR_CHANNELS};
use proptest::prelude::*;

type B = NdArray<f32>;

fn volume(values: Vec<f32>, side: usize) -> Tensor<B, 3> {
    Tensor::from_data(TensorData::new(values, Shape::new([side, side, side])), &Default::default())
}

#[test]
fn test_permutation_is_a_bijection() {
    let mut seen = [false; DESCRIPTOR_CHANNELS];
    for &c in CHANNEL_PERMUTATION.iter() {
        assert!(!seen[c], "channel {c} repeated");
        seen[c] = true;
    }
    assert!(seen.iter().all(|&s| s));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn descriptor_ignores_affine_contrast(
        values in prop::collection::vec(0.0f32..1.0, 216),
        scale in prop_oneof![0.5f32..4.0, -4.0f32..-0.5],
        offset in -10.0f32..10.0,
    ) {
        let extractor = MindSsc::new(1, 1);
        let original = volume(values.clone(), 6);
        let remapped = volume(values.iter().map(|v| v * scale + offset).collect(), 6);

        let a = extractor.compute(&original).unwrap();
        let b = extractor.compute(&remapped).unwrap();
        let diff = (a - b).abs().max().into_scalar();
        prop_assert!(diff < 1e-2, "max difference {}", diff);
    }

    #[test]
    fn descriptor_values_are_bounded(values in prop::collection::vec(-5.0f32..5.0, 125)) {
        let descriptor = MindSsc::new(1, 2).compute(&volume(values, 5)).unwrap();
        prop_assert_eq!(descriptor.dims(), [12, 5, 5, 5]);
        let data = descriptor.into_data().to_vec::<f32>().unwrap();
        prop_assert!(data.iter().all(|v| v.is_finite() && *v >= 0.0 && *v <= 1.0 + 1e-6));
    }
}
