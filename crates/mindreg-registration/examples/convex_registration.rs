//! Convex Registration Example
//!
//! Registers a synthetic textured ball onto a translated and slightly
//! rotated copy of itself, then prints the recovered rigid matrix and the
//! intensity error before and after warping.
//!
//! Usage:
//!   RUST_LOG=debug cargo run --example convex_registration

use std::sync::Arc;

use burn_ndarray::NdArray;
use mindreg_core::{RigidTransform, Volume};
use mindreg_registration::metric::mean_squared_error;
use mindreg_registration::{
    ConsoleProgressCallback, ConvexRegistration, ConvexRegistrationConfig, Interpolation, Result,
};
use nalgebra::{Point3, Vector3};
use tracing_subscriber::EnvFilter;

type Backend = NdArray<f32>;

const SIDE: usize = 40;

/// Textured ball sampled through `motion`, which maps output voxels to
/// positions of the reference ball.
fn phantom(motion: &RigidTransform) -> Volume<Backend> {
    let centre = (SIDE as f64 - 1.0) / 2.0;
    let mut values = Vec::with_capacity(SIDE * SIDE * SIDE);
    for i in 0..SIDE {
        for j in 0..SIDE {
            for k in 0..SIDE {
                let p = motion.transform_point(&Point3::new(i as f64, j as f64, k as f64));
                let r = ((p.x - centre).powi(2) + (p.y - centre).powi(2) + (p.z - centre).powi(2)).sqrt();
                let value = if r <= 15.0 {
                    1.0 + 0.5 * (0.45 * p.x).sin() * (0.3 * p.y).cos() + 0.4 * (0.35 * p.z + 0.2 * p.x).sin()
                } else {
                    0.0
                };
                values.push(value as f32);
            }
        }
    }
    Volume::from_vec(values, [SIDE; 3], &Default::default())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Convex Registration (NdArray Backend)");
    println!("=====================================\n");

    let truth = RigidTransform::from_euler([0.0, 0.0, 0.08], Vector3::new(3.0, -2.0, 1.0));
    let fixed = phantom(&RigidTransform::identity());
    // moving(y) = fixed(T^-1 y), so fixed voxel x sits at T x in moving.
    let moving = phantom(&truth.inverse());

    let config = ConvexRegistrationConfig::default()
        .with_grid_spacing(2)
        .with_disp_hw(3);
    let registration = ConvexRegistration::new(config).with_progress(Arc::new(ConsoleProgressCallback::new()));
    let output = registration.execute(&fixed, &moving)?;

    println!("\nTrue rigid matrix:{}", truth.matrix());
    println!("Recovered rigid matrix:{}", output.rigid().matrix());

    let before = mean_squared_error(fixed.data(), moving.data())?.into_scalar();
    let warped = output.warp_moving(&moving, Interpolation::Linear);
    let after = mean_squared_error(fixed.data(), &warped)?.into_scalar();
    println!("MSE before: {:.5}, after: {:.5}", before, after);

    let field = output.displacement_channels_last();
    println!("Displacement field (H, W, D, 3): {:?}", field.dims());

    Ok(())
}
