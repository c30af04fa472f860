//! Keypoint coordinate conversions.
//!
//! Normalized coordinates follow the align-corners convention: `-1` and
//! `+1` are the centres of the first and last voxel along each axis. The
//! axis order stays `(h, w, d)`.

use nalgebra::Point3;

fn half_span(n: usize) -> f64 {
    (n.max(2) - 1) as f64 / 2.0
}

/// Voxel positions to normalized `[-1, 1]` positions on a grid of `shape`.
pub fn voxel_to_normalized(points: &[Point3<f64>], shape: [usize; 3]) -> Vec<Point3<f64>> {
    let scale = shape.map(half_span);
    points
        .iter()
        .map(|p| Point3::new(p.x / scale[0] - 1.0, p.y / scale[1] - 1.0, p.z / scale[2] - 1.0))
        .collect()
}

/// Normalized `[-1, 1]` positions back to voxel positions.
pub fn normalized_to_voxel(points: &[Point3<f64>], shape: [usize; 3]) -> Vec<Point3<f64>> {
    let scale = shape.map(half_span);
    points
        .iter()
        .map(|p| Point3::new((p.x + 1.0) * scale[0], (p.y + 1.0) * scale[1], (p.z + 1.0) * scale[2]))
        .collect()
}
