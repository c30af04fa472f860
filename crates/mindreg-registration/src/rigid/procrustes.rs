//! Closed-form fits of point correspondences.

use mindreg_core::RigidTransform;
use nalgebra::{Matrix3, Matrix4, Matrix4x3, Point3, Vector3, Vector4};

use crate::error::{RegistrationError, Result};

/// Fewest pairs a fit accepts.
pub const MIN_CORRESPONDENCES: usize = 4;

fn check_counts(fixed: &[Point3<f64>], moving: &[Point3<f64>]) -> Result<()> {
    if fixed.len() != moving.len() {
        return Err(RegistrationError::shape_mismatch(&[fixed.len(), 3], &[moving.len(), 3]));
    }
    if fixed.len() < MIN_CORRESPONDENCES {
        return Err(RegistrationError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            actual: fixed.len(),
        });
    }
    Ok(())
}

fn centroid(points: &[Point3<f64>]) -> Vector3<f64> {
    points.iter().map(|p| p.coords).sum::<Vector3<f64>>() / points.len() as f64
}

/// Least-squares rigid transform mapping `fixed` onto `moving`.
///
/// Orthogonal Procrustes: with `H = sum (x - x̄)(y - ȳ)^T = U S V^T`, the
/// rotation is `R = V diag(1, 1, det(V U^T)) U^T` and the translation
/// `t = ȳ - R x̄`. The sign correction keeps `R` a proper rotation.
pub fn fit_rigid(fixed: &[Point3<f64>], moving: &[Point3<f64>]) -> Result<RigidTransform> {
    check_counts(fixed, moving)?;

    let fixed_mean = centroid(fixed);
    let moving_mean = centroid(moving);
    let covariance = fixed
        .iter()
        .zip(moving)
        .fold(Matrix3::zeros(), |acc, (x, y)| {
            acc + (x.coords - fixed_mean) * (y.coords - moving_mean).transpose()
        });

    let svd = covariance.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(RegistrationError::singular_system("SVD of the cross-covariance did not converge")),
    };
    let v = v_t.transpose();

    // Singular values are sorted, so the last axis is the weakest.
    let mut correction = Matrix3::identity();
    correction[(2, 2)] = (v * u.transpose()).determinant().signum();
    let rotation = v * correction * u.transpose();
    let translation = moving_mean - rotation * fixed_mean;

    if rotation.iter().chain(translation.iter()).any(|x| !x.is_finite()) {
        return Err(RegistrationError::numerical_instability("Rigid fit produced non-finite values"));
    }
    Ok(RigidTransform::from_parts(rotation, translation))
}

/// Least-squares affine transform mapping `fixed` onto `moving`.
///
/// Solves the normal equations `(F^T F) X = F^T M` with `F` the homogeneous
/// fixed points and `M` the moving points. Returns the homogeneous 4x4
/// matrix acting on column vectors.
pub fn fit_affine(fixed: &[Point3<f64>], moving: &[Point3<f64>]) -> Result<Matrix4<f64>> {
    check_counts(fixed, moving)?;

    let mut normal = Matrix4::<f64>::zeros();
    let mut rhs = Matrix4x3::<f64>::zeros();
    for (x, y) in fixed.iter().zip(moving) {
        let f = Vector4::new(x.x, x.y, x.z, 1.0);
        normal += f * f.transpose();
        rhs += f * y.coords.transpose();
    }

    let solution = normal
        .lu()
        .solve(&rhs)
        .filter(|s| s.iter().all(|x| x.is_finite()))
        .ok_or_else(|| RegistrationError::singular_system("Affine normal equations are singular (coplanar points?)"))?;

    let mut matrix = Matrix4::identity();
    matrix.fixed_view_mut::<3, 4>(0, 0).copy_from(&solution.transpose());
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 8.0, 0.0),
            Point3::new(0.0, 0.0, 6.0),
            Point3::new(4.0, 5.0, 3.0),
            Point3::new(-3.0, 2.0, 7.0),
        ]
    }

    #[test]
    fn test_rigid_fit_is_exact() {
        let truth = RigidTransform::from_euler([0.2, -0.1, 0.35], Vector3::new(1.5, -2.0, 3.0));
        let fixed = cloud();
        let moving: Vec<_> = fixed.iter().map(|p| truth.transform_point(p)).collect();

        let fitted = fit_rigid(&fixed, &moving).unwrap();
        assert!((fitted.matrix() - truth.matrix()).abs().max() < 1e-9);
        assert!((fitted.rotation().determinant() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rigid_fit_never_reflects() {
        // A mirrored cloud is best matched by a reflection; the fit must
        // still return a proper rotation.
        let fixed = cloud();
        let moving: Vec<_> = fixed.iter().map(|p| Point3::new(-p.x, p.y, p.z)).collect();
        let fitted = fit_rigid(&fixed, &moving).unwrap();
        assert!((fitted.rotation().determinant() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_affine_fit_is_exact() {
        let truth = Matrix4::new(
            1.1, 0.1, 0.0, 2.0, //
            -0.05, 0.9, 0.2, -1.0, //
            0.0, 0.15, 1.2, 0.5, //
            0.0, 0.0, 0.0, 1.0,
        );
        let fixed = cloud();
        let moving: Vec<_> = fixed.iter().map(|p| truth.transform_point(p)).collect();

        let fitted = fit_affine(&fixed, &moving).unwrap();
        assert!((fitted - truth).abs().max() < 1e-9);
    }

    #[test]
    fn test_affine_fit_rejects_coplanar_points() {
        let fixed: Vec<_> = cloud().iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
        let err = fit_affine(&fixed, &fixed).unwrap_err();
        assert!(matches!(err, RegistrationError::SingularSystem(_)));
    }

    #[test]
    fn test_too_few_pairs() {
        let fixed = &cloud()[..3];
        let err = fit_rigid(fixed, fixed).unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::InsufficientCorrespondences { required: 4, actual: 3 }
        ));
    }
}
