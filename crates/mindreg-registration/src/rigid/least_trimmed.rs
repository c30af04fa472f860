//! Least-trimmed-squares wrappers around the closed-form fits.
//!
//! Every round fits the currently retained pairs, measures the residual
//! `|T(x) - y|` of *all* pairs, and retains the best half (at least
//! [`MIN_CORRESPONDENCES`]) for the next round. The loop runs a fixed
//! number of rounds and returns the fit of the last one, tolerating up to
//! about 50% outliers.

use mindreg_core::RigidTransform;
use nalgebra::{Matrix4, Point3};

use super::correspondence::PointCorrespondenceSet;
use super::procrustes::{fit_affine, fit_rigid, MIN_CORRESPONDENCES};
use crate::config::DEFAULT_RIGID_ROUNDS;
use crate::error::{RegistrationError, Result};

fn trimmed_fit<M>(
    set: &PointCorrespondenceSet,
    rounds: usize,
    fit: impl Fn(&[Point3<f64>], &[Point3<f64>]) -> Result<M>,
    apply: impl Fn(&M, &Point3<f64>) -> Point3<f64>,
) -> Result<M> {
    if rounds == 0 {
        return Err(RegistrationError::invalid_configuration(
            "Least-trimmed fit needs at least one round",
        ));
    }
    let n = set.len();
    if n < MIN_CORRESPONDENCES {
        return Err(RegistrationError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            actual: n,
        });
    }

    let keep = (n / 2).max(MIN_CORRESPONDENCES);
    let mut retained: Vec<usize> = (0..n).collect();
    let mut model = None;

    for round in 0..rounds {
        let (fixed, moving) = set.subset(&retained);
        let current = fit(&fixed, &moving)?;

        let mut residuals: Vec<(usize, f64)> = set
            .fixed()
            .iter()
            .zip(set.moving())
            .enumerate()
            .map(|(i, (x, y))| (i, (apply(&current, x) - y).norm()))
            .collect();
        residuals.sort_by(|a, b| a.1.total_cmp(&b.1));
        residuals.truncate(keep);

        tracing::debug!(
            "Trimming round {}/{}: retained {} of {}, median residual {:.4}",
            round + 1,
            rounds,
            residuals.len(),
            n,
            residuals[residuals.len() / 2].1
        );

        retained = residuals.into_iter().map(|(i, _)| i).collect();
        model = Some(current);
    }

    model.ok_or_else(|| RegistrationError::invalid_configuration("Least-trimmed fit ran no rounds"))
}

/// Outlier-robust rigid fit.
#[derive(Debug, Clone, Copy)]
pub struct RobustRigidFitter {
    rounds: usize,
}

impl Default for RobustRigidFitter {
    fn default() -> Self {
        Self::new(DEFAULT_RIGID_ROUNDS)
    }
}

impl RobustRigidFitter {
    pub fn new(rounds: usize) -> Self {
        Self { rounds }
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Rigid transform mapping the fixed points onto the moving points.
    pub fn fit(&self, set: &PointCorrespondenceSet) -> Result<RigidTransform> {
        trimmed_fit(set, self.rounds, fit_rigid, |t, p| t.transform_point(p))
    }
}

/// Outlier-robust affine fit, returning a homogeneous 4x4 matrix.
#[derive(Debug, Clone, Copy)]
pub struct RobustAffineFitter {
    rounds: usize,
}

impl Default for RobustAffineFitter {
    fn default() -> Self {
        Self::new(DEFAULT_RIGID_ROUNDS)
    }
}

impl RobustAffineFitter {
    pub fn new(rounds: usize) -> Self {
        Self { rounds }
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn fit(&self, set: &PointCorrespondenceSet) -> Result<Matrix4<f64>> {
        trimmed_fit(set, self.rounds, fit_affine, |m: &Matrix4<f64>, p| m.transform_point(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn lattice_points() -> Vec<Point3<f64>> {
        let mut points = Vec::new();
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    points.push(Point3::new(i as f64 * 5.0, j as f64 * 4.0 + 1.0, k as f64 * 6.0 - 2.0));
                }
            }
        }
        points
    }

    #[test]
    fn test_clean_pairs_are_fitted_exactly() {
        let truth = RigidTransform::from_euler([0.05, 0.1, -0.2], Vector3::new(2.0, 0.0, -1.0));
        let fixed = lattice_points();
        let moving = fixed.iter().map(|p| truth.transform_point(p)).collect();
        let set = PointCorrespondenceSet::new(fixed, moving).unwrap();

        let fitted = RobustRigidFitter::new(3).fit(&set).unwrap();
        assert!((fitted.matrix() - truth.matrix()).abs().max() < 1e-9);
    }

    #[test]
    fn test_single_gross_outlier_is_ignored() {
        let truth = RigidTransform::from_translation(Vector3::new(1.0, -1.0, 0.5));
        let fixed = lattice_points();
        let mut moving: Vec<_> = fixed.iter().map(|p| truth.transform_point(p)).collect();
        moving[13] += Vector3::new(40.0, -25.0, 30.0);
        let set = PointCorrespondenceSet::new(fixed, moving).unwrap();

        let fitted = RobustAffineFitter::new(4).fit(&set).unwrap();
        assert!((fitted - truth.matrix()).abs().max() < 1e-8);
    }

    #[test]
    fn test_zero_rounds_is_rejected() {
        let fixed = lattice_points();
        let set = PointCorrespondenceSet::new(fixed.clone(), fixed).unwrap();
        assert!(matches!(
            RobustRigidFitter::new(0).fit(&set),
            Err(RegistrationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_empty_set_is_rejected() {
        let err = RobustRigidFitter::default()
            .fit(&PointCorrespondenceSet::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::InsufficientCorrespondences { actual: 0, .. }
        ));
    }
}
