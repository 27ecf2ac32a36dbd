use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// Finds the rigid transform that best maps `mobile` onto `target` in the
/// least-squares sense (Kabsch algorithm).
///
/// Returns `None` when the point sets differ in length, are empty, or the
/// covariance decomposition fails.
pub fn superposition(mobile: &[Point3<f64>], target: &[Point3<f64>]) -> Option<Isometry3<f64>> {
    if mobile.len() != target.len() || mobile.is_empty() {
        return None;
    }
    let mobile_center = centroid(mobile)?;
    let target_center = centroid(target)?;

    let covariance = mobile
        .iter()
        .zip(target.iter())
        .fold(Matrix3::zeros(), |acc, (m, t)| {
            acc + (m - mobile_center) * (t - target_center).transpose()
        });

    let svd = covariance.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;

    let d = (v_t.transpose() * u.transpose()).determinant().signum();
    let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));
    let rotation_matrix = v_t.transpose() * correction * u.transpose();

    let rotation = Rotation3::from_matrix_unchecked(rotation_matrix);
    let translation = target_center.coords - rotation * mobile_center.coords;

    Some(Isometry3::from_parts(
        Translation3::from(translation),
        UnitQuaternion::from_rotation_matrix(&rotation),
    ))
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Unit;

    fn sample_points() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.5, 0.2, -0.3),
            Point3::new(2.1, 1.4, 0.5),
            Point3::new(-0.7, 2.2, 1.9),
        ]
    }

    #[test]
    fn centroid_of_empty_set_is_none() {
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn centroid_is_arithmetic_mean() {
        let c = centroid(&[Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, -2.0)]).unwrap();
        assert!((c - Point3::new(1.0, 2.0, -1.0)).norm() < 1e-12);
    }

    #[test]
    fn superposition_recovers_known_rigid_transform() {
        let mobile = sample_points();
        let rotation = Rotation3::from_axis_angle(
            &Unit::new_normalize(Vector3::new(0.3, -1.0, 0.7)),
            1.1,
        );
        let shift = Vector3::new(4.0, -2.5, 10.0);
        let target: Vec<_> = mobile.iter().map(|p| rotation * p + shift).collect();

        let transform = superposition(&mobile, &target).unwrap();
        let fitted: Vec<_> = mobile.iter().map(|p| transform * p).collect();

        assert!(calculate_rmsd(&fitted, &target).unwrap() < 1e-9);
    }

    #[test]
    fn superposition_never_returns_a_reflection() {
        let mobile = sample_points();
        let target: Vec<_> = mobile.iter().map(|p| Point3::new(-p.x, p.y, p.z)).collect();

        let transform = superposition(&mobile, &target).unwrap();
        let det = transform.rotation.to_rotation_matrix().matrix().determinant();
        assert!((det - 1.0).abs() < 1e-9);
    }

    #[test]
    fn superposition_rejects_mismatched_lengths() {
        let points = sample_points();
        assert!(superposition(&points, &points[..2]).is_none());
        assert!(superposition(&[], &[]).is_none());
    }

    #[test]
    fn calculate_rmsd_of_identical_sets_is_zero() {
        let points = sample_points();
        assert_eq!(calculate_rmsd(&points, &points), Some(0.0));
    }
}
