use std::f64::consts::FRAC_PI_2;

use log::{error, warn};
use nalgebra::Vector3;

use crate::error::NumericalInstabilityError;

/// Dumbbells longer than this after a step have blown up.
pub const EXPLOSION_THRESHOLD: f64 = 5.0;

/// Angle turned by a dumbbell in one step. The cosine is rounded to four
/// places so that round-off cannot push it outside [-1, 1].
pub fn rotation_angle(old: &Vector3<f64>, new: &Vector3<f64>) -> f64 {
    let cos = old.dot(new) / (old.norm() * new.norm());
    ((cos * 1e4).round() / 1e4).clamp(-1.0, 1.0).acos()
}

/// Compares each dumbbell's Δx before and after a step.
///
/// Turning by more than 90° is only logged. With `explosion_protection` on,
/// any dumbbell longer than [`EXPLOSION_THRESHOLD`] is fatal; all offenders
/// are logged and the first is returned.
pub fn check_dumbbells_for_explosion(
    old_delta_xs: &[Vector3<f64>],
    new_delta_xs: &[Vector3<f64>],
    explosion_protection: bool,
) -> Result<(), NumericalInstabilityError> {
    let mut first_explosion = None;
    for (i, (old, new)) in old_delta_xs.iter().zip(new_delta_xs.iter()).enumerate() {
        if rotation_angle(old, new) > FRAC_PI_2 {
            warn!(
                "Dumbbell {} turned by more than 90 degrees in one step: old delta x {}, new delta x {}",
                i, old, new
            );
        }
        let length = new.norm();
        if explosion_protection && length > EXPLOSION_THRESHOLD {
            let err = NumericalInstabilityError::DumbbellExplosion {
                index: i,
                length,
                threshold: EXPLOSION_THRESHOLD,
            };
            error!("{}", err);
            first_explosion.get_or_insert(err);
        }
    }
    match first_explosion {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_long_dumbbell_explodes() {
        let old = [Vector3::new(1.0, 0.0, 0.0)];
        assert!(check_dumbbells_for_explosion(&old, &[Vector3::new(6.0, 0.0, 0.0)], true).is_err());
        assert!(check_dumbbells_for_explosion(&old, &[Vector3::new(4.0, 0.0, 0.0)], true).is_ok());
        // Protection off.
        assert!(check_dumbbells_for_explosion(&old, &[Vector3::new(6.0, 0.0, 0.0)], false).is_ok());
    }

    #[test]
    fn test_reports_first_offender() {
        let old = [Vector3::x(), Vector3::x(), Vector3::x()];
        let new = [Vector3::x(), Vector3::new(0.0, 7.0, 0.0), Vector3::new(9.0, 0.0, 0.0)];
        match check_dumbbells_for_explosion(&old, &new, true) {
            Err(NumericalInstabilityError::DumbbellExplosion { index, length, .. }) => {
                assert_eq!(index, 1);
                assert_relative_eq!(length, 7.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_large_rotation_is_advisory() {
        let old = [Vector3::x()];
        let new = [Vector3::new(-1.0, 0.1, 0.0)];
        assert!(rotation_angle(&old[0], &new[0]) > FRAC_PI_2);
        assert!(check_dumbbells_for_explosion(&old, &new, true).is_ok());
    }

    #[test]
    fn test_rotation_angle_rounding() {
        let v = Vector3::new(0.3, -0.4, 1.2);
        assert_relative_eq!(rotation_angle(&v, &(v * 2.0)), 0.0);
        assert_relative_eq!(rotation_angle(&v, &-v), std::f64::consts::PI);
    }
}
