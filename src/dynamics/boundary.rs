use nalgebra::{Matrix3, Point3, Vector3};

use crate::{
    config::setup::parameters::common::PeriodicBox,
    error::NumericalInstabilityError,
};

fn wrap1(x: f64, l: f64) -> f64 {
    if l > 0.0 {
        (x + 0.5 * l).rem_euclid(l) - 0.5 * l
    } else {
        x
    }
}

/// Basis vectors (columns) of the periodic cell after it has been carried
/// along by the accumulated ambient rotation `ot` and strain `et`.
///
/// Each canonical edge is displaced by `(ot × + et) · edge`, and the
/// displacement is itself reduced modulo the box, so a continuously sheared
/// cell returns to its original shape every time the shear offset crosses a
/// whole box length.
pub fn shear_basis_vectors(
    l: Vector3<f64>,
    ot: &Vector3<f64>,
    et: &Matrix3<f64>,
) -> Matrix3<f64> {
    let canonical = Matrix3::from_diagonal(&l);
    let gradient = ot.cross_matrix() + et;
    let mut basis = canonical + gradient * canonical;
    for i in 0..3 {
        for k in 0..3 {
            let add_on = basis[(k, i)] - canonical[(k, i)];
            basis[(k, i)] = canonical[(k, i)] + wrap1(add_on, l[k]);
        }
    }
    basis
}

/// A periodic box sheared to a particular instant.
#[derive(Debug, Clone)]
pub struct ShearedBox {
    centre: Point3<f64>,
    basis: Matrix3<f64>,
    basis_inverse: Matrix3<f64>,
}

impl ShearedBox {
    pub fn new(
        periodic_box: &PeriodicBox,
        ot: &Vector3<f64>,
        et: &Matrix3<f64>,
    ) -> Result<Self, NumericalInstabilityError> {
        let basis = shear_basis_vectors(periodic_box.l(), ot, et);
        let basis_inverse = basis
            .try_inverse()
            .ok_or(NumericalInstabilityError::DegenerateBox)?;
        Ok(ShearedBox {
            centre: periodic_box.centre(),
            basis,
            basis_inverse,
        })
    }

    pub fn basis(&self) -> &Matrix3<f64> {
        &self.basis
    }

    /// Brings `r` into the cell: cell coordinates are reduced to [-0.5, 0.5).
    pub fn wrap(&self, r: Point3<f64>) -> Point3<f64> {
        let cell = self.basis_inverse * (r - self.centre);
        let cell = cell.map(|c| wrap1(c, 1.0));
        self.centre + self.basis * cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube() -> PeriodicBox {
        PeriodicBox {
            bottom_left: Point3::new(-5.0, -5.0, -5.0),
            top_right: Point3::new(5.0, 5.0, 5.0),
        }
    }

    fn unsheared() -> ShearedBox {
        ShearedBox::new(&cube(), &Vector3::zeros(), &Matrix3::zeros()).unwrap()
    }

    // Simple shear u_x = gamma * z, accumulated to `offset`.
    fn sheared(offset: f64) -> ShearedBox {
        let half = offset / 10.0 * 0.5;
        let ot = Vector3::new(0.0, half, 0.0);
        let et = Matrix3::new(0.0, 0.0, half, 0.0, 0.0, 0.0, half, 0.0, 0.0);
        ShearedBox::new(&cube(), &ot, &et).unwrap()
    }

    #[test]
    fn test_wrap_past_top_right() {
        let b = unsheared();
        let eps = 0.1;
        assert_relative_eq!(
            b.wrap(Point3::new(5.0 + eps, 0.0, 0.0)),
            Point3::new(-5.0 + eps, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            b.wrap(Point3::new(1.0, -5.0 - eps, 23.0)),
            Point3::new(1.0, 5.0 - eps, 3.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_wrap_is_idempotent() {
        for b in [unsheared(), sheared(2.0), sheared(7.5)] {
            for r in [
                Point3::new(5.5, 0.0, 0.0),
                Point3::new(-12.0, 3.0, 9.9),
                Point3::new(0.1, 0.2, 0.3),
            ] {
                let once = b.wrap(r);
                assert_relative_eq!(b.wrap(once), once, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_inside_positions_unchanged() {
        let r = Point3::new(1.0, -2.0, 4.9);
        assert_relative_eq!(unsheared().wrap(r), r, epsilon = 1e-12);
    }

    #[test]
    fn test_sheared_box_shifts_image() {
        let b = sheared(2.0);
        assert_relative_eq!(
            b.basis().column(2).into_owned(),
            Vector3::new(2.0, 0.0, 10.0),
            epsilon = 1e-12
        );
        // Leaving through the top re-enters at the bottom, displaced by the
        // shear offset.
        assert_relative_eq!(
            b.wrap(Point3::new(0.0, 0.0, 5.5)),
            Point3::new(-2.0, 0.0, -4.5),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_shear_offset_is_periodic() {
        let a = sheared(3.0);
        let b = sheared(13.0);
        assert_relative_eq!(a.basis(), b.basis(), epsilon = 1e-12);
    }
}
