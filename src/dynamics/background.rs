use nalgebra::{Matrix3, Point3, Vector3};

use crate::numerics::interface::AmbientFlow;

/// Ambient velocity at `r`: U∞ + O∞ × (r - c) + E · (r - c).
pub fn background_velocity(
    ambient: &AmbientFlow,
    e_infinity: &Matrix3<f64>,
    r: &Point3<f64>,
) -> Vector3<f64> {
    let x = r - ambient.centre;
    ambient.u_infinity + ambient.o_infinity.cross(&x) + e_infinity * x
}

/// Returns sphere velocities and angular velocities plus the background flow.
/// Each sphere uses its own strain rate.
pub fn add_background_flow_spheres(
    velocities: &[Vector3<f64>],
    angular_velocities: &[Vector3<f64>],
    strain_rates: &[Matrix3<f64>],
    ambient: &AmbientFlow,
    positions: &[Point3<f64>],
) -> (Vec<Vector3<f64>>, Vec<Vector3<f64>>) {
    let u = velocities
        .iter()
        .zip(strain_rates.iter())
        .zip(positions.iter())
        .map(|((u, e), r)| u + background_velocity(ambient, e, r))
        .collect();
    let o = angular_velocities
        .iter()
        .map(|o| o + ambient.o_infinity)
        .collect();
    (u, o)
}

/// Returns dumbbell centre velocities and half velocity differences plus the
/// background flow. The bead offset ±Δx/2 picks up half the ambient gradient
/// acting on Δx.
pub fn add_background_flow_dumbbells(
    velocities: &[Vector3<f64>],
    half_velocity_differences: &[Vector3<f64>],
    ambient: &AmbientFlow,
    positions: &[Point3<f64>],
    delta_xs: &[Vector3<f64>],
) -> (Vec<Vector3<f64>>, Vec<Vector3<f64>>) {
    let e = &ambient.e_infinity;
    let u = velocities
        .iter()
        .zip(positions.iter())
        .map(|(u, r)| u + background_velocity(ambient, e, r))
        .collect();
    let half_du = half_velocity_differences
        .iter()
        .zip(delta_xs.iter())
        .map(|(half_du, dx)| half_du + (ambient.o_infinity.cross(dx) + e * dx).scale(0.5))
        .collect();
    (u, half_du)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::setup::parameters::common::AmbientFlowConfig;
    use approx::assert_relative_eq;

    // Simple shear u_x = z about the point (0, 0, 1).
    fn shear() -> AmbientFlow {
        AmbientFlow::at_time(
            &AmbientFlowConfig {
                u_infinity: Vector3::new(0.1, 0.0, 0.0),
                o_infinity: Vector3::new(0.0, 0.5, 0.0),
                e_infinity: Matrix3::new(0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0),
                centre: Point3::new(0.0, 0.0, 1.0),
            },
            0.0,
        )
    }

    #[test]
    fn test_spheres_follow_shear() {
        let ambient = shear();
        let (u, o) = add_background_flow_spheres(
            &[Vector3::zeros(), Vector3::new(0.0, 1.0, 0.0)],
            &[Vector3::zeros(), Vector3::zeros()],
            &[ambient.e_infinity, ambient.e_infinity],
            &ambient,
            &[Point3::new(0.0, 0.0, 3.0), Point3::new(4.0, 0.0, 1.0)],
        );
        assert_relative_eq!(u[0], Vector3::new(2.1, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(u[1], Vector3::new(0.1, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(o[0], Vector3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn test_dumbbell_beads_follow_shear() {
        let ambient = shear();
        let position = Point3::new(0.0, 0.0, 2.0);
        let dx = Vector3::new(0.0, 0.0, 1.0);
        let (u, half_du) = add_background_flow_dumbbells(
            &[Vector3::zeros()],
            &[Vector3::zeros()],
            &ambient,
            &[position],
            &[dx],
        );
        // Beads at z = 2.5 and z = 1.5.
        let u1 = background_velocity(&ambient, &ambient.e_infinity, &(position + dx * 0.5));
        let u2 = background_velocity(&ambient, &ambient.e_infinity, &(position - dx * 0.5));
        assert_relative_eq!(u[0], (u1 + u2) * 0.5, epsilon = 1e-12);
        assert_relative_eq!(half_du[0], (u1 - u2) * 0.5, epsilon = 1e-12);
    }
}
