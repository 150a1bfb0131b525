use approx::relative_eq;
use nalgebra::{Matrix3, Point3, Vector3};

use crate::{config::setup::parameters::simulation::TimesteppingScheme, state::Sphere};

use super::integrate::{ab2_velocity, euler_timestep};

/// Orthonormal frame whose third axis is along `omega`, as the columns of a
/// rotation matrix, plus the angular speed. `None` for zero angular velocity.
pub fn rotating_frame(omega: &Vector3<f64>) -> Option<(Matrix3<f64>, f64)> {
    if *omega == Vector3::zeros() {
        return None;
    }
    let speed = omega.norm();
    let z_axis = omega / speed;
    // Any helper not parallel to the rotation axis will do.
    let helper = if relative_eq!(z_axis.z.abs(), 1.0, epsilon = 1e-8) {
        Vector3::x()
    } else {
        Vector3::z()
    };
    let x_axis = z_axis.cross(&helper).normalize();
    let y_axis = z_axis.cross(&x_axis);
    Some((Matrix3::from_columns(&[x_axis, y_axis, z_axis]), speed))
}

/// Moves one marker rigidly with its sphere: the offset from the old centre
/// is rotated by `omega * dt` and re-anchored at the new centre.
pub fn rotate_marker(
    marker: Point3<f64>,
    old_centre: Point3<f64>,
    new_centre: Point3<f64>,
    frame: Option<&(Matrix3<f64>, f64)>,
    dt: f64,
) -> Point3<f64> {
    let offset = marker - old_centre;
    let (rot_matrix, speed) = match frame {
        Some(frame) => frame,
        None => return new_centre + offset,
    };

    // Spherical coordinates in the rotating frame. Radius and polar angle
    // are unchanged by a rotation about the frame's z axis.
    let local = rot_matrix.transpose() * offset;
    let r = local.norm();
    if r == 0.0 {
        return new_centre;
    }
    let theta = (local.z / r).clamp(-1.0, 1.0).acos();
    let phi0 = if local.x == 0.0 && local.y == 0.0 {
        0.0
    } else {
        local.y.atan2(local.x)
    };
    let phi = euler_timestep(phi0, *speed, dt);

    let rotated = Vector3::new(
        r * theta.sin() * phi.cos(),
        r * theta.sin() * phi.sin(),
        r * theta.cos(),
    );
    new_centre + rot_matrix * rotated
}

/// New rotation markers after an Euler timestep with angular velocity `omega`.
pub fn euler_timestep_rotation(
    sphere: &Sphere,
    new_position: Point3<f64>,
    omega: &Vector3<f64>,
    dt: f64,
) -> [Point3<f64>; 2] {
    let frame = rotating_frame(omega);
    sphere.rotation_markers.map(|marker| {
        rotate_marker(marker, sphere.position, new_position, frame.as_ref(), dt)
    })
}

/// Adams-Bashforth 2: Euler with omega replaced by 1.5 omega - 0.5 omega_previous.
pub fn ab2_timestep_rotation(
    sphere: &Sphere,
    new_position: Point3<f64>,
    omega: &Vector3<f64>,
    omega_previous: &Vector3<f64>,
    dt: f64,
) -> [Point3<f64>; 2] {
    euler_timestep_rotation(sphere, new_position, &ab2_velocity(*omega, *omega_previous), dt)
}

pub fn advance_rotations(
    scheme: TimesteppingScheme,
    spheres: &[Sphere],
    new_positions: &[Point3<f64>],
    omegas: &[Vector3<f64>],
    omegas_previous: Option<&[Vector3<f64>]>,
    dt: f64,
) -> Vec<[Point3<f64>; 2]> {
    spheres
        .iter()
        .zip(new_positions.iter())
        .zip(omegas.iter())
        .enumerate()
        .map(|(i, ((sphere, new_position), omega))| {
            let omega_previous = omegas_previous.and_then(|prev| prev.get(i));
            match (scheme, omega_previous) {
                (TimesteppingScheme::Ab2, Some(omega_previous)) => {
                    ab2_timestep_rotation(sphere, *new_position, omega, omega_previous, dt)
                }
                _ => euler_timestep_rotation(sphere, *new_position, omega, dt),
            }
        })
        .collect()
}
