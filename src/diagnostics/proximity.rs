use log::info;
use nalgebra::{DMatrix, Point3};

use crate::state::SimState;

/// Spheres, then first beads, then second beads, with their radii.
fn sphere_and_bead_elements(state: &SimState) -> Vec<(Point3<f64>, f64)> {
    let spheres = state.spheres.iter().map(|s| (s.position, s.radius));
    let beads_1 = state
        .dumbbells
        .iter()
        .map(|d| (d.bead_positions().0, d.bead_radius));
    let beads_2 = state
        .dumbbells
        .iter()
        .map(|d| (d.bead_positions().1, d.bead_radius));
    spheres.chain(beads_1).chain(beads_2).collect()
}

/// Pairwise centre distances between spheres and dumbbell beads, and the
/// same distances over the pair's average size (s').
pub fn separation_matrices(state: &SimState) -> (DMatrix<f64>, DMatrix<f64>) {
    let elements = sphere_and_bead_elements(state);
    let n = elements.len();
    let distances = DMatrix::from_fn(n, n, |i, j| (elements[i].0 - elements[j].0).norm());
    let scaled = DMatrix::from_fn(n, n, |i, j| {
        distances[(i, j)] / (0.5 * (elements[i].1 + elements[j].1))
    });
    (distances, scaled)
}

/// Reports how close particles are. Takes no action; extend here to reject
/// configurations the near-field tables don't cover.
pub fn report_particle_proximity(state: &SimState, printout: bool) {
    if !printout {
        return;
    }
    for (i, s) in state.spheres.iter().enumerate() {
        info!("sphere {} position {}", i, s.position);
    }
    for (i, d) in state.dumbbells.iter().enumerate() {
        info!("dumbbell {} position {} delta x {}", i, d.position, d.delta_x);
    }
    let (_, scaled) = separation_matrices(state);
    let closest = scaled
        .iter()
        .copied()
        .filter(|s| *s > 0.0)
        .fold(f64::INFINITY, f64::min);
    if closest.is_finite() {
        info!("Closest scaled separation s' = {:.5}", closest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Dumbbell, Sphere};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_separations_include_beads() {
        let state = SimState::new(
            vec![Sphere::new(Point3::origin(), 1.0)],
            vec![Dumbbell::new(Point3::new(4.0, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0), 0.5)],
        );
        let (distances, scaled) = separation_matrices(&state);
        assert_eq!(distances.shape(), (3, 3));
        // Beads at x = 5 and x = 3.
        assert_relative_eq!(distances[(0, 1)], 5.0);
        assert_relative_eq!(distances[(0, 2)], 3.0);
        assert_relative_eq!(distances[(1, 2)], 2.0);
        assert_relative_eq!(scaled[(0, 2)], 3.0 / 0.75);
        assert_relative_eq!(scaled[(1, 2)], 4.0);
        assert_relative_eq!(scaled[(1, 1)], 0.0);
        report_particle_proximity(&state, true);
    }
}
