use std::{f64::consts::PI, time::Instant};

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::{
    error::{ConfigurationError, StokesResult},
    state::SimState,
};

use super::{
    interface::{
        FarFieldCache, GeneratedMatrix, GenerationTimings, MatrixRequest, ResistanceMatrixGenerator,
    },
    layout::DofLayout,
};

// F = 6πηaU
pub fn stokes_translation_coefficient(viscosity: f64, radius: f64) -> f64 {
    6.0 * PI * viscosity * radius
}

// T = 8πηa^3Ω
pub fn stokes_rotation_coefficient(viscosity: f64, radius: f64) -> f64 {
    8.0 * PI * viscosity * radius.powi(3)
}

// S = (20/3)πηa^3E
pub fn stokes_stresslet_coefficient(viscosity: f64, radius: f64) -> f64 {
    (20.0 / 3.0) * PI * viscosity * radius.powi(3)
}

/// Far-field mobility of isolated particles, in FTS ordering.
///
/// A dumbbell's centre and half-difference modes each move two beads, so
/// both see twice the single-bead drag.
pub fn drag_mobility(state: &SimState, viscosity: f64) -> DMatrix<f64> {
    let layout = DofLayout::of(state);
    let mut diagonal = DVector::zeros(layout.size());
    for (i, s) in state.spheres.iter().enumerate() {
        let f = layout.sphere_force(i);
        let t = layout.sphere_torque(i);
        let st = layout.sphere_stresslet(i);
        diagonal
            .rows_mut(f, 3)
            .fill(1.0 / stokes_translation_coefficient(viscosity, s.radius));
        diagonal
            .rows_mut(t, 3)
            .fill(1.0 / stokes_rotation_coefficient(viscosity, s.radius));
        diagonal
            .rows_mut(st, 5)
            .fill(1.0 / stokes_stresslet_coefficient(viscosity, s.radius));
    }
    for (i, d) in state.dumbbells.iter().enumerate() {
        let mobility = 1.0 / (2.0 * stokes_translation_coefficient(viscosity, d.bead_radius));
        diagonal.rows_mut(layout.dumbbell_force(i), 3).fill(mobility);
        diagonal
            .rows_mut(layout.dumbbell_force_difference(i), 3)
            .fill(mobility);
    }
    DMatrix::from_diagonal(&diagonal)
}

pub fn check_element_sizes(state: &SimState) -> Result<(), ConfigurationError> {
    match state.element_sizes().iter().position(|a| !(*a > 0.0)) {
        Some(i) => Err(ConfigurationError::InvalidParameter {
            name: "radius",
            reason: format!("{} has non-positive size", state.label(i)),
        }),
        None => Ok(()),
    }
}

/// Resistance from isolated-particle Stokes drag, with no near-field
/// correction. Local, so a periodic box changes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DragResistance;

impl ResistanceMatrixGenerator for DragResistance {
    fn generate(
        &self,
        state: &SimState,
        cache: &FarFieldCache,
        request: &MatrixRequest<'_>,
    ) -> StokesResult<GeneratedMatrix> {
        let layout = DofLayout::of(state);
        check_element_sizes(state)?;

        let far_start = Instant::now();
        let reusable = cache
            .minfinity_inverse()
            .filter(|m| !request.regenerate && m.nrows() == layout.size())
            .is_some();
        let cache = if reusable {
            cache.clone()
        } else {
            debug!("Regenerating far-field mobility at frame {}", request.frame);
            let inverse = drag_mobility(state, request.viscosity)
                .try_inverse()
                .ok_or_else(|| ConfigurationError::InvalidParameter {
                    name: "viscosity",
                    reason: "far-field mobility is not invertible".to_string(),
                })?;
            FarFieldCache::store(inverse, request.frame)
        };
        let far_field = far_start.elapsed().as_secs_f64();

        if let Some(periodic) = &request.periodic {
            debug!(
                "Drag resistance is local, ignoring periodic box {:?}",
                periodic.periodic_box
            );
        }

        let matrix = match cache.minfinity_inverse() {
            Some(m) => m.clone(),
            None => DMatrix::zeros(layout.size(), layout.size()),
        };

        Ok(GeneratedMatrix {
            matrix,
            layout,
            cache,
            timings: GenerationTimings {
                far_field,
                near_field: 0.0,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Dumbbell, Sphere};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn request(frame: usize, regenerate: bool) -> MatrixRequest<'static> {
        MatrixRequest {
            frame,
            viscosity: 1.0,
            regenerate,
            periodic: None,
        }
    }

    fn state() -> SimState {
        SimState::new(
            vec![Sphere::new(Point3::origin(), 1.0)],
            vec![Dumbbell::new(Point3::new(3.0, 0.0, 0.0), Vector3::x(), 0.5)],
        )
    }

    #[test]
    fn test_drag_resistance_diagonal() {
        let generated = DragResistance
            .generate(&state(), &FarFieldCache::new(), &request(0, true))
            .unwrap();
        let m = &generated.matrix;
        assert_eq!(m.nrows(), 17);
        assert_relative_eq!(m[(0, 0)], 6.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(m[(3, 3)], 8.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(m[(6, 6)], 20.0 * PI / 3.0, epsilon = 1e-12);
        assert_relative_eq!(m[(11, 11)], 6.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(m[(14, 14)], 6.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(m[(0, 1)], 0.0);
        assert_eq!(generated.cache.generated_at_frame(), Some(0));
    }

    #[test]
    fn test_reuses_cache_unless_regenerating() {
        let s = state();
        let first = DragResistance
            .generate(&s, &FarFieldCache::new(), &request(0, true))
            .unwrap();
        let reused = DragResistance
            .generate(&s, &first.cache, &request(1, false))
            .unwrap();
        assert_eq!(reused.cache.generated_at_frame(), Some(0));
        let regenerated = DragResistance
            .generate(&s, &first.cache, &request(2, true))
            .unwrap();
        assert_eq!(regenerated.cache.generated_at_frame(), Some(2));
    }

    #[test]
    fn test_rejects_zero_radius() {
        let s = SimState::new(vec![Sphere::new(Point3::origin(), 0.0)], vec![]);
        assert!(DragResistance
            .generate(&s, &FarFieldCache::new(), &request(0, true))
            .is_err());
    }
}
