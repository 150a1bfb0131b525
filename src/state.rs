use std::fmt;

use log::debug;
use nalgebra::{Matrix3, Point3, Vector3};

use crate::numerics::interface::AmbientFlow;

/// Particle population membership, used to label diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleLabel {
    Sphere(usize),
    Dumbbell(usize),
}

impl fmt::Display for ParticleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticleLabel::Sphere(i) => write!(f, "sphere {}", i),
            ParticleLabel::Dumbbell(i) => write!(f, "dumbbell {}", i),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Sphere {
    pub position: Point3<f64>,
    pub radius: f64,
    // Endpoints of two reference vectors anchored at the centre. Their
    // motion records the sphere's orientation.
    pub rotation_markers: [Point3<f64>; 2],
}

impl Sphere {
    pub fn new(position: Point3<f64>, radius: f64) -> Self {
        Sphere {
            position,
            radius,
            rotation_markers: [
                position + Vector3::x().scale(radius),
                position + Vector3::y().scale(radius),
            ],
        }
    }

    pub fn translate(&mut self, dr: Vector3<f64>) {
        self.position += dr;
        for marker in self.rotation_markers.iter_mut() {
            *marker += dr;
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Dumbbell {
    pub position: Point3<f64>,
    // Bead 1 minus bead 2.
    pub delta_x: Vector3<f64>,
    pub bead_radius: f64,
}

impl Dumbbell {
    pub fn new(position: Point3<f64>, delta_x: Vector3<f64>, bead_radius: f64) -> Self {
        debug!("Dumbbell::new(r={}, dx={})", position, delta_x);
        Dumbbell {
            position,
            delta_x,
            bead_radius,
        }
    }

    pub fn bead_positions(&self) -> (Point3<f64>, Point3<f64>) {
        let dx_half = self.delta_x.scale(0.5);
        (self.position + dx_half, self.position - dx_half)
    }

    pub fn length(&self) -> f64 {
        self.delta_x.norm()
    }
}

#[derive(Clone, Debug)]
pub struct SimState {
    pub spheres: Vec<Sphere>,
    pub dumbbells: Vec<Dumbbell>,
    pub t: f64,
    pub step: usize,
}

impl SimState {
    pub fn new(spheres: Vec<Sphere>, dumbbells: Vec<Dumbbell>) -> SimState {
        SimState {
            spheres,
            dumbbells,
            t: 0.0,
            step: 0,
        }
    }

    // Spheres first, then dumbbells.
    pub fn element_sizes(&self) -> Vec<f64> {
        self.spheres
            .iter()
            .map(|s| s.radius)
            .chain(self.dumbbells.iter().map(|d| d.bead_radius))
            .collect()
    }

    pub fn label(&self, element: usize) -> ParticleLabel {
        if element < self.spheres.len() {
            ParticleLabel::Sphere(element)
        } else {
            ParticleLabel::Dumbbell(element - self.spheres.len())
        }
    }
}

/// Lab-frame velocities used to advance one frame. Kept for the next frame's
/// two-step update.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameVelocities {
    pub sphere_velocities: Vec<Vector3<f64>>,
    pub sphere_angular_velocities: Vec<Vector3<f64>>,
    pub dumbbell_velocities: Vec<Vector3<f64>>,
    pub dumbbell_half_velocity_differences: Vec<Vector3<f64>>,
}

// A step summary is a summary of what happened or was computed during a single step.
// `None` marks a quantity that was not computed this frame.

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SphereStepSummary {
    pub force: Option<Vector3<f64>>,
    pub torque: Option<Vector3<f64>>,
    pub stresslet: Option<Matrix3<f64>>,
    pub velocity: Option<Vector3<f64>>,
    pub angular_velocity: Option<Vector3<f64>>,
    pub strain_rate: Option<Matrix3<f64>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DumbbellStepSummary {
    pub force: Option<Vector3<f64>>,
    pub force_difference: Option<Vector3<f64>>,
    pub velocity: Option<Vector3<f64>>,
    pub half_velocity_difference: Option<Vector3<f64>>,
}

/// Force exerted on the fixed-velocity spheres by the dumbbells alone.
#[derive(Clone, Debug, PartialEq)]
pub enum WallForce {
    NotRequested,
    Computed(Vec<Vector3<f64>>),
    Unsupported,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameTimings {
    pub far_field: f64,
    pub near_field: f64,
    pub generation: f64,
    pub solve: f64,
}

#[derive(Clone, Debug)]
pub struct StepSummary {
    pub sphere_summaries: Vec<SphereStepSummary>,
    pub dumbbell_summaries: Vec<DumbbellStepSummary>,
    pub ambient: AmbientFlow,
    pub force_on_wall_due_to_dumbbells: WallForce,
    pub timings: FrameTimings,
    // Populated once the frame has been integrated.
    pub velocities: Option<FrameVelocities>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dumbbell_beads() {
        let d = Dumbbell::new(Point3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 2.0, 0.0), 0.1);
        let (b1, b2) = d.bead_positions();
        assert_relative_eq!(b1, Point3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(b2, Point3::new(1.0, -1.0, 0.0));
        assert_relative_eq!(b1 - b2, d.delta_x);
        assert_relative_eq!(d.length(), 2.0);
    }

    #[test]
    fn test_labels_and_sizes() {
        let state = SimState::new(
            vec![Sphere::new(Point3::origin(), 1.0)],
            vec![Dumbbell::new(Point3::origin(), Vector3::x(), 0.2)],
        );
        assert_eq!(state.element_sizes(), vec![1.0, 0.2]);
        assert_eq!(state.label(0), ParticleLabel::Sphere(0));
        assert_eq!(state.label(1), ParticleLabel::Dumbbell(0));
        assert_eq!(format!("{}", state.label(1)), "dumbbell 0");
    }

    #[test]
    fn test_sphere_translate_moves_markers() {
        let mut s = Sphere::new(Point3::origin(), 2.0);
        s.translate(Vector3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(s.rotation_markers[0], Point3::new(2.0, 0.0, 1.0));
        assert_relative_eq!(s.rotation_markers[1], Point3::new(0.0, 2.0, 1.0));
    }
}
