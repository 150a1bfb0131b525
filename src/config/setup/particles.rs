use crate::geometry::point::{random_unit_vector, random_vector};
use crate::numerics::interface::{DumbbellInputs, SphereInputs};
use crate::state::{Dumbbell, Sphere};

use nalgebra::{Matrix3, Point3, Vector3};
use rand::distributions::Uniform;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum ParticleInitializationConfig {
    RandomUniformByNumber(ParticleNumberConfig),
    Explicit(ExplicitParticleConfig),
}

/// Free, force-free particles scattered uniformly through a box centred on
/// the origin.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
pub struct ParticleNumberConfig {
    #[serde(default)]
    pub num_spheres: usize,
    #[serde(default)]
    pub sphere_radius: f64,
    #[serde(default)]
    pub num_dumbbells: usize,
    #[serde(default)]
    pub bead_radius: f64,
    #[serde(default)]
    pub dumbbell_length: f64,
    pub l: Vector3<f64>,
    pub seed: u64,
}

// Unset quantities are left for the solve.

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
pub struct SphereConfig {
    pub position: Point3<f64>,
    pub radius: f64,
    #[serde(default)]
    pub force: Option<Vector3<f64>>,
    #[serde(default)]
    pub torque: Option<Vector3<f64>>,
    #[serde(default)]
    pub stresslet: Option<Matrix3<f64>>,
    #[serde(default)]
    pub velocity: Option<Vector3<f64>>,
    #[serde(default)]
    pub angular_velocity: Option<Vector3<f64>>,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
pub struct DumbbellConfig {
    pub position: Point3<f64>,
    pub delta_x: Vector3<f64>,
    pub bead_radius: f64,
    #[serde(default)]
    pub force: Option<Vector3<f64>>,
    #[serde(default)]
    pub force_difference: Option<Vector3<f64>>,
    #[serde(default)]
    pub velocity: Option<Vector3<f64>>,
    #[serde(default)]
    pub half_velocity_difference: Option<Vector3<f64>>,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
pub struct ExplicitParticleConfig {
    #[serde(default)]
    pub spheres: Vec<SphereConfig>,
    #[serde(default)]
    pub dumbbells: Vec<DumbbellConfig>,
}

impl SphereConfig {
    pub fn prescribed(&self) -> SphereInputs {
        SphereInputs {
            force: self.force,
            torque: self.torque,
            stresslet: self.stresslet,
            velocity: self.velocity,
            angular_velocity: self.angular_velocity,
            strain_rate: None,
        }
    }
}

impl DumbbellConfig {
    pub fn prescribed(&self) -> DumbbellInputs {
        DumbbellInputs {
            force: self.force,
            force_difference: self.force_difference,
            velocity: self.velocity,
            half_velocity_difference: self.half_velocity_difference,
        }
    }
}

/// Initial particles together with what is prescribed for each of them.
pub struct InitialParticles {
    pub spheres: Vec<Sphere>,
    pub dumbbells: Vec<Dumbbell>,
    pub sphere_inputs: Vec<SphereInputs>,
    pub dumbbell_inputs: Vec<DumbbellInputs>,
}

pub fn random_uniform_positions<R: rand::Rng>(
    rng: &mut R,
    n: usize,
    l: Vector3<f64>,
) -> Vec<Point3<f64>> {
    let r_distr = Uniform::new(-0.5, 0.5);
    (0..n)
        .map(|_i| random_vector(rng, r_distr).component_mul(&l).into())
        .collect()
}

fn force_free_sphere() -> SphereInputs {
    SphereInputs {
        force: Some(Vector3::zeros()),
        torque: Some(Vector3::zeros()),
        stresslet: Some(Matrix3::zeros()),
        ..Default::default()
    }
}

fn force_free_dumbbell() -> DumbbellInputs {
    DumbbellInputs {
        force: Some(Vector3::zeros()),
        force_difference: Some(Vector3::zeros()),
        ..Default::default()
    }
}

fn random_uniform_particles(config: &ParticleNumberConfig) -> InitialParticles {
    let mut rng = Pcg64Mcg::seed_from_u64(config.seed);
    let spheres = random_uniform_positions(&mut rng, config.num_spheres, config.l)
        .into_iter()
        .map(|r| Sphere::new(r, config.sphere_radius))
        .collect();
    let dumbbell_rs = random_uniform_positions(&mut rng, config.num_dumbbells, config.l);
    let dumbbells = dumbbell_rs
        .into_iter()
        .map(|r| {
            let u = random_unit_vector(&mut rng);
            Dumbbell::new(r, u.scale(config.dumbbell_length), config.bead_radius)
        })
        .collect();
    InitialParticles {
        spheres,
        dumbbells,
        sphere_inputs: vec![force_free_sphere(); config.num_spheres],
        dumbbell_inputs: vec![force_free_dumbbell(); config.num_dumbbells],
    }
}

pub fn initialize_particles(config: &ParticleInitializationConfig) -> InitialParticles {
    match config {
        ParticleInitializationConfig::RandomUniformByNumber(number_config) => {
            random_uniform_particles(number_config)
        }
        ParticleInitializationConfig::Explicit(ExplicitParticleConfig { spheres, dumbbells }) => {
            InitialParticles {
                spheres: spheres
                    .iter()
                    .map(|s| Sphere::new(s.position, s.radius))
                    .collect(),
                dumbbells: dumbbells
                    .iter()
                    .map(|d| Dumbbell::new(d.position, d.delta_x, d.bead_radius))
                    .collect(),
                sphere_inputs: spheres.iter().map(SphereConfig::prescribed).collect(),
                dumbbell_inputs: dumbbells.iter().map(DumbbellConfig::prescribed).collect(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn number_config(seed: u64) -> ParticleNumberConfig {
        ParticleNumberConfig {
            num_spheres: 4,
            sphere_radius: 1.0,
            num_dumbbells: 3,
            bead_radius: 0.1,
            dumbbell_length: 2.0,
            l: Vector3::new(10.0, 20.0, 30.0),
            seed,
        }
    }

    #[test]
    fn test_random_particles_are_reproducible() {
        let config = ParticleInitializationConfig::RandomUniformByNumber(number_config(7));
        let a = initialize_particles(&config);
        let b = initialize_particles(&config);
        assert_eq!(a.spheres, b.spheres);
        assert_eq!(a.dumbbells, b.dumbbells);
        assert_eq!(a.sphere_inputs.len(), 4);
        for d in &a.dumbbells {
            assert_relative_eq!(d.length(), 2.0, epsilon = 1e-12);
            assert!(d.position.x.abs() <= 5.0 && d.position.z.abs() <= 15.0);
        }
    }

    #[test]
    fn test_parse_explicit_particles() {
        let yaml = "
type: Explicit
spheres:
  - position: [0.0, 0.0, 0.0]
    radius: 1.0
    velocity: [1.0, 0.0, 0.0]
    torque: [0.0, 0.0, 0.0]
dumbbells:
  - position: [3.0, 0.0, 0.0]
    delta_x: [0.0, 0.0, 1.0]
    bead_radius: 0.1
    force: [0.0, 0.0, -1.0]
    force_difference: [0.0, 0.0, 0.0]
";
        let config: ParticleInitializationConfig = serde_yaml::from_str(yaml).unwrap();
        let particles = initialize_particles(&config);
        assert_eq!(particles.spheres.len(), 1);
        assert_eq!(particles.sphere_inputs[0].velocity, Some(Vector3::x()));
        assert_eq!(particles.sphere_inputs[0].force, None);
        assert_eq!(
            particles.dumbbell_inputs[0].force,
            Some(Vector3::new(0.0, 0.0, -1.0))
        );
        assert_eq!(particles.dumbbell_inputs[0].velocity, None);
    }
}
