pub mod inputs;
pub mod parameters;
pub mod particles;

use std::{error::Error, fs::File, io::Read, path::Path};

use log::info;

use crate::state::SimState;

use self::{
    inputs::ConstantInputs,
    parameters::simulation::SimParams,
    particles::{initialize_particles, InitialParticles, ParticleInitializationConfig},
};

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
pub struct SetupConfig {
    pub parameters: SimParams,
    pub particles: ParticleInitializationConfig,
}

impl SetupConfig {
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, Box<dyn Error>> {
        let config: SetupConfig = serde_yaml::from_str(contents)?;
        config.parameters.validate()?;
        Ok(config)
    }

    pub fn print(&self) {
        let p = &self.parameters;
        let periodic = match &p.periodic_box {
            Some(b) if !b.is_degenerate() => format!("{} to {}", b.bottom_left, b.top_right),
            _ => "none".to_string(),
        };
        info!(
            "\
Setup:
  Boundary conditions: {input_form}
  Timestepping: {timestepping:?}, dt = {dt}, {num_frames} frames (t_max = {t_max})
  Viscosity: {viscosity}
  Periodic box: {periodic}
  Far-field mobility regenerated every {invert_m_every} frames
  Explosion protection: {explosion_protection}",
            input_form = p.input_form,
            timestepping = p.timestepping,
            dt = p.dt,
            num_frames = p.num_frames,
            t_max = p.t_max(),
            viscosity = p.viscosity,
            periodic = periodic,
            invert_m_every = p.invert_m_every,
            explosion_protection = p.explosion_protection,
        );
        if let Some(spring) = &p.spring {
            info!(
                "  Dumbbell spring: k = {}, natural length {}",
                spring.spring_constant, spring.natural_length
            );
        }
    }
}

/// Initial state plus the boundary-condition supplier for a run.
pub fn initialize_run(config: &SetupConfig) -> (SimState, ConstantInputs) {
    let InitialParticles {
        spheres,
        dumbbells,
        sphere_inputs,
        dumbbell_inputs,
    } = initialize_particles(&config.particles);
    info!(
        "Initialized {} spheres and {} dumbbells",
        spheres.len(),
        dumbbells.len()
    );
    let supplier = ConstantInputs::new(&config.parameters, sphere_inputs, dumbbell_inputs);
    (SimState::new(spheres, dumbbells), supplier)
}
