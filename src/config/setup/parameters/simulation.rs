use std::fmt;

use crate::error::ConfigurationError;

use super::common::{AmbientFlowConfig, PeriodicBox, SpringConfig};

/// Which of force or velocity is prescribed for each degree of freedom.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputForm {
    Fts,
    Fte,
    Ufte,
    Ufteu,
    Duf,
    StokesDragDumbbellsOnly,
}

impl InputForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputForm::Fts => "fts",
            InputForm::Fte => "fte",
            InputForm::Ufte => "ufte",
            InputForm::Ufteu => "ufteu",
            InputForm::Duf => "duf",
            InputForm::StokesDragDumbbellsOnly => "stokes_drag_dumbbells_only",
        }
    }
}

impl fmt::Display for InputForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimesteppingScheme {
    Euler,
    #[default]
    Ab2,
}

fn default_invert_m_every() -> usize {
    10
}

fn default_true() -> bool {
    true
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct SimParams {
    // Time step.
    pub dt: f64,
    pub num_frames: usize,
    // Boundary-condition mode.
    pub input_form: InputForm,
    #[serde(default)]
    pub timestepping: TimesteppingScheme,
    // Fluid.
    pub viscosity: f64,
    #[serde(default)]
    pub ambient_flow: AmbientFlowConfig,
    // System. No box means an unbounded fluid.
    #[serde(default)]
    pub periodic_box: Option<PeriodicBox>,
    // Dumbbell elasticity.
    #[serde(default)]
    pub spring: Option<SpringConfig>,
    // Far-field mobility is regenerated on frames divisible by this.
    #[serde(default = "default_invert_m_every")]
    pub invert_m_every: usize,
    #[serde(default = "default_true")]
    pub explosion_protection: bool,
    #[serde(default)]
    pub extract_force_on_wall_due_to_dumbbells: bool,
    #[serde(default)]
    pub printout: bool,
    // Size ratios the near-field lookup has been computed for.
    #[serde(default)]
    pub size_ratios: Option<Vec<f64>>,
    // Ignore the first regeneration frame when averaging ETA timings.
    #[serde(default = "default_true")]
    pub discount_warmup_frame: bool,
}

impl SimParams {
    pub fn to_steps(&self, t: f64) -> usize {
        (t / self.dt).ceil() as usize
    }

    pub fn t_max(&self) -> f64 {
        self.num_frames as f64 * self.dt
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.dt > 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "dt",
                reason: format!("must be positive, got {}", self.dt),
            });
        }
        if !(self.viscosity > 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "viscosity",
                reason: format!("must be positive, got {}", self.viscosity),
            });
        }
        if self.invert_m_every == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "invert_m_every",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_params() {
        let params: SimParams = serde_yaml::from_str(
            "
dt: 0.5
num_frames: 4
input_form: stokes_drag_dumbbells_only
viscosity: 1.0
",
        )
        .unwrap();
        assert_eq!(params.input_form, InputForm::StokesDragDumbbellsOnly);
        assert_eq!(params.timestepping, TimesteppingScheme::Ab2);
        assert_eq!(params.invert_m_every, 10);
        assert!(params.explosion_protection);
        assert!(params.periodic_box.is_none());
        assert_eq!(params.to_steps(1.2), 3);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_regeneration_interval() {
        let mut params: SimParams = serde_yaml::from_str(
            "{dt: 0.1, num_frames: 1, input_form: fte, viscosity: 1.0}",
        )
        .unwrap();
        params.invert_m_every = 0;
        assert!(matches!(
            params.validate(),
            Err(ConfigurationError::InvalidParameter {
                name: "invert_m_every",
                ..
            })
        ));
    }
}
