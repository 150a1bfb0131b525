use nalgebra::Vector3;

use crate::{
    error::StokesResult,
    numerics::interface::{
        AmbientFlow, BoundaryConditionSupplier, DumbbellInputs, InputBundle, SphereInputs,
        SupplyRequest,
    },
    state::Dumbbell,
};

use super::parameters::{
    common::{AmbientFlowConfig, PeriodicBox, SpringConfig},
    simulation::SimParams,
};

/// Bead 1 minus bead 2 force from a Hookean spring of natural length `L0`:
/// `DF = -2k(|Δx| - L0) Δx̂`.
pub fn spring_force_difference(spring: &SpringConfig, dumbbell: &Dumbbell) -> Vector3<f64> {
    let length = dumbbell.length();
    match dumbbell.delta_x.try_normalize(0.0) {
        Some(direction) => {
            direction.scale(-2.0 * spring.spring_constant * (length - spring.natural_length))
        }
        None => Vector3::zeros(),
    }
}

/// Supplies the same prescriptions every frame. Sphere strain rates that
/// aren't given follow the ambient strain; a configured spring adds to each
/// dumbbell's force difference.
#[derive(Debug, Clone)]
pub struct ConstantInputs {
    sphere_inputs: Vec<SphereInputs>,
    dumbbell_inputs: Vec<DumbbellInputs>,
    ambient_flow: AmbientFlowConfig,
    periodic_box: Option<PeriodicBox>,
    spring: Option<SpringConfig>,
    viscosity: f64,
}

impl ConstantInputs {
    pub fn new(
        sim_params: &SimParams,
        sphere_inputs: Vec<SphereInputs>,
        dumbbell_inputs: Vec<DumbbellInputs>,
    ) -> Self {
        ConstantInputs {
            sphere_inputs,
            dumbbell_inputs,
            ambient_flow: sim_params.ambient_flow.clone(),
            periodic_box: sim_params.periodic_box.clone(),
            spring: sim_params.spring.clone(),
            viscosity: sim_params.viscosity,
        }
    }
}

impl BoundaryConditionSupplier for ConstantInputs {
    fn supply(&self, request: &SupplyRequest<'_>) -> StokesResult<InputBundle> {
        let ambient = AmbientFlow::at_time(&self.ambient_flow, request.state.t);

        let spheres = self
            .sphere_inputs
            .iter()
            .map(|s| SphereInputs {
                strain_rate: s.strain_rate.or(Some(ambient.e_infinity)),
                ..s.clone()
            })
            .collect();

        let dumbbells = self
            .dumbbell_inputs
            .iter()
            .zip(request.state.dumbbells.iter())
            .map(|(d, dumbbell)| match (&self.spring, request.skip_computation) {
                (Some(spring), false) => DumbbellInputs {
                    force_difference: Some(
                        d.force_difference.unwrap_or_else(Vector3::zeros)
                            + spring_force_difference(spring, dumbbell),
                    ),
                    ..d.clone()
                },
                _ => d.clone(),
            })
            .collect();

        Ok(InputBundle {
            spheres,
            dumbbells,
            ambient,
            periodic_box: self.periodic_box.clone(),
            viscosity: self.viscosity,
            description: format!(
                "{} spheres, {} dumbbells, {} mode",
                self.sphere_inputs.len(),
                self.dumbbell_inputs.len(),
                request.input_form
            ),
        })
    }
}
