use std::time::Instant;

use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Vector3};

use crate::{
    config::setup::parameters::{common::PeriodicBox, simulation::InputForm},
    error::{ConfigurationError, StokesResult},
    geometry::tensor::expand,
    numerics::{
        interface::{
            BoundaryConditionSupplier, FarFieldCache, InputBundle, MatrixReordering,
            MatrixRequest, PeriodicGeometry, ResistanceMatrixGenerator, SupplyRequest,
        },
        drag::check_element_sizes,
        layout::DofLayout,
    },
    state::{
        DumbbellStepSummary, FrameTimings, FrameVelocities, ParticleLabel, SimState,
        SphereStepSummary, StepSummary, WallForce,
    },
};

use super::assemble::{pack_rhs, reorder_matrix, require, BoundaryMode, LinearSystem};

// Particles shown by the verbose per-frame dump.
const PRINTOUT_LIMIT: usize = 10;

pub struct Collaborators<'a> {
    pub generator: &'a dyn ResistanceMatrixGenerator,
    pub supplier: &'a dyn BoundaryConditionSupplier,
    pub reordering: &'a dyn MatrixReordering,
}

pub struct FrameContext<'a> {
    pub frame: usize,
    pub dt: f64,
    pub input_form: InputForm,
    pub invert_m_every: usize,
    pub extract_force_on_wall_due_to_dumbbells: bool,
    pub printout: bool,
    pub previous_velocities: Option<&'a FrameVelocities>,
}

/// Disturbance quantities for one frame, before the background flow is added.
pub struct FrameSolution {
    pub summary: StepSummary,
    pub cache: FarFieldCache,
    pub periodic_box: Option<PeriodicBox>,
}

fn check_counts(state: &SimState, inputs: &InputBundle) -> Result<(), ConfigurationError> {
    if inputs.spheres.len() != state.spheres.len() {
        return Err(ConfigurationError::ParticleCountMismatch {
            kind: "spheres",
            expected: state.spheres.len(),
            found: inputs.spheres.len(),
        });
    }
    if inputs.dumbbells.len() != state.dumbbells.len() {
        return Err(ConfigurationError::ParticleCountMismatch {
            kind: "dumbbells",
            expected: state.dumbbells.len(),
            found: inputs.dumbbells.len(),
        });
    }
    Ok(())
}

fn supply(
    collaborators: &Collaborators<'_>,
    state: &SimState,
    ctx: &FrameContext<'_>,
    resistance_fte: Option<&DMatrix<f64>>,
    skip_computation: bool,
) -> StokesResult<InputBundle> {
    let inputs = collaborators.supplier.supply(&SupplyRequest {
        input_form: ctx.input_form,
        state,
        frame: ctx.frame,
        dt: ctx.dt,
        previous_velocities: ctx.previous_velocities,
        resistance_fte,
        skip_computation,
    })?;
    check_counts(state, &inputs)?;
    Ok(inputs)
}

/// Solves one frame: assembles the mode's linear system, solves it and
/// reconstructs every per-particle quantity.
///
/// The returned cache replaces `cache` for the next frame.
pub fn solve_frame(
    state: &SimState,
    cache: &FarFieldCache,
    ctx: &FrameContext<'_>,
    collaborators: &Collaborators<'_>,
) -> StokesResult<FrameSolution> {
    // In fte mode the first call only needs to get the geometry right; the
    // full inputs depend on the reordered matrix.
    let skip_computation = ctx.input_form == InputForm::Fte;
    let inputs = supply(collaborators, state, ctx, None, skip_computation)?;

    let mode = match BoundaryMode::resolve(ctx.input_form, &inputs)? {
        Some(mode) => mode,
        None => return stokes_drag_dumbbells_only(state, cache, &inputs, ctx),
    };

    let layout = DofLayout::of(state);
    // Catch missing inputs before the expensive part.
    let early_rhs = if mode.inputs_need_matrix() {
        None
    } else {
        Some(pack_rhs(&mode, &inputs, &layout)?)
    };

    let regenerate = !cache.is_valid(ctx.frame, ctx.invert_m_every, &layout);
    let generation_start = Instant::now();
    let generated = collaborators.generator.generate(
        state,
        cache,
        &MatrixRequest {
            frame: ctx.frame,
            viscosity: inputs.viscosity,
            regenerate,
            periodic: inputs.effective_box().map(|periodic_box| PeriodicGeometry {
                periodic_box,
                ambient: &inputs.ambient,
                dt: ctx.dt,
            }),
        },
    )?;
    let generation = generation_start.elapsed().as_secs_f64();

    let solve_start = Instant::now();
    let matrix = reorder_matrix(
        &mode,
        &generated.layout,
        generated.matrix,
        collaborators.reordering,
    )?;
    let (inputs, rhs) = match early_rhs {
        Some(rhs) => (inputs, rhs),
        None => {
            let inputs = supply(collaborators, state, ctx, Some(&matrix), false)?;
            let rhs = pack_rhs(&mode, &inputs, &layout)?;
            (inputs, rhs)
        }
    };
    let system = LinearSystem {
        mode,
        layout,
        matrix,
        rhs,
    };

    let (solution, force_on_wall_due_to_dumbbells) =
        match (mode, ctx.extract_force_on_wall_due_to_dumbbells) {
            (
                BoundaryMode::Ufte {
                    num_fixed_velocity_spheres,
                },
                true,
            ) => {
                let mobility = system.mobility()?;
                let solution = &mobility * &system.rhs;
                let wall = force_on_wall_due_to_dumbbells(
                    &mobility,
                    &system.rhs,
                    num_fixed_velocity_spheres,
                    &layout,
                );
                (solution, WallForce::Computed(wall))
            }
            (BoundaryMode::Ufteu { .. }, true) => {
                warn!(
                    "Extracting the force on the wall due to dumbbells is not supported in ufteu \
                     mode, use ufte instead"
                );
                (system.solve()?, WallForce::Unsupported)
            }
            (_, true) => (system.solve()?, WallForce::Unsupported),
            (_, false) => (system.solve()?, WallForce::NotRequested),
        };
    let solve = solve_start.elapsed().as_secs_f64();

    let (sphere_summaries, dumbbell_summaries) = unpack(&mode, &inputs, &solution, &layout)?;
    let summary = StepSummary {
        sphere_summaries,
        dumbbell_summaries,
        ambient: inputs.ambient.clone(),
        force_on_wall_due_to_dumbbells,
        timings: FrameTimings {
            far_field: generated.timings.far_field,
            near_field: generated.timings.near_field,
            generation,
            solve,
        },
        velocities: None,
    };
    if ctx.printout {
        debug!("frame {}: {}", ctx.frame, inputs.description);
        log_summary(&summary);
    }

    Ok(FrameSolution {
        summary,
        cache: generated.cache,
        periodic_box: inputs.effective_box().cloned(),
    })
}

/// Force on the fixed-velocity spheres from the dumbbell forces alone: the
/// (fixed-sphere force, dumbbell) sub-block of the mobility applied to the
/// dumbbell part of the excitation vector.
pub fn force_on_wall_due_to_dumbbells(
    mobility: &DMatrix<f64>,
    rhs: &DVector<f64>,
    num_fixed_velocity_spheres: usize,
    layout: &DofLayout,
) -> Vec<Vector3<f64>> {
    let start = layout.dumbbell_start();
    let n = layout.size() - start;
    let block = mobility.view((0, start), (3 * num_fixed_velocity_spheres, n));
    let flat = block * rhs.rows(start, n);
    (0..num_fixed_velocity_spheres)
        .map(|i| flat.fixed_rows::<3>(3 * i).into_owned())
        .collect()
}

fn unpack(
    mode: &BoundaryMode,
    inputs: &InputBundle,
    solution: &DVector<f64>,
    layout: &DofLayout,
) -> Result<(Vec<SphereStepSummary>, Vec<DumbbellStepSummary>), ConfigurationError> {
    let form = mode.form();
    let held = matches!(mode, BoundaryMode::Duf { .. });

    let mut spheres = Vec::with_capacity(inputs.spheres.len());
    for (i, s) in inputs.spheres.iter().enumerate() {
        let label = ParticleLabel::Sphere(i);
        let force_slot = solution.fixed_rows::<3>(layout.sphere_force(i)).into_owned();
        let torque_slot = solution.fixed_rows::<3>(layout.sphere_torque(i)).into_owned();
        let stresslet_slot = expand(
            &solution
                .fixed_rows::<5>(layout.sphere_stresslet(i))
                .into_owned(),
        );

        let (force, velocity) = if i < mode.num_fixed_velocity_spheres() {
            (force_slot, require(s.velocity, form, label, "velocity")?)
        } else {
            (require(s.force, form, label, "force")?, force_slot)
        };
        let (stresslet, strain_rate) = if mode.stresslets_known() {
            (require(s.stresslet, form, label, "stresslet")?, stresslet_slot)
        } else {
            (stresslet_slot, require(s.strain_rate, form, label, "strain rate")?)
        };
        spheres.push(SphereStepSummary {
            force: Some(force),
            torque: Some(require(s.torque, form, label, "torque")?),
            stresslet: Some(stresslet),
            velocity: (!held).then_some(velocity),
            angular_velocity: (!held).then_some(torque_slot),
            strain_rate: Some(strain_rate),
        });
    }

    let mut dumbbells = Vec::with_capacity(inputs.dumbbells.len());
    for (i, d) in inputs.dumbbells.iter().enumerate() {
        let label = ParticleLabel::Dumbbell(i);
        let slot = solution.fixed_rows::<3>(layout.dumbbell_force(i)).into_owned();
        let difference_slot = solution
            .fixed_rows::<3>(layout.dumbbell_force_difference(i))
            .into_owned();
        let summary = if i < mode.num_fixed_velocity_dumbbells() {
            DumbbellStepSummary {
                force: Some(slot),
                force_difference: Some(difference_slot),
                velocity: Some(require(d.velocity, form, label, "velocity")?),
                half_velocity_difference: Some(require(
                    d.half_velocity_difference,
                    form,
                    label,
                    "half velocity difference",
                )?),
            }
        } else {
            DumbbellStepSummary {
                force: Some(require(d.force, form, label, "force")?),
                force_difference: Some(require(
                    d.force_difference,
                    form,
                    label,
                    "force difference",
                )?),
                velocity: Some(slot),
                half_velocity_difference: Some(difference_slot),
            }
        };
        dumbbells.push(summary);
    }

    Ok((spheres, dumbbells))
}

/// Free-draining dumbbells: each bead moves as U = F / (μ a) under its own
/// force, so no linear system is needed.
fn stokes_drag_dumbbells_only(
    state: &SimState,
    cache: &FarFieldCache,
    inputs: &InputBundle,
    ctx: &FrameContext<'_>,
) -> StokesResult<FrameSolution> {
    let form = InputForm::StokesDragDumbbellsOnly;
    if !state.spheres.is_empty() {
        return Err(ConfigurationError::ParticleCountMismatch {
            kind: "spheres",
            expected: 0,
            found: state.spheres.len(),
        }
        .into());
    }
    check_element_sizes(state)?;

    let solve_start = Instant::now();
    let mut dumbbell_summaries = Vec::with_capacity(inputs.dumbbells.len());
    for (i, (d, dumbbell)) in inputs.dumbbells.iter().zip(&state.dumbbells).enumerate() {
        let label = ParticleLabel::Dumbbell(i);
        let f = require(d.force, form, label, "force")?;
        let df = require(d.force_difference, form, label, "force difference")?;
        let drag = inputs.viscosity * dumbbell.bead_radius;
        let u1 = (f + df).scale(0.5) / drag;
        let u2 = (f - df).scale(0.5) / drag;
        dumbbell_summaries.push(DumbbellStepSummary {
            force: Some(f),
            force_difference: Some(df),
            velocity: Some((u1 + u2).scale(0.5)),
            half_velocity_difference: Some((u1 - u2).scale(0.5)),
        });
    }

    let summary = StepSummary {
        sphere_summaries: Vec::new(),
        dumbbell_summaries,
        ambient: inputs.ambient.clone(),
        force_on_wall_due_to_dumbbells: WallForce::NotRequested,
        timings: FrameTimings {
            solve: solve_start.elapsed().as_secs_f64(),
            ..Default::default()
        },
        velocities: None,
    };
    if ctx.printout {
        debug!("frame {}: {}", ctx.frame, inputs.description);
        log_summary(&summary);
    }
    Ok(FrameSolution {
        summary,
        cache: cache.clone(),
        periodic_box: inputs.effective_box().cloned(),
    })
}

fn log_summary(summary: &StepSummary) {
    for (i, s) in summary.sphere_summaries.iter().take(PRINTOUT_LIMIT).enumerate() {
        debug!(
            "sphere {}: F={:?} T={:?} S={:?} U={:?} O={:?} E={:?}",
            i, s.force, s.torque, s.stresslet, s.velocity, s.angular_velocity, s.strain_rate
        );
    }
    for (i, d) in summary.dumbbell_summaries.iter().take(PRINTOUT_LIMIT).enumerate() {
        debug!(
            "dumbbell {}: F={:?} DF={:?} U={:?} HalfDU={:?}",
            i, d.force, d.force_difference, d.velocity, d.half_velocity_difference
        );
    }
    debug!("force on wall due to dumbbells: {:?}", summary.force_on_wall_due_to_dumbbells);
}
