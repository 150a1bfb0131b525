pub mod assemble;
pub mod background;
pub mod boundary;
pub mod integrate;
pub mod rotation;
pub mod solve;

use std::time::Instant;

use log::{error, info};
use nalgebra::{Matrix3, Vector3};
use time::OffsetDateTime;

use crate::config::run::{RunContext, RunParams};
use crate::config::setup::parameters::simulation::SimParams;
use crate::diagnostics::eta::format_elapsed_time;
use crate::diagnostics::explosion::check_dumbbells_for_explosion;
use crate::diagnostics::proximity::report_particle_proximity;
use crate::diagnostics::size_ratio::check_size_ratios;
use crate::dynamics::background::{add_background_flow_dumbbells, add_background_flow_spheres};
use crate::dynamics::boundary::ShearedBox;
use crate::dynamics::rotation::advance_rotations;
use crate::dynamics::solve::{solve_frame, Collaborators, FrameContext};
use crate::error::StokesResult;
use crate::state::*;

/// Lab-frame velocities for the frame: the solved disturbance plus the
/// background flow. Spheres the mode holds in place don't move.
fn lab_velocities(sim_state: &SimState, summary: &StepSummary) -> FrameVelocities {
    let ambient = &summary.ambient;
    let or_zero = |v: Option<Vector3<f64>>| v.unwrap_or_else(Vector3::zeros);

    let sphere_positions: Vec<_> = sim_state.spheres.iter().map(|s| s.position).collect();
    let strain_rates: Vec<Matrix3<f64>> = summary
        .sphere_summaries
        .iter()
        .map(|s| s.strain_rate.unwrap_or(ambient.e_infinity))
        .collect();
    let (mut sphere_velocities, mut sphere_angular_velocities) = add_background_flow_spheres(
        &summary.sphere_summaries.iter().map(|s| or_zero(s.velocity)).collect::<Vec<_>>(),
        &summary
            .sphere_summaries
            .iter()
            .map(|s| or_zero(s.angular_velocity))
            .collect::<Vec<_>>(),
        &strain_rates,
        ambient,
        &sphere_positions,
    );
    for (i, s) in summary.sphere_summaries.iter().enumerate() {
        if s.velocity.is_none() {
            sphere_velocities[i] = Vector3::zeros();
            sphere_angular_velocities[i] = Vector3::zeros();
        }
    }

    let (dumbbell_velocities, dumbbell_half_velocity_differences) = add_background_flow_dumbbells(
        &summary.dumbbell_summaries.iter().map(|d| or_zero(d.velocity)).collect::<Vec<_>>(),
        &summary
            .dumbbell_summaries
            .iter()
            .map(|d| or_zero(d.half_velocity_difference))
            .collect::<Vec<_>>(),
        ambient,
        &sim_state.dumbbells.iter().map(|d| d.position).collect::<Vec<_>>(),
        &sim_state.dumbbells.iter().map(|d| d.delta_x).collect::<Vec<_>>(),
    );

    FrameVelocities {
        sphere_velocities,
        sphere_angular_velocities,
        dumbbell_velocities,
        dumbbell_half_velocity_differences,
    }
}

fn doubled(vs: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
    vs.iter().map(|v| v * 2.0).collect()
}

/// Advances the simulation by one frame.
///
/// On error `sim_state` and `run_context` are left as they were at the start
/// of the frame.
pub fn update(
    sim_params: &SimParams,
    sim_state: &mut SimState,
    run_context: &mut RunContext,
    collaborators: &Collaborators<'_>,
) -> StokesResult<StepSummary> {
    let frame_start = Instant::now();
    let dt = sim_params.dt;
    let solution = solve_frame(
        sim_state,
        &run_context.far_field_cache,
        &FrameContext {
            frame: sim_state.step,
            dt,
            input_form: sim_params.input_form,
            invert_m_every: sim_params.invert_m_every,
            extract_force_on_wall_due_to_dumbbells: sim_params
                .extract_force_on_wall_due_to_dumbbells,
            printout: sim_params.printout,
            previous_velocities: run_context.previous_velocities.as_ref(),
        },
        collaborators,
    )?;
    let mut summary = solution.summary;
    let velocities = lab_velocities(sim_state, &summary);

    // Euler until there is a previous frame to step from.
    let scheme = sim_params.timestepping;
    let previous = run_context.previous_velocities.as_ref();

    let sphere_positions: Vec<_> = sim_state.spheres.iter().map(|s| s.position).collect();
    let new_sphere_positions = scheme.step_all(
        &sphere_positions,
        &velocities.sphere_velocities,
        previous.map(|p| p.sphere_velocities.as_slice()),
        dt,
    );
    let new_markers = advance_rotations(
        scheme,
        &sim_state.spheres,
        &new_sphere_positions,
        &velocities.sphere_angular_velocities,
        previous.map(|p| p.sphere_angular_velocities.as_slice()),
        dt,
    );

    let dumbbell_positions: Vec<_> = sim_state.dumbbells.iter().map(|d| d.position).collect();
    let new_dumbbell_positions = scheme.step_all(
        &dumbbell_positions,
        &velocities.dumbbell_velocities,
        previous.map(|p| p.dumbbell_velocities.as_slice()),
        dt,
    );
    // The beads sit at ±Δx/2, so Δx moves at twice the half difference.
    let delta_xs: Vec<_> = sim_state.dumbbells.iter().map(|d| d.delta_x).collect();
    let previous_delta_x_rates = previous.map(|p| doubled(&p.dumbbell_half_velocity_differences));
    let new_delta_xs = scheme.step_all(
        &delta_xs,
        &doubled(&velocities.dumbbell_half_velocity_differences),
        previous_delta_x_rates.as_deref(),
        dt,
    );

    check_dumbbells_for_explosion(&delta_xs, &new_delta_xs, sim_params.explosion_protection)?;

    let sheared_box = match &solution.periodic_box {
        Some(periodic_box) => Some(ShearedBox::new(
            periodic_box,
            &summary.ambient.ot_infinity,
            &summary.ambient.et_infinity,
        )?),
        None => None,
    };

    for ((sphere, r), markers) in sim_state
        .spheres
        .iter_mut()
        .zip(new_sphere_positions)
        .zip(new_markers)
    {
        sphere.position = r;
        sphere.rotation_markers = markers;
        if let Some(b) = &sheared_box {
            sphere.translate(b.wrap(r) - r);
        }
    }
    for ((dumbbell, r), dx) in sim_state
        .dumbbells
        .iter_mut()
        .zip(new_dumbbell_positions)
        .zip(new_delta_xs)
    {
        dumbbell.position = match &sheared_box {
            Some(b) => b.wrap(r),
            None => r,
        };
        dumbbell.delta_x = dx;
    }

    sim_state.t += dt;
    sim_state.step += 1;

    report_particle_proximity(sim_state, sim_params.printout);

    run_context.far_field_cache = solution.cache;
    run_context.previous_velocities = Some(velocities.clone());
    run_context.clock.record(frame_start.elapsed().as_secs_f64());

    summary.velocities = Some(velocities);
    Ok(summary)
}

/// Runs frames until `run_params.num_frames`, calling `checkpoint` every
/// `dstep_view` frames and after the last one. Stops at the first fatal
/// error, leaving `sim_state` at the last good frame.
pub fn run<F>(
    sim_params: &SimParams,
    sim_state: &mut SimState,
    collaborators: &Collaborators<'_>,
    run_params: &RunParams,
    mut checkpoint: F,
) -> StokesResult<()>
where
    F: FnMut(&SimState, &StepSummary) -> StokesResult<()>,
{
    if let Some(size_ratios) = &sim_params.size_ratios {
        check_size_ratios(sim_state, size_ratios)?;
    }

    let dstep_view = run_params.dstep_view.max(1);
    let mut run_context = RunContext::new(run_params.start_frame);

    while sim_state.step < run_params.num_frames {
        let frame = sim_state.step;
        let summary = match update(sim_params, sim_state, &mut run_context, collaborators) {
            Ok(summary) => summary,
            Err(e) => {
                error!("Stopping at frame {}: {}", frame, e);
                return Err(e);
            }
        };

        if frame % dstep_view == 0 || sim_state.step == run_params.num_frames {
            let time_left = run_context.clock.time_left(
                frame,
                run_params.num_frames,
                sim_params.invert_m_every,
                sim_params.discount_warmup_frame,
            );
            let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
            info!(
                "CHECKPOINT: step={}/{}, t = {:.6}, elapsed {}, left {}, finish {}",
                sim_state.step,
                run_params.num_frames,
                sim_state.t,
                format_elapsed_time(run_context.clock.elapsed()),
                time_left.format_time_left(),
                time_left.format_finish_time(now),
            );
            checkpoint(sim_state, &summary)?;
        }
    }
    Ok(())
}
