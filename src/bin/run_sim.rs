use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use stokesdyn::{
    config::{
        run::RunParams,
        setup::{self, SetupConfig},
    },
    dynamics::{run, solve::Collaborators},
    numerics::{drag::DragResistance, reorder::PivotReordering},
    output::CheckpointWriter,
};

#[derive(Debug, clap::Parser)]
#[command(name = "stokesdyn_run", about = "Run a Stokesian dynamics simulation")]
pub struct RunCli {
    #[arg(short = 'c', long = "config")]
    pub config: String,

    #[arg(short = 'o', long = "output", default_value = "checkpoints.csv")]
    pub output: String,

    #[arg(short = 'd', long = "dstep-view", default_value_t = 1)]
    pub dstep_view: usize,

    // Checkpoint interval in simulation time, takes precedence over --dstep-view.
    #[arg(long = "dt-view")]
    pub dt_view: Option<f64>,

    // Overrides the setup file's frame count.
    #[arg(short = 'n', long = "num-frames")]
    pub num_frames: Option<usize>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = RunCli::parse();

    let setup_config = match SetupConfig::parse(&args.config) {
        Ok(setup_config) => setup_config,
        Err(e) => {
            error!("Could not read setup {}: {}", args.config, e);
            return ExitCode::FAILURE;
        }
    };
    setup_config.print();

    let (mut sim_state, supplier) = setup::initialize_run(&setup_config);
    let sim_params = setup_config.parameters;

    let mut writer = match CheckpointWriter::from_path(&args.output) {
        Ok(writer) => writer,
        Err(e) => {
            error!("Could not open output {}: {}", args.output, e);
            return ExitCode::FAILURE;
        }
    };

    let run_params = RunParams {
        num_frames: args.num_frames.unwrap_or(sim_params.num_frames),
        dstep_view: args
            .dt_view
            .map_or(args.dstep_view, |dt_view| sim_params.to_steps(dt_view)),
        start_frame: sim_state.step,
    };
    let collaborators = Collaborators {
        generator: &DragResistance,
        supplier: &supplier,
        reordering: &PivotReordering,
    };

    let result = writer.write_checkpoint(&sim_state).and_then(|_| {
        run(
            &sim_params,
            &mut sim_state,
            &collaborators,
            &run_params,
            |state, _summary| writer.write_checkpoint(state),
        )
    });
    // Keep what was written up to a failure.
    let flushed = writer.flush();

    match result.and(flushed) {
        Ok(()) => {
            info!("Done!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Simulation stopped at step {}, t = {}: {}", sim_state.step, sim_state.t, e);
            ExitCode::FAILURE
        }
    }
}
