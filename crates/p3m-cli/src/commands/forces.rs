use crate::cli::ForcesArgs;
use crate::commands::generate_system;
use crate::config::PartialRunConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use p3m::core::models::forces::ForceAccumulator;
use p3m::engine::progress::ProgressReporter;
use p3m::engine::tuning::reciprocal_space_error;
use p3m::workflows::forces::P3mAd;
use std::time::Instant;
use tracing::info;

pub fn run(args: ForcesArgs, quiet: bool) -> Result<()> {
    let partial = PartialRunConfig::load(args.system.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let run = partial.merge_forces(&args)?;
    info!(
        mesh = run.params.mesh,
        cao = run.params.cao,
        alpha = run.params.alpha,
        box_length = run.params.box_length,
        interlaced = run.params.interlaced,
        "Method parameters resolved."
    );

    let system = generate_system(&run.system, run.params.box_length);

    let progress_handler = CliProgressHandler::new(!quiet);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let setup_start = Instant::now();
    let mut p3m = P3mAd::new(run.params, &system, &reporter)?;
    let setup_time = setup_start.elapsed();

    let mut forces = ForceAccumulator::new(system.len());
    let step_start = Instant::now();
    p3m.compute_forces(&system, &mut forces)?;
    let step_time = step_start.elapsed();
    info!(
        setup_ms = setup_time.as_secs_f64() * 1e3,
        step_ms = step_time.as_secs_f64() * 1e3,
        "Force evaluation finished."
    );

    let estimate = reciprocal_space_error(&system, p3m.parameters());

    println!(
        "{:>6} {:>8} {:>14} {:>14} {:>14}",
        "index", "charge", "fx", "fy", "fz"
    );
    for (i, (particle, force)) in system
        .iter()
        .zip(forces.iter())
        .take(args.show)
        .enumerate()
    {
        println!(
            "{:>6} {:>8.3} {:>14.6e} {:>14.6e} {:>14.6e}",
            i, particle.charge, force.x, force.y, force.z
        );
    }
    if system.len() > args.show {
        println!("   ... ({} more)", system.len() - args.show);
    }

    let net = forces.net_force();
    println!();
    println!("Particles:               {}", system.len());
    println!("Mesh spacing:            {:.6}", p3m.parameters().spacing());
    println!("Setup time:              {:.3} ms", setup_time.as_secs_f64() * 1e3);
    println!("Force evaluation time:   {:.3} ms", step_time.as_secs_f64() * 1e3);
    println!("RMS force:               {:.6e}", forces.rms());
    println!(
        "Net force:               ({:.3e}, {:.3e}, {:.3e})",
        net.x, net.y, net.z
    );
    println!("Estimated RMS error:     {:.6e}", estimate);

    Ok(())
}
