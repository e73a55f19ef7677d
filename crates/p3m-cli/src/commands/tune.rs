use crate::cli::TuneArgs;
use crate::commands::generate_system;
use crate::config::PartialRunConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use p3m::engine::collaborators::KolafaPerram;
use p3m::engine::influence::InfluenceFunction;
use p3m::engine::progress::ProgressReporter;
use p3m::engine::tuning::hockney_eastwood;
use p3m::workflows::tune::evaluate_candidates;
use tracing::{info, warn};

pub fn run(args: TuneArgs, quiet: bool) -> Result<()> {
    let partial = PartialRunConfig::load(args.system.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let run = partial.merge_tune(&args)?;

    let system = generate_system(&run.system, run.base.box_length);
    let estimator = KolafaPerram::new(run.r_cut).map_err(|e| CliError::Config(e.to_string()))?;

    let progress_handler = CliProgressHandler::new(!quiet);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Evaluating {} candidate(s) for {} particles (real-space cutoff {})...",
        run.candidates.len(),
        system.len(),
        estimator.r_cut()
    );
    let reports = evaluate_candidates(&system, &run.base, &run.candidates, &estimator, &reporter);

    if reports.is_empty() {
        warn!("No candidate formed a valid parameter set.");
        println!("Warning: none of the candidates formed a valid parameter set.");
        return Ok(());
    }

    print!(
        "{:>4} {:>6} {:>4} {:>10} {:>14} {:>14} {:>14}",
        "rank", "mesh", "cao", "alpha", "real", "reciprocal", "total"
    );
    if run.charge_model.is_some() {
        print!(" {:>14}", "Q_HE");
    }
    println!();

    let silent = ProgressReporter::new();
    for (rank, report) in reports.iter().take(args.top).enumerate() {
        print!(
            "{:>4} {:>6} {:>4} {:>10.4} {:>14.6e} {:>14.6e} {:>14.6e}",
            rank + 1,
            report.params.mesh,
            report.params.cao,
            report.params.alpha,
            report.estimate.real_space,
            report.estimate.reciprocal,
            report.estimate.total
        );
        if let Some(model) = run.charge_model {
            let influence = InfluenceFunction::build(&report.params, &silent)?;
            print!(" {:>14.6e}", hockney_eastwood(&report.params, &influence, model)?);
        }
        println!();
    }

    if let Some(best) = reports.first() {
        println!(
            "\nBest: mesh = {}, cao = {}, alpha = {} (estimated RMS error {:.3e})",
            best.params.mesh, best.params.cao, best.params.alpha, best.estimate.total
        );
    }
    Ok(())
}
