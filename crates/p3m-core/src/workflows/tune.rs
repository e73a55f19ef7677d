use itertools::iproduct;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::core::models::system::ParticleSystem;
use crate::engine::collaborators::RealSpaceErrorEstimator;
use crate::engine::config::Parameters;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tuning::{ErrorEstimate, estimate_error};

/// One `(mesh, cao, alpha)` triple to evaluate on top of a base parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Candidate {
    pub mesh: usize,
    pub cao: usize,
    pub alpha: f64,
}

impl Candidate {
    pub fn new(mesh: usize, cao: usize, alpha: f64) -> Self {
        Self { mesh, cao, alpha }
    }

    /// Cartesian product of the given meshes, orders and splitting parameters.
    pub fn grid(meshes: &[usize], caos: &[usize], alphas: &[f64]) -> Vec<Self> {
        iproduct!(meshes, caos, alphas)
            .map(|(&mesh, &cao, &alpha)| Self::new(mesh, cao, alpha))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateReport {
    pub params: Parameters,
    pub estimate: ErrorEstimate,
}

/// Estimates the RMS force error of every valid candidate and returns them
/// ordered from most to least accurate.
///
/// Candidates that do not form valid parameters together with `base` (for
/// example `cao > mesh`) are skipped with a warning.
#[instrument(skip_all, name = "tune_workflow")]
pub fn evaluate_candidates<R: RealSpaceErrorEstimator + ?Sized>(
    system: &ParticleSystem,
    base: &Parameters,
    candidates: &[Candidate],
    real_space: &R,
    reporter: &ProgressReporter,
) -> Vec<CandidateReport> {
    info!(candidates = candidates.len(), "Evaluating tuning candidates.");
    let reports = reporter.phase("Parameter Tuning", || {
        reporter.report(Progress::TaskStart {
            total_steps: candidates.len() as u64,
        });

        let mut reports = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match base.with_candidate(candidate.mesh, candidate.cao, candidate.alpha) {
                Ok(params) => {
                    let estimate = estimate_error(system, &params, real_space);
                    reports.push(CandidateReport { params, estimate });
                }
                Err(e) => warn!(?candidate, "Skipping candidate: {}", e),
            }
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);

        reports.sort_by(|a, b| a.estimate.total.total_cmp(&b.estimate.total));
        reports
    });

    if let Some(best) = reports.first() {
        info!(
            mesh = best.params.mesh,
            cao = best.params.cao,
            alpha = best.params.alpha,
            error = best.estimate.total,
            "Best candidate found."
        );
    }
    reports
}
