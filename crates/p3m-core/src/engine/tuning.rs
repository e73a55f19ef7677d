//! Analytic RMS force error estimates used to choose method parameters.
//!
//! Nothing here touches per-step state: the estimates depend on the
//! parameters and on two moments of the particle system only (`N` and Σq²).

use std::f64::consts::PI;

use serde::Deserialize;
use tracing::{debug, instrument};

use super::collaborators::RealSpaceErrorEstimator;
use super::config::Parameters;
use super::error::P3mError;
use super::influence::InfluenceFunction;
use crate::core::models::system::ParticleSystem;
use crate::core::utils::spectral::{sinc, unshifted_frequency};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Aliasing sums of one mesh frequency, over images `m ∈ [-B, B]³`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AliasingSums {
    /// `Σ exp(-2(π/αL)²|nm|²) / |nm|²`
    pub alias1: f64,
    /// `Σ U² · exp(-(π/αL)²|nm|²)`
    pub alias2: f64,
    /// `Σ U² · |nm|²`
    pub alias3: f64,
    /// `Σ U²`
    pub alias4: f64,
}

/// Reciprocal and real-space parts of the estimated RMS force error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorEstimate {
    pub real_space: f64,
    pub reciprocal: f64,
    pub total: f64,
}

/// Signed frequencies visited by the estimators, `[-M/2, M/2)` for even
/// meshes and `[-(M-1)/2, (M-1)/2]` for odd ones.
fn centered_frequencies(mesh: usize) -> std::ops::Range<isize> {
    let lo = -((mesh / 2) as isize);
    lo..lo + mesh as isize
}

/// Aliasing sums for frequency `n` using the tuning radius `brillouin_tuning`.
pub fn aliasing_sums(n: [isize; 3], params: &Parameters) -> AliasingSums {
    let mesh = params.mesh as isize;
    let m = params.mesh as f64;
    let b = params.brillouin_tuning as isize;
    let exp_factor = (PI / (params.alpha * params.box_length)).powi(2);
    let exponent = 2 * params.cao as i32;

    let mut sums = AliasingSums::default();
    for mx in -b..=b {
        let nmx = n[0] + mx * mesh;
        let sx = sinc(nmx as f64 / m);
        for my in -b..=b {
            let nmy = n[1] + my * mesh;
            let sxy = sx * sinc(nmy as f64 / m);
            for mz in -b..=b {
                let nmz = n[2] + mz * mesh;
                let nm2 = (nmx * nmx + nmy * nmy + nmz * nmz) as f64;
                let ex = (-exp_factor * nm2).exp();
                let u2 = (sxy * sinc(nmz as f64 / m)).powi(exponent);

                sums.alias1 += ex * ex / nm2;
                sums.alias2 += u2 * ex;
                sums.alias3 += u2 * nm2;
                sums.alias4 += u2;
            }
        }
    }
    sums
}

fn plane_error_sum(nx: isize, params: &Parameters) -> f64 {
    let mut sum = 0.0;
    for ny in centered_frequencies(params.mesh) {
        for nz in centered_frequencies(params.mesh) {
            if nx == 0 && ny == 0 && nz == 0 {
                continue;
            }
            let s = aliasing_sums([nx, ny, nz], params);
            if s.alias3 == 0.0 || s.alias4 == 0.0 {
                continue;
            }
            sum += s.alias1 - s.alias2 * s.alias2 / (s.alias3 * s.alias4);
        }
    }
    sum
}

/// Estimated RMS error of the reciprocal-space forces for the ad scheme.
///
/// Returns zero for an empty system or `alpha == 0`.
#[instrument(skip_all, name = "reciprocal_space_error")]
pub fn reciprocal_space_error(system: &ParticleSystem, params: &Parameters) -> f64 {
    if system.is_empty() || params.alpha == 0.0 {
        return 0.0;
    }

    #[cfg(feature = "parallel")]
    let parallel = params.execution.is_parallel();
    #[cfg(not(feature = "parallel"))]
    let parallel = false;

    let q: f64 = if parallel {
        #[cfg(feature = "parallel")]
        let sum: f64 = centered_frequencies(params.mesh)
            .into_par_iter()
            .map(|nx| plane_error_sum(nx, params))
            .sum();
        #[cfg(not(feature = "parallel"))]
        let sum = 0.0;
        sum
    } else {
        centered_frequencies(params.mesh)
            .map(|nx| plane_error_sum(nx, params))
            .sum()
    };

    let q = if q < 0.0 {
        debug!(
            q,
            mesh = params.mesh,
            cao = params.cao,
            "Negative error functional from round-off; using its magnitude."
        );
        q.abs()
    } else {
        q
    };

    2.0 * system.sum_q2() * (q / system.len() as f64).sqrt() / params.box_length.powi(2)
}

/// Combines independent real-space and reciprocal-space RMS errors.
pub fn total_error(real_space: f64, reciprocal: f64) -> f64 {
    real_space.hypot(reciprocal)
}

pub fn estimate_error<R: RealSpaceErrorEstimator + ?Sized>(
    system: &ParticleSystem,
    params: &Parameters,
    real_space: &R,
) -> ErrorEstimate {
    let real = real_space.real_space_error(system, params);
    let reciprocal = reciprocal_space_error(system, params);
    ErrorEstimate {
        real_space: real,
        reciprocal,
        total: total_error(real, reciprocal),
    }
}

/// Pair correlation assumed by the Hockney–Eastwood functional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChargeModel {
    /// Uncorrelated point charges.
    #[default]
    PointCharge,
    /// Charges bound in dipoles of unit length.
    CorrelatedDipole,
    /// Three-site water with O–H and H–H distances in units of the O–H bond.
    Water,
}

impl ChargeModel {
    /// Structure factor `s(k)` weighting the reference term.
    pub fn structure_factor(self, k: f64) -> f64 {
        match self {
            ChargeModel::PointCharge => 1.0,
            ChargeModel::CorrelatedDipole => k.sin() / k,
            ChargeModel::Water => {
                let k_hh = 1.63 * k;
                -0.67 * k.sin() / k + 0.34 * k_hh.sin() / k_hh
            }
        }
    }
}

/// Hockney–Eastwood pair-error functional `Σ_{n≠0} A·G² - 2·B·G + C` of a
/// built influence function, with aliasing radius `brillouin`.
#[instrument(skip_all, name = "hockney_eastwood")]
pub fn hockney_eastwood(
    params: &Parameters,
    influence: &InfluenceFunction,
    model: ChargeModel,
) -> Result<f64, P3mError> {
    if influence.size() != params.mesh {
        return Err(P3mError::MeshMismatch {
            expected: params.mesh,
            found: influence.size(),
        });
    }

    let mesh = params.mesh as isize;
    let m = params.mesh as f64;
    let b = params.brillouin as isize;
    let k_unit2 = (2.0 * PI / params.box_length).powi(2);
    let alpha2 = params.alpha * params.alpha;
    let cao = params.cao as i32;

    let mut q_he = 0.0;
    for nx in centered_frequencies(params.mesh) {
        for ny in centered_frequencies(params.mesh) {
            for nz in centered_frequencies(params.mesh) {
                if nx == 0 && ny == 0 && nz == 0 {
                    continue;
                }
                let g = influence.get(
                    unshifted_frequency(nx, params.mesh),
                    unshifted_frequency(ny, params.mesh),
                    unshifted_frequency(nz, params.mesh),
                );

                let (mut a, mut bb, mut c) = (0.0, 0.0, 0.0);
                for mx in -b..=b {
                    let nmx = nx + mx * mesh;
                    for my in -b..=b {
                        let nmy = ny + my * mesh;
                        for mz in -b..=b {
                            let nmz = nz + mz * mesh;
                            let u = sinc(nmx as f64 / m) * sinc(nmy as f64 / m) * sinc(nmz as f64 / m);
                            let km2 = k_unit2 * (nmx * nmx + nmy * nmy + nmz * nmz) as f64;

                            a += u.powi(4 * cao) * km2;
                            bb += u.powi(2 * cao) * 4.0 * PI * (-km2 / (4.0 * alpha2)).exp();
                            c += (-2.0 * km2 / (4.0 * alpha2)).exp() / km2
                                * model.structure_factor(km2.sqrt());
                        }
                    }
                }
                c *= 16.0 * PI * PI;
                q_he += a * g * g - 2.0 * bb * g + c;
            }
        }
    }
    Ok(q_he)
}
