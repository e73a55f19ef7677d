use std::f64::consts::PI;

use tracing::{debug, info, instrument};

use super::config::Parameters;
use super::error::P3mError;
use super::progress::{Progress, ProgressReporter};
use crate::core::utils::spectral::{is_half_mesh_multiple, shifted_frequency, sinc};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Optimal influence function of the analytically differentiated scheme.
///
/// Stored with the same flat layout as [`Mesh`](crate::core::models::mesh::Mesh),
/// so the convolution is an element-wise product.
#[derive(Debug, Clone, PartialEq)]
pub struct InfluenceFunction {
    mesh: usize,
    values: Vec<f64>,
}

/// Per-axis aliasing terms for one frequency component: `sinc^(2·cao)` and
/// `(nm / L)²` for every image `m ∈ [-B, B]`.
struct AxisTerms {
    sinc_power: Vec<f64>,
    nm_squared: Vec<f64>,
}

impl InfluenceFunction {
    /// Builds the influence function for `params`.
    ///
    /// Frequencies at the origin and at every point whose components are all
    /// multiples of half the mesh are zero. With `alpha == 0` the whole
    /// function is zero.
    ///
    /// # Errors
    ///
    /// Returns [`P3mError::DegenerateInfluence`] for the first frequency whose
    /// value is not finite (e.g. vanishing denominators).
    #[instrument(skip_all, name = "influence_function")]
    pub fn build(params: &Parameters, reporter: &ProgressReporter) -> Result<Self, P3mError> {
        params.validate()?;
        let m = params.mesh;
        let mut values = vec![0.0; m * m * m];

        if params.alpha == 0.0 {
            info!("Splitting parameter is zero; reciprocal-space contribution disabled.");
            return Ok(Self { mesh: m, values });
        }

        let axis: Vec<AxisTerms> = (0..m).map(|n| axis_terms(n, params)).collect();
        let build_plane = |(nx, plane): (usize, &mut [f64])| -> Result<(), P3mError> {
            fill_plane(nx, plane, &axis, params)?;
            reporter.report(Progress::TaskIncrement);
            Ok(())
        };

        #[cfg(feature = "parallel")]
        let parallel = params.execution.is_parallel();
        #[cfg(not(feature = "parallel"))]
        let parallel = false;

        reporter.phase("Influence Function", || {
            reporter.report(Progress::TaskStart {
                total_steps: m as u64,
            });
            let result = if parallel {
                #[cfg(feature = "parallel")]
                let planes = values.par_chunks_mut(m * m).enumerate().try_for_each(build_plane);
                #[cfg(not(feature = "parallel"))]
                let planes = Ok(());
                planes
            } else {
                values.chunks_mut(m * m).enumerate().try_for_each(build_plane)
            };
            reporter.report(Progress::TaskFinish);
            result
        })?;

        debug!(
            mesh = m,
            cao = params.cao,
            alpha = params.alpha,
            "Influence function built."
        );
        Ok(Self { mesh: m, values })
    }

    pub fn size(&self) -> usize {
        self.mesh
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn get(&self, nx: usize, ny: usize, nz: usize) -> f64 {
        self.values[(nx * self.mesh + ny) * self.mesh + nz]
    }

    /// True when every entry is zero, as for `alpha == 0`.
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&g| g == 0.0)
    }
}

fn axis_terms(n: usize, params: &Parameters) -> AxisTerms {
    let m = params.mesh as f64;
    let shifted = shifted_frequency(n, params.mesh) as f64;
    let b = params.brillouin as isize;
    let exponent = 2 * params.cao as i32;

    let (sinc_power, nm_squared) = (-b..=b)
        .map(|image| {
            let nm = shifted + m * image as f64;
            let scaled = nm / params.box_length;
            (sinc(nm / m).powi(exponent), scaled * scaled)
        })
        .unzip();

    AxisTerms {
        sinc_power,
        nm_squared,
    }
}

fn fill_plane(
    nx: usize,
    plane: &mut [f64],
    axis: &[AxisTerms],
    params: &Parameters,
) -> Result<(), P3mError> {
    let m = params.mesh;
    let exp_factor = (PI / params.alpha).powi(2);
    let (x, half_x) = (&axis[nx], is_half_mesh_multiple(nx, m));

    for ny in 0..m {
        let (y, half_y) = (&axis[ny], is_half_mesh_multiple(ny, m));
        for nz in 0..m {
            let idx = ny * m + nz;
            if half_x && half_y && is_half_mesh_multiple(nz, m) {
                plane[idx] = 0.0;
                continue;
            }
            let z = &axis[nz];

            let (mut numerator, mut denom1, mut denom2) = (0.0, 0.0, 0.0);
            for (sx, nmx) in x.sinc_power.iter().zip(&x.nm_squared) {
                for (sy, nmy) in y.sinc_power.iter().zip(&y.nm_squared) {
                    let sxy = sx * sy;
                    for (sz, nmz) in z.sinc_power.iter().zip(&z.nm_squared) {
                        let u = sxy * sz;
                        let nm2 = nmx + nmy + nmz;
                        numerator += u * (-exp_factor * nm2).exp();
                        denom1 += u;
                        denom2 += u * nm2;
                    }
                }
            }

            let value = numerator / (PI * denom1 * denom2);
            if !value.is_finite() {
                return Err(P3mError::DegenerateInfluence { nx, ny, nz, value });
            }
            plane[idx] = value;
        }
    }
    Ok(())
}
