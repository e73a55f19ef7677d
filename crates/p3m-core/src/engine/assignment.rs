//! Charge assignment onto the mesh and force gather back onto the particles.
//!
//! Assignment maps every particle onto a `cao³` stencil of mesh points. The
//! stencil of each particle is computed independently (in parallel under
//! [`Execution::Parallel`]) and then scattered serially into the mesh, so
//! overlapping stencils never race. The per-particle stencil data is kept in
//! an [`AssignmentCache`] and reused by the paired gather of the same step.

use nalgebra::Vector3;
use tracing::trace;

use super::config::{Execution, Parameters};
use super::error::P3mError;
use crate::core::interpolation::{InterpolationWeights, MAX_ORDER};
use crate::core::models::forces::ForceAccumulator;
use crate::core::models::mesh::{Mesh, WrapStrategy};
use crate::core::models::system::{Particle, ParticleSystem};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Which of the two interlaced grids an assignment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Image {
    /// Unshifted grid, stored in the real part of the mesh.
    Primary,
    /// Grid shifted by half a mesh spacing, stored in the imaginary part.
    Interlaced,
}

impl Image {
    /// Offset of the particle position in mesh units.
    #[inline]
    pub fn shift(self) -> f64 {
        match self {
            Image::Primary => 0.0,
            Image::Interlaced => 0.5,
        }
    }
}

/// Per-particle stencil data produced by [`spread`] and consumed by [`gather`].
#[derive(Debug, Clone)]
pub struct AssignmentCache {
    image: Image,
    interlaced: bool,
    cao: usize,
    mesh: usize,
    wrap: WrapStrategy,
    execution: Execution,
    base: Vec<[usize; 3]>,
    weights: Vec<f64>,
    derivatives: Option<Vec<Vector3<f64>>>,
}

impl AssignmentCache {
    pub fn image(&self) -> Image {
        self.image
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn stencil_size(&self) -> usize {
        self.cao * self.cao * self.cao
    }

    /// Lowest mesh index of the stencil of particle `i` per dimension.
    pub fn base(&self, i: usize) -> [usize; 3] {
        self.base[i]
    }

    /// Charge-weighted assignment weights of particle `i`, in stencil order.
    pub fn weights(&self, i: usize) -> &[f64] {
        let n = self.stencil_size();
        &self.weights[i * n..(i + 1) * n]
    }

    pub fn derivatives(&self, i: usize) -> Option<&[Vector3<f64>]> {
        let n = self.stencil_size();
        self.derivatives.as_ref().map(|d| &d[i * n..(i + 1) * n])
    }

    pub fn has_derivatives(&self) -> bool {
        self.derivatives.is_some()
    }

    /// Factor applied to every gathered force: both grids of an interlaced
    /// pair contribute one half.
    pub fn image_factor(&self) -> f64 {
        if self.interlaced { 0.5 } else { 1.0 }
    }

    fn stencil_cells(&self, i: usize) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        let [b0, b1, b2] = self.base[i];
        let cao = self.cao as isize;
        let (mesh, wrap) = (self.mesh, self.wrap);
        (0..cao).flat_map(move |i0| {
            (0..cao).flat_map(move |i1| {
                (0..cao).map(move |i2| {
                    (
                        wrap.apply(b0 as isize + i0, mesh),
                        wrap.apply(b1 as isize + i1, mesh),
                        wrap.apply(b2 as isize + i2, mesh),
                    )
                })
            })
        })
    }
}

/// One-dimensional weights of a particle along each axis.
struct AxisWeights {
    base: [usize; 3],
    w: [[f64; MAX_ORDER]; 3],
    dw: [[f64; MAX_ORDER]; 3],
}

struct StencilContext<'a, W: InterpolationWeights + ?Sized> {
    table: &'a W,
    cao: usize,
    mesh: usize,
    wrap: WrapStrategy,
    box_length: f64,
    inv_spacing: f64,
    pos_shift: f64,
    bins: usize,
}

impl<'a, W: InterpolationWeights + ?Sized> StencilContext<'a, W> {
    fn new(params: &Parameters, table: &'a W, image: Image) -> Self {
        Self {
            table,
            cao: params.cao,
            mesh: params.mesh,
            wrap: params.wrap,
            box_length: params.box_length,
            inv_spacing: params.mesh as f64 / params.box_length,
            pos_shift: ((params.cao - 1) / 2) as f64 - image.shift(),
            bins: table.bins(),
        }
    }

    /// Base index and per-axis weights of one particle. Derivative weights
    /// are only looked up when `with_derivatives` is set.
    fn axis_weights(&self, particle: &Particle, with_derivatives: bool) -> AxisWeights {
        let mut out = AxisWeights {
            base: [0; 3],
            w: [[0.0; MAX_ORDER]; 3],
            dw: [[0.0; MAX_ORDER]; 3],
        };
        for dim in 0..3 {
            let x = particle.position[dim].rem_euclid(self.box_length);
            let pos = x * self.inv_spacing - self.pos_shift;
            let nmp = (pos + 0.5).floor();
            let arg = ((pos - nmp + 0.5) * self.bins as f64).floor().max(0.0) as usize;
            let arg = arg.min(self.bins - 1);

            out.base[dim] = self.wrap.apply(nmp as isize, self.mesh);
            for i in 0..self.cao {
                out.w[dim][i] = self.table.weight(i, arg);
                if with_derivatives {
                    out.dw[dim][i] = self.table.derivative_weight(i, arg);
                }
            }
        }
        out
    }

    fn fill(
        &self,
        particle: &Particle,
        base: &mut [usize; 3],
        weights: &mut [f64],
        derivatives: Option<&mut [Vector3<f64>]>,
    ) {
        let axis = self.axis_weights(particle, derivatives.is_some());
        *base = axis.base;
        self.fill_weights(particle.charge, &axis, weights);
        if let Some(derivatives) = derivatives {
            self.fill_derivatives(particle.charge, &axis, derivatives);
        }
    }

    fn fill_weights(&self, charge: f64, axis: &AxisWeights, weights: &mut [f64]) {
        let mut c = 0;
        for i0 in 0..self.cao {
            let t0 = charge * axis.w[0][i0];
            for i1 in 0..self.cao {
                let t1 = t0 * axis.w[1][i1];
                for i2 in 0..self.cao {
                    weights[c] = t1 * axis.w[2][i2];
                    c += 1;
                }
            }
        }
    }

    fn fill_derivatives(&self, charge: f64, axis: &AxisWeights, derivatives: &mut [Vector3<f64>]) {
        let AxisWeights { w, dw, .. } = axis;
        let scale = charge / self.box_length;
        let mut c = 0;
        for i0 in 0..self.cao {
            for i1 in 0..self.cao {
                for i2 in 0..self.cao {
                    derivatives[c] = scale
                        * Vector3::new(
                            dw[0][i0] * w[1][i1] * w[2][i2],
                            w[0][i0] * dw[1][i1] * w[2][i2],
                            w[0][i0] * w[1][i1] * dw[2][i2],
                        );
                    c += 1;
                }
            }
        }
    }
}

fn check_inputs<W: InterpolationWeights + ?Sized>(
    params: &Parameters,
    table: &W,
    mesh: &Mesh,
) -> Result<(), P3mError> {
    if mesh.size() != params.mesh {
        return Err(P3mError::MeshMismatch {
            expected: params.mesh,
            found: mesh.size(),
        });
    }
    if table.order() != params.cao {
        return Err(P3mError::InterpolationMismatch {
            expected: params.cao,
            found: table.order(),
        });
    }
    Ok(())
}

/// Spreads all charges of `system` onto one image of `mesh`.
///
/// The mesh is accumulated into, never cleared; the caller zeroes it once
/// per step before assigning the first image. With `with_derivatives` the
/// returned cache also holds `q/L · ∇W` per stencil point for [`gather`].
pub fn spread<W: InterpolationWeights + ?Sized>(
    system: &ParticleSystem,
    params: &Parameters,
    table: &W,
    mesh: &mut Mesh,
    image: Image,
    with_derivatives: bool,
) -> Result<AssignmentCache, P3mError> {
    check_inputs(params, table, mesh)?;

    let ctx = StencilContext::new(params, table, image);
    let particles = system.particles();
    let n = particles.len();
    let cao3 = params.cao.pow(3);

    let mut base = vec![[0usize; 3]; n];
    let mut weights = vec![0.0; n * cao3];
    let mut derivatives = with_derivatives.then(|| vec![Vector3::zeros(); n * cao3]);

    #[cfg(feature = "parallel")]
    let parallel = params.execution.is_parallel();
    #[cfg(not(feature = "parallel"))]
    let parallel = false;

    if parallel {
        #[cfg(feature = "parallel")]
        {
            let stencils = base.par_iter_mut().zip(weights.par_chunks_mut(cao3));
            match derivatives.as_mut() {
                Some(derivatives) => stencils
                    .zip(derivatives.par_chunks_mut(cao3))
                    .zip(particles.par_iter())
                    .for_each(|(((b, w), d), p)| ctx.fill(p, b, w, Some(d))),
                None => stencils
                    .zip(particles.par_iter())
                    .for_each(|((b, w), p)| ctx.fill(p, b, w, None)),
            }
        }
    } else {
        let stencils = base.iter_mut().zip(weights.chunks_mut(cao3));
        match derivatives.as_mut() {
            Some(derivatives) => stencils
                .zip(derivatives.chunks_mut(cao3))
                .zip(particles.iter())
                .for_each(|(((b, w), d), p)| ctx.fill(p, b, w, Some(d))),
            None => stencils
                .zip(particles.iter())
                .for_each(|((b, w), p)| ctx.fill(p, b, w, None)),
        }
    }

    let cache = AssignmentCache {
        image,
        interlaced: params.interlaced,
        cao: params.cao,
        mesh: params.mesh,
        wrap: params.wrap,
        execution: params.execution,
        base,
        weights,
        derivatives,
    };

    let data = mesh.data_mut();
    for i in 0..n {
        for (&w, (a, b, c)) in cache.weights(i).iter().zip(cache.stencil_cells(i)) {
            let idx = (a * params.mesh + b) * params.mesh + c;
            match image {
                Image::Primary => data[idx].re += w,
                Image::Interlaced => data[idx].im += w,
            }
        }
    }

    trace!(particles = n, image = ?image, "Charges assigned to mesh.");
    Ok(cache)
}

/// Adds `-image_factor · prefactor · Σ φ · q/L·∇W` to every particle's force,
/// where `φ` is the solved mesh of the cache's image.
pub fn gather(
    forces: &mut ForceAccumulator,
    mesh: &Mesh,
    cache: &AssignmentCache,
    prefactor: f64,
) -> Result<(), P3mError> {
    if mesh.size() != cache.mesh {
        return Err(P3mError::MeshMismatch {
            expected: cache.mesh,
            found: mesh.size(),
        });
    }
    if forces.len() != cache.len() {
        return Err(P3mError::CacheMismatch {
            expected: forces.len(),
            found: cache.len(),
        });
    }
    if !cache.has_derivatives() {
        return Err(P3mError::MissingDerivatives);
    }

    let factor = cache.image_factor() * prefactor;
    let data = mesh.data();
    let m = cache.mesh;
    let image = cache.image;

    let particle_force = |i: usize| -> Vector3<f64> {
        let derivatives = cache.derivatives(i).unwrap_or_default();
        let mut sum = Vector3::zeros();
        for (d, (a, b, c)) in derivatives.iter().zip(cache.stencil_cells(i)) {
            let value = data[(a * m + b) * m + c];
            let phi = match image {
                Image::Primary => value.re,
                Image::Interlaced => value.im,
            };
            sum += d * phi;
        }
        -factor * sum
    };

    #[cfg(feature = "parallel")]
    let parallel = cache.execution.is_parallel();
    #[cfg(not(feature = "parallel"))]
    let parallel = false;

    if parallel {
        #[cfg(feature = "parallel")]
        forces
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, f)| *f += particle_force(i));
    } else {
        forces
            .as_mut_slice()
            .iter_mut()
            .enumerate()
            .for_each(|(i, f)| *f += particle_force(i));
    }

    Ok(())
}
