use tracing::{debug, info, instrument};

use crate::core::fft::{FourierTransform3d, RustFft3d};
use crate::core::interpolation::{BSplineTable, InterpolationWeights};
use crate::core::models::forces::ForceAccumulator;
use crate::core::models::mesh::Mesh;
use crate::core::models::system::ParticleSystem;
use crate::engine::assignment::{self, Image};
use crate::engine::collaborators::{NoSelfForceCorrection, SelfForceCorrection};
use crate::engine::config::Parameters;
use crate::engine::error::P3mError;
use crate::engine::influence::InfluenceFunction;
use crate::engine::progress::ProgressReporter;
use crate::engine::solver::ReciprocalSolver;

/// Reciprocal-space force evaluation with analytic differentiation.
///
/// Owns the mesh, the influence function and the collaborators; particle
/// data stays with the caller and is passed in on every step. The influence
/// function is built once at construction and again only through
/// [`P3mAd::rebuild`].
pub struct P3mAd<F = RustFft3d, W = BSplineTable, S = NoSelfForceCorrection>
where
    F: FourierTransform3d,
    W: InterpolationWeights,
    S: SelfForceCorrection,
{
    params: Parameters,
    solver: ReciprocalSolver<F>,
    weights: W,
    self_force: S,
    influence: InfluenceFunction,
    mesh: Mesh,
}

impl P3mAd {
    /// Sets up the method with the shipped `rustfft` transform, B-spline
    /// table and no self-force correction.
    ///
    /// Without a correction the analytic-differentiation self force stays in
    /// the result. It does not vanish on a single grid, so non-interlaced
    /// forces typically exceed [`reciprocal_space_error`] several times over.
    /// Enable `interlaced` to cancel most of it, or pass a
    /// [`SelfForceCorrection`] to [`P3mAd::with_collaborators`].
    ///
    /// [`reciprocal_space_error`]: crate::engine::tuning::reciprocal_space_error
    pub fn new(
        params: Parameters,
        system: &ParticleSystem,
        reporter: &ProgressReporter,
    ) -> Result<Self, P3mError> {
        params.validate()?;
        let fft = RustFft3d::new(params.mesh);
        let weights = BSplineTable::new(params.cao, params.max_interpol)?;
        Self::with_collaborators(params, fft, weights, NoSelfForceCorrection, system, reporter)
    }
}

impl<F, W, S> P3mAd<F, W, S>
where
    F: FourierTransform3d,
    W: InterpolationWeights,
    S: SelfForceCorrection,
{
    #[instrument(skip_all, name = "p3m_setup")]
    pub fn with_collaborators(
        params: Parameters,
        fft: F,
        weights: W,
        self_force: S,
        system: &ParticleSystem,
        reporter: &ProgressReporter,
    ) -> Result<Self, P3mError> {
        check_collaborators(&params, &fft, &weights)?;

        info!(
            mesh = params.mesh,
            cao = params.cao,
            alpha = params.alpha,
            box_length = params.box_length,
            interlaced = params.interlaced,
            "Setting up P3M (ad)."
        );
        let influence = InfluenceFunction::build(&params, reporter)?;
        let mut self_force = self_force;
        self_force.init(system, &params, &influence)?;

        Ok(Self {
            mesh: Mesh::new(params.mesh),
            solver: ReciprocalSolver::new(fft),
            params,
            weights,
            self_force,
            influence,
        })
    }

    /// Replaces the parameters, rebuilding the influence function and
    /// re-initialising the self-force correction. The collaborators are kept,
    /// so mesh size and assignment order must stay compatible with them.
    #[instrument(skip_all, name = "p3m_rebuild")]
    pub fn rebuild(
        &mut self,
        params: Parameters,
        system: &ParticleSystem,
        reporter: &ProgressReporter,
    ) -> Result<(), P3mError> {
        check_collaborators(&params, self.solver.fft(), &self.weights)?;
        let influence = InfluenceFunction::build(&params, reporter)?;
        self.self_force.init(system, &params, &influence)?;
        self.influence = influence;
        self.params = params;
        debug!("Influence function rebuilt.");
        Ok(())
    }

    /// Adds the reciprocal-space forces of `system` to `forces`.
    #[instrument(skip_all, name = "p3m_forces")]
    pub fn compute_forces(
        &mut self,
        system: &ParticleSystem,
        forces: &mut ForceAccumulator,
    ) -> Result<(), P3mError> {
        if forces.len() != system.len() {
            return Err(P3mError::CacheMismatch {
                expected: system.len(),
                found: forces.len(),
            });
        }

        self.mesh.clear();
        let primary = assignment::spread(
            system,
            &self.params,
            &self.weights,
            &mut self.mesh,
            Image::Primary,
            true,
        )?;
        let interlaced = if self.params.interlaced {
            Some(assignment::spread(
                system,
                &self.params,
                &self.weights,
                &mut self.mesh,
                Image::Interlaced,
                true,
            )?)
        } else {
            None
        };

        self.solver.solve(&mut self.mesh, &self.influence)?;

        let prefactor = self.force_prefactor();
        assignment::gather(forces, &self.mesh, &primary, prefactor)?;
        if let Some(cache) = &interlaced {
            assignment::gather(forces, &self.mesh, cache, prefactor)?;
        }

        self.self_force.subtract(system, &self.params, forces)?;
        debug!(particles = system.len(), "Reciprocal-space forces computed.");
        Ok(())
    }

    /// `M / L³`: turns the unnormalised inverse transform into a potential.
    pub fn force_prefactor(&self) -> f64 {
        self.params.mesh as f64 / self.params.box_length.powi(3)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn influence(&self) -> &InfluenceFunction {
        &self.influence
    }

    pub fn self_force(&self) -> &S {
        &self.self_force
    }
}

fn check_collaborators<F, W>(params: &Parameters, fft: &F, weights: &W) -> Result<(), P3mError>
where
    F: FourierTransform3d + ?Sized,
    W: InterpolationWeights + ?Sized,
{
    params.validate()?;
    if fft.size() != params.mesh {
        return Err(P3mError::MeshMismatch {
            expected: params.mesh,
            found: fft.size(),
        });
    }
    if weights.order() != params.cao {
        return Err(P3mError::InterpolationMismatch {
            expected: params.cao,
            found: weights.order(),
        });
    }
    Ok(())
}
