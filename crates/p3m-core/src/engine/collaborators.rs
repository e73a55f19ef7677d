//! Seams for the parts of a complete Ewald-type force evaluation that live
//! outside the mesh method itself.

use super::config::{ConfigError, Parameters};
use super::error::P3mError;
use super::influence::InfluenceFunction;
use crate::core::models::forces::ForceAccumulator;
use crate::core::models::system::ParticleSystem;

/// Removes the spurious force a particle exerts on itself through the mesh.
///
/// `init` is called exactly once after every influence function build;
/// `subtract` once at the end of every force evaluation.
pub trait SelfForceCorrection: Send + Sync {
    fn init(
        &mut self,
        system: &ParticleSystem,
        params: &Parameters,
        influence: &InfluenceFunction,
    ) -> Result<(), P3mError>;

    fn subtract(
        &self,
        system: &ParticleSystem,
        params: &Parameters,
        forces: &mut ForceAccumulator,
    ) -> Result<(), P3mError>;
}

/// Leaves forces untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSelfForceCorrection;

impl SelfForceCorrection for NoSelfForceCorrection {
    fn init(
        &mut self,
        _system: &ParticleSystem,
        _params: &Parameters,
        _influence: &InfluenceFunction,
    ) -> Result<(), P3mError> {
        Ok(())
    }

    fn subtract(
        &self,
        _system: &ParticleSystem,
        _params: &Parameters,
        _forces: &mut ForceAccumulator,
    ) -> Result<(), P3mError> {
        Ok(())
    }
}

/// RMS force error of the short-range (real-space) part of the split.
pub trait RealSpaceErrorEstimator: Send + Sync {
    fn real_space_error(&self, system: &ParticleSystem, params: &Parameters) -> f64;
}

/// Kolafa–Perram estimate for a real-space cutoff `r_cut`:
/// `2·Σq²·exp(-α²·r_cut²) / sqrt(N·r_cut·L³)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KolafaPerram {
    r_cut: f64,
}

impl KolafaPerram {
    pub fn new(r_cut: f64) -> Result<Self, ConfigError> {
        if !r_cut.is_finite() || r_cut <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "r_cut",
                reason: format!("must be finite and positive, got {r_cut}"),
            });
        }
        Ok(Self { r_cut })
    }

    pub fn r_cut(&self) -> f64 {
        self.r_cut
    }
}

impl RealSpaceErrorEstimator for KolafaPerram {
    fn real_space_error(&self, system: &ParticleSystem, params: &Parameters) -> f64 {
        if system.is_empty() {
            return 0.0;
        }
        let volume = params.box_length.powi(3);
        2.0 * system.sum_q2() * (-(params.alpha * self.r_cut).powi(2)).exp()
            / (system.len() as f64 * self.r_cut * volume).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::ParametersBuilder;
    use nalgebra::Point3;

    fn params(alpha: f64) -> Parameters {
        ParametersBuilder::new()
            .mesh(8)
            .cao(3)
            .alpha(alpha)
            .box_length(10.0)
            .build()
            .unwrap()
    }

    fn dipole() -> ParticleSystem {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::new(1.0, 1.0, 1.0), 1.0);
        system.add_particle(Point3::new(2.0, 1.0, 1.0), -1.0);
        system
    }

    #[test]
    fn kolafa_perram_matches_closed_form() {
        let estimator = KolafaPerram::new(3.0).unwrap();
        assert_eq!(estimator.r_cut(), 3.0);
        let expected = 2.0 * 2.0 * (-(0.5f64 * 3.0).powi(2)).exp() / (2.0 * 3.0 * 1000.0f64).sqrt();
        let value = estimator.real_space_error(&dipole(), &params(0.5));
        assert!((value - expected).abs() < 1e-15);
    }

    #[test]
    fn kolafa_perram_decreases_with_alpha_and_cutoff() {
        let system = dipole();
        let short = KolafaPerram::new(2.0).unwrap();
        let long = KolafaPerram::new(4.0).unwrap();
        assert!(short.real_space_error(&system, &params(1.0)) > long.real_space_error(&system, &params(1.0)));
        assert!(short.real_space_error(&system, &params(0.5)) > short.real_space_error(&system, &params(1.0)));
    }

    #[test]
    fn kolafa_perram_is_zero_for_empty_systems() {
        let estimator = KolafaPerram::new(3.0).unwrap();
        assert_eq!(estimator.real_space_error(&ParticleSystem::new(), &params(1.0)), 0.0);
    }

    #[test]
    fn kolafa_perram_rejects_non_positive_cutoff() {
        assert!(KolafaPerram::new(0.0).is_err());
        assert!(KolafaPerram::new(-1.0).is_err());
        assert!(KolafaPerram::new(f64::NAN).is_err());
    }

    #[test]
    fn no_self_force_correction_leaves_forces_untouched() {
        let system = dipole();
        let params = params(1.0);
        let mut forces = ForceAccumulator::new(2);
        forces[0].x = 1.5;
        let mut correction = NoSelfForceCorrection;
        let influence = InfluenceFunction::build(&params, &Default::default()).unwrap();
        correction.init(&system, &params, &influence).unwrap();
        correction.subtract(&system, &params, &mut forces).unwrap();
        assert_eq!(forces[0].x, 1.5);
        assert_eq!(forces[1].x, 0.0);
    }
}
