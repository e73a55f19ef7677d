use crate::core::interpolation::MAX_ORDER;
use crate::core::models::mesh::WrapStrategy;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_MAX_INTERPOL: usize = 10_000;
pub const DEFAULT_BRILLOUIN: usize = 1;
pub const DEFAULT_BRILLOUIN_TUNING: usize = 1;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// How the data-parallel loops (assignment, gather, influence planes) run.
///
/// `Parallel` only takes effect when the crate is built with the `parallel`
/// feature; otherwise every loop runs serially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Execution {
    Serial,
    #[default]
    Parallel,
}

impl Execution {
    #[inline]
    pub fn is_parallel(self) -> bool {
        cfg!(feature = "parallel") && self == Execution::Parallel
    }
}

/// Validated method parameters. Rebuilding the influence function is
/// required whenever any of these change.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    /// Mesh points per dimension, M.
    pub mesh: usize,
    /// Charge assignment order, the stencil width per dimension.
    pub cao: usize,
    /// Ewald splitting parameter (inverse length).
    pub alpha: f64,
    /// Edge length of the cubic box.
    pub box_length: f64,
    /// Interpolation bins per unit mesh spacing; the table has twice as many.
    pub max_interpol: usize,
    /// Aliasing radius of the influence function sums.
    pub brillouin: usize,
    /// Aliasing radius of the error estimator sums.
    pub brillouin_tuning: usize,
    pub wrap: WrapStrategy,
    /// Add a second grid shifted by half a mesh spacing.
    pub interlaced: bool,
    pub execution: Execution,
}

impl Parameters {
    pub fn builder() -> ParametersBuilder {
        ParametersBuilder::new()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mesh < 2 {
            return Err(invalid("mesh", format!("must be at least 2, got {}", self.mesh)));
        }
        if self.cao == 0 || self.cao > MAX_ORDER {
            return Err(invalid(
                "cao",
                format!("must lie in 1..={MAX_ORDER}, got {}", self.cao),
            ));
        }
        if self.cao > self.mesh {
            return Err(invalid(
                "cao",
                format!("stencil of {} exceeds mesh of {}", self.cao, self.mesh),
            ));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(invalid(
                "alpha",
                format!("must be finite and non-negative, got {}", self.alpha),
            ));
        }
        if !self.box_length.is_finite() || self.box_length <= 0.0 {
            return Err(invalid(
                "box_length",
                format!("must be finite and positive, got {}", self.box_length),
            ));
        }
        if self.max_interpol == 0 {
            return Err(invalid("max_interpol", "must be at least 1".to_string()));
        }
        if !self.wrap.supports(self.mesh) {
            return Err(invalid(
                "wrap",
                format!("bitmask wrapping requires a power-of-two mesh, got {}", self.mesh),
            ));
        }
        Ok(())
    }

    /// Mesh spacing, `box_length / mesh`.
    pub fn spacing(&self) -> f64 {
        self.box_length / self.mesh as f64
    }

    /// Copy of these parameters with a different `(mesh, cao, alpha)` triple.
    pub fn with_candidate(&self, mesh: usize, cao: usize, alpha: f64) -> Result<Self, ConfigError> {
        let candidate = Self {
            mesh,
            cao,
            alpha,
            ..self.clone()
        };
        candidate.validate()?;
        Ok(candidate)
    }
}

fn invalid(name: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidValue { name, reason }
}

/// Every [`Parameters`] field as an optional value, in the kebab-case form
/// used by configuration files. Layered under explicit builder calls with
/// [`ParametersBuilder::merge`].
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialParameters {
    pub mesh: Option<usize>,
    pub cao: Option<usize>,
    pub alpha: Option<f64>,
    pub box_length: Option<f64>,
    pub max_interpol: Option<usize>,
    pub brillouin: Option<usize>,
    pub brillouin_tuning: Option<usize>,
    pub wrap: Option<WrapStrategy>,
    pub interlaced: Option<bool>,
    pub execution: Option<Execution>,
}

#[derive(Debug, Default, Clone)]
pub struct ParametersBuilder {
    mesh: Option<usize>,
    cao: Option<usize>,
    alpha: Option<f64>,
    box_length: Option<f64>,
    max_interpol: Option<usize>,
    brillouin: Option<usize>,
    brillouin_tuning: Option<usize>,
    wrap: Option<WrapStrategy>,
    interlaced: Option<bool>,
    execution: Option<Execution>,
}

impl ParametersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mesh(mut self, mesh: usize) -> Self {
        self.mesh = Some(mesh);
        self
    }
    pub fn cao(mut self, cao: usize) -> Self {
        self.cao = Some(cao);
        self
    }
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }
    pub fn box_length(mut self, length: f64) -> Self {
        self.box_length = Some(length);
        self
    }
    pub fn max_interpol(mut self, bins: usize) -> Self {
        self.max_interpol = Some(bins);
        self
    }
    pub fn brillouin(mut self, radius: usize) -> Self {
        self.brillouin = Some(radius);
        self
    }
    pub fn brillouin_tuning(mut self, radius: usize) -> Self {
        self.brillouin_tuning = Some(radius);
        self
    }
    pub fn wrap(mut self, wrap: WrapStrategy) -> Self {
        self.wrap = Some(wrap);
        self
    }
    pub fn interlaced(mut self, interlaced: bool) -> Self {
        self.interlaced = Some(interlaced);
        self
    }
    pub fn execution(mut self, execution: Execution) -> Self {
        self.execution = Some(execution);
        self
    }

    /// Fills every field not yet set from `partial`; values already on the
    /// builder win.
    pub fn merge(self, partial: &PartialParameters) -> Self {
        Self {
            mesh: self.mesh.or(partial.mesh),
            cao: self.cao.or(partial.cao),
            alpha: self.alpha.or(partial.alpha),
            box_length: self.box_length.or(partial.box_length),
            max_interpol: self.max_interpol.or(partial.max_interpol),
            brillouin: self.brillouin.or(partial.brillouin),
            brillouin_tuning: self.brillouin_tuning.or(partial.brillouin_tuning),
            wrap: self.wrap.or(partial.wrap),
            interlaced: self.interlaced.or(partial.interlaced),
            execution: self.execution.or(partial.execution),
        }
    }

    pub fn build(self) -> Result<Parameters, ConfigError> {
        let params = Parameters {
            mesh: self.mesh.ok_or(ConfigError::MissingParameter("mesh"))?,
            cao: self.cao.ok_or(ConfigError::MissingParameter("cao"))?,
            alpha: self.alpha.ok_or(ConfigError::MissingParameter("alpha"))?,
            box_length: self
                .box_length
                .ok_or(ConfigError::MissingParameter("box_length"))?,
            max_interpol: self.max_interpol.unwrap_or(DEFAULT_MAX_INTERPOL),
            brillouin: self.brillouin.unwrap_or(DEFAULT_BRILLOUIN),
            brillouin_tuning: self.brillouin_tuning.unwrap_or(DEFAULT_BRILLOUIN_TUNING),
            wrap: self.wrap.unwrap_or_default(),
            interlaced: self.interlaced.unwrap_or(false),
            execution: self.execution.unwrap_or_default(),
        };
        params.validate()?;
        Ok(params)
    }
}
