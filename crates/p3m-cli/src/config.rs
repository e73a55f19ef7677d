use crate::cli::{ForcesArgs, SystemArgs, TuneArgs};
use crate::error::{CliError, Result};
use crate::utils::parser::{parse_charge_model, parse_execution, parse_list, parse_wrap_strategy};
use p3m::engine::config::{Parameters, ParametersBuilder, PartialParameters};
use p3m::engine::tuning::ChargeModel;
use p3m::workflows::tune::Candidate;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

const DEFAULT_PARTICLES: usize = 100;
const DEFAULT_SEED: u64 = 42;
const DEFAULT_BOX_LENGTH: f64 = 10.0;
const DEFAULT_MESH: usize = 32;
const DEFAULT_CAO: usize = 5;
const DEFAULT_TUNE_MESHES: [usize; 3] = [16, 32, 64];
const DEFAULT_TUNE_CAOS: [usize; 3] = [3, 5, 7];

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialSystemConfig {
    pub particles: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialTuningConfig {
    pub meshes: Option<Vec<usize>>,
    pub caos: Option<Vec<usize>>,
    pub alphas: Option<Vec<f64>>,
    pub r_cut: Option<f64>,
    pub charge_model: Option<ChargeModel>,
}

/// Run configuration as read from a TOML file, before CLI overrides.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialRunConfig {
    pub system: Option<PartialSystemConfig>,
    pub method: Option<PartialParameters>,
    pub tuning: Option<PartialTuningConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemConfig {
    pub particles: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForcesRun {
    pub system: SystemConfig,
    pub params: Parameters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TuneRun {
    pub system: SystemConfig,
    pub base: Parameters,
    pub candidates: Vec<Candidate>,
    pub r_cut: f64,
    pub charge_model: Option<ChargeModel>,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads `path` when given, otherwise starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    /// Precedence is CLI flag, then `-S`, then file, then built-in default.
    pub fn merge_forces(mut self, args: &ForcesArgs) -> Result<ForcesRun> {
        self.apply_set_values(&args.system.set_values)?;

        let flags = PartialParameters {
            mesh: args.mesh,
            cao: args.cao,
            alpha: args.alpha,
            interlaced: args.interlaced.then_some(true),
            ..system_flags(&args.system)
        };
        let params = self
            .layered(Parameters::builder().merge(&flags))
            .merge(&PartialParameters {
                mesh: Some(DEFAULT_MESH),
                cao: Some(DEFAULT_CAO),
                ..Default::default()
            })
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(ForcesRun {
            system: self.system_config(&args.system),
            params,
        })
    }

    pub fn merge_tune(mut self, args: &TuneArgs) -> Result<TuneRun> {
        self.apply_set_values(&args.system.set_values)?;
        let tuning = self.tuning.clone().unwrap_or_default();

        let meshes = args
            .meshes
            .clone()
            .or(tuning.meshes)
            .unwrap_or_else(|| DEFAULT_TUNE_MESHES.to_vec());
        let caos = args
            .caos
            .clone()
            .or(tuning.caos)
            .unwrap_or_else(|| DEFAULT_TUNE_CAOS.to_vec());
        let alphas = args.alphas.clone().or(tuning.alphas).ok_or_else(|| {
            CliError::Config("`tuning.alphas` is required (or pass --alphas).".to_string())
        })?;
        let r_cut = args.r_cut.or(tuning.r_cut).ok_or_else(|| {
            CliError::Config("`tuning.r-cut` is required (or pass --r-cut).".to_string())
        })?;

        let largest_mesh = meshes.iter().copied().max().ok_or_else(|| {
            CliError::Config("`tuning.meshes` cannot be empty.".to_string())
        })?;
        if caos.is_empty() || alphas.is_empty() {
            return Err(CliError::Config(
                "`tuning.caos` and `tuning.alphas` cannot be empty.".to_string(),
            ));
        }

        // Each candidate replaces mesh, cao and alpha, so the base only has
        // to carry valid placeholders for them.
        let placeholders = Parameters::builder()
            .mesh(largest_mesh)
            .cao(1)
            .alpha(0.0)
            .merge(&system_flags(&args.system));
        let base = self
            .layered(placeholders)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(TuneRun {
            system: self.system_config(&args.system),
            base,
            candidates: Candidate::grid(&meshes, &caos, &alphas),
            r_cut,
            charge_model: args.charge_model.or(tuning.charge_model),
        })
    }

    fn system_config(&self, args: &SystemArgs) -> SystemConfig {
        let system = self.system.clone().unwrap_or_default();
        SystemConfig {
            particles: args
                .particles
                .or(system.particles)
                .unwrap_or(DEFAULT_PARTICLES),
            seed: args.seed.or(system.seed).unwrap_or(DEFAULT_SEED),
        }
    }

    /// Layers the `[method]` table and the default box under `builder`.
    fn layered(&self, builder: ParametersBuilder) -> ParametersBuilder {
        builder
            .merge(&self.method.clone().unwrap_or_default())
            .merge(&PartialParameters {
                box_length: Some(DEFAULT_BOX_LENGTH),
                ..Default::default()
            })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;
            let (key, value) = (key.trim(), value.trim());

            match key {
                "system.particles" => {
                    self.system.get_or_insert_with(Default::default).particles =
                        Some(parse_value(key, value)?)
                }
                "system.seed" => {
                    self.system.get_or_insert_with(Default::default).seed =
                        Some(parse_value(key, value)?)
                }
                "method.mesh" => {
                    self.method.get_or_insert_with(Default::default).mesh =
                        Some(parse_value(key, value)?)
                }
                "method.cao" => {
                    self.method.get_or_insert_with(Default::default).cao =
                        Some(parse_value(key, value)?)
                }
                "method.alpha" => {
                    self.method.get_or_insert_with(Default::default).alpha =
                        Some(parse_value(key, value)?)
                }
                "method.box-length" => {
                    self.method.get_or_insert_with(Default::default).box_length =
                        Some(parse_value(key, value)?)
                }
                "method.max-interpol" => {
                    self.method.get_or_insert_with(Default::default).max_interpol =
                        Some(parse_value(key, value)?)
                }
                "method.brillouin" => {
                    self.method.get_or_insert_with(Default::default).brillouin =
                        Some(parse_value(key, value)?)
                }
                "method.brillouin-tuning" => {
                    self.method.get_or_insert_with(Default::default).brillouin_tuning =
                        Some(parse_value(key, value)?)
                }
                "method.interlaced" => {
                    self.method.get_or_insert_with(Default::default).interlaced =
                        Some(parse_value(key, value)?)
                }
                "method.wrap" => {
                    self.method.get_or_insert_with(Default::default).wrap =
                        Some(parse_wrap_strategy(value)?)
                }
                "method.execution" => {
                    self.method.get_or_insert_with(Default::default).execution =
                        Some(parse_execution(value)?)
                }
                "tuning.meshes" => {
                    self.tuning.get_or_insert_with(Default::default).meshes =
                        Some(parse_list(value)?)
                }
                "tuning.caos" => {
                    self.tuning.get_or_insert_with(Default::default).caos = Some(parse_list(value)?)
                }
                "tuning.alphas" => {
                    self.tuning.get_or_insert_with(Default::default).alphas =
                        Some(parse_list(value)?)
                }
                "tuning.r-cut" => {
                    self.tuning.get_or_insert_with(Default::default).r_cut =
                        Some(parse_value(key, value)?)
                }
                "tuning.charge-model" => {
                    self.tuning.get_or_insert_with(Default::default).charge_model =
                        Some(parse_charge_model(value)?)
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The method values carried by the shared system flags.
fn system_flags(args: &SystemArgs) -> PartialParameters {
    PartialParameters {
        box_length: args.box_length,
        ..Default::default()
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use p3m::core::models::mesh::WrapStrategy;
    use p3m::engine::config::Execution;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn forces_args(args: &[&str]) -> ForcesArgs {
        let mut argv = vec!["p3m", "forces"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Forces(args) => args,
            _ => panic!("Expected 'forces' subcommand"),
        }
    }

    fn tune_args(args: &[&str]) -> TuneArgs {
        let mut argv = vec!["p3m", "tune"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Tune(args) => args,
            _ => panic!("Expected 'tune' subcommand"),
        }
    }

    const FULL_CONFIG: &str = r#"
        [system]
        particles = 64
        seed = 7

        [method]
        mesh = 16
        cao = 4
        alpha = 0.9
        box-length = 12.0
        brillouin = 2
        wrap = "bitmask"
        execution = "serial"

        [tuning]
        meshes = [8, 16]
        caos = [2, 4]
        alphas = [0.7]
        r-cut = 3.5
        charge-model = "correlated-dipole"
    "#;

    #[test]
    fn file_values_fill_the_run_configuration() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, "full.toml", FULL_CONFIG);
        let partial = PartialRunConfig::from_file(&path).unwrap();

        let run = partial.clone().merge_forces(&forces_args(&[])).unwrap();
        assert_eq!(run.system, SystemConfig { particles: 64, seed: 7 });
        assert_eq!(run.params.mesh, 16);
        assert_eq!(run.params.cao, 4);
        assert_eq!(run.params.alpha, 0.9);
        assert_eq!(run.params.box_length, 12.0);
        assert_eq!(run.params.brillouin, 2);
        assert_eq!(run.params.wrap, WrapStrategy::Bitmask);
        assert_eq!(run.params.execution, Execution::Serial);
        assert!(!run.params.interlaced);

        let tune = partial.merge_tune(&tune_args(&[])).unwrap();
        assert_eq!(tune.candidates.len(), 4);
        assert_eq!(tune.r_cut, 3.5);
        assert_eq!(tune.charge_model, Some(ChargeModel::CorrelatedDipole));
        assert_eq!(tune.base.mesh, 16);
        assert_eq!(tune.base.box_length, 12.0);
    }

    #[test]
    fn missing_file_sections_fall_back_to_defaults() {
        let run = PartialRunConfig::load(None)
            .unwrap()
            .merge_forces(&forces_args(&["--alpha", "0.5"]))
            .unwrap();
        assert_eq!(
            run.system,
            SystemConfig {
                particles: DEFAULT_PARTICLES,
                seed: DEFAULT_SEED
            }
        );
        assert_eq!(run.params.mesh, DEFAULT_MESH);
        assert_eq!(run.params.cao, DEFAULT_CAO);
        assert_eq!(run.params.box_length, DEFAULT_BOX_LENGTH);
        assert_eq!(run.params.wrap, WrapStrategy::Modulo);
    }

    #[test]
    fn cli_arguments_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, "override.toml", FULL_CONFIG);
        let args = forces_args(&[
            "-m",
            "32",
            "--alpha",
            "1.1",
            "-L",
            "20",
            "--interlaced",
            "-S",
            "method.mesh=8",
        ]);
        let run = PartialRunConfig::from_file(&path)
            .unwrap()
            .merge_forces(&args)
            .unwrap();
        assert_eq!(run.params.mesh, 32);
        assert_eq!(run.params.alpha, 1.1);
        assert_eq!(run.params.box_length, 20.0);
        assert!(run.params.interlaced);
    }

    #[test]
    fn set_values_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, "set.toml", FULL_CONFIG);
        let args = tune_args(&[
            "-S",
            "tuning.meshes=32,64",
            "-S",
            "tuning.charge-model=water",
            "-S",
            "method.wrap=modulo",
            "-S",
            "system.seed=99",
        ]);
        let run = PartialRunConfig::from_file(&path)
            .unwrap()
            .merge_tune(&args)
            .unwrap();
        assert_eq!(run.system.seed, 99);
        assert_eq!(run.base.mesh, 64);
        assert_eq!(run.base.wrap, WrapStrategy::Modulo);
        assert_eq!(run.charge_model, Some(ChargeModel::Water));
        assert_eq!(run.candidates[0], Candidate::new(32, 2, 0.7));
    }

    #[test]
    fn method_table_shares_the_core_parameter_schema() {
        let dir = tempdir().unwrap();
        let path = write_config(
            &dir,
            "method.toml",
            "[method]\nalpha = 0.6\nbox-length = 15.0\ninterlaced = true\nmax-interpol = 128\n",
        );
        let partial = PartialRunConfig::from_file(&path).unwrap();

        let run = partial.clone().merge_forces(&forces_args(&[])).unwrap();
        assert_eq!(run.params.box_length, 15.0);
        assert_eq!(run.params.max_interpol, 128);
        assert!(run.params.interlaced);

        let run = partial
            .clone()
            .merge_forces(&forces_args(&["-S", "method.box-length=9.0"]))
            .unwrap();
        assert_eq!(run.params.box_length, 9.0);

        let run = partial
            .clone()
            .merge_forces(&forces_args(&["-L", "7.5", "-S", "method.box-length=9.0"]))
            .unwrap();
        assert_eq!(run.params.box_length, 7.5);

        let tune = partial
            .merge_tune(&tune_args(&["--alphas", "0.5", "--r-cut", "3"]))
            .unwrap();
        assert!(tune.base.interlaced);
        assert_eq!(tune.base.box_length, 15.0);
    }

    #[test]
    fn missing_alpha_is_a_configuration_error() {
        let result = PartialRunConfig::default().merge_forces(&forces_args(&[]));
        match result {
            Err(CliError::Config(msg)) => assert!(msg.contains("alpha")),
            other => panic!("Expected a configuration error, got {:?}", other),
        }
    }

    #[test]
    fn tune_requires_alphas_and_cutoff() {
        let missing_alphas = PartialRunConfig::default().merge_tune(&tune_args(&["--r-cut", "4"]));
        assert!(matches!(missing_alphas, Err(CliError::Config(msg)) if msg.contains("alphas")));

        let missing_cutoff =
            PartialRunConfig::default().merge_tune(&tune_args(&["--alphas", "0.5"]));
        assert!(matches!(missing_cutoff, Err(CliError::Config(msg)) if msg.contains("r-cut")));
    }

    #[test]
    fn invalid_parameters_surface_as_configuration_errors() {
        let result = PartialRunConfig::default()
            .merge_forces(&forces_args(&["--alpha", "0.5", "-m", "4", "--cao", "6"]));
        assert!(matches!(result, Err(CliError::Config(_))));

        let result = PartialRunConfig::default().merge_forces(&forces_args(&[
            "--alpha",
            "0.5",
            "-m",
            "24",
            "-S",
            "method.wrap=bitmask",
        ]));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        let mut config = PartialRunConfig::default();
        assert!(matches!(
            config.apply_set_values(&["method.mesh".to_string()]),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            config.apply_set_values(&["method.color=red".to_string()]),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            config.apply_set_values(&["method.mesh=many".to_string()]),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            config.apply_set_values(&["method.wrap=mask".to_string()]),
            Err(CliError::Argument(_))
        ));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, "unknown.toml", "[method]\nmesh = 16\nsmoothing = 2\n");
        let result = PartialRunConfig::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }
}
