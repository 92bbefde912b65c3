mod defaults;

pub use defaults::DefaultsConfig;

use crate::cli::{OptimizeArgs, PrepareArgs, TrainArgs};
use crate::data::DataManager;
use crate::error::{CliError, Result};
use serde::Deserialize;
use solvex::core::data::features::SolventLabel;
use solvex::core::ml::preprocessing::UnknownCategory;
use solvex::engine::config::{
    self as core_config, DatasetConfig, PrepareConfig, SearchConfig, TrainingConfig,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialDatasetConfig {
    input: Option<PathBuf>,
    log_s_min: Option<f64>,
    log_s_max: Option<f64>,
    solvent_label: Option<SolventLabel>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialTrainingConfig {
    test_fraction: Option<f64>,
    seed: Option<u64>,
    models: Option<Vec<String>>,
    unknown_category: Option<UnknownCategory>,
    features_out: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSearchConfig {
    solvents: Option<Vec<String>>,
    t_min: Option<f64>,
    t_max: Option<f64>,
    t_step: Option<f64>,
    top_k: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialStorageConfig {
    model_path: Option<PathBuf>,
}

/// Everything a config file may set. Every key is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    dataset: Option<PartialDatasetConfig>,
    training: Option<PartialTrainingConfig>,
    search: Option<PartialSearchConfig>,
    storage: Option<PartialStorageConfig>,
    #[serde(skip)]
    defaults: DefaultsConfig,
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads the optional config file and applies `-S` overrides on top of it.
    pub fn load(path: Option<&Path>, set_values: &[String]) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_set_values(set_values)?;
        Ok(config)
    }

    pub fn merge_prepare(mut self, args: &PrepareArgs) -> Result<PrepareConfig> {
        let dataset = self.merge_dataset(args.input.as_ref(), args.log_s_min, args.log_s_max)?;
        core_config::PrepareConfigBuilder::new()
            .dataset(dataset)
            .output_path(&args.output)
            .stats_path(args.stats.clone())
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Returns the training configuration and the path the best model is written to.
    pub fn merge_train(
        mut self,
        args: &TrainArgs,
        data_manager: &DataManager,
    ) -> Result<(TrainingConfig, PathBuf)> {
        let dataset = self.merge_dataset(args.input.as_ref(), None, None)?;
        let training = self.training.take().unwrap_or_default();
        let defaults = &self.defaults;

        let config = core_config::TrainingConfigBuilder::new()
            .dataset(dataset)
            .test_fraction(
                args.test_fraction
                    .or(training.test_fraction)
                    .unwrap_or(defaults.test_fraction),
            )
            .seed(args.seed.or(training.seed).unwrap_or(defaults.seed))
            .models(
                args.models
                    .clone()
                    .or(training.models)
                    .unwrap_or_else(|| defaults.models.clone()),
            )
            .unknown_category(
                training
                    .unknown_category
                    .unwrap_or(defaults.unknown_category),
            )
            .features_out(args.features_out.clone().or(training.features_out))
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let model_path = self.model_path(args.model.as_ref(), data_manager);
        Ok((config, model_path))
    }

    /// Returns the search configuration and the path the trained model is read from.
    pub fn merge_optimize(
        mut self,
        args: &OptimizeArgs,
        data_manager: &DataManager,
    ) -> Result<(SearchConfig, PathBuf)> {
        let search = self.search.take().unwrap_or_default();
        let defaults = &self.defaults;

        let solvents = if args.solvents.is_empty() {
            search.solvents.unwrap_or_else(|| defaults.solvents.clone())
        } else {
            args.solvents.clone()
        };

        let config = core_config::SearchConfigBuilder::new()
            .smiles(args.smiles.as_str())
            .solvents(solvents)
            .temperatures(
                args.t_min.or(search.t_min).unwrap_or(defaults.t_min),
                args.t_max.or(search.t_max).unwrap_or(defaults.t_max),
                args.t_step.or(search.t_step).unwrap_or(defaults.t_step),
            )
            .top_k(args.top_k.or(search.top_k).unwrap_or(defaults.top_k))
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let model_path = self.model_path(args.model.as_ref(), data_manager);
        Ok((config, model_path))
    }

    fn merge_dataset(
        &mut self,
        cli_input: Option<&PathBuf>,
        cli_log_s_min: Option<f64>,
        cli_log_s_max: Option<f64>,
    ) -> Result<DatasetConfig> {
        let dataset = self.dataset.take().unwrap_or_default();
        let input = cli_input.cloned().or(dataset.input).ok_or_else(|| {
            CliError::Config(
                "An input dataset is required either via `--input` or `dataset.input`.".to_string(),
            )
        })?;

        core_config::DatasetConfigBuilder::new()
            .input_path(input)
            .log_s_window(
                cli_log_s_min
                    .or(dataset.log_s_min)
                    .unwrap_or(self.defaults.log_s_min),
                cli_log_s_max
                    .or(dataset.log_s_max)
                    .unwrap_or(self.defaults.log_s_max),
            )
            .solvent_label(dataset.solvent_label.unwrap_or(self.defaults.solvent_label))
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn model_path(&mut self, cli_model: Option<&PathBuf>, data_manager: &DataManager) -> PathBuf {
        let storage = self.storage.take().unwrap_or_default();
        cli_model
            .cloned()
            .or(storage.model_path)
            .unwrap_or_else(|| data_manager.default_model_path())
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "dataset.input" => {
                    self.dataset.get_or_insert_with(Default::default).input =
                        Some(PathBuf::from(value));
                }
                "dataset.log-s-min" => {
                    self.dataset.get_or_insert_with(Default::default).log_s_min =
                        Some(parse_value(key, value)?);
                }
                "dataset.log-s-max" => {
                    self.dataset.get_or_insert_with(Default::default).log_s_max =
                        Some(parse_value(key, value)?);
                }
                "dataset.solvent-label" => {
                    self.dataset
                        .get_or_insert_with(Default::default)
                        .solvent_label = Some(parse_solvent_label(value)?);
                }
                "training.test-fraction" => {
                    self.training
                        .get_or_insert_with(Default::default)
                        .test_fraction = Some(parse_value(key, value)?);
                }
                "training.seed" => {
                    self.training.get_or_insert_with(Default::default).seed =
                        Some(parse_value(key, value)?);
                }
                "training.models" => {
                    self.training.get_or_insert_with(Default::default).models =
                        Some(parse_list(value));
                }
                "training.unknown-category" => {
                    self.training
                        .get_or_insert_with(Default::default)
                        .unknown_category = Some(parse_unknown_category(value)?);
                }
                "training.features-out" => {
                    self.training
                        .get_or_insert_with(Default::default)
                        .features_out = Some(PathBuf::from(value));
                }
                "search.solvents" => {
                    self.search.get_or_insert_with(Default::default).solvents =
                        Some(parse_list(value));
                }
                "search.t-min" => {
                    self.search.get_or_insert_with(Default::default).t_min =
                        Some(parse_value(key, value)?);
                }
                "search.t-max" => {
                    self.search.get_or_insert_with(Default::default).t_max =
                        Some(parse_value(key, value)?);
                }
                "search.t-step" => {
                    self.search.get_or_insert_with(Default::default).t_step =
                        Some(parse_value(key, value)?);
                }
                "search.top-k" => {
                    self.search.get_or_insert_with(Default::default).top_k =
                        Some(parse_value(key, value)?);
                }
                "storage.model-path" => {
                    self.storage.get_or_insert_with(Default::default).model_path =
                        Some(PathBuf::from(value));
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

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_solvent_label(value: &str) -> Result<SolventLabel> {
    match value.trim() {
        "smiles" => Ok(SolventLabel::Smiles),
        "name" => Ok(SolventLabel::Name),
        other => Err(CliError::Config(format!(
            "Invalid dataset.solvent-label '{}'. Expected 'smiles' or 'name'.",
            other
        ))),
    }
}

fn parse_unknown_category(value: &str) -> Result<UnknownCategory> {
    match value.trim() {
        "ignore" => Ok(UnknownCategory::Ignore),
        "error" => Ok(UnknownCategory::Error),
        other => Err(CliError::Config(format!(
            "Invalid training.unknown-category '{}'. Expected 'ignore' or 'error'.",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use once_cell::sync::Lazy;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    static TEST_DIR: Lazy<TempDir> = Lazy::new(|| tempdir().expect("Failed to create temp dir"));

    fn write_config_file(name: &str, content: &str) -> PathBuf {
        let file_path = TEST_DIR.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn manager() -> DataManager {
        DataManager::with_custom_path(TEST_DIR.path().join("data"))
    }

    fn parse(args: &[&str]) -> (PartialConfig, Commands) {
        let cli = Cli::parse_from(args);
        let config = PartialConfig::load(cli.config.as_deref(), &cli.set_values).unwrap();
        (config, cli.command)
    }

    #[test]
    fn defaults_fill_everything_not_given() {
        let (config, command) = parse(&["solvex", "train", "-i", "raw.csv"]);
        let Commands::Train(args) = command else {
            panic!("Expected 'train' subcommand");
        };
        let (training, model_path) = config.merge_train(&args, &manager()).unwrap();

        assert_eq!(training.dataset.input_path, PathBuf::from("raw.csv"));
        assert_eq!(training.dataset.log_s_window.min, -12.0);
        assert_eq!(training.dataset.log_s_window.max, 2.0);
        assert_eq!(training.selection.test_fraction, 0.2);
        assert_eq!(training.selection.seed, 42);
        assert_eq!(training.selection.models.len(), 9);
        assert_eq!(training.features_out, None);
        assert_eq!(model_path, manager().default_model_path());
    }

    #[test]
    fn file_values_fill_in_and_flags_override_them() {
        let config_path = write_config_file(
            "train.toml",
            r#"
            [dataset]
            input = "from_file.csv"
            log-s-min = -8.0
            solvent-label = "name"

            [training]
            seed = 7 # Will be overridden
            test-fraction = 0.25
            models = ["linear", "ridge"]

            [storage]
            model-path = "/tmp/solvex/model.json"
            "#,
        );
        let (config, command) = parse(&[
            "solvex",
            "train",
            "-c",
            config_path.to_str().unwrap(),
            "--seed",
            "11",
        ]);
        let Commands::Train(args) = command else {
            panic!("Expected 'train' subcommand");
        };
        let (training, model_path) = config.merge_train(&args, &manager()).unwrap();

        assert_eq!(training.dataset.input_path, PathBuf::from("from_file.csv"));
        assert_eq!(training.dataset.log_s_window.min, -8.0);
        assert_eq!(training.dataset.solvent_label, SolventLabel::Name);
        assert_eq!(training.selection.seed, 11);
        assert_eq!(training.selection.test_fraction, 0.25);
        assert_eq!(training.selection.models, vec!["linear", "ridge"]);
        assert_eq!(model_path, PathBuf::from("/tmp/solvex/model.json"));
    }

    #[test]
    fn set_values_override_file_but_not_flags() {
        let config_path = write_config_file(
            "search.toml",
            r#"
            [search]
            t-min = 280.0
            t-max = 300.0
            top-k = 2 # Will be overridden by --set
            solvents = ["O"]
            "#,
        );
        let (config, command) = parse(&[
            "solvex",
            "optimize",
            "CCO",
            "-c",
            config_path.to_str().unwrap(),
            "-S",
            "search.top-k=4",
            "-S",
            "search.t-max=320",
            "--t-max",
            "310",
        ]);
        let Commands::Optimize(args) = command else {
            panic!("Expected 'optimize' subcommand");
        };
        let (search, _) = config.merge_optimize(&args, &manager()).unwrap();

        assert_eq!(search.smiles, "CCO");
        assert_eq!(search.top_k, 4);
        assert_eq!(search.temperatures.min_k, 280.0);
        assert_eq!(search.temperatures.max_k, 310.0);
        assert_eq!(search.temperatures.step_k, 10.0);
        assert_eq!(search.solvents, vec!["O"]);
    }

    #[test]
    fn cli_solvents_replace_configured_ones() {
        let (config, command) = parse(&[
            "solvex",
            "optimize",
            "CCO",
            "-S",
            "search.solvents=O,CCO",
            "-s",
            "dmso",
        ]);
        let Commands::Optimize(args) = command else {
            panic!("Expected 'optimize' subcommand");
        };
        let (search, _) = config.merge_optimize(&args, &manager()).unwrap();
        assert_eq!(search.solvents, vec!["dmso"]);
    }

    #[test]
    fn prepare_requires_an_input() {
        let (config, command) = parse(&["solvex", "prepare", "-o", "out.csv"]);
        let Commands::Prepare(args) = command else {
            panic!("Expected 'prepare' subcommand");
        };
        assert!(matches!(config.merge_prepare(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn invalid_values_surface_as_config_errors() {
        let (config, command) = parse(&["solvex", "train", "-i", "raw.csv", "--test-fraction", "1.5"]);
        let Commands::Train(args) = command else {
            panic!("Expected 'train' subcommand");
        };
        assert!(matches!(
            config.merge_train(&args, &manager()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn unknown_set_key_is_rejected() {
        let mut config = PartialConfig::default();
        let result = config.apply_set_values(&["search.depth=3".to_string()]);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("search.depth")));
    }

    #[test]
    fn malformed_set_value_is_rejected() {
        let mut config = PartialConfig::default();
        assert!(config.apply_set_values(&["training.seed".to_string()]).is_err());
        assert!(config.apply_set_values(&["training.seed=abc".to_string()]).is_err());
        assert!(
            config
                .apply_set_values(&["training.unknown-category=drop".to_string()])
                .is_err()
        );
    }

    #[test]
    fn unknown_file_keys_are_a_parsing_error() {
        let config_path = write_config_file("unknown.toml", "[search]\nmax-depth = 3\n");
        assert!(matches!(
            PartialConfig::from_file(&config_path),
            Err(CliError::FileParsing { .. })
        ));
    }
}
