//! Layered configuration loading and validation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;

use crate::domain::errors::ConfigError;
use crate::domain::models::config::{Config, CredentialsConfig};

/// Project-local configuration directory
pub const CONFIG_DIR: &str = ".coderefine";

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "CODEREFINE_";

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the current directory.
    pub fn load() -> Result<Config> {
        Self::load_with(Path::new("."), None)
    }

    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. <project>/.coderefine/config.yaml
    /// 3. <project>/.coderefine/local.yaml (optional local overrides)
    /// 4. An explicit config file, if given
    /// 5. Environment variables (CODEREFINE_* prefix, `__` separates sections)
    ///
    /// Missing files are skipped, so with no sources at all the defaults apply.
    pub fn load_with(project_dir: &Path, explicit: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(Self::project_file(project_dir, "config.yaml")))
            .merge(Yaml::file(Self::project_file(project_dir, "local.yaml")));

        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn project_file(project_dir: &Path, name: &str) -> PathBuf {
        project_dir.join(CONFIG_DIR).join(name)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let analysis = &config.analysis;
        if analysis.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(analysis.max_iterations));
        }
        if !(0.0..=100.0).contains(&analysis.min_score_threshold) {
            return Err(ConfigError::InvalidScoreThreshold(
                analysis.min_score_threshold,
            ));
        }
        if analysis.convergence_threshold.is_nan() || analysis.convergence_threshold <= 0.0 {
            return Err(ConfigError::InvalidConvergenceThreshold(
                analysis.convergence_threshold,
            ));
        }
        if analysis.stagnation_threshold == 0 {
            return Err(ConfigError::InvalidStagnationThreshold(
                analysis.stagnation_threshold,
            ));
        }

        let similarity = config.reconciler.similarity_threshold;
        if !(0.0..=1.0).contains(&similarity) {
            return Err(ConfigError::InvalidSimilarityThreshold(similarity));
        }

        for (field, value) in [
            ("llm_confidence", config.issue_defaults.llm_confidence),
            ("tool_confidence", config.issue_defaults.tool_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidConfidence {
                    field: field.to_string(),
                    value,
                });
            }
        }

        let categories = &config.weights.categories;
        let severities = &config.weights.severities;
        let priority = &config.priority;
        for (name, value) in [
            ("categories.security", categories.security),
            ("categories.bug", categories.bug),
            ("categories.performance", categories.performance),
            ("categories.style", categories.style),
            ("categories.general", categories.general),
            ("severities.critical", severities.critical),
            ("severities.high", severities.high),
            ("severities.medium", severities.medium),
            ("severities.low", severities.low),
            ("priority.critical", priority.critical),
            ("priority.high", priority.high),
            ("priority.medium", priority.medium),
            ("priority.low", priority.low),
            ("priority.rejected_factor", priority.rejected_factor),
            ("optimization.min_score", config.optimization.min_score),
            (
                "optimization.issue_reduction_ratio",
                config.optimization.issue_reduction_ratio,
            ),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: name.to_string(),
                    value,
                });
            }
        }

        if config.static_analysis.max_workers == 0 {
            return Err(ConfigError::InvalidMaxWorkers(
                config.static_analysis.max_workers,
            ));
        }
        for tool in &config.static_analysis.tools {
            if tool.name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "Static tool name cannot be empty".to_string(),
                ));
            }
            if tool.program.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Static tool '{}' program cannot be empty",
                    tool.name
                )));
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log format: {}. Must be one of: json, pretty",
                config.logging.format
            )));
        }

        Ok(())
    }

    /// Read the API key named by the credentials config.
    ///
    /// Returns `Ok(None)` when the key is absent and not required.
    pub fn resolve_credential(
        credentials: &CredentialsConfig,
    ) -> Result<Option<String>, ConfigError> {
        let key = std::env::var(&credentials.api_key_env)
            .ok()
            .filter(|value| !value.trim().is_empty());

        match key {
            Some(key) => Ok(Some(key)),
            None if credentials.required => Err(ConfigError::MissingCredential(
                credentials.api_key_env.clone(),
            )),
            None => {
                tracing::debug!(env = %credentials.api_key_env, "No API key configured");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_project_config(dir: &Path, name: &str, yaml: &str) {
        let config_dir = dir.join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(name), yaml).unwrap();
    }

    #[test]
    fn test_default_config_is_valid() {
        ConfigLoader::validate(&Config::default()).expect("Default config should be valid");
    }

    #[test]
    fn test_no_sources_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars_unset(["CODEREFINE_ANALYSIS__MAX_ITERATIONS"], || {
            let config = ConfigLoader::load_with(dir.path(), None).unwrap();
            assert_eq!(config, Config::default());
        });
    }

    #[test]
    fn test_layer_precedence() {
        let dir = tempfile::tempdir().unwrap();
        write_project_config(
            dir.path(),
            "config.yaml",
            "analysis:\n  max_iterations: 8\n  min_score_threshold: 80\n",
        );
        write_project_config(dir.path(), "local.yaml", "analysis:\n  max_iterations: 6\n");
        let explicit = dir.path().join("ci.yaml");
        fs::write(&explicit, "analysis:\n  stagnation_threshold: 4\n").unwrap();

        temp_env::with_var("CODEREFINE_ANALYSIS__MAX_ITERATIONS", Some("3"), || {
            let config = ConfigLoader::load_with(dir.path(), Some(&explicit)).unwrap();
            assert_eq!(config.analysis.max_iterations, 3);
            assert!((config.analysis.min_score_threshold - 80.0).abs() < f64::EPSILON);
            assert_eq!(config.analysis.stagnation_threshold, 4);
        });

        temp_env::with_vars_unset(["CODEREFINE_ANALYSIS__MAX_ITERATIONS"], || {
            let config = ConfigLoader::load_with(dir.path(), None).unwrap();
            assert_eq!(config.analysis.max_iterations, 6);
        });
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(ConfigLoader::load_with(dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "reconciler:\n  similarity_threshold: 1.5\n").unwrap();
        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("similarity_threshold"));
    }

    #[test]
    fn test_validate_zero_iterations() {
        let mut config = Config::default();
        config.analysis.max_iterations = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxIterations(0))
        );
    }

    #[test]
    fn test_validate_score_out_of_range() {
        let mut config = Config::default();
        config.analysis.min_score_threshold = 120.0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidScoreThreshold(_))
        ));
    }

    #[test]
    fn test_validate_negative_weight() {
        let mut config = Config::default();
        config.weights.categories.style = -1.0;
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidWeight { name, .. }) => assert_eq!(name, "categories.style"),
            other => panic!("Expected InvalidWeight, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_confidence_defaults() {
        let mut config = Config::default();
        config.issue_defaults.tool_confidence = 1.2;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidConfidence { .. })
        ));
    }

    #[test]
    fn test_validate_zero_workers() {
        let mut config = Config::default();
        config.static_analysis.max_workers = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxWorkers(0))
        );
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "loud"),
            other => panic!("Expected InvalidLogLevel, got {other:?}"),
        }
    }

    #[test]
    fn test_credential_required_and_missing() {
        let credentials = CredentialsConfig {
            api_key_env: "CODEREFINE_TEST_LOADER_KEY".to_string(),
            required: true,
        };
        temp_env::with_var("CODEREFINE_TEST_LOADER_KEY", None::<&str>, || {
            assert_eq!(
                ConfigLoader::resolve_credential(&credentials),
                Err(ConfigError::MissingCredential(
                    "CODEREFINE_TEST_LOADER_KEY".to_string()
                ))
            );
        });
        temp_env::with_var("CODEREFINE_TEST_LOADER_KEY", Some("   "), || {
            assert!(ConfigLoader::resolve_credential(&credentials).is_err());
        });
    }

    #[test]
    fn test_credential_present_or_optional() {
        let mut credentials = CredentialsConfig {
            api_key_env: "CODEREFINE_TEST_LOADER_KEY2".to_string(),
            required: true,
        };
        temp_env::with_var("CODEREFINE_TEST_LOADER_KEY2", Some("sk-test"), || {
            assert_eq!(
                ConfigLoader::resolve_credential(&credentials),
                Ok(Some("sk-test".to_string()))
            );
        });
        credentials.required = false;
        temp_env::with_var("CODEREFINE_TEST_LOADER_KEY2", None::<&str>, || {
            assert_eq!(ConfigLoader::resolve_credential(&credentials), Ok(None));
        });
    }
}
