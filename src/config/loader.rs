//! Configuration Loader
//!
//! Layers an optional TOML file and `BATCHLINE_*` environment variables over
//! the built-in defaults, then validates the merged result.

use ::config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::BatchConfig;
use crate::constants::{self, env};

/// Loaded, validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: BatchConfig,
    environment: String,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration from the default locations and the process environment
    ///
    /// `BATCHLINE_CONFIG` names a file that must exist; otherwise
    /// `config/batchline.toml` is used when present.
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        match std::env::var(env::CONFIG_PATH) {
            Ok(path) => Self::load_with_sources(Some(PathBuf::from(path)), true, None),
            Err(_) => Self::load_with_sources(
                Some(PathBuf::from(constants::DEFAULT_CONFIG_PATH)),
                false,
                None,
            ),
        }
    }

    /// Load configuration from a file that must exist, plus the process environment
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_sources(Some(path.as_ref().to_path_buf()), true, None)
    }

    /// Load configuration from explicit sources
    ///
    /// `env_overrides` replaces the process environment as the source of
    /// `BATCHLINE_*` variables, which keeps tests independent of each other.
    pub fn load_with_sources(
        file: Option<PathBuf>,
        file_required: bool,
        env_overrides: Option<::config::Map<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let environment = crate::logging::get_environment();
        let mut builder = Config::builder();

        let mut source_file = None;
        if let Some(path) = file {
            if path.exists() {
                debug!(path = %path.display(), "Adding configuration file source");
                builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
                source_file = Some(path);
            } else if file_required {
                return Err(ConfigurationError::ConfigFileNotFound { path });
            } else {
                debug!(path = %path.display(), "Optional configuration file not present");
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(env::PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env_overrides),
        );

        let config: BatchConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        info!(
            environment = %environment,
            source_file = ?source_file,
            chunk_size = config.job.chunk_size,
            page_size = config.job.page_size,
            throttle_limit = config.executor.throttle_limit,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
            source_file,
        }))
    }

    /// Wrap an already-built configuration after validating it
    pub fn from_config(config: BatchConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: crate::logging::get_environment(),
            source_file: None,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }
}
