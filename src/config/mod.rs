use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RegistrationError;
use crate::logging::LoggingConfig;
use crate::transform::TransformFamily;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub registration: RegistrationConfig,
    pub color: ColorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub family: TransformFamily,
    /// Slice everything is aligned to; `None` picks the middle slice.
    pub reference_index: Option<usize>,
    pub log_path: PathBuf,
    pub log_mode: LogMode,
    /// Run the backward and forward sweeps concurrently.
    pub parallel_sweeps: bool,
}

/// Whether a run records a new transform log or replays an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogMode {
    Write,
    Replay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub weighting: ColorWeighting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorWeighting {
    /// Weights along the first principal component of the stack's colors.
    PrincipalComponent,
    /// Fixed ITU-R BT.601 luma weights.
    Bt601,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            family: TransformFamily::RigidBody,
            reference_index: None,
            log_path: PathBuf::from("TransformationMatrices.txt"),
            log_mode: LogMode::Write,
            parallel_sweeps: false,
        }
    }
}

impl RegistrationConfig {
    /// Configured reference, or the middle slice of `len`.
    pub fn reference_for(&self, len: usize) -> usize {
        self.reference_index.unwrap_or(len / 2)
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            weighting: ColorWeighting::PrincipalComponent,
        }
    }
}

impl Config {
    /// JSON if the file starts with `{`, TOML otherwise.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;

        if content.trim_start().starts_with('{') {
            serde_json::from_str(&content).map_err(|e| RegistrationError::Config(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| RegistrationError::Config(e.to_string()))
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: ConfigFormat) -> Result<()> {
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| RegistrationError::Config(e.to_string()))?,
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| RegistrationError::Config(e.to_string()))?
            }
        };

        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.registration.log_path.as_os_str().is_empty() {
            errors.push("Registration log_path must not be empty".to_string());
        }

        if self.registration.log_mode == LogMode::Replay && !self.registration.log_path.exists() {
            errors.push(format!(
                "Replay log does not exist: {}",
                self.registration.log_path.display()
            ));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConfigFormat {
    Json,
    Toml,
}

pub fn load_config_or_default(config_path: Option<&Path>) -> Config {
    match config_path {
        Some(path) => match Config::load_from_file(path) {
            Ok(config) => {
                if let Err(errors) = config.validate() {
                    for error in &errors {
                        tracing::warn!(%error, "configuration validation error");
                    }
                    eprintln!("Configuration validation errors:");
                    for error in errors {
                        eprintln!("  - {}", error);
                    }
                    eprintln!("Using default configuration instead.");
                    Config::default()
                } else {
                    config
                }
            }
            Err(e) => {
                eprintln!("Failed to load config from '{}': {}", path.display(), e);
                eprintln!("Using default configuration.");
                Config::default()
            }
        },
        None => Config::default(),
    }
}
