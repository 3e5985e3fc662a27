//! Logging configuration
//!
//! Per-component levels and output destinations for the tracing subscriber.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    pub global_level: String,

    /// Enable console output
    pub console_output: bool,

    /// Directory for daily JSON log files (None = no file logging)
    pub log_directory: Option<PathBuf>,

    /// Include file location in console logs
    pub include_file_location: bool,

    /// Level for the eigen/linear solvers and color reduction
    pub numeric_level: String,

    /// Level for chain composition and the transform log
    pub registration_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_level: "info".to_string(),
            console_output: true,
            log_directory: None,
            include_file_location: false,
            numeric_level: "warn".to_string(),
            registration_level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Verbose console logging plus JSON files under `logs/`.
    pub fn development() -> Self {
        Self {
            global_level: "debug".to_string(),
            log_directory: Some(PathBuf::from("logs")),
            include_file_location: true,
            numeric_level: "debug".to_string(),
            registration_level: "trace".to_string(),
            ..Self::default()
        }
    }

    /// Level implied by a `-v` count on the command line.
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        let level = match verbose {
            0 => return self,
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        self.global_level = level.to_string();
        self.numeric_level = level.to_string();
        self.registration_level = level.to_string();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, level) in [
            ("global_level", &self.global_level),
            ("numeric_level", &self.numeric_level),
            ("registration_level", &self.registration_level),
        ] {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(format!(
                    "Invalid {name}: {level}. Must be one of: {VALID_LEVELS:?}"
                ));
            }
        }

        if let Some(ref log_dir) = self.log_directory {
            if let Some(parent) = log_dir.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(format!("Log directory parent does not exist: {:?}", parent));
                }
            }
        }

        Ok(())
    }

    /// Effective level for a component, falling back to the global level.
    pub fn get_component_level(&self, component: &str) -> &str {
        match component {
            "numeric" | "color" => &self.numeric_level,
            "registration" | "pipeline" => &self.registration_level,
            _ => &self.global_level,
        }
    }

    /// `EnvFilter` directives: global level for the crate, overridden per module.
    pub fn filter_directives(&self) -> String {
        let krate = env!("CARGO_PKG_NAME").replace('-', "_");
        format!(
            "{krate}={global},{krate}::numeric={numeric},{krate}::color={numeric},\
             {krate}::registration={registration},{krate}::pipeline={registration}",
            global = self.global_level,
            numeric = self.numeric_level,
            registration = self.registration_level,
        )
    }
}
