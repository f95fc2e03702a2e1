use std::env;
use std::fmt;

use crate::mechanism::{MechanismKind, UnknownMechanism};

/// Distinguishes runtime behavior for different stages of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the admissions tooling.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub run: RunConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("ADMISSIONS_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("ADMISSIONS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mechanism = match env::var("ADMISSIONS_MECHANISM") {
            Ok(value) => value
                .parse::<MechanismKind>()
                .map_err(|source| ConfigError::InvalidMechanism { source })?,
            Err(_) => MechanismKind::DeferredAcceptance,
        };

        let trace_steps = match env::var("ADMISSIONS_TRACE_STEPS") {
            Ok(value) => parse_flag("ADMISSIONS_TRACE_STEPS", &value)?,
            Err(_) => false,
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            run: RunConfig {
                mechanism,
                trace_steps,
            },
        })
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
    }
}

/// Defaults for a mechanism run when the command line does not override them.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mechanism: MechanismKind,
    /// Record and print every round, not only the final allocation.
    pub trace_steps: bool,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidMechanism { source: UnknownMechanism },
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidMechanism { source } => {
                write!(f, "ADMISSIONS_MECHANISM is invalid: {}", source)
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{} must be true or false, got '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidMechanism { source } => Some(source),
            ConfigError::InvalidFlag { .. } => None,
        }
    }
}
