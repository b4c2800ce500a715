use juju_driver::JujuError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid application name '{0}': must be lowercase letters, digits and hyphens, each hyphenated part containing a letter")]
    InvalidApplicationName(String),

    #[error("unknown series '{0}': not part of the configured matrix")]
    UnknownSeries(String),

    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("application not found in model: {0}")]
    ApplicationNotFound(String),

    #[error("application has no units: {0}")]
    NoUnits(String),

    #[error("assertion failed: {0}")]
    Assertion(String),

    #[error(transparent)]
    Juju(#[from] JujuError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SuiteError>;
