pub mod matrix;
pub mod run;
pub mod scenarios;

use anyhow::Context;
use charm_suite::{SuiteConfig, TestMatrix, WarnLevel};
use std::path::{Path, PathBuf};

/// Global flags shared by every subcommand.
pub struct Settings {
    pub juju: Option<PathBuf>,
    pub model: Option<String>,
    pub repository: PathBuf,
    pub config: Option<PathBuf>,
    pub json: bool,
}

impl Settings {
    /// Load the suite config (or the defaults) and refuse it if it has errors.
    pub fn suite_config(&self) -> anyhow::Result<SuiteConfig> {
        let config = match &self.config {
            Some(path) => SuiteConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => SuiteConfig::default(),
        };
        check(&config)?;
        Ok(config)
    }

    pub fn matrix(&self, config: &SuiteConfig) -> anyhow::Result<TestMatrix> {
        TestMatrix::build(config, &self.repository).context("failed to build test matrix")
    }

    pub fn juju(&self) -> Option<&Path> {
        self.juju.as_deref()
    }
}

fn check(config: &SuiteConfig) -> anyhow::Result<()> {
    let warnings = config.validate();
    for w in &warnings {
        match w.level {
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            WarnLevel::Error => eprintln!("[error] {}", w.message),
        }
    }
    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
