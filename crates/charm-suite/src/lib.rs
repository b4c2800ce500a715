//! `charm-suite`: deployment scenarios for charm functional testing.
//!
//! A [`TestMatrix`] (series × source) is built from a [`SuiteConfig`], and a
//! [`SuiteRunner`] walks every [`Scenario`] across it against a connected
//! [`juju_driver::Model`], producing a [`SuiteReport`].

pub mod config;
pub mod error;
pub mod matrix;
pub mod report;
pub mod runner;
pub mod scenario;

pub use config::{
    CompanionConfig, CompanionsConfig, ConfigWarning, PollingConfig, SeriesConfig, SourceConfig,
    SourceKind, SuiteConfig, WarnLevel,
};
pub use error::{Result, SuiteError};
pub use matrix::{local_build_path, validate_application_name, Companion, TestCase, TestMatrix};
pub use report::{Outcome, ScenarioReport, SuiteReport, Summary};
pub use runner::SuiteRunner;
pub use scenario::{Expectation, Scenario, SkipPolicy};
