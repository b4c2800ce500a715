use crate::config::{SourceKind, SuiteConfig};
use crate::error::{Result, SuiteError};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Companion
// ---------------------------------------------------------------------------

/// Datastore applications deployed next to the charm under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Companion {
    Redis,
    Postgresql,
    Mysql,
}

impl Companion {
    pub const ALL: [Companion; 3] = [Companion::Redis, Companion::Postgresql, Companion::Mysql];

    pub fn as_str(self) -> &'static str {
        match self {
            Companion::Redis => "redis",
            Companion::Postgresql => "postgresql",
            Companion::Mysql => "mysql",
        }
    }
}

impl fmt::Display for Companion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TestCase
// ---------------------------------------------------------------------------

/// One (series, source) point of the matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    pub charm: String,
    pub series: String,
    /// Every scenario of this case is expected to fail.
    pub canary: bool,
    pub source: SourceKind,
    /// What `juju deploy` is given: a build directory or a charm URL.
    pub location: String,
}

impl TestCase {
    /// `<charm>-<series>-<source>`
    pub fn app_name(&self) -> String {
        format!("{}-{}-{}", self.charm, self.series, self.source.id())
    }

    /// Stable identifier used in reports, e.g. `bionic-local`.
    pub fn id(&self) -> String {
        format!("{}-{}", self.series, self.source.id())
    }

    /// Deployed from the charm store. Skips scenarios that only make sense
    /// for the locally built artifact.
    pub fn is_store_variant(&self) -> bool {
        self.app_name().ends_with(SourceKind::Jujucharms.id())
    }

    /// Deployed from the local build. Skips the upgrade.
    pub fn is_local_variant(&self) -> bool {
        self.app_name().ends_with(SourceKind::Local.id())
    }

    /// `<charm>-<companion>-<series>`, shared by every source of a series.
    pub fn companion_name(&self, companion: Companion) -> String {
        format!("{}-{}-{}", self.charm, companion.as_str(), self.series)
    }

    /// Every application this case deploys: the charm under test, then its
    /// companions.
    pub fn application_names(&self) -> Vec<String> {
        let mut names = vec![self.app_name()];
        names.extend(Companion::ALL.iter().map(|&c| self.companion_name(c)));
        names
    }
}

// ---------------------------------------------------------------------------
// TestMatrix
// ---------------------------------------------------------------------------

/// The series × source cross product, in configuration order
/// (series-major, like stacked pytest parametrization).
#[derive(Debug, Clone, Serialize)]
pub struct TestMatrix {
    local_build: String,
    cases: Vec<TestCase>,
}

impl TestMatrix {
    pub fn build(config: &SuiteConfig, repository: &Path) -> Result<Self> {
        let local_build = local_build_path(repository, &config.charm);
        let mut cases = Vec::with_capacity(config.series.len() * config.sources.len());

        for series in &config.series {
            for source in &config.sources {
                let location = match source.kind {
                    SourceKind::Local => local_build.clone(),
                    SourceKind::Jujucharms => source.location.clone().ok_or_else(|| {
                        SuiteError::InvalidConfig(
                            "source 'jujucharms' requires a location".to_string(),
                        )
                    })?,
                };
                let case = TestCase {
                    charm: config.charm.clone(),
                    series: series.name.clone(),
                    canary: series.canary,
                    source: source.kind,
                    location,
                };
                for name in case.application_names() {
                    validate_application_name(&name)?;
                }
                cases.push(case);
            }
        }

        Ok(TestMatrix { local_build, cases })
    }

    /// Keep only the cases of the given series. An empty filter keeps all.
    pub fn filter_series(&mut self, series: &[String]) -> Result<()> {
        if series.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = series
            .iter()
            .find(|s| !self.cases.iter().any(|c| &c.series == *s))
        {
            return Err(SuiteError::UnknownSeries(unknown.clone()));
        }
        self.cases.retain(|c| series.contains(&c.series));
        Ok(())
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Directory the upgrade scenario switches to.
    pub fn local_build(&self) -> &str {
        &self.local_build
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// `<repository>/builds/<charm>`, with any trailing `/` of the repository
/// removed first.
pub fn local_build_path(repository: &Path, charm: &str) -> String {
    let repo = repository.to_string_lossy();
    format!("{}/builds/{charm}", repo.trim_end_matches('/'))
}

// ---------------------------------------------------------------------------
// Application name validation
// ---------------------------------------------------------------------------

static APP_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn app_name_re() -> &'static Regex {
    APP_NAME_RE.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]*[a-z][a-z0-9]*)*$").unwrap()
    })
}

/// Juju application names: lowercase, hyphen separated, no part made only
/// of digits.
pub fn validate_application_name(name: &str) -> Result<()> {
    if !app_name_re().is_match(name) {
        return Err(SuiteError::InvalidApplicationName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
