use crate::error::{Result, SuiteError};
use crate::matrix::Companion;
use juju_driver::{InvocationPolicy, PollConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SeriesConfig
// ---------------------------------------------------------------------------

/// One OS series of the test matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub name: String,
    /// Expected to fail: every scenario of this series is reported as
    /// xfail/xpass and deploy passes `--force`.
    #[serde(default)]
    pub canary: bool,
}

impl SeriesConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            canary: false,
        }
    }
}

fn default_series() -> Vec<SeriesConfig> {
    vec![SeriesConfig::new("bionic")]
}

// ---------------------------------------------------------------------------
// SourceKind / SourceConfig
// ---------------------------------------------------------------------------

/// Where the charm under test comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Locally built artifact under `$JUJU_REPOSITORY/builds/<charm>`
    Local,
    /// Published charm store URL
    Jujucharms,
}

impl SourceKind {
    /// Suffix of the application name for this source.
    pub fn id(self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::Jujucharms => "jujucharms",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Charm URL. Required for `jujucharms`; ignored for `local`, whose
    /// location is derived from the repository path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

fn default_sources() -> Vec<SourceConfig> {
    vec![SourceConfig {
        kind: SourceKind::Local,
        location: None,
    }]
}

// ---------------------------------------------------------------------------
// CompanionsConfig
// ---------------------------------------------------------------------------

/// A datastore deployed next to the charm under test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionConfig {
    pub charm: String,
    pub series: String,
}

impl CompanionConfig {
    fn new(charm: &str, series: &str) -> Self {
        Self {
            charm: charm.to_string(),
            series: series.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionsConfig {
    #[serde(default = "default_redis")]
    pub redis: CompanionConfig,
    #[serde(default = "default_postgresql")]
    pub postgresql: CompanionConfig,
    #[serde(default = "default_mysql")]
    pub mysql: CompanionConfig,
}

fn default_redis() -> CompanionConfig {
    CompanionConfig::new("cs:~omnivector/redis", "xenial")
}

fn default_postgresql() -> CompanionConfig {
    CompanionConfig::new("cs:postgresql", "bionic")
}

fn default_mysql() -> CompanionConfig {
    CompanionConfig::new("cs:mysql", "xenial")
}

impl Default for CompanionsConfig {
    fn default() -> Self {
        Self {
            redis: default_redis(),
            postgresql: default_postgresql(),
            mysql: default_mysql(),
        }
    }
}

impl CompanionsConfig {
    pub fn get(&self, companion: Companion) -> &CompanionConfig {
        match companion {
            Companion::Redis => &self.redis,
            Companion::Postgresql => &self.postgresql,
            Companion::Mysql => &self.mysql,
        }
    }
}

// ---------------------------------------------------------------------------
// PollingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

fn default_interval_secs() -> u64 {
    2
}

fn default_max_wait_secs() -> u64 {
    30 * 60
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// SuiteConfig
// ---------------------------------------------------------------------------

/// Suite configuration, optionally loaded from a YAML file.
///
/// Every field has a default, so an empty file (or no file) describes the
/// stock GitLab matrix: `bionic` × `local`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    #[serde(default = "default_charm")]
    pub charm: String,
    #[serde(default = "default_series")]
    pub series: Vec<SeriesConfig>,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub companions: CompanionsConfig,
    /// Action exercised by the reconfigure-action scenario
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default)]
    pub polling: PollingConfig,
    /// Await `deploy` / `upgrade-charm` and fail on a non-zero exit
    #[serde(default)]
    pub check_invocations: bool,
}

fn default_charm() -> String {
    "gitlab".to_string()
}

fn default_action() -> String {
    "reconfigure".to_string()
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            charm: default_charm(),
            series: default_series(),
            sources: default_sources(),
            companions: CompanionsConfig::default(),
            action: default_action(),
            polling: PollingConfig::default(),
            check_invocations: false,
        }
    }
}

impl SuiteConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SuiteError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        // An empty document deserializes to unit, not to an empty map.
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: SuiteConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            Duration::from_secs(self.polling.interval_secs),
            Duration::from_secs(self.polling.max_wait_secs),
        )
    }

    pub fn invocation_policy(&self) -> InvocationPolicy {
        if self.check_invocations {
            InvocationPolicy::Checked
        } else {
            InvocationPolicy::FireAndForget
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        if self.charm.trim().is_empty() {
            error("charm must not be empty".to_string());
        }
        if self.series.is_empty() {
            error("at least one series is required".to_string());
        }
        if self.sources.is_empty() {
            error("at least one source is required".to_string());
        }
        if self.action.trim().is_empty() {
            error("action must not be empty".to_string());
        }
        if self.polling.interval_secs == 0 {
            error("polling.interval_secs must be greater than zero".to_string());
        }

        for (i, source) in self.sources.iter().enumerate() {
            if self.sources[..i].iter().any(|s| s.kind == source.kind) {
                error(format!("source '{}' is listed more than once", source.kind));
            }
            if source.kind == SourceKind::Jujucharms
                && source.location.as_deref().is_none_or(|l| l.trim().is_empty())
            {
                error("source 'jujucharms' requires a location".to_string());
            }
        }

        for (i, series) in self.series.iter().enumerate() {
            if self.series[..i].iter().any(|s| s.name == series.name) {
                error(format!("series '{}' is listed more than once", series.name));
            }
        }

        if self.polling.max_wait_secs < self.polling.interval_secs {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "polling.max_wait_secs is shorter than one interval; every wait probes once"
                    .to_string(),
            });
        }
        if self.sources.iter().any(|s| s.kind == SourceKind::Local && s.location.is_some()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "location is ignored for the local source".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn errors(cfg: &SuiteConfig) -> Vec<String> {
        cfg.validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect()
    }

    #[test]
    fn defaults_describe_the_gitlab_matrix() {
        let cfg = SuiteConfig::default();
        assert_eq!(cfg.charm, "gitlab");
        assert_eq!(cfg.series, vec![SeriesConfig::new("bionic")]);
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.sources[0].kind, SourceKind::Local);
        assert_eq!(cfg.companions.redis.charm, "cs:~omnivector/redis");
        assert_eq!(cfg.companions.mysql.series, "xenial");
        assert_eq!(cfg.companions.postgresql.series, "bionic");
        assert_eq!(cfg.action, "reconfigure");
        assert_eq!(cfg.invocation_policy(), InvocationPolicy::FireAndForget);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = r#"
series:
  - name: bionic
  - name: cosmic
    canary: true
sources:
  - kind: local
  - kind: jujucharms
    location: cs:~pirate-charmers/gitlab
companions:
  redis:
    charm: cs:redis
    series: bionic
polling:
  interval_secs: 5
check_invocations: true
"#;
        let cfg: SuiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.charm, "gitlab");
        assert!(cfg.series[1].canary);
        assert_eq!(
            cfg.sources[1].location.as_deref(),
            Some("cs:~pirate-charmers/gitlab")
        );
        assert_eq!(cfg.companions.redis.charm, "cs:redis");
        assert_eq!(cfg.companions.mysql, default_mysql());
        assert_eq!(
            cfg.poll_config(),
            PollConfig::new(Duration::from_secs(5), Duration::from_secs(1800))
        );
        assert_eq!(cfg.invocation_policy(), InvocationPolicy::Checked);
        assert!(errors(&cfg).is_empty());
    }

    #[test]
    fn load_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let err = SuiteConfig::load(&dir.path().join("charm-ft.yaml")).unwrap_err();
        assert!(matches!(err, SuiteError::ConfigNotFound(_)));
    }

    #[test]
    fn load_empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("charm-ft.yaml");
        std::fs::write(&path, "\n").unwrap();
        let cfg = SuiteConfig::load(&path).unwrap();
        assert_eq!(cfg.charm, "gitlab");
    }

    #[test]
    fn load_reads_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("charm-ft.yaml");
        std::fs::write(&path, "charm: mattermost\naction: restart\n").unwrap();
        let cfg = SuiteConfig::load(&path).unwrap();
        assert_eq!(cfg.charm, "mattermost");
        assert_eq!(cfg.action, "restart");
    }

    #[test]
    fn load_rejects_malformed_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("charm-ft.yaml");
        std::fs::write(&path, "series: [unterminated\n").unwrap();
        assert!(matches!(
            SuiteConfig::load(&path).unwrap_err(),
            SuiteError::Yaml(_)
        ));
    }

    #[test]
    fn store_source_requires_location() {
        let mut cfg = SuiteConfig::default();
        cfg.sources.push(SourceConfig {
            kind: SourceKind::Jujucharms,
            location: None,
        });
        assert_eq!(errors(&cfg), vec!["source 'jujucharms' requires a location"]);
    }

    #[test]
    fn duplicates_and_empty_lists_are_errors() {
        let mut cfg = SuiteConfig::default();
        cfg.series.push(SeriesConfig::new("bionic"));
        cfg.sources.push(cfg.sources[0].clone());
        let errs = errors(&cfg);
        assert!(errs.iter().any(|e| e.contains("series 'bionic'")));
        assert!(errs.iter().any(|e| e.contains("source 'local'")));

        let empty = SuiteConfig {
            series: vec![],
            sources: vec![],
            ..SuiteConfig::default()
        };
        assert_eq!(errors(&empty).len(), 2);
    }

    #[test]
    fn short_max_wait_is_only_a_warning() {
        let mut cfg = SuiteConfig::default();
        cfg.polling.max_wait_secs = 0;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
    }
}
