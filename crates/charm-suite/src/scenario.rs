use crate::error::SuiteError;
use crate::matrix::TestCase;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// The fixed lifecycle script, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Deploy,
    DeployStatus,
    RedisDeploy,
    PostgresqlDeploy,
    MysqlDeploy,
    RedisRelate,
    PostgresqlRelate,
    Upgrade,
    ReconfigureAction,
    RunCommand,
    FileStat,
    PostgresqlUnrelate,
    MysqlRelate,
}

impl Scenario {
    pub const ALL: [Scenario; 13] = [
        Scenario::Deploy,
        Scenario::DeployStatus,
        Scenario::RedisDeploy,
        Scenario::PostgresqlDeploy,
        Scenario::MysqlDeploy,
        Scenario::RedisRelate,
        Scenario::PostgresqlRelate,
        Scenario::Upgrade,
        Scenario::ReconfigureAction,
        Scenario::RunCommand,
        Scenario::FileStat,
        Scenario::PostgresqlUnrelate,
        Scenario::MysqlRelate,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Scenario::Deploy => "deploy",
            Scenario::DeployStatus => "deploy-status",
            Scenario::RedisDeploy => "redis-deploy",
            Scenario::PostgresqlDeploy => "postgresql-deploy",
            Scenario::MysqlDeploy => "mysql-deploy",
            Scenario::RedisRelate => "redis-relate",
            Scenario::PostgresqlRelate => "postgresql-relate",
            Scenario::Upgrade => "upgrade",
            Scenario::ReconfigureAction => "reconfigure-action",
            Scenario::RunCommand => "run-command",
            Scenario::FileStat => "file-stat",
            Scenario::PostgresqlUnrelate => "postgresql-unrelate",
            Scenario::MysqlRelate => "mysql-relate",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Scenario::Deploy => "deploy the charm and wait for it to report waiting",
            Scenario::DeployStatus => "unit settles and the application is blocked on its relations",
            Scenario::RedisDeploy => "deploy the Redis companion and wait for active",
            Scenario::PostgresqlDeploy => "deploy the PostgreSQL companion and wait for active",
            Scenario::MysqlDeploy => "deploy the MySQL companion and wait for active",
            Scenario::RedisRelate => "relate Redis; the application stays blocked",
            Scenario::PostgresqlRelate => "relate PostgreSQL; the application becomes active",
            Scenario::Upgrade => "upgrade-charm --switch to the local build",
            Scenario::ReconfigureAction => "run the reconfigure action to completion",
            Scenario::RunCommand => "run `echo test` on the first unit",
            Scenario::FileStat => "charm metadata.yaml is -rw-r--r-- root:root",
            Scenario::PostgresqlUnrelate => "remove the PostgreSQL relation; the application is blocked again",
            Scenario::MysqlRelate => "relate MySQL as the database backend",
        }
    }

    /// Known-broken scenarios report `xfail` / `xpass` instead of
    /// `failed` / `passed`.
    pub fn expectation(self) -> Expectation {
        match self {
            Scenario::MysqlRelate => Expectation::Fail,
            _ => Expectation::Pass,
        }
    }

    pub fn skip_policy(self) -> SkipPolicy {
        match self {
            Scenario::RedisDeploy
            | Scenario::PostgresqlDeploy
            | Scenario::MysqlDeploy
            | Scenario::ReconfigureAction
            | Scenario::RunCommand
            | Scenario::FileStat => SkipPolicy::StoreVariant,
            Scenario::Upgrade => SkipPolicy::LocalVariant,
            _ => SkipPolicy::Never,
        }
    }

    /// Why `case` does not run this scenario, if it doesn't.
    pub fn skip_reason(self, case: &TestCase) -> Option<&'static str> {
        match self.skip_policy() {
            SkipPolicy::StoreVariant if case.is_store_variant() => {
                Some("not exercised for charm store deployments")
            }
            SkipPolicy::LocalVariant if case.is_local_variant() => {
                Some("upgrade is only tested for charm store deployments")
            }
            _ => None,
        }
    }

    pub fn from_slug(slug: &str) -> Result<Self, SuiteError> {
        Self::ALL
            .into_iter()
            .find(|s| s.slug() == slug)
            .ok_or_else(|| SuiteError::UnknownScenario(slug.to_string()))
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Scenario {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::from_slug(s)
    }
}

// ---------------------------------------------------------------------------
// Expectation / SkipPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Pass,
    Fail,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Expectation::Pass => "pass",
            Expectation::Fail => "xfail",
        })
    }
}

/// Which application-name suffix makes a scenario inapplicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipPolicy {
    Never,
    /// Skipped when the name ends with `jujucharms`
    StoreVariant,
    /// Skipped when the name ends with `local`
    LocalVariant,
}

impl fmt::Display for SkipPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipPolicy::Never => "-",
            SkipPolicy::StoreVariant => "store variant",
            SkipPolicy::LocalVariant => "local variant",
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
