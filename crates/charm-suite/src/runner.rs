//! Scenario runner.
//!
//! Every scenario follows the same shape: issue one juju command, poll
//! `juju status` until the expected state (or `error`) shows up, then check
//! the snapshot the last poll returned. Scenarios run scenario-major: the
//! whole matrix goes through `deploy`, then through `deploy-status`, and so
//! on, so companions deployed by the local case exist before a store case
//! of the same series relates to them.

use crate::config::SuiteConfig;
use crate::error::{Result, SuiteError};
use crate::matrix::{Companion, TestCase, TestMatrix};
use crate::report::{Outcome, ScenarioReport, SuiteReport};
use crate::scenario::{Expectation, Scenario};
use chrono::Utc;
use juju_driver::{
    ActionStatus, ApplicationStatus, Controller, DeployRequest, JujuError, Model, ModelStatus,
    Status, Unit,
};
use std::time::Instant;
use tracing::{info, warn};

/// Command run by the run-command scenario and the text it must print.
pub const ECHO_COMMAND: &str = "echo test";
pub const ECHO_EXPECTED: &str = "test";

/// Mode, owner and group of the charm's `metadata.yaml` on the unit.
pub const EXPECTED_FILEMODE: &str = "-rw-r--r--";
pub const EXPECTED_UID: u32 = 0;
pub const EXPECTED_GID: u32 = 0;

/// Path of the deployed charm's metadata on `unit`.
pub fn metadata_path(unit: &Unit) -> String {
    format!("/var/lib/juju/agents/{}/charm/metadata.yaml", unit.agent_dir())
}

#[derive(Debug, Clone, Copy)]
enum RelationChange {
    Add,
    Remove,
}

// ---------------------------------------------------------------------------
// SuiteRunner
// ---------------------------------------------------------------------------

pub struct SuiteRunner<C> {
    model: Model<C>,
    config: SuiteConfig,
    matrix: TestMatrix,
    selection: Vec<Scenario>,
}

impl<C: Controller> SuiteRunner<C> {
    /// Polling and invocation policy of `model` are taken from `config`.
    pub fn new(model: Model<C>, config: SuiteConfig, matrix: TestMatrix) -> Self {
        let model = model
            .with_poll(config.poll_config())
            .with_policy(config.invocation_policy());
        SuiteRunner {
            model,
            config,
            matrix,
            selection: Scenario::ALL.to_vec(),
        }
    }

    /// Restrict the run to `only`, keeping execution order. An empty slice
    /// selects everything.
    pub fn select(mut self, only: &[Scenario]) -> Self {
        self.selection = if only.is_empty() {
            Scenario::ALL.to_vec()
        } else {
            Scenario::ALL
                .into_iter()
                .filter(|s| only.contains(s))
                .collect()
        };
        self
    }

    pub fn selection(&self) -> &[Scenario] {
        &self.selection
    }

    pub fn model(&self) -> &Model<C> {
        &self.model
    }

    pub fn into_model(self) -> Model<C> {
        self.model
    }

    pub async fn run(&self) -> SuiteReport {
        let started_at = Utc::now();
        info!(
            model = %self.model.name(),
            cases = self.matrix.cases().len(),
            scenarios = self.selection.len(),
            "starting suite"
        );

        let mut results = Vec::new();
        for &scenario in &self.selection {
            for case in self.matrix.cases() {
                results.push(self.run_scenario(case, scenario).await);
            }
        }

        let report = SuiteReport {
            model: self.model.name().to_string(),
            started_at,
            finished_at: Utc::now(),
            results,
        };
        info!(summary = %report.summary(), "suite finished");
        report
    }

    pub async fn run_scenario(&self, case: &TestCase, scenario: Scenario) -> ScenarioReport {
        let application = case.app_name();
        let start = Instant::now();
        info!(case = %case.id(), scenario = %scenario, "running scenario");

        let outcome = match scenario.skip_reason(case) {
            Some(reason) => Outcome::Skipped {
                reason: reason.to_string(),
            },
            None => settle(case, scenario, self.execute(case, scenario).await),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            Outcome::Failed { reason } => warn!(
                case = %case.id(),
                scenario = %scenario,
                duration_ms,
                reason = %reason,
                "scenario failed"
            ),
            other => info!(
                case = %case.id(),
                scenario = %scenario,
                duration_ms,
                outcome = other.label(),
                "scenario finished"
            ),
        }

        ScenarioReport {
            case: case.id(),
            application,
            scenario,
            outcome,
            duration_ms,
        }
    }

    async fn execute(&self, case: &TestCase, scenario: Scenario) -> Result<()> {
        match scenario {
            Scenario::Deploy => self.deploy(case).await,
            Scenario::DeployStatus => self.deploy_status(case).await,
            Scenario::RedisDeploy => self.deploy_companion(case, Companion::Redis).await,
            Scenario::PostgresqlDeploy => self.deploy_companion(case, Companion::Postgresql).await,
            Scenario::MysqlDeploy => self.deploy_companion(case, Companion::Mysql).await,
            Scenario::RedisRelate => {
                self.change_relation(
                    case,
                    RelationChange::Add,
                    Companion::Redis,
                    ("redis", None),
                    Status::Blocked,
                )
                .await
            }
            Scenario::PostgresqlRelate => {
                self.change_relation(
                    case,
                    RelationChange::Add,
                    Companion::Postgresql,
                    ("pgsql", Some("db")),
                    Status::Active,
                )
                .await
            }
            Scenario::Upgrade => self.upgrade(case).await,
            Scenario::ReconfigureAction => self.reconfigure_action(case).await,
            Scenario::RunCommand => self.run_command(case).await,
            Scenario::FileStat => self.file_stat(case).await,
            Scenario::PostgresqlUnrelate => {
                self.change_relation(
                    case,
                    RelationChange::Remove,
                    Companion::Postgresql,
                    ("pgsql", Some("db")),
                    Status::Blocked,
                )
                .await
            }
            Scenario::MysqlRelate => {
                self.change_relation(
                    case,
                    RelationChange::Add,
                    Companion::Mysql,
                    ("db", None),
                    Status::Active,
                )
                .await
            }
        }
    }

    // -----------------------------------------------------------------------
    // Scenarios
    // -----------------------------------------------------------------------

    async fn deploy(&self, case: &TestCase) -> Result<()> {
        let app = case.app_name();
        let request = DeployRequest::new(&case.location, &app)
            .series(&case.series)
            .force(case.canary);
        self.model.deploy(&request).await?;
        self.model.wait_for_new_application(&app).await?;
        self.model
            .block_until(&format!("{app} to be waiting"), |s| {
                s.application_status(&app) == Status::Waiting
            })
            .await?;
        Ok(())
    }

    async fn deploy_status(&self, case: &TestCase) -> Result<()> {
        let app = case.app_name();
        let unit = self.first_unit(&app).await?;
        self.wait_for_agent(&unit, &[Status::Idle, Status::Error])
            .await?;
        let snapshot = self
            .wait_for(&app, &[Status::Blocked, Status::Error])
            .await?;
        expect_agent_not_error(&snapshot, &unit)?;
        expect_not_error(&snapshot, &app)
    }

    async fn deploy_companion(&self, case: &TestCase, companion: Companion) -> Result<()> {
        self.application(&case.app_name()).await?;

        let charm = self.config.companions.get(companion);
        let name = case.companion_name(companion);
        let request = DeployRequest::new(&charm.charm, &name).series(&charm.series);
        self.model.deploy(&request).await?;
        self.model.wait_for_new_application(&name).await?;
        let snapshot = self
            .wait_for(&name, &[Status::Active, Status::Error])
            .await?;
        expect_not_error(&snapshot, &name)
    }

    /// Add or remove the relation between `<app>:<endpoint>` and the
    /// companion, then wait for the companion to settle and for the
    /// application to reach `expected`.
    async fn change_relation(
        &self,
        case: &TestCase,
        change: RelationChange,
        companion: Companion,
        (endpoint, companion_endpoint): (&str, Option<&str>),
        expected: Status,
    ) -> Result<()> {
        let app = case.app_name();
        let other = case.companion_name(companion);
        let status = self.model.status().await?;
        require_application(&status, &app)?;
        require_application(&status, &other)?;

        let a = format!("{app}:{endpoint}");
        let b = match companion_endpoint {
            Some(e) => format!("{other}:{e}"),
            None => other.clone(),
        };
        match change {
            RelationChange::Add => self.model.add_relation(&a, &b).await?,
            RelationChange::Remove => self.model.remove_relation(&a, &b).await?,
        }

        self.wait_for(&other, &[Status::Active, Status::Error])
            .await?;
        let snapshot = self.wait_for(&app, &[expected, Status::Error]).await?;
        expect_not_error(&snapshot, &other)?;
        expect_not_error(&snapshot, &app)
    }

    async fn upgrade(&self, case: &TestCase) -> Result<()> {
        let app = case.app_name();
        let unit = self.first_unit(&app).await?;
        self.wait_for_agent(&unit, &[Status::Idle]).await?;
        self.model
            .upgrade_charm(&app, self.matrix.local_build())
            .await?;
        self.wait_for_agent(&unit, &[Status::Idle, Status::Error])
            .await?;
        let snapshot = self
            .wait_for(&app, &[Status::Active, Status::Error])
            .await?;
        expect_agent_not_error(&snapshot, &unit)?;
        expect_not_error(&snapshot, &app)
    }

    async fn reconfigure_action(&self, case: &TestCase) -> Result<()> {
        let unit = self.first_unit(&case.app_name()).await?;
        let action = self.model.run_action(&unit, &self.config.action).await?;
        let result = action.wait().await?;
        if result.status != ActionStatus::Completed {
            return Err(SuiteError::Assertion(format!(
                "action {} on {unit} finished as {}{}",
                action.name(),
                result.status,
                result
                    .message
                    .map(|m| format!(": {m}"))
                    .unwrap_or_default()
            )));
        }
        Ok(())
    }

    async fn run_command(&self, case: &TestCase) -> Result<()> {
        let unit = self.first_unit(&case.app_name()).await?;
        let result = self.model.run_command(ECHO_COMMAND, &unit).await?;
        if result.code != "0" {
            return Err(SuiteError::Assertion(format!(
                "`{ECHO_COMMAND}` on {unit} exited with code {}: {}",
                result.code,
                result.stderr.trim()
            )));
        }
        if !result.stdout.contains(ECHO_EXPECTED) {
            return Err(SuiteError::Assertion(format!(
                "`{ECHO_COMMAND}` on {unit} printed {:?}",
                result.stdout
            )));
        }
        Ok(())
    }

    async fn file_stat(&self, case: &TestCase) -> Result<()> {
        let unit = self.first_unit(&case.app_name()).await?;
        let path = metadata_path(&unit);
        let stat = self.model.file_stat(&path, &unit).await?;

        let mode = stat.filemode();
        if mode != EXPECTED_FILEMODE {
            return Err(SuiteError::Assertion(format!(
                "{path} has mode {mode}, expected {EXPECTED_FILEMODE}"
            )));
        }
        if (stat.uid, stat.gid) != (EXPECTED_UID, EXPECTED_GID) {
            return Err(SuiteError::Assertion(format!(
                "{path} is owned by {}:{}, expected {EXPECTED_UID}:{EXPECTED_GID}",
                stat.uid, stat.gid
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn application(&self, name: &str) -> Result<ApplicationStatus> {
        self.model.application(name).await.map_err(|e| match e {
            JujuError::ApplicationNotFound(name) => SuiteError::ApplicationNotFound(name),
            other => other.into(),
        })
    }

    async fn first_unit(&self, app: &str) -> Result<Unit> {
        self.application(app)
            .await?
            .first_unit()
            .ok_or_else(|| SuiteError::NoUnits(app.to_string()))
    }

    async fn wait_for(&self, app: &str, targets: &[Status]) -> Result<ModelStatus> {
        let label = format!("{app} to be {}", describe(targets));
        let snapshot = self
            .model
            .block_until(&label, |s| s.application_status(app).is_any_of(targets))
            .await?;
        Ok(snapshot)
    }

    async fn wait_for_agent(&self, unit: &Unit, targets: &[Status]) -> Result<ModelStatus> {
        let label = format!("{unit} agent to be {}", describe(targets));
        let snapshot = self
            .model
            .block_until(&label, |s| {
                s.agent_status(unit.entity_id()).is_any_of(targets)
            })
            .await?;
        Ok(snapshot)
    }
}

/// Map a scenario result onto an outcome, honoring expected failures.
fn settle(case: &TestCase, scenario: Scenario, result: Result<()>) -> Outcome {
    let expect_failure = case.canary || scenario.expectation() == Expectation::Fail;
    match (result, expect_failure) {
        (Ok(()), false) => Outcome::Passed,
        (Ok(()), true) => Outcome::XPassed,
        (Err(e), false) => Outcome::Failed {
            reason: e.to_string(),
        },
        (Err(e), true) => Outcome::XFailed {
            reason: e.to_string(),
        },
    }
}

fn describe(targets: &[Status]) -> String {
    targets
        .iter()
        .map(Status::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}

fn require_application(status: &ModelStatus, name: &str) -> Result<()> {
    if status.application(name).is_none() {
        return Err(SuiteError::ApplicationNotFound(name.to_string()));
    }
    Ok(())
}

fn expect_not_error(snapshot: &ModelStatus, app: &str) -> Result<()> {
    let status = snapshot.application_status(app);
    if status.is_error() {
        let message = snapshot
            .application(app)
            .and_then(|a| a.status.message.clone())
            .map(|m| format!(": {m}"))
            .unwrap_or_default();
        return Err(SuiteError::Assertion(format!(
            "application {app} is in error{message}"
        )));
    }
    Ok(())
}

fn expect_agent_not_error(snapshot: &ModelStatus, unit: &Unit) -> Result<()> {
    if snapshot.agent_status(unit.entity_id()).is_error() {
        return Err(SuiteError::Assertion(format!(
            "unit {unit} agent is in error"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
