use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::controller::Controller;
use crate::poll::{poll_until, PollConfig, PollOutcome};
use crate::types::{
    ActionResult, ApplicationStatus, CommandOutput, CommandResult, FileStat, ModelStatus,
    QueuedAction, RunOutput, Unit,
};
use crate::{JujuError, Result};

// ─── InvocationPolicy ─────────────────────────────────────────────────────

/// How state-changing commands that are followed by a poll are issued.
///
/// Applies to `deploy` and `upgrade-charm`. Relation, action and command
/// calls are always checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvocationPolicy {
    /// Launch in the background and ignore the exit status. A failed
    /// invocation surfaces only through the poll that follows it.
    #[default]
    FireAndForget,
    /// Wait for the command and fail on a non-zero exit status.
    Checked,
}

// ─── DeployRequest ────────────────────────────────────────────────────────

/// Arguments of `juju deploy <charm> -m <model> --series <series> <name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// Charm URL (`cs:postgresql`) or local build path
    pub charm: String,
    pub application: String,
    pub series: Option<String>,
    /// Pass `--force` (deploy onto an unsupported series)
    pub force: bool,
}

impl DeployRequest {
    pub fn new(charm: impl Into<String>, application: impl Into<String>) -> Self {
        DeployRequest {
            charm: charm.into(),
            application: application.into(),
            series: None,
            force: false,
        }
    }

    pub fn series(mut self, series: impl Into<String>) -> Self {
        self.series = Some(series.into());
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    fn args(&self, model: &str) -> Vec<String> {
        let mut args = vec![
            "deploy".to_string(),
            self.charm.clone(),
            "-m".to_string(),
            model.to_string(),
        ];
        if let Some(series) = &self.series {
            args.push("--series".to_string());
            args.push(series.clone());
        }
        args.push(self.application.clone());
        if self.force {
            args.push("--force".to_string());
        }
        args
    }
}

// ─── Model ────────────────────────────────────────────────────────────────

/// A connected Juju model.
///
/// Nothing is cached: every query runs `juju status` again, and every
/// predicate passed to [`Model::block_until`] sees a fresh snapshot.
pub struct Model<C> {
    controller: C,
    name: String,
    poll: PollConfig,
    policy: InvocationPolicy,
}

impl<C: Controller> Model<C> {
    /// Connect to `name`, or to the controller's current model when `None`.
    ///
    /// A given name is kept as is, so `ctrl:owner/model` keeps targeting
    /// that controller. A `None` takes the name from the status document,
    /// which resolves to whatever `juju switch` points at.
    pub async fn connect(controller: C, name: Option<&str>) -> Result<Self> {
        let mut args = vec!["status".to_string()];
        if let Some(n) = name {
            args.push("-m".to_string());
            args.push(n.to_string());
        }
        args.push("--format=json".to_string());

        let out = checked(&controller, &args).await?;
        let status: ModelStatus = parse_json("status", &out.stdout)?;
        let name = name.map_or(status.model.name, str::to_string);
        info!(model = %name, "connected to model");

        Ok(Model {
            controller,
            name,
            poll: PollConfig::default(),
            policy: InvocationPolicy::default(),
        })
    }

    /// Create a new model named `name` and connect to it.
    pub async fn create(controller: C, name: &str) -> Result<Self> {
        checked(&controller, &["add-model".to_string(), name.to_string()]).await?;
        info!(model = %name, "created model");
        Self::connect(controller, Some(name)).await
    }

    /// Destroy this model, including its storage.
    pub async fn destroy(self) -> Result<()> {
        let args = [
            "destroy-model".to_string(),
            "-y".to_string(),
            "--destroy-storage".to_string(),
            self.name.clone(),
        ];
        checked(&self.controller, &args).await?;
        info!(model = %self.name, "destroyed model");
        Ok(())
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_policy(mut self, policy: InvocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn poll_config(&self) -> PollConfig {
        self.poll
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Fetch a fresh `juju status` snapshot of this model.
    pub async fn status(&self) -> Result<ModelStatus> {
        let out = self.exec_checked("status", &["--format=json"]).await?;
        parse_json("status", &out.stdout)
    }

    /// Fetch the status of one application.
    pub async fn application(&self, name: &str) -> Result<ApplicationStatus> {
        self.status()
            .await?
            .applications
            .remove(name)
            .ok_or_else(|| JujuError::ApplicationNotFound(name.to_string()))
    }

    /// Poll status until `predicate` holds and return the satisfying
    /// snapshot, or [`JujuError::Timeout`] once the poll budget is spent.
    pub async fn block_until<P>(&self, waiting_for: &str, predicate: P) -> Result<ModelStatus>
    where
        P: Fn(&ModelStatus) -> bool,
    {
        let model = self;
        let predicate = &predicate;
        let outcome = poll_until(&self.poll, waiting_for, move || async move {
            let status = model.status().await?;
            Ok::<_, JujuError>(predicate(&status).then_some(status))
        })
        .await?;

        match outcome {
            PollOutcome::Satisfied(status) => Ok(status),
            PollOutcome::TimedOut { elapsed, .. } => Err(JujuError::Timeout {
                waiting_for: waiting_for.to_string(),
                after: elapsed,
            }),
        }
    }

    /// Wait until `name` shows up in the model. Returns at once if it is
    /// already there.
    pub async fn wait_for_new_application(&self, name: &str) -> Result<ModelStatus> {
        self.block_until(&format!("application {name} to appear"), |s| {
            s.application(name).is_some()
        })
        .await
    }

    pub async fn deploy(&self, request: &DeployRequest) -> Result<()> {
        info!(
            application = %request.application,
            charm = %request.charm,
            series = ?request.series,
            "deploying"
        );
        self.invoke(request.args(&self.name)).await
    }

    /// `juju upgrade-charm --switch=<switch> -m <model> <application>`
    pub async fn upgrade_charm(&self, application: &str, switch: &str) -> Result<()> {
        info!(application = %application, switch = %switch, "upgrading charm");
        let args = vec![
            "upgrade-charm".to_string(),
            format!("--switch={switch}"),
            "-m".to_string(),
            self.name.clone(),
            application.to_string(),
        ];
        self.invoke(args).await
    }

    pub async fn add_relation(&self, a: &str, b: &str) -> Result<()> {
        info!(a = %a, b = %b, "adding relation");
        self.exec_checked("add-relation", &[a, b]).await.map(|_| ())
    }

    pub async fn remove_relation(&self, a: &str, b: &str) -> Result<()> {
        info!(a = %a, b = %b, "removing relation");
        self.exec_checked("remove-relation", &[a, b])
            .await
            .map(|_| ())
    }

    /// Queue action `name` on `unit`. Call [`Action::wait`] for the result.
    pub async fn run_action(&self, unit: &Unit, name: &str) -> Result<Action<'_, C>> {
        info!(unit = %unit, action = %name, "running action");
        let out = self
            .exec_checked("run-action", &[unit.entity_id(), name, "--format=json"])
            .await?;
        let queued: QueuedAction = parse_json("run-action", &out.stdout)?;
        let id = queued.into_id().ok_or_else(|| {
            JujuError::Unexpected(format!("run-action returned no action id: {}", out.stdout))
        })?;
        debug!(unit = %unit, action = %name, id = %id, "action queued");
        Ok(Action {
            model: self,
            id,
            name: name.to_string(),
        })
    }

    /// Run a shell command on `unit` and capture its result.
    pub async fn run_command(&self, command: &str, unit: &Unit) -> Result<CommandResult> {
        let out = self
            .exec_checked(
                "run",
                &["--unit", unit.entity_id(), "--format=json", command],
            )
            .await?;
        let parsed: RunOutput = parse_json("run", &out.stdout)?;
        parsed.for_unit(unit.entity_id()).ok_or_else(|| {
            JujuError::Unexpected(format!("no result for unit {unit} in: {}", out.stdout))
        })
    }

    /// Stat `path` on `unit`.
    pub async fn file_stat(&self, path: &str, unit: &Unit) -> Result<FileStat> {
        let command = format!("stat -c '%f %u %g' {}", shell_quote(path));
        let result = self.run_command(&command, unit).await?;
        if result.code != "0" {
            return Err(JujuError::Command {
                command: format!("run --unit {unit} {command}"),
                code: result.code,
                stderr: result.stderr,
            });
        }
        FileStat::parse(&result.stdout).ok_or_else(|| {
            JujuError::Unexpected(format!("unparseable stat output: {:?}", result.stdout))
        })
    }

    // ─── Internal ─────────────────────────────────────────────────────────

    async fn invoke(&self, args: Vec<String>) -> Result<()> {
        match self.policy {
            InvocationPolicy::FireAndForget => self.controller.launch(&args),
            InvocationPolicy::Checked => checked(&self.controller, &args).await.map(|_| ()),
        }
    }

    /// `juju <subcommand> -m <model> <rest…>`, failing on non-zero exit.
    async fn exec_checked(&self, subcommand: &str, rest: &[&str]) -> Result<CommandOutput> {
        let mut args = vec![
            subcommand.to_string(),
            "-m".to_string(),
            self.name.clone(),
        ];
        args.extend(rest.iter().map(|s| s.to_string()));
        checked(&self.controller, &args).await
    }
}

// ─── Action ───────────────────────────────────────────────────────────────

/// A queued action on a unit.
pub struct Action<'m, C> {
    model: &'m Model<C>,
    id: String,
    name: String,
}

impl<C: Controller> Action<'_, C> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Poll the action until it reaches a terminal status.
    pub async fn wait(&self) -> Result<ActionResult> {
        let model = self.model;
        let id = self.id.as_str();
        let label = format!("action {} ({id}) to finish", self.name);
        let outcome = poll_until(&model.poll, &label, move || async move {
            let out = model
                .exec_checked("show-action-output", &[id, "--format=json"])
                .await?;
            let result: ActionResult = parse_json("show-action-output", &out.stdout)?;
            Ok::<_, JujuError>(result.status.is_terminal().then_some(result))
        })
        .await?;

        match outcome {
            PollOutcome::Satisfied(mut result) => {
                result.id.get_or_insert_with(|| self.id.clone());
                info!(action = %self.name, id = %self.id, status = %result.status, "action finished");
                Ok(result)
            }
            PollOutcome::TimedOut { elapsed, .. } => Err(JujuError::Timeout {
                waiting_for: label,
                after: elapsed,
            }),
        }
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────

async fn checked<C: Controller>(controller: &C, args: &[String]) -> Result<CommandOutput> {
    let out = controller.exec(args).await?;
    if out.success() {
        Ok(out)
    } else {
        Err(JujuError::Command {
            command: args.join(" "),
            code: out.code_text(),
            stderr: out.stderr.trim().to_string(),
        })
    }
}

fn parse_json<T: DeserializeOwned>(command: &str, output: &str) -> Result<T> {
    serde_json::from_str(output.trim()).map_err(|source| JujuError::Parse {
        command: command.to_string(),
        output: output.trim().to_string(),
        source,
    })
}

/// Single-quote `s` for a POSIX shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

// ─── Tests ────────────────────────────────────────────────────────────────
