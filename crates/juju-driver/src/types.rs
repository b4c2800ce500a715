use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ─── Status ───────────────────────────────────────────────────────────────

/// A workload, application or agent status as reported by `juju status`.
///
/// Application and workload statuses (`active`, `blocked`, …) and agent
/// statuses (`idle`, `executing`, …) share one enum so predicates can be
/// written uniformly. Values this driver does not know about are kept
/// verbatim in [`Status::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Active,
    Blocked,
    Waiting,
    Maintenance,
    Error,
    Terminated,
    Allocating,
    Executing,
    Idle,
    Lost,
    Failed,
    Rebooting,
    #[default]
    Unknown,
    Other(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Active => "active",
            Status::Blocked => "blocked",
            Status::Waiting => "waiting",
            Status::Maintenance => "maintenance",
            Status::Error => "error",
            Status::Terminated => "terminated",
            Status::Allocating => "allocating",
            Status::Executing => "executing",
            Status::Idle => "idle",
            Status::Lost => "lost",
            Status::Failed => "failed",
            Status::Rebooting => "rebooting",
            Status::Unknown => "unknown",
            Status::Other(s) => s,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error)
    }

    /// `true` if this status is one of `candidates`.
    pub fn is_any_of(&self, candidates: &[Status]) -> bool {
        candidates.contains(self)
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => Status::Active,
            "blocked" => Status::Blocked,
            "waiting" => Status::Waiting,
            "maintenance" => Status::Maintenance,
            "error" => Status::Error,
            "terminated" => Status::Terminated,
            "allocating" => Status::Allocating,
            "executing" => Status::Executing,
            "idle" => Status::Idle,
            "lost" => Status::Lost,
            "failed" => Status::Failed,
            "rebooting" => Status::Rebooting,
            "unknown" | "" => Status::Unknown,
            _ => Status::Other(s),
        }
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        Status::from(s.to_string())
    }
}

impl From<Status> for String {
    fn from(s: Status) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusInfo {
    #[serde(default)]
    pub current: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusInfo {
    pub fn new(current: Status) -> Self {
        StatusInfo {
            current,
            message: None,
        }
    }
}

// ─── `juju status --format=json` ──────────────────────────────────────────

/// One snapshot of `juju status --format=json`.
///
/// Only the fields the scenarios observe are modelled; everything else in
/// the document (machines, offers, storage) is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelStatus {
    pub model: ModelInfo,
    #[serde(default)]
    pub applications: BTreeMap<String, ApplicationStatus>,
}

impl ModelStatus {
    pub fn application(&self, name: &str) -> Option<&ApplicationStatus> {
        self.applications.get(name)
    }

    /// Application status, or [`Status::Unknown`] when the application is
    /// not (yet) part of the model.
    pub fn application_status(&self, name: &str) -> Status {
        self.application(name)
            .map(|a| a.status.current.clone())
            .unwrap_or_default()
    }

    /// Agent status of `unit` (`"<app>/<n>"`), or [`Status::Unknown`].
    pub fn agent_status(&self, unit: &str) -> Status {
        self.unit(unit)
            .map(|u| u.agent.current.clone())
            .unwrap_or_default()
    }

    pub fn unit(&self, unit: &str) -> Option<&UnitStatus> {
        let app = unit.split('/').next()?;
        self.application(app)?.units.get(unit)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(rename = "application-status", default)]
    pub status: StatusInfo,
    #[serde(default)]
    pub units: BTreeMap<String, UnitStatus>,
    /// Endpoint name → related application names.
    #[serde(default)]
    pub relations: BTreeMap<String, Vec<String>>,
}

impl ApplicationStatus {
    /// Units ordered by their numeric suffix (`app/2` before `app/10`).
    pub fn units(&self) -> Vec<Unit> {
        let mut units: Vec<Unit> = self.units.keys().map(|k| Unit::new(k.clone())).collect();
        units.sort_by_key(|u| u.number());
        units
    }

    pub fn first_unit(&self) -> Option<Unit> {
        self.units().into_iter().next()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitStatus {
    #[serde(rename = "workload-status", default)]
    pub workload: StatusInfo,
    #[serde(rename = "juju-status", default)]
    pub agent: StatusInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
}

// ─── Unit handle ──────────────────────────────────────────────────────────

/// A unit, identified by its entity id (`"gitlab-bionic-local/0"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unit {
    entity_id: String,
}

impl Unit {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Unit {
            entity_id: entity_id.into(),
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn application(&self) -> &str {
        self.entity_id.split('/').next().unwrap_or(&self.entity_id)
    }

    fn number(&self) -> u64 {
        self.entity_id
            .rsplit('/')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(u64::MAX)
    }

    /// Directory name of the unit agent under `/var/lib/juju/agents`.
    pub fn agent_dir(&self) -> String {
        format!("unit-{}", self.entity_id.replace('/', "-"))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entity_id)
    }
}

// ─── Raw process output ───────────────────────────────────────────────────

/// Captured result of one `juju` invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        CommandOutput {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        CommandOutput {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn code_text(&self) -> String {
        self.code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string())
    }
}

// ─── `juju run` ───────────────────────────────────────────────────────────

/// Result of running a shell command on a unit.
///
/// `code` is textual, as Juju reports it (`"0"`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    pub code: String,
    pub stdout: String,
    pub stderr: String,
}

/// The two JSON shapes `juju run --format=json` has produced across
/// Juju 2.x releases.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RunOutput {
    /// `[{"UnitId": "app/0", "ReturnCode": 0, "Stdout": "…"}]`
    Listed(Vec<ListedRun>),
    /// `{"app/0": {"results": {"Code": "0", "Stdout": "…"}, "status": "completed"}}`
    Keyed(HashMap<String, KeyedRun>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListedRun {
    #[serde(rename = "UnitId", default)]
    pub unit_id: Option<String>,
    #[serde(rename = "ReturnCode", default)]
    pub return_code: Option<ExitCode>,
    #[serde(rename = "Stdout", default)]
    pub stdout: String,
    #[serde(rename = "Stderr", default)]
    pub stderr: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyedRun {
    #[serde(default)]
    pub results: KeyedRunResults,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct KeyedRunResults {
    #[serde(rename = "Code", alias = "return-code", default)]
    pub code: Option<ExitCode>,
    #[serde(rename = "Stdout", alias = "stdout", default)]
    pub stdout: String,
    #[serde(rename = "Stderr", alias = "stderr", default)]
    pub stderr: String,
}

/// Exit code as either a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ExitCode {
    Number(i64),
    Text(String),
}

impl ExitCode {
    fn into_text(self) -> String {
        match self {
            ExitCode::Number(n) => n.to_string(),
            ExitCode::Text(s) => s,
        }
    }
}

impl RunOutput {
    /// Pick the entry for `unit` (or the only entry) as a [`CommandResult`].
    pub(crate) fn for_unit(self, unit: &str) -> Option<CommandResult> {
        match self {
            RunOutput::Listed(entries) => {
                let single = entries.len() == 1;
                entries
                    .into_iter()
                    .find(|e| single || e.unit_id.as_deref() == Some(unit))
                    .map(|e| CommandResult {
                        code: e.return_code.map(ExitCode::into_text).unwrap_or_else(|| "0".into()),
                        stdout: e.stdout,
                        stderr: e.stderr,
                    })
            }
            RunOutput::Keyed(mut entries) => {
                let key = if entries.contains_key(unit) {
                    unit.to_string()
                } else if entries.len() == 1 {
                    entries.keys().next()?.clone()
                } else {
                    return None;
                };
                let e = entries.remove(&key)?;
                Some(CommandResult {
                    code: e
                        .results
                        .code
                        .map(ExitCode::into_text)
                        .unwrap_or_else(|| "0".into()),
                    stdout: e.results.stdout,
                    stderr: e.results.stderr,
                })
            }
        }
    }
}

// ─── Actions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Aborted,
    Error,
    Other(String),
}

impl ActionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Running => "running",
            ActionStatus::Completed => "completed",
            ActionStatus::Failed => "failed",
            ActionStatus::Cancelled => "cancelled",
            ActionStatus::Aborted => "aborted",
            ActionStatus::Error => "error",
            ActionStatus::Other(s) => s,
        }
    }

    /// `true` once the action can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Completed
                | ActionStatus::Failed
                | ActionStatus::Cancelled
                | ActionStatus::Aborted
                | ActionStatus::Error
        )
    }
}

impl From<String> for ActionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => ActionStatus::Pending,
            "running" => ActionStatus::Running,
            "completed" => ActionStatus::Completed,
            "failed" => ActionStatus::Failed,
            "cancelled" => ActionStatus::Cancelled,
            "aborted" => ActionStatus::Aborted,
            "error" => ActionStatus::Error,
            _ => ActionStatus::Other(s),
        }
    }
}

impl From<ActionStatus> for String {
    fn from(s: ActionStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `juju show-action-output <id> --format=json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(default)]
    pub id: Option<String>,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Action-defined payload; opaque to this driver.
    #[serde(default)]
    pub results: serde_json::Value,
}

/// `juju run-action --format=json` acknowledgement.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum QueuedAction {
    Queued {
        #[serde(rename = "Action queued with id")]
        id: String,
    },
    Keyed(HashMap<String, KeyedAction>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyedAction {
    pub id: String,
}

impl QueuedAction {
    pub(crate) fn into_id(self) -> Option<String> {
        match self {
            QueuedAction::Queued { id } => Some(id),
            QueuedAction::Keyed(map) => map.into_values().next().map(|a| a.id),
        }
    }
}

// ─── File stat ────────────────────────────────────────────────────────────

const S_IFMT: u32 = 0o170000;

/// POSIX metadata of a file on a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileStat {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

impl FileStat {
    /// Parse the output of `stat -c '%f %u %g'` (raw mode in hex).
    pub fn parse(output: &str) -> Option<Self> {
        let mut fields = output.split_whitespace();
        let mode = u32::from_str_radix(fields.next()?, 16).ok()?;
        let uid = fields.next()?.parse().ok()?;
        let gid = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(FileStat { mode, uid, gid })
    }

    /// `ls -l` style rendering of the mode bits, e.g. `-rw-r--r--`.
    pub fn filemode(&self) -> String {
        let m = self.mode;
        let kind = match m & S_IFMT {
            0o140000 => 's',
            0o120000 => 'l',
            0o100000 => '-',
            0o060000 => 'b',
            0o040000 => 'd',
            0o020000 => 'c',
            0o010000 => 'p',
            _ => '?',
        };

        let triplet = |read: u32, write: u32, exec: u32, special: u32, set: char, unset: char| {
            let r = if m & read != 0 { 'r' } else { '-' };
            let w = if m & write != 0 { 'w' } else { '-' };
            let x = match (m & exec != 0, m & special != 0) {
                (true, true) => set,
                (false, true) => unset,
                (true, false) => 'x',
                (false, false) => '-',
            };
            [r, w, x]
        };

        let mut out = String::with_capacity(10);
        out.push(kind);
        out.extend(triplet(0o400, 0o200, 0o100, 0o4000, 's', 'S'));
        out.extend(triplet(0o040, 0o020, 0o010, 0o2000, 's', 'S'));
        out.extend(triplet(0o004, 0o002, 0o001, 0o1000, 't', 'T'));
        out
    }
}
