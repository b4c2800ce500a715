//! In-memory [`Controller`] for tests.
//!
//! [`FakeController`] records every invocation and answers `juju status`
//! from a simulated model ([`FakeWorld`]). Tests make the model evolve in
//! two ways:
//!
//! - command hooks (`on_command`) mutate the world when a matching command
//!   is issued, e.g. add an application on `deploy`;
//! - per-application state scripts hold each state for a number of status
//!   observations before moving to the next one. The last state is sticky.
//!
//! Canned outputs queued with [`FakeWorld::respond`] take precedence over
//! the built-in `status` answer, so a test can inject a failing status call.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::sync::Mutex;

use crate::controller::Controller;
use crate::types::{
    ApplicationStatus, CommandOutput, ModelInfo, ModelStatus, Status, StatusInfo, UnitStatus,
};
use crate::{JujuError, Result};

type Hook = Box<dyn FnMut(&[String], &mut FakeWorld) + Send>;

/// Application and unit-agent status of a simulated application.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub application: Status,
    pub agent: Status,
}

impl AppState {
    pub fn new(application: Status, agent: Status) -> Self {
        AppState { application, agent }
    }
}

#[derive(Debug)]
struct Hold {
    state: AppState,
    remaining: u32,
}

#[derive(Debug)]
struct FakeApp {
    charm: String,
    series: String,
    units: u32,
    states: VecDeque<Hold>,
}

impl FakeApp {
    fn advance(&mut self) -> AppState {
        let len = self.states.len();
        let Some(front) = self.states.front_mut() else {
            return AppState::default();
        };
        let state = front.state.clone();
        front.remaining = front.remaining.saturating_sub(1);
        if front.remaining == 0 && len > 1 {
            self.states.pop_front();
        }
        state
    }
}

// ─── FakeWorld ────────────────────────────────────────────────────────────

/// The simulated model behind a [`FakeController`].
#[derive(Debug)]
pub struct FakeWorld {
    model: String,
    apps: BTreeMap<String, FakeApp>,
    responses: HashMap<String, VecDeque<CommandOutput>>,
}

impl FakeWorld {
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Add a single-unit application in a sticky `state`.
    pub fn add_application(&mut self, name: &str, charm: &str, series: &str, state: AppState) {
        self.apps.insert(
            name.to_string(),
            FakeApp {
                charm: charm.to_string(),
                series: series.to_string(),
                units: 1,
                states: VecDeque::from([Hold {
                    state,
                    remaining: 0,
                }]),
            },
        );
    }

    pub fn remove_application(&mut self, name: &str) {
        self.apps.remove(name);
    }

    pub fn has_application(&self, name: &str) -> bool {
        self.apps.contains_key(name)
    }

    /// Replace the application's script with a single sticky state.
    pub fn set_state(&mut self, name: &str, state: AppState) {
        self.script(name, vec![(0, state)]);
    }

    /// Replace the application's script. Each state is reported for the
    /// given number of status observations; the last one is kept forever.
    pub fn script(&mut self, name: &str, steps: Vec<(u32, AppState)>) {
        if steps.is_empty() {
            return;
        }
        if let Some(app) = self.apps.get_mut(name) {
            app.states = steps
                .into_iter()
                .map(|(remaining, state)| Hold { state, remaining })
                .collect();
        }
    }

    /// Queue `output` as the answer to the next `juju <subcommand>` call.
    pub fn respond(&mut self, subcommand: &str, output: CommandOutput) {
        self.responses
            .entry(subcommand.to_string())
            .or_default()
            .push_back(output);
    }

    fn observe(&mut self) -> ModelStatus {
        let mut applications = BTreeMap::new();
        for (name, app) in &mut self.apps {
            let state = app.advance();
            let units = (0..app.units)
                .map(|n| {
                    let unit = UnitStatus {
                        workload: StatusInfo::new(state.application.clone()),
                        agent: StatusInfo::new(state.agent.clone()),
                        machine: Some(n.to_string()),
                    };
                    (format!("{name}/{n}"), unit)
                })
                .collect();
            applications.insert(
                name.clone(),
                ApplicationStatus {
                    charm: Some(app.charm.clone()),
                    series: Some(app.series.clone()),
                    status: StatusInfo::new(state.application),
                    units,
                    relations: BTreeMap::new(),
                },
            );
        }
        ModelStatus {
            model: ModelInfo {
                name: self.model.clone(),
                controller: Some("fake".to_string()),
                cloud: None,
                version: None,
            },
            applications,
        }
    }
}

// ─── FakeController ───────────────────────────────────────────────────────

struct Inner {
    world: FakeWorld,
    hooks: Vec<Hook>,
    calls: Vec<Vec<String>>,
    launched: Vec<Vec<String>>,
}

pub struct FakeController {
    inner: Mutex<Inner>,
}

impl FakeController {
    pub fn new(model: &str) -> Self {
        FakeController {
            inner: Mutex::new(Inner {
                world: FakeWorld {
                    model: model.to_string(),
                    apps: BTreeMap::new(),
                    responses: HashMap::new(),
                },
                hooks: Vec::new(),
                calls: Vec::new(),
                launched: Vec::new(),
            }),
        }
    }

    /// Register a hook run for every command, before it is answered.
    pub fn on_command<F>(&self, hook: F)
    where
        F: FnMut(&[String], &mut FakeWorld) + Send + 'static,
    {
        if let Ok(mut inner) = self.inner.lock() {
            inner.hooks.push(Box::new(hook));
        }
    }

    /// Inspect or modify the simulated model directly.
    pub fn with_world<R>(&self, f: impl FnOnce(&mut FakeWorld) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut inner.world)
    }

    /// Every command received so far, executed or launched, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.inner
            .lock()
            .map(|i| i.calls.clone())
            .unwrap_or_default()
    }

    /// Commands whose first argument is `subcommand`.
    pub fn calls_to(&self, subcommand: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.first().map(String::as_str) == Some(subcommand))
            .collect()
    }

    /// Commands that went through [`Controller::launch`].
    pub fn launched(&self) -> Vec<Vec<String>> {
        self.inner
            .lock()
            .map(|i| i.launched.clone())
            .unwrap_or_default()
    }

    fn handle(&self, args: &[String], launched: bool) -> Result<CommandOutput> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| JujuError::Unexpected("fake controller lock poisoned".into()))?;
        let inner = &mut *guard;

        inner.calls.push(args.to_vec());
        if launched {
            inner.launched.push(args.to_vec());
        }
        for hook in inner.hooks.iter_mut() {
            hook(args, &mut inner.world);
        }

        let sub = args.first().map(String::as_str).unwrap_or("");
        if let Some(out) = inner
            .world
            .responses
            .get_mut(sub)
            .and_then(VecDeque::pop_front)
        {
            return Ok(out);
        }

        if sub == "status" {
            let status = inner.world.observe();
            let json = serde_json::to_string(&status)
                .map_err(|e| JujuError::Unexpected(e.to_string()))?;
            return Ok(CommandOutput::ok(json));
        }

        Ok(CommandOutput::ok(""))
    }
}

impl Controller for FakeController {
    fn exec(&self, args: &[String]) -> impl Future<Output = Result<CommandOutput>> + Send {
        std::future::ready(self.handle(args, false))
    }

    fn launch(&self, args: &[String]) -> Result<()> {
        self.handle(args, true).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(fake: &FakeController) -> ModelStatus {
        let out = fake.handle(&["status".to_string()], false).unwrap();
        serde_json::from_str(&out.stdout).unwrap()
    }

    fn waiting() -> AppState {
        AppState::new(Status::Waiting, Status::Executing)
    }

    fn blocked() -> AppState {
        AppState::new(Status::Blocked, Status::Idle)
    }

    #[test]
    fn empty_world_reports_model_name() {
        let fake = FakeController::new("ci");
        let status = status_of(&fake);
        assert_eq!(status.model.name, "ci");
        assert!(status.applications.is_empty());
    }

    #[test]
    fn scripted_states_are_held_then_sticky() {
        let fake = FakeController::new("ci");
        fake.with_world(|w| {
            w.add_application("app", "local:app", "bionic", AppState::default());
            w.script("app", vec![(2, waiting()), (0, blocked())]);
        });
        let seen: Vec<Status> = (0..4)
            .map(|_| status_of(&fake).application_status("app"))
            .collect();
        assert_eq!(
            seen,
            vec![Status::Waiting, Status::Waiting, Status::Blocked, Status::Blocked]
        );
    }

    #[test]
    fn units_carry_agent_status() {
        let fake = FakeController::new("ci");
        fake.with_world(|w| w.add_application("app", "cs:app", "xenial", blocked()));
        let status = status_of(&fake);
        assert_eq!(status.agent_status("app/0"), Status::Idle);
        assert_eq!(status.application("app").unwrap().units().len(), 1);
    }

    #[test]
    fn hooks_see_commands_before_they_are_answered() {
        let fake = FakeController::new("ci");
        fake.on_command(|args, world| {
            if args[0] == "deploy" {
                world.add_application(&args[1], "cs:app", "bionic", blocked());
            }
        });
        fake.launch(&["deploy".to_string(), "redis".to_string()])
            .unwrap();
        assert!(fake.with_world(|w| w.has_application("redis")));
        assert_eq!(fake.launched().len(), 1);
        assert_eq!(fake.calls_to("deploy").len(), 1);
    }

    #[test]
    fn queued_responses_take_precedence_and_drain() {
        let fake = FakeController::new("ci");
        fake.with_world(|w| w.respond("status", CommandOutput::failed(1, "no controller")));
        let first = fake.handle(&["status".to_string()], false).unwrap();
        assert!(!first.success());
        let second = fake.handle(&["status".to_string()], false).unwrap();
        assert!(second.success());
    }

    #[test]
    fn unknown_commands_succeed_silently() {
        let fake = FakeController::new("ci");
        let out = fake.handle(&["add-relation".to_string()], false).unwrap();
        assert_eq!(out, CommandOutput::ok(""));
    }
}
