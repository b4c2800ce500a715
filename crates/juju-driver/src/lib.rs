//! `juju-driver`: typed async driver for the `juju` CLI.
//!
//! Everything goes through the command line: each query or request spawns
//! `juju … --format=json` and parses what it prints. There is no API
//! connection, no websocket and no cached model state.
//!
//! # Architecture
//!
//! ```text
//! Model<C>        ← deploy / relate / run-action / run / stat, block_until
//!     │
//!     ▼
//! Controller      ← exec(args) → CommandOutput, launch(args)
//!     │
//!     ├── JujuCli          spawns the real binary (tokio::process)
//!     └── FakeController   in-memory model for tests (feature `test-util`)
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use juju_driver::{DeployRequest, JujuCli, Model, Status};
//!
//! let model = Model::connect(JujuCli::discover(None)?, Some("ci")).await?;
//! model
//!     .deploy(&DeployRequest::new("cs:postgresql", "pg").series("bionic"))
//!     .await?;
//! model.wait_for_new_application("pg").await?;
//! let status = model
//!     .block_until("pg to settle", |s| {
//!         s.application_status("pg").is_any_of(&[Status::Active, Status::Error])
//!     })
//!     .await?;
//! ```

pub mod controller;
pub mod error;
pub mod model;
pub mod poll;
pub mod types;

pub(crate) mod process;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;


pub use controller::Controller;
pub use error::JujuError;
pub use model::{Action, DeployRequest, InvocationPolicy, Model};
pub use poll::{poll_until, PollConfig, PollOutcome};
pub use process::JujuCli;
pub use types::{
    ActionResult, ActionStatus, ApplicationStatus, CommandOutput, CommandResult, FileStat,
    ModelInfo, ModelStatus, Status, StatusInfo, Unit, UnitStatus,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, JujuError>;
