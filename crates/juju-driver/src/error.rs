use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JujuError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("juju binary not found on PATH: {0}")]
    BinaryNotFound(#[from] which::Error),

    #[error("Failed to parse `juju {command}` output: {source}\n  output: {output}")]
    Parse {
        command: String,
        output: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("`juju {command}` exited with {code}\nstderr: {stderr}")]
    Command {
        command: String,
        code: String,
        stderr: String,
    },

    #[error("timed out after {after:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: String,
        after: Duration,
    },

    #[error("application not found in model: {0}")]
    ApplicationNotFound(String),

    #[error("unit not found in model: {0}")]
    UnitNotFound(String),

    #[error("Unexpected output: {0}")]
    Unexpected(String),
}
