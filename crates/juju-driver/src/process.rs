use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::controller::Controller;
use crate::types::CommandOutput;
use crate::Result;

// ─── JujuCli ──────────────────────────────────────────────────────────────

/// [`Controller`] backed by a real `juju` executable.
///
/// Every call spawns a fresh process; there is no long-lived connection.
/// Stdin is closed so the CLI can never block on an interactive prompt.
#[derive(Debug, Clone)]
pub struct JujuCli {
    exe: PathBuf,
    env: Vec<(String, String)>,
}

impl JujuCli {
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        JujuCli {
            exe: exe.into(),
            env: Vec::new(),
        }
    }

    /// Use `explicit` if given, otherwise look `juju` up on `PATH`.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(p) => Ok(Self::new(p)),
            None => Ok(Self::new(which::which("juju")?)),
        }
    }

    /// Set an extra environment variable for every spawned process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn executable(&self) -> &Path {
        &self.exe
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.exe);
        cmd.args(args).stdin(Stdio::null());
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd
    }
}

impl Controller for JujuCli {
    fn exec(&self, args: &[String]) -> impl Future<Output = Result<CommandOutput>> + Send {
        let mut cmd = self.command(args);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let rendered = render(args);

        async move {
            debug!(command = %rendered, "juju exec");
            let output = cmd.output().await?;
            let out = CommandOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };
            debug!(command = %rendered, code = %out.code_text(), "juju exec finished");
            Ok(out)
        }
    }

    fn launch(&self, args: &[String]) -> Result<()> {
        let mut cmd = self.command(args);
        cmd.stdout(Stdio::null()).stderr(Stdio::piped());
        let child = cmd.spawn()?;
        let rendered = render(args);
        debug!(command = %rendered, pid = ?child.id(), "juju launch");

        // Nobody awaits this task; a failure only shows up in the log.
        tokio::spawn(async move {
            match child.wait_with_output().await {
                Ok(out) if out.status.success() => {
                    debug!(command = %rendered, "background juju command finished");
                }
                Ok(out) => {
                    let stderr = String::from_utf8_lossy(&out.stderr);
                    warn!(
                        command = %rendered,
                        code = ?out.status.code(),
                        stderr = %stderr.trim(),
                        "background juju command failed"
                    );
                }
                Err(e) => {
                    warn!(command = %rendered, error = %e, "failed to wait for background juju command");
                }
            }
        });

        Ok(())
    }
}

fn render(args: &[String]) -> String {
    let mut s = String::from("juju");
    for a in args {
        s.push(' ');
        s.push_str(a);
    }
    s
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JujuError;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn exec_captures_stdout_and_exit_code() {
        // `echo` stands in for juju and prints its arguments back.
        let cli = JujuCli::new("echo");
        let out = cli.exec(&args(&["status", "--format=json"])).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "status --format=json\n");
    }

    #[tokio::test]
    async fn exec_reports_non_zero_exit_without_erroring() {
        let cli = JujuCli::new("false");
        let out = cli.exec(&[]).await.unwrap();
        assert!(!out.success());
        assert_eq!(out.code, Some(1));
    }

    #[tokio::test]
    async fn exec_passes_extra_environment() {
        let cli = JujuCli::new("sh").with_env("JUJU_MODEL", "ci-model");
        let out = cli
            .exec(&args(&["-c", "printf %s \"$JUJU_MODEL\""]))
            .await
            .unwrap();
        assert_eq!(out.stdout, "ci-model");
    }

    #[tokio::test]
    async fn exec_captures_stderr() {
        let cli = JujuCli::new("sh");
        let out = cli
            .exec(&args(&["-c", "echo boom >&2; exit 3"]))
            .await
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stderr.trim(), "boom");
    }

    #[tokio::test]
    async fn exec_missing_binary_is_io_error() {
        let cli = JujuCli::new("/nonexistent/juju");
        let err = cli.exec(&args(&["status"])).await.unwrap_err();
        assert!(matches!(err, JujuError::Io(_)));
    }

    #[tokio::test]
    async fn launch_returns_before_the_process_exits() {
        let cli = JujuCli::new("sleep");
        let started = std::time::Instant::now();
        cli.launch(&args(&["2"])).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[tokio::test]
    async fn launch_ignores_failing_exit_status() {
        let cli = JujuCli::new("false");
        assert!(cli.launch(&[]).is_ok());
    }

    #[tokio::test]
    async fn launch_missing_binary_is_io_error() {
        let cli = JujuCli::new("/nonexistent/juju");
        assert!(matches!(cli.launch(&[]), Err(JujuError::Io(_))));
    }

    #[test]
    fn discover_prefers_explicit_path() {
        let cli = JujuCli::discover(Some(Path::new("/opt/juju/bin/juju"))).unwrap();
        assert_eq!(cli.executable(), Path::new("/opt/juju/bin/juju"));
    }

    #[test]
    fn render_joins_arguments() {
        assert_eq!(
            render(&args(&["deploy", "cs:mysql", "-m", "m"])),
            "juju deploy cs:mysql -m m"
        );
    }
}
