use std::future::Future;

use crate::types::CommandOutput;
use crate::Result;

/// Access to a Juju controller through its CLI.
///
/// `args` never include the executable itself: `["status", "--format=json"]`
/// runs `juju status --format=json`. Implemented by [`crate::JujuCli`] for
/// real controllers and by `FakeController` (feature `test-util`) in tests.
pub trait Controller: Send + Sync {
    /// Run `juju <args>` to completion and capture its output.
    ///
    /// A non-zero exit is *not* an error at this level; callers decide.
    fn exec(&self, args: &[String]) -> impl Future<Output = Result<CommandOutput>> + Send;

    /// Start `juju <args>` in the background and return immediately.
    ///
    /// The exit status is never reported back to the caller.
    fn launch(&self, args: &[String]) -> Result<()>;
}
