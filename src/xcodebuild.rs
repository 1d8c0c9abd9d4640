//! Running xcodebuild.

use tracing::info;
use xcci_invocation::{Invocation, Verbosity};

use crate::error::{Error, Result};
use crate::exec::{Cmd, Exec};
use crate::gha::{group, Console};

pub const XCODEBUILD: &str = "xcodebuild";
pub const XCPRETTY: &str = "xcpretty";

/// Run one invocation inside its own log group
///
/// In `xcpretty` mode stdout goes through `xcpretty`; stderr is never
/// filtered. Success is judged on xcodebuild's status alone.
pub fn run(
    exec: &dyn Exec,
    console: &dyn Console,
    invocation: &Invocation,
    verbosity: Verbosity,
) -> Result<()> {
    group(console, &invocation.title(), || {
        let cmd = Cmd::new(XCODEBUILD).args(invocation.argv.iter().cloned());
        let filter = (verbosity == Verbosity::Xcpretty).then(|| Cmd::new(XCPRETTY));

        info!(
            action = %invocation.action,
            bundle = %invocation.result_bundle,
            "running xcodebuild"
        );
        let status = exec.run_filtered(&cmd, filter.as_ref())?;
        if !status.success() {
            console.info(&format!("exec: {}", cmd));
            return Err(Error::BuildToolAborted {
                program: XCODEBUILD.to_string(),
                status,
                command: cmd.to_string(),
            });
        }
        Ok(())
    })
}

/// Run invocations in order, stopping at the first failure
pub fn run_all(
    exec: &dyn Exec,
    console: &dyn Console,
    invocations: &[Invocation],
    verbosity: Verbosity,
) -> Result<()> {
    for invocation in invocations {
        run(exec, console, invocation, verbosity)?;
    }
    Ok(())
}
