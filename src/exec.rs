//! External process execution
//!
//! Every subprocess xcci starts goes through the [`Exec`] trait, so the
//! selection, destination and secrets logic can be driven by
//! [`MockExec`](crate::mock::MockExec) in tests.

use std::fmt;
use std::io::Write;
use std::process::{Child, Command, Stdio};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result, Termination};
use crate::gha::{group, Console};

/// Trailer xcodebuild sometimes appends to otherwise valid JSON on CI
pub const BUILD_SESSION_TRAILER: &str =
    "build session not created after 15 seconds - still waiting";

/// A command to run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cmd {
    pub program: String,
    pub args: Vec<String>,
    /// Variables added to the inherited environment
    pub env: Vec<(String, String)>,
    /// Written to the child's stdin, then stdin is closed
    pub stdin: Option<String>,
    /// Report stderr as info rather than warnings
    pub stderr_as_info: bool,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn stderr_as_info(mut self) -> Self {
        self.stderr_as_info = true;
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> Error {
        Error::Spawn {
            program: self.program.clone(),
            command: self.to_string(),
            source,
        }
    }

    fn failed(&self, status: Termination) -> Error {
        Error::CommandFailed {
            program: self.program.clone(),
            status,
            command: self.to_string(),
        }
    }
}

/// Renders the command line; stdin is never included
impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Process execution capability
pub trait Exec {
    /// Run to completion and return stdout. Non-zero exit is an error.
    fn capture(&self, cmd: &Cmd) -> Result<String>;

    /// Run with inherited stdout/stderr. Non-zero exit is an error.
    fn run(&self, cmd: &Cmd) -> Result<()>;

    /// Run with stdout optionally piped through `filter`, returning how
    /// `cmd` itself ended. The filter's own status is ignored.
    fn run_filtered(&self, cmd: &Cmd, filter: Option<&Cmd>) -> Result<Termination>;
}

/// [`Exec`] backed by real processes
pub struct SystemExec<'a> {
    console: &'a dyn Console,
    verbose: bool,
}

impl<'a> SystemExec<'a> {
    pub fn new(console: &'a dyn Console, verbose: bool) -> Self {
        Self { console, verbose }
    }

    /// Show the full command line of a command that failed
    fn echo_failed(&self, cmd: &Cmd) {
        self.console.info(&format!("» {}", cmd));
    }

    fn feed_stdin(&self, cmd: &Cmd, child: &mut Child) -> Result<()> {
        if let Some(ref input) = cmd.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes())?;
            }
        }
        Ok(())
    }
}

impl Exec for SystemExec<'_> {
    fn capture(&self, cmd: &Cmd) -> Result<String> {
        debug!(command = %cmd, "capturing");
        if self.verbose {
            self.console.info(&format!("» {}", cmd));
        }

        let mut child = cmd
            .command()
            .stdin(if cmd.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| cmd.spawn_error(e))?;
        self.feed_stdin(cmd, &mut child)?;
        let output = child.wait_with_output()?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            let message = format!("{}: {}", cmd.program, stderr.trim_end());
            if cmd.stderr_as_info {
                self.console.info(&message);
            } else {
                self.console.warning(&message);
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if self.verbose && !stdout.is_empty() {
            self.console.info(stdout.trim_end());
        }

        let status = Termination::from_status(output.status);
        if !status.success() {
            self.echo_failed(cmd);
            return Err(cmd.failed(status));
        }
        Ok(stdout)
    }

    fn run(&self, cmd: &Cmd) -> Result<()> {
        debug!(command = %cmd, "running");
        let mut child = cmd
            .command()
            .stdin(if cmd.stdin.is_some() { Stdio::piped() } else { Stdio::inherit() })
            .spawn()
            .map_err(|e| cmd.spawn_error(e))?;
        self.feed_stdin(cmd, &mut child)?;

        let status = Termination::from_status(child.wait()?);
        if !status.success() {
            self.echo_failed(cmd);
            return Err(cmd.failed(status));
        }
        Ok(())
    }

    fn run_filtered(&self, cmd: &Cmd, filter: Option<&Cmd>) -> Result<Termination> {
        debug!(command = %cmd, filter = ?filter.map(|f| f.program.as_str()), "running filtered");
        let Some(filter) = filter else {
            let mut child = cmd.command().spawn().map_err(|e| cmd.spawn_error(e))?;
            return Ok(Termination::from_status(child.wait()?));
        };

        let mut child = cmd
            .command()
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| cmd.spawn_error(e))?;
        let Some(stdout) = child.stdout.take() else {
            return Ok(Termination::from_status(child.wait()?));
        };

        let mut pretty = match filter.command().stdin(Stdio::from(stdout)).spawn() {
            Ok(pretty) => pretty,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(filter.spawn_error(e));
            }
        };

        let status = Termination::from_status(child.wait()?);
        let filter_status = pretty.wait()?;
        debug!(status = %status, filter_status = ?filter_status.code(), "filtered run finished");
        Ok(status)
    }
}

/// Parse JSON printed by an Apple tool.
///
/// Surrounding whitespace and the [`BUILD_SESSION_TRAILER`] are tolerated.
/// On failure the raw text is logged in a `JSON` group before the error is
/// returned.
pub fn parse_tool_json<T: DeserializeOwned>(
    console: &dyn Console,
    tool: &str,
    text: &str,
) -> Result<T> {
    let mut input = text.trim();
    if let Some(stripped) = input.strip_suffix(BUILD_SESSION_TRAILER) {
        input = stripped;
    }

    serde_json::from_str(input).map_err(|source| {
        group(console, "JSON", || console.error(input));
        Error::MalformedToolOutput {
            tool: tool.to_string(),
            source,
        }
    })
}
