//! Scripted process execution.

use std::cell::RefCell;

use crate::error::{Error, Result, Termination};
use crate::exec::{Cmd, Exec};

/// What a scripted command does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Succeed, printing this to stdout
    Output(String),
    /// End with this status
    Exit(Termination),
}

/// [`Exec`] that answers from a script and records every call
///
/// Responses are matched against the rendered command line, with any
/// environment overrides prefixed as `KEY=value `, e.g.
/// `DEVELOPER_DIR=/Applications/Xcode.app swift --version`. The longest
/// matching prefix wins. Unscripted commands succeed with empty output.
#[derive(Debug, Default)]
pub struct MockExec {
    script: Vec<(String, MockResponse)>,
    calls: RefCell<Vec<Cmd>>,
}

impl MockExec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `stdout`
    pub fn respond(mut self, prefix: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.script
            .push((prefix.into(), MockResponse::Output(stdout.into())));
        self
    }

    /// Make commands starting with `prefix` end with `status`
    pub fn exit(mut self, prefix: impl Into<String>, status: Termination) -> Self {
        self.script.push((prefix.into(), MockResponse::Exit(status)));
        self
    }

    /// How a command is rendered for matching
    pub fn render(cmd: &Cmd) -> String {
        let mut line = String::new();
        for (key, value) in &cmd.env {
            line.push_str(&format!("{}={} ", key, value));
        }
        line.push_str(&cmd.to_string());
        line
    }

    /// Every command run so far
    pub fn calls(&self) -> Vec<Cmd> {
        self.calls.borrow().clone()
    }

    /// Every command run so far, rendered
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Self::render).collect()
    }

    /// Commands whose program is `program`
    pub fn calls_to(&self, program: &str) -> Vec<Cmd> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.program == program)
            .cloned()
            .collect()
    }

    fn answer(&self, cmd: &Cmd) -> MockResponse {
        self.calls.borrow_mut().push(cmd.clone());
        let line = Self::render(cmd);
        self.script
            .iter()
            .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| MockResponse::Output(String::new()))
    }

    fn failed(cmd: &Cmd, status: Termination) -> Error {
        Error::CommandFailed {
            program: cmd.program.clone(),
            status,
            command: cmd.to_string(),
        }
    }
}

impl Exec for MockExec {
    fn capture(&self, cmd: &Cmd) -> Result<String> {
        match self.answer(cmd) {
            MockResponse::Output(out) => Ok(out),
            MockResponse::Exit(status) if status.success() => Ok(String::new()),
            MockResponse::Exit(status) => Err(Self::failed(cmd, status)),
        }
    }

    fn run(&self, cmd: &Cmd) -> Result<()> {
        match self.answer(cmd) {
            MockResponse::Exit(status) if !status.success() => Err(Self::failed(cmd, status)),
            _ => Ok(()),
        }
    }

    fn run_filtered(&self, cmd: &Cmd, _filter: Option<&Cmd>) -> Result<Termination> {
        match self.answer(cmd) {
            MockResponse::Exit(status) => Ok(status),
            MockResponse::Output(_) => Ok(Termination::Code(0)),
        }
    }
}
