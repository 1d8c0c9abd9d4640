//! Console that records what would have been printed.

use std::cell::RefCell;

use crate::gha::{escape_data, Console};

/// Records workflow-command lines in the form `StdoutConsole` would print
#[derive(Debug, Default)]
pub struct RecordingConsole {
    lines: RefCell<Vec<String>>,
    secrets: RefCell<Vec<String>>,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Values registered through `set_secret`, in order
    pub fn secrets(&self) -> Vec<String> {
        self.secrets.borrow().clone()
    }

    /// Messages logged with the given workflow command, unescaped
    pub fn messages(&self, command: &str) -> Vec<String> {
        let prefix = format!("::{}::", command);
        self.lines
            .borrow()
            .iter()
            .filter_map(|l| l.strip_prefix(&prefix))
            .map(|m| m.replace("%0A", "\n").replace("%0D", "\r").replace("%25", "%"))
            .collect()
    }

    pub fn notices(&self) -> Vec<String> {
        self.messages("notice")
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages("warning")
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages("error")
    }

    fn push(&self, line: String) {
        self.lines.borrow_mut().push(line);
    }
}

impl Console for RecordingConsole {
    fn info(&self, message: &str) {
        self.push(message.to_string());
    }

    fn notice(&self, message: &str) {
        self.push(format!("::notice::{}", escape_data(message)));
    }

    fn warning(&self, message: &str) {
        self.push(format!("::warning::{}", escape_data(message)));
    }

    fn error(&self, message: &str) {
        self.push(format!("::error::{}", escape_data(message)));
    }

    fn start_group(&self, title: &str) {
        self.push(format!("::group::{}", escape_data(title)));
    }

    fn end_group(&self) {
        self.push("::endgroup::".to_string());
    }

    fn set_secret(&self, value: &str) {
        self.secrets.borrow_mut().push(value.to_string());
    }
}
