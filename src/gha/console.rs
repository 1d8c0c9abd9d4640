//! Workflow-command logging.

/// Log sink for user-visible output
///
/// Implementations must be usable through a shared reference; the run is
/// single-threaded.
pub trait Console {
    fn info(&self, message: &str);
    fn notice(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
    fn start_group(&self, title: &str);
    fn end_group(&self);

    /// Register a value to be redacted from all further log output
    fn set_secret(&self, value: &str);
}

/// Run `f` inside a collapsible log group
pub fn group<T>(console: &dyn Console, title: &str, f: impl FnOnce() -> T) -> T {
    console.start_group(title);
    let result = f();
    console.end_group();
    result
}

/// Escape message data for a workflow command
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Console that prints workflow commands to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl StdoutConsole {
    fn command(name: &str, message: &str) {
        println!("::{}::{}", name, escape_data(message));
    }
}

impl Console for StdoutConsole {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn notice(&self, message: &str) {
        Self::command("notice", message);
    }

    fn warning(&self, message: &str) {
        Self::command("warning", message);
    }

    fn error(&self, message: &str) {
        Self::command("error", message);
    }

    fn start_group(&self, title: &str) {
        Self::command("group", title);
    }

    fn end_group(&self) {
        println!("::endgroup::");
    }

    fn set_secret(&self, value: &str) {
        if !value.is_empty() {
            Self::command("add-mask", value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingConsole;

    #[test]
    fn test_escape_data() {
        assert_eq!(escape_data("50% done\r\nnext"), "50%25 done%0D%0Anext");
        assert_eq!(escape_data("plain"), "plain");
    }

    #[test]
    fn test_group_wraps_closure() {
        let console = RecordingConsole::default();
        let value = group(&console, "Title", || {
            console.info("inside");
            42
        });
        assert_eq!(value, 42);
        assert_eq!(
            console.lines(),
            vec!["::group::Title", "inside", "::endgroup::"]
        );
    }
}
