//! Test doubles for the host collaborators
//!
//! - [`MockExec`]: scripted process execution that records every call
//! - [`RecordingConsole`]: captures workflow-command output
//!
//! Inputs and state have plain in-memory implementations in
//! [`gha`](crate::gha) (`MapInputs`, `MemoryState`).

mod console;
mod exec;

pub use console::RecordingConsole;
pub use exec::{MockExec, MockResponse};
