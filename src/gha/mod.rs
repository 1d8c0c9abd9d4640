//! GitHub Actions host-runtime primitives
//!
//! Inputs, persisted state, workflow-command logging and the runner
//! environment. Each is a small trait or struct so the rest of the crate
//! never reads `INPUT_*`/`STATE_*` variables or prints workflow commands
//! directly.

mod console;
mod env;
mod inputs;
mod state;

pub use console::{escape_data, group, Console, StdoutConsole};
pub use env::HostEnv;
pub use inputs::{EnvInputs, FileInputs, Inputs, LayeredInputs, MapInputs};
pub use state::{GithubState, MemoryState, StateStore};
