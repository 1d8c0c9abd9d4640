//! State persisted between the main and post invocations.
//!
//! The two phases run as separate processes. The main phase appends to the
//! file named by `GITHUB_STATE`; the runner replays those values into the
//! post phase as `STATE_<name>` environment variables.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

/// Small key-value store that survives into the post phase
pub trait StateStore {
    fn get(&self, name: &str) -> Option<String>;
    fn save(&self, name: &str, value: &str) -> Result<()>;
    /// Forget a value, for this process and any later one
    fn clear(&self, name: &str) -> Result<()>;
}

/// State backed by the Actions runner
#[derive(Debug, Default)]
pub struct GithubState {
    file: Option<PathBuf>,
    /// Values written by this process; `None` marks a cleared key
    overlay: RefCell<HashMap<String, Option<String>>>,
}

impl GithubState {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self {
            file,
            overlay: RefCell::new(HashMap::new()),
        }
    }

    /// State file from `GITHUB_STATE`
    pub fn from_env() -> Self {
        Self::new(
            env::var_os("GITHUB_STATE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        )
    }

    fn append(&self, name: &str, value: &str) -> Result<()> {
        let Some(ref path) = self.file else {
            warn!(name, "GITHUB_STATE is not set, state is kept in memory only");
            return Ok(());
        };

        let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        write!(file, "{}<<{}\n{}\n{}\n", name, delimiter, value, delimiter)?;
        Ok(())
    }
}

impl StateStore for GithubState {
    fn get(&self, name: &str) -> Option<String> {
        if let Some(value) = self.overlay.borrow().get(name) {
            return value.clone();
        }
        env::var(format!("STATE_{}", name))
            .ok()
            .filter(|v| !v.is_empty())
    }

    fn save(&self, name: &str, value: &str) -> Result<()> {
        debug!(name, "saving state");
        self.append(name, value)?;
        self.overlay
            .borrow_mut()
            .insert(name.to_string(), Some(value.to_string()));
        Ok(())
    }

    fn clear(&self, name: &str) -> Result<()> {
        debug!(name, "clearing state");
        self.append(name, "")?;
        self.overlay.borrow_mut().insert(name.to_string(), None);
        Ok(())
    }
}

/// In-memory state, shared by both phases when they run in one process
#[derive(Debug, Default)]
pub struct MemoryState {
    values: RefCell<BTreeMap<String, String>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored key
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values.borrow().clone()
    }
}

impl StateStore for MemoryState {
    fn get(&self, name: &str) -> Option<String> {
        self.values.borrow().get(name).cloned()
    }

    fn save(&self, name: &str, value: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, name: &str) -> Result<()> {
        self.values.borrow_mut().remove(name);
        Ok(())
    }
}
