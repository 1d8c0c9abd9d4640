//! Runner environment.

use std::env;
use std::path::PathBuf;

/// The parts of the runner environment xcci depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnv {
    /// `RUNNER_TEMP`, or the OS temp directory outside of Actions
    pub runner_temp: PathBuf,
    pub home: Option<PathBuf>,
    /// `RUNNER_OS`, e.g. `macOS`
    pub runner_os: Option<String>,
    pub run_id: Option<String>,
    pub run_number: Option<String>,
    /// `GITHUB_REPOSITORY`, `owner/name`
    pub repository: Option<String>,
}

impl HostEnv {
    /// Read the environment of the current process
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            runner_temp: var("RUNNER_TEMP")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            home: var("HOME").map(PathBuf::from),
            runner_os: var("RUNNER_OS"),
            run_id: var("GITHUB_RUN_ID"),
            run_number: var("GITHUB_RUN_NUMBER"),
            repository: var("GITHUB_REPOSITORY"),
        }
    }

    pub fn is_macos(&self) -> bool {
        self.runner_os.as_deref() == Some("macOS")
    }

    /// Link to the artifacts section of the current workflow run
    pub fn artifact_href(&self) -> String {
        format!(
            "https://github.com/{}/actions/runs/{}#artifact",
            self.repository.as_deref().unwrap_or_default(),
            self.run_id.as_deref().unwrap_or_default()
        )
    }
}
