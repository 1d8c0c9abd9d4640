//! Secrets lifecycle
//!
//! The main phase writes signing material to disk and records where
//! through a [`SecretsLedger`]. The post phase, a separate process, loads
//! the [`SecretsRecord`] back from state and tears everything down with
//! [`teardown`]. Teardown never fails the job: each step runs in isolation
//! and failures are collected into a [`TeardownReport`].

pub mod api_key;
pub mod keychain;
pub mod profiles;
mod record;

pub use record::{
    SecretsLedger, SecretsRecord, KEYCHAIN_PATH, KEYCHAIN_SEARCH_PATH, KEY_PATH,
    PROVISIONING_PROFILE_PATHS, STATE_KEYS,
};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::exec::Exec;
use crate::gha::Console;

/// Decode a base64 input, ignoring embedded whitespace
///
/// The error never carries the value or the decoder's offset into it.
pub(crate) fn decode(name: &str, value: &str) -> Result<Vec<u8>> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|_| Error::setup(format!("decoding {}", name), "not valid base64"))
}

/// One cleanup step that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownFailure {
    pub resource: String,
    pub message: String,
}

/// Outcome of [`teardown`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    /// Steps attempted, in order
    pub attempted: Vec<String>,
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn step(&mut self, console: &dyn Console, resource: &str, f: impl FnOnce() -> Result<()>) {
        debug!(resource, "teardown step");
        self.attempted.push(resource.to_string());
        if let Err(e) = f() {
            console.error(&format!("Failed to clean up {}: {}", resource, e));
            self.failures.push(TeardownFailure {
                resource: resource.to_string(),
                message: e.to_string(),
            });
        }
    }
}

/// Remove everything `record` names
///
/// Steps that have nothing to do are skipped. A failing step is logged and
/// the remaining steps still run.
pub fn teardown(record: &SecretsRecord, exec: &dyn Exec, console: &dyn Console) -> TeardownReport {
    let mut report = TeardownReport::default();

    if let Some(ref path) = record.key_path {
        report.step(console, "App Store Connect API key file", || api_key::delete(console, path));
    }
    if let Some(ref prior) = record.keychain_search_path {
        report.step(console, "keychain search path", || {
            keychain::restore_search_path(exec, console, prior)
        });
    }
    if let Some(ref path) = record.keychain_path {
        report.step(console, "keychain", || keychain::delete(exec, console, path));
    }
    if !record.provisioning_profile_paths.is_empty() {
        console.info("Deleting provisioning profiles");
        for path in &record.provisioning_profile_paths {
            report.step(console, "provisioning profile", || profiles::delete(path));
        }
    }

    if !report.is_clean() {
        console.warning(&format!(
            "some cleanup steps failed ({} of {})",
            report.failures.len(),
            report.attempted.len()
        ));
    }
    report
}
