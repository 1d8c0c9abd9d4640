//! Error taxonomy for xcci
//!
//! Every fatal condition of a run is a variant here. Cleanup failures are
//! deliberately absent: teardown collects them into a
//! [`TeardownReport`](crate::secrets::TeardownReport) instead.

use std::fmt;
use std::io;

use thiserror::Error;
use xcci_invocation::InputError;

/// How an external process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited with this status code
    Code(i32),
    /// Killed by this signal number
    Signal(i32),
}

impl Termination {
    pub fn success(&self) -> bool {
        matches!(self, Termination::Code(0))
    }

    #[cfg(unix)]
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        match (status.code(), status.signal()) {
            (Some(code), _) => Termination::Code(code),
            (None, Some(signal)) => Termination::Signal(signal),
            (None, None) => Termination::Code(-1),
        }
    }

    #[cfg(not(unix))]
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        Termination::Code(status.code().unwrap_or(-1))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Code(code) => write!(f, "{}", code),
            Termination::Signal(signal) => write!(f, "signal {}", signal),
        }
    }
}

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum Error {
    /// No discovered Xcode satisfies the requested constraint
    ///
    /// `constraint` reads as a phrase, e.g. `~> ^15` or `with Swift ~> 5.9`
    #[error("No Xcode {constraint}")]
    NoMatchingToolchain { constraint: String },

    /// A closed-set input (platform, arch) had an unknown value
    #[error(transparent)]
    Input(#[from] InputError),

    /// An input could not be interpreted
    #[error("invalid value for `{name}` ({value}): {reason}")]
    InvalidInput {
        name: String,
        value: String,
        reason: String,
    },

    /// One of two co-dependent inputs was given without the other
    #[error("{provided} requires {missing}.")]
    MissingRequiredPair { provided: String, missing: String },

    /// xcodebuild exited non-zero or was killed
    #[error("`{program}` aborted ({status})")]
    BuildToolAborted {
        program: String,
        status: Termination,
        command: String,
    },

    /// A helper command exited non-zero or was killed
    #[error("`{program}` aborted ({status})")]
    CommandFailed {
        program: String,
        status: Termination,
        command: String,
    },

    /// A command could not be started at all
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        command: String,
        #[source]
        source: io::Error,
    },

    /// A tool printed JSON we could not parse
    #[error("malformed JSON from `{tool}`: {source}")]
    MalformedToolOutput {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    /// An Xcode's embedded Swift version could not be determined
    #[error("failed to extract Swift version from Xcode {xcode}")]
    ToolVersion { xcode: String },

    /// Creating the keychain, API key file or a provisioning profile failed
    #[error("code signing setup failed while {step}: {reason}")]
    SecretSetup { step: String, reason: String },

    /// A saved-state value could not be encoded as JSON
    #[error("could not encode saved state: {0}")]
    StateEncoding(#[from] serde_json::Error),

    /// No scheme was given and none could be derived
    #[error("Could not determine scheme")]
    SchemeNotFound,

    /// The input file could not be read
    #[error("failed to load inputs from {path}: {reason}")]
    Config { path: String, reason: String },

    /// Collecting or packing log artifacts failed
    #[error("failed to upload logs: {0}")]
    Artifact(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// The command line that produced this error, when one did
    pub fn command(&self) -> Option<&str> {
        match self {
            Error::BuildToolAborted { command, .. }
            | Error::CommandFailed { command, .. }
            | Error::Spawn { command, .. } => Some(command),
            _ => None,
        }
    }

    pub(crate) fn setup(step: impl Into<String>, reason: impl fmt::Display) -> Self {
        Error::SecretSetup {
            step: step.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for xcci operations
pub type Result<T> = std::result::Result<T, Error>;
