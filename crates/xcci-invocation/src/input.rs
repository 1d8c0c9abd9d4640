//! Closed input enums.
//!
//! Action inputs arrive as free-form strings. They are validated here, once,
//! at the boundary; everything downstream works with these types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised when an input is outside its closed set of values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Invalid platform: {0}")]
    InvalidPlatform(String),

    #[error("Invalid arch: {0}")]
    InvalidArch(String),
}

/// Target platform for the build
///
/// The "unset" platform is modelled as `Option<Platform>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "iOS")]
    Ios,
    #[serde(rename = "tvOS")]
    TvOs,
    #[serde(rename = "watchOS")]
    WatchOs,
    #[serde(rename = "macOS")]
    MacOs,
    #[serde(rename = "mac-catalyst")]
    MacCatalyst,
}

impl Platform {
    /// Every accepted platform value
    pub const ALL: [Platform; 5] = [
        Platform::Ios,
        Platform::TvOs,
        Platform::WatchOs,
        Platform::MacOs,
        Platform::MacCatalyst,
    ];

    /// Parse an optional platform input; empty means unset
    pub fn parse_optional(value: &str) -> Result<Option<Self>, InputError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        value.parse().map(Some)
    }

    /// The input spelling of this platform
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "iOS",
            Platform::TvOs => "tvOS",
            Platform::WatchOs => "watchOS",
            Platform::MacOs => "macOS",
            Platform::MacCatalyst => "mac-catalyst",
        }
    }

    /// Platforms that run on a simulator or device rather than the host Mac
    pub fn is_device_class(&self) -> bool {
        matches!(self, Platform::Ios | Platform::TvOs | Platform::WatchOs)
    }
}

impl FromStr for Platform {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| InputError::InvalidPlatform(s.to_string()))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture passed to `xcodebuild -arch`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    #[serde(rename = "arm64")]
    Arm64,
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "i386")]
    I386,
}

impl Arch {
    /// Parse an optional arch input; empty means unset
    pub fn parse_optional(value: &str) -> Result<Option<Self>, InputError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        value.parse().map(Some)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Arm64 => "arm64",
            Arch::X86_64 => "x86_64",
            Arch::I386 => "i386",
        }
    }
}

impl FromStr for Arch {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arm64" => Ok(Arch::Arm64),
            "x86_64" => Ok(Arch::X86_64),
            "i386" => Ok(Arch::I386),
            other => Err(InputError::InvalidArch(other.to_string())),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The xcodebuild action to run
///
/// `Other` carries any action xcodebuild knows that this tool has no
/// special handling for; it is passed through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Build,
    #[default]
    Test,
    BuildForTesting,
    TestWithoutBuilding,
    Analyze,
    Archive,
    Clean,
    /// Skip invoking xcodebuild entirely
    None,
    Other(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::Build => "build",
            Action::Test => "test",
            Action::BuildForTesting => "build-for-testing",
            Action::TestWithoutBuilding => "test-without-building",
            Action::Analyze => "analyze",
            Action::Archive => "archive",
            Action::Clean => "clean",
            Action::None => "none",
            Action::Other(s) => s,
        }
    }

    /// Actions that compile test targets
    pub fn is_testable(&self) -> bool {
        matches!(self, Action::Test | Action::BuildForTesting)
    }
}

impl From<&str> for Action {
    fn from(value: &str) -> Self {
        match value {
            "build" => Action::Build,
            "test" => Action::Test,
            "build-for-testing" => Action::BuildForTesting,
            "test-without-building" => Action::TestWithoutBuilding,
            "analyze" => Action::Analyze,
            "archive" => Action::Archive,
            "clean" => Action::Clean,
            "none" => Action::None,
            other => Action::Other(other.to_string()),
        }
    }
}

impl From<String> for Action {
    fn from(value: String) -> Self {
        Action::from(value.as_str())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build configuration name
///
/// Both `.xcodeproj` and SwiftPM projects capitalize the stock
/// configurations and match them case-sensitively. An unknown name is kept
/// as given: xcodebuild does not fail on it, it just builds something else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Configuration {
    Debug,
    Release,
    Custom(String),
}

impl Configuration {
    /// Parse an optional configuration input; empty means project default
    pub fn parse_optional(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(Configuration::from(value))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Configuration::Debug => "Debug",
            Configuration::Release => "Release",
            Configuration::Custom(s) => s,
        }
    }
}

impl From<&str> for Configuration {
    fn from(value: &str) -> Self {
        match value {
            "debug" => Configuration::Debug,
            "release" => Configuration::Release,
            other => Configuration::Custom(other.to_string()),
        }
    }
}

impl From<String> for Configuration {
    fn from(value: String) -> Self {
        Configuration::from(value.as_str())
    }
}

impl From<Configuration> for String {
    fn from(configuration: Configuration) -> Self {
        configuration.as_str().to_string()
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of xcodebuild's output reaches the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Pipe stdout through `xcpretty`
    #[default]
    Xcpretty,
    /// Pass `-quiet` to xcodebuild
    Quiet,
    /// Echo every helper command and its output
    Verbose,
}

impl Verbosity {
    /// Parse a verbosity value, `None` when it is not one of the known modes
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "xcpretty" => Some(Verbosity::Xcpretty),
            "quiet" => Some(Verbosity::Quiet),
            "verbose" => Some(Verbosity::Verbose),
            _ => None,
        }
    }
}
