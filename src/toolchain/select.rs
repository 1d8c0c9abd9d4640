//! Picking an Xcode against the `xcode` / `swift` constraints.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;
use semver::Version;
use serde::Serialize;
use tracing::debug;

use super::{bundle_version, discover, ActiveToolchain, Installation};
use crate::error::{Error, Result};
use crate::exec::{Cmd, Exec};
use crate::gha::Console;
use crate::version::{coerce_version, VersionRange};

/// Project-local file pinning a Swift minor version
pub const PINNED_VERSION_FILE: &str = ".swift-version";

/// Outcome of toolchain selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Version of the Xcode builds will run with
    pub xcode: Version,
    /// App bundle, when selection switched to it
    pub path: Option<PathBuf>,
    /// Embedded Swift, when a Swift constraint drove selection
    pub swift: Option<Version>,
    /// Whether the active Xcode was switched
    pub activated: bool,
}

/// Resolves constraints against discovered installations and activates the winner
pub struct Selector<'a> {
    exec: &'a dyn Exec,
    console: &'a dyn Console,
    active: &'a dyn ActiveToolchain,
}

impl<'a> Selector<'a> {
    pub fn new(
        exec: &'a dyn Exec,
        console: &'a dyn Console,
        active: &'a dyn ActiveToolchain,
    ) -> Self {
        Self {
            exec,
            console,
            active,
        }
    }

    /// Select per the resolution order in the module docs
    pub fn select(
        &self,
        xcode: Option<&VersionRange>,
        swift: Option<&VersionRange>,
        working_dir: &Path,
    ) -> Result<Selection> {
        if let Some(range) = swift {
            return self.select_swift(range);
        }
        if let Some(range) = xcode {
            return self.select_xcode(range);
        }
        if let Some(range) = read_pinned_swift_version(working_dir, self.console) {
            return self.select_swift(&range);
        }
        match self.current_version() {
            Some(version) => {
                debug!(%version, "using the active Xcode");
                Ok(Selection {
                    xcode: version,
                    path: None,
                    swift: None,
                    activated: false,
                })
            }
            None => self.select_xcode(&VersionRange::any()),
        }
    }

    /// Highest Xcode whose own version satisfies `range`
    pub fn select_xcode(&self, range: &VersionRange) -> Result<Selection> {
        let installations = discover(self.exec)?;
        let best = best_by_xcode(&installations, range).ok_or_else(|| Error::NoMatchingToolchain {
            constraint: format!("~> {}", range),
        })?;

        self.active.activate(best)?;
        Ok(Selection {
            xcode: best.version.clone(),
            path: Some(best.path.clone()),
            swift: None,
            activated: true,
        })
    }

    /// Xcode embedding the highest Swift that satisfies `range`
    pub fn select_swift(&self, range: &VersionRange) -> Result<Selection> {
        let installations = discover(self.exec)?;
        let mut candidates = Vec::with_capacity(installations.len());
        for install in installations {
            let swift = swift_version(self.exec, &install)?;
            debug!(xcode = %install.version, %swift, "embedded Swift");
            candidates.push((install, swift));
        }

        let (best, swift) =
            best_by_swift(&candidates, range).ok_or_else(|| Error::NoMatchingToolchain {
                constraint: format!("with Swift ~> {}", range),
            })?;
        self.console.info(&format!("» Selected Swift {}", swift));

        self.active.activate(best)?;
        Ok(Selection {
            xcode: best.version.clone(),
            path: Some(best.path.clone()),
            swift: Some(swift.clone()),
            activated: true,
        })
    }

    /// Version of the currently active Xcode, if it can be determined
    fn current_version(&self) -> Option<Version> {
        let developer_dir = self.active.developer_dir().ok()?;
        // <app>/Contents/Developer
        let app = developer_dir.parent()?.parent()?;
        bundle_version(self.exec, app)
    }
}

/// Highest-versioned installation in `range`
pub fn best_by_xcode<'i>(
    installations: &'i [Installation],
    range: &VersionRange,
) -> Option<&'i Installation> {
    installations
        .iter()
        .filter(|i| range.matches(&i.version))
        .max_by(|a, b| a.version.cmp(&b.version))
}

/// Installation with the highest Swift in `range`, ties going to the higher Xcode
pub fn best_by_swift<'i>(
    candidates: &'i [(Installation, Version)],
    range: &VersionRange,
) -> Option<(&'i Installation, &'i Version)> {
    candidates
        .iter()
        .filter(|(_, swift)| range.matches(swift))
        .max_by(|(a, swift_a), (b, swift_b)| match swift_a.cmp(swift_b) {
            Ordering::Equal => a.version.cmp(&b.version),
            other => other,
        })
        .map(|(install, swift)| (install, swift))
}

/// Swift version embedded in an Xcode
pub fn swift_version(exec: &dyn Exec, install: &Installation) -> Result<Version> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"Swift version (\S+)").expect("swift pattern is valid"));

    let cmd = Cmd::new("swift")
        .arg("--version")
        .env("DEVELOPER_DIR", install.path.display().to_string())
        .stderr_as_info();
    let out = exec.capture(&cmd)?;

    pattern
        .captures(&out)
        .and_then(|c| c.get(1))
        .and_then(|m| coerce_version(m.as_str()))
        .ok_or_else(|| Error::ToolVersion {
            xcode: install.version.to_string(),
        })
}

/// Range from `.swift-version`, if present and parseable
pub fn read_pinned_swift_version(
    working_dir: &Path,
    console: &dyn Console,
) -> Option<VersionRange> {
    let text = fs::read_to_string(working_dir.join(PINNED_VERSION_FILE)).ok()?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match VersionRange::tilde(text) {
        Ok(range) => {
            console.info(&format!("» `{}` » ~> {}", PINNED_VERSION_FILE, text));
            Some(range)
        }
        Err(e) => {
            console.warning(&format!(
                "ignoring `{}`: cannot read `{}` as a version ({})",
                PINNED_VERSION_FILE, text, e
            ));
            None
        }
    }
}
