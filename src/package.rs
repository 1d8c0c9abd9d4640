//! Swift Package Manager projects.

use std::path::Path;

use semver::Version;
use serde::Deserialize;
use xcci_invocation::{Platform, WATCHOS_TESTABLE_SINCE};

use crate::error::{Error, Result};
use crate::exec::{parse_tool_json, Cmd, Exec};
use crate::gha::{group, Console};
use crate::xcodebuild::XCODEBUILD;

pub const MANIFEST: &str = "Package.swift";

/// First Xcode able to build a package without a generated project
const BUILDS_PACKAGES_SINCE: Version = Version::new(11, 0, 0);

/// Whether `dir` holds a Swift package
pub fn is_swift_package(dir: &Path) -> bool {
    dir.join(MANIFEST).is_file()
}

#[derive(Debug, Deserialize)]
struct SchemeList {
    workspace: Option<Schemes>,
    project: Option<Schemes>,
}

#[derive(Debug, Deserialize)]
struct Schemes {
    #[serde(default)]
    schemes: Vec<String>,
}

/// The scheme to build when none was given
///
/// Prefers the aggregate `*-Package` scheme SwiftPM generates.
pub fn scheme_from_package(
    exec: &dyn Exec,
    console: &dyn Console,
    workspace: Option<&str>,
) -> Result<String> {
    let mut cmd = Cmd::new(XCODEBUILD).args(["-list", "-json"]);
    if let Some(workspace) = workspace {
        cmd = cmd.args(["-workspace", workspace]);
    }
    let out = exec.capture(&cmd)?;
    let list: SchemeList = parse_tool_json(console, XCODEBUILD, &out)?;

    let schemes = list.workspace.or(list.project).map(|s| s.schemes).unwrap_or_default();
    schemes
        .iter()
        .find(|s| s.ends_with("-Package"))
        .or_else(|| schemes.first())
        .cloned()
        .ok_or(Error::SchemeNotFound)
}

/// Why a `.xcodeproj` must be generated before building, if it must
pub fn xcodeproj_reason(
    platform: Option<Platform>,
    xcode: &Version,
    warnings_as_errors: bool,
) -> Option<&'static str> {
    if platform == Some(Platform::WatchOs) && *xcode < WATCHOS_TESTABLE_SINCE {
        Some("Xcode <12.5 fails to build Swift Packages for watchOS if tests exist")
    } else if *xcode < BUILDS_PACKAGES_SINCE {
        Some("Xcode <11 cannot build")
    } else if warnings_as_errors {
        // a package `build` compiles test targets too, and their warnings would fail it
        Some("`warningsAsErrors` is set")
    } else {
        None
    }
}

/// `swift package generate-xcodeproj`
pub fn generate_xcodeproj(exec: &dyn Exec, console: &dyn Console, reason: &str) -> Result<()> {
    group(console, "Generating `.xcodeproj`", || {
        console.info(&format!("Generating `.xcodeproj` ∵ {}", reason));
        exec.run(&Cmd::new("swift").args(["package", "generate-xcodeproj"]))
    })
}
