//! Finding installed Xcodes through Spotlight metadata.

use std::path::Path;

use semver::Version;
use tracing::debug;

use super::Installation;
use crate::error::Result;
use crate::exec::{Cmd, Exec};
use crate::version::coerce_version;

/// Bundle identifier shared by every Xcode release
pub const XCODE_BUNDLE_ID: &str = "com.apple.dt.Xcode";

/// Every Xcode Spotlight knows about that reports a usable version.
///
/// Bundles without a readable `kMDItemVersion` (partially installed or
/// still unpacking) are skipped.
pub fn discover(exec: &dyn Exec) -> Result<Vec<Installation>> {
    let out = exec.capture(
        &Cmd::new("mdfind").arg(format!("kMDItemCFBundleIdentifier = {}", XCODE_BUNDLE_ID)),
    )?;

    let mut installations = Vec::new();
    for path in out.lines().map(str::trim).filter(|p| !p.is_empty()) {
        match bundle_version(exec, Path::new(path)) {
            Some(version) => {
                debug!(path, %version, "found Xcode");
                installations.push(Installation::new(path, version));
            }
            None => debug!(path, "skipping Xcode without a readable version"),
        }
    }
    Ok(installations)
}

/// `kMDItemVersion` of an app bundle
pub fn bundle_version(exec: &dyn Exec, app: &Path) -> Option<Version> {
    let out = exec
        .capture(
            &Cmd::new("mdls")
                .args(["-raw", "-name", "kMDItemVersion"])
                .arg(app.display().to_string()),
        )
        .ok()?;
    coerce_version(&out)
}
