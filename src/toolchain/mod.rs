//! Xcode toolchain discovery and selection
//!
//! Resolution order:
//! 1. `swift` range: highest Swift among matching Xcodes, ties to highest Xcode
//! 2. `xcode` range: highest matching Xcode
//! 3. `.swift-version` in the working directory, as a `swift` range
//! 4. The machine's current Xcode, unchanged
//!
//! Only cases 1-3 switch the active Xcode, and only after a match.

mod active;
mod discovery;
mod select;

pub use active::{ActiveToolchain, ReadOnly, XcodeSelect};
pub use discovery::{bundle_version, discover, XCODE_BUNDLE_ID};
pub use select::{
    best_by_swift, best_by_xcode, read_pinned_swift_version, swift_version, Selection, Selector,
    PINNED_VERSION_FILE,
};

use semver::Version;
use serde::Serialize;
use std::path::PathBuf;

/// One installed copy of Xcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installation {
    /// Path of the `.app` bundle
    pub path: PathBuf,
    pub version: Version,
}

impl Installation {
    pub fn new(path: impl Into<PathBuf>, version: Version) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }
}
