//! The machine-wide active Xcode.

use std::path::PathBuf;

use tracing::debug;

use super::Installation;
use crate::error::Result;
use crate::exec::{Cmd, Exec};

/// Capability over the machine's active developer directory
///
/// Switching affects every process on the host; xcci assumes it has the
/// runner to itself.
pub trait ActiveToolchain {
    /// The active developer directory, e.g. `/Applications/Xcode.app/Contents/Developer`
    fn developer_dir(&self) -> Result<PathBuf>;

    /// Make `installation` the active Xcode
    fn activate(&self, installation: &Installation) -> Result<()>;
}

/// [`ActiveToolchain`] through `xcode-select`
pub struct XcodeSelect<'a> {
    exec: &'a dyn Exec,
}

impl<'a> XcodeSelect<'a> {
    pub fn new(exec: &'a dyn Exec) -> Self {
        Self { exec }
    }
}

impl ActiveToolchain for XcodeSelect<'_> {
    fn developer_dir(&self) -> Result<PathBuf> {
        let out = self
            .exec
            .capture(&Cmd::new("xcode-select").arg("--print-path"))?;
        Ok(PathBuf::from(out.trim()))
    }

    fn activate(&self, installation: &Installation) -> Result<()> {
        self.exec.run(
            &Cmd::new("sudo")
                .args(["xcode-select", "--switch"])
                .arg(installation.path.display().to_string()),
        )
    }
}

/// Wraps another [`ActiveToolchain`] and never switches
///
/// Used when planning without side effects.
pub struct ReadOnly<'a>(pub &'a dyn ActiveToolchain);

impl ActiveToolchain for ReadOnly<'_> {
    fn developer_dir(&self) -> Result<PathBuf> {
        self.0.developer_dir()
    }

    fn activate(&self, installation: &Installation) -> Result<()> {
        debug!(path = %installation.path.display(), "not switching Xcode in read-only mode");
        Ok(())
    }
}
