//! Provisioning profiles.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{decode, SecretsLedger};
use crate::config::ProfileInputs;
use crate::error::{Error, Result};
use crate::gha::Console;

/// Where Xcode looks for profiles, relative to `$HOME`
pub const PROFILES_DIR: &str = "Library/MobileDevice/Provisioning Profiles";

pub const MOBILE_EXTENSION: &str = "mobileprovision";
pub const MAC_EXTENSION: &str = "provisionprofile";

/// Decode every profile into Xcode's profile directory
pub fn install(
    console: &dyn Console,
    home: Option<&Path>,
    profiles: &ProfileInputs,
    ledger: &mut SecretsLedger<'_>,
) -> Result<Vec<PathBuf>> {
    let home =
        home.ok_or_else(|| Error::setup("installing provisioning profiles", "HOME is not set"))?;
    let dir = home.join(PROFILES_DIR);

    console.info("Creating provisioning profiles");
    fs::create_dir_all(&dir).map_err(|e| Error::setup("creating the profiles directory", e))?;

    let entries = profiles
        .mobile
        .iter()
        .map(|p| (p, MOBILE_EXTENSION))
        .chain(profiles.mac.iter().map(|p| (p, MAC_EXTENSION)));

    let mut paths = Vec::new();
    for (profile, extension) in entries {
        let bytes = decode("provisioning profile", profile.expose())?;
        let path = dir.join(format!("{}.{}", Uuid::new_v4(), extension));
        ledger.provisioning_profile(&path)?;
        fs::write(&path, bytes).map_err(|e| Error::setup("writing a provisioning profile", e))?;
        paths.push(path);
    }
    Ok(paths)
}

/// Remove one installed profile if it is still there
pub fn delete(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}
