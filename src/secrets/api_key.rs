//! App Store Connect API key file.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{decode, SecretsLedger};
use crate::error::{Error, Result};
use crate::gha::Console;

/// Write the `.p8` key under `runner_temp` with an unguessable name
pub fn create(
    console: &dyn Console,
    runner_temp: &Path,
    key_base64: &str,
    ledger: &mut SecretsLedger<'_>,
) -> Result<PathBuf> {
    let key = decode("authentication-key-base64", key_base64)?;
    let name = Uuid::new_v4().to_string();
    console.set_secret(&name);

    let path = runner_temp.join(format!("{}.p8", name));
    ledger.key_path(&path)?;

    console.info("Creating App Store Connect API key file");
    fs::write(&path, key).map_err(|e| Error::setup("writing the API key file", e))?;
    Ok(path)
}

/// Remove the key file if it is still there
pub fn delete(console: &dyn Console, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    console.info("Deleting App Store Connect API key file");
    fs::remove_file(path)?;
    Ok(())
}
