//! Ephemeral signing keychain.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{decode, SecretsLedger};
use crate::config::CertificateInput;
use crate::error::{Error, Result};
use crate::exec::{Cmd, Exec};
use crate::gha::Console;

pub const SECURITY: &str = "/usr/bin/security";

/// Seconds of inactivity before the keychain locks again
const LOCK_TIMEOUT: &str = "21600";

/// Run one `security` subcommand in interactive mode
///
/// The command travels over stdin so passwords stay off the process list.
pub fn security(exec: &dyn Exec, args: &[&str]) -> Result<()> {
    if args.iter().any(|arg| arg.contains('\n')) {
        return Err(Error::setup(
            format!("running `security {}`", args.first().copied().unwrap_or_default()),
            "arguments must not contain newlines",
        ));
    }
    let command = format!("{}\n", args.join(" "));
    exec.run(&Cmd::new(SECURITY).arg("-i").stdin(command))
}

/// The user keychain search list, one entry per line as `security` prints it
pub fn search_path(exec: &dyn Exec) -> Result<Vec<String>> {
    let out = exec.capture(&Cmd::new(SECURITY).args(["list-keychains", "-d", "user"]))?;
    Ok(out
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Create a keychain holding `certificate` and put it first in the search list
pub fn create(
    exec: &dyn Exec,
    console: &dyn Console,
    runner_temp: &Path,
    certificate: &CertificateInput,
    ledger: &mut SecretsLedger<'_>,
) -> Result<PathBuf> {
    let passphrase = certificate
        .passphrase
        .as_ref()
        .ok_or_else(|| Error::MissingRequiredPair {
            provided: "code-sign-certificate".to_string(),
            missing: "code-sign-certificate-passphrase".to_string(),
        })?;
    let p12 = decode("code-sign-certificate", certificate.base64.expose())?;

    let password = Uuid::new_v4().to_string();
    console.set_secret(&password);
    let name = Uuid::new_v4().to_string();
    console.set_secret(&name);

    let keychain = runner_temp.join(format!("{}.keychain-db", name));
    ledger.keychain_path(&keychain)?;
    let keychain_arg = keychain.display().to_string();

    let prior = search_path(exec).map_err(|e| Error::setup("reading the keychain search path", e))?;
    ledger.keychain_search_path(&prior)?;

    console.info("Creating keychain");
    security(exec, &["create-keychain", "-p", &password, &keychain_arg])
        .and_then(|_| {
            security(
                exec,
                &["set-keychain-settings", "-lut", LOCK_TIMEOUT, &keychain_arg],
            )
        })
        .and_then(|_| security(exec, &["unlock-keychain", "-p", &password, &keychain_arg]))
        .map_err(|e| Error::setup("creating the keychain", e))?;

    console.info("Importing certificate to keychain");
    let certificate_path = runner_temp.join(format!("{}.p12", name));
    fs::write(&certificate_path, p12).map_err(|e| Error::setup("writing the certificate", e))?;
    let certificate_arg = certificate_path.display().to_string();
    let imported = security(
        exec,
        &[
            "import",
            &certificate_arg,
            "-P",
            passphrase.expose(),
            "-A",
            "-t",
            "cert",
            "-f",
            "pkcs12",
            "-x",
            "-k",
            &keychain_arg,
        ],
    );
    let removed = fs::remove_file(&certificate_path);
    imported.map_err(|e| Error::setup("importing the certificate", e))?;
    removed.map_err(|e| Error::setup("removing the certificate file", e))?;

    console.info("Updating keychain search path");
    let mut list = vec!["list-keychains", "-d", "user", "-s", keychain_arg.as_str()];
    list.extend(prior.iter().map(String::as_str));
    security(exec, &list).map_err(|e| Error::setup("updating the keychain search path", e))?;

    Ok(keychain)
}

/// Put the search list back the way it was
pub fn restore_search_path(exec: &dyn Exec, console: &dyn Console, prior: &[String]) -> Result<()> {
    console.info("Restoring keychain search path");
    let mut list = vec!["list-keychains", "-d", "user", "-s"];
    list.extend(prior.iter().map(String::as_str));
    security(exec, &list)
}

/// Delete the keychain, falling back to removing its file
///
/// A keychain that no longer exists is left alone.
pub fn delete(exec: &dyn Exec, console: &dyn Console, keychain: &Path) -> Result<()> {
    if !keychain.exists() {
        return Ok(());
    }
    console.info("Deleting keychain");
    let keychain_arg = keychain.display().to_string();
    if let Err(e) = security(exec, &["delete-keychain", &keychain_arg]) {
        console.error(&format!("Failed to delete keychain: {}", e));
        if keychain.exists() {
            fs::remove_file(keychain)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;
    use crate::error::Termination;
    use crate::gha::MemoryState;
    use crate::mock::{MockExec, RecordingConsole};
    use crate::gha::StateStore;
    use crate::secrets::record::{KEYCHAIN_PATH, KEYCHAIN_SEARCH_PATH};
    use tempfile::TempDir;

    const LOGIN: &str = "\"/Users/runner/Library/Keychains/login.keychain-db\"";

    fn certificate() -> CertificateInput {
        CertificateInput {
            // "p12 bytes"
            base64: Secret::new("cDEyIGJ5dGVz"),
            passphrase: Some(Secret::new("pass")),
        }
    }

    fn stdin_lines(exec: &MockExec) -> Vec<String> {
        exec.calls_to(SECURITY)
            .into_iter()
            .filter_map(|c| c.stdin)
            .map(|s| s.trim_end().to_string())
            .collect()
    }

    #[test]
    fn test_create_runs_security_in_order() {
        let dir = TempDir::new().unwrap();
        let exec = MockExec::new().respond(
            "/usr/bin/security list-keychains -d user",
            format!("    {}\n", LOGIN),
        );
        let console = RecordingConsole::new();
        let state = MemoryState::new();
        let mut ledger = SecretsLedger::new(&state);

        let keychain = create(&exec, &console, dir.path(), &certificate(), &mut ledger).unwrap();
        let k = keychain.display().to_string();
        assert!(k.ends_with(".keychain-db"));
        assert_eq!(keychain.parent(), Some(dir.path()));

        let lines = stdin_lines(&exec);
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("create-keychain -p "));
        assert!(lines[0].ends_with(&k));
        assert_eq!(lines[1], format!("set-keychain-settings -lut 21600 {}", k));
        assert!(lines[2].starts_with("unlock-keychain -p "));
        assert!(lines[3].starts_with("import "));
        assert!(lines[3].contains(" -P pass -A -t cert -f pkcs12 -x -k "));
        assert_eq!(lines[4], format!("list-keychains -d user -s {} {}", k, LOGIN));

        // password, name
        assert_eq!(console.secrets().len(), 2);
        // the certificate never outlives the import
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());

        assert_eq!(state.get(KEYCHAIN_PATH), Some(k));
        assert_eq!(state.get(KEYCHAIN_SEARCH_PATH), Some(format!("[{:?}]", LOGIN)));
    }

    #[test]
    fn test_missing_passphrase() {
        let dir = TempDir::new().unwrap();
        let exec = MockExec::new();
        let console = RecordingConsole::new();
        let state = MemoryState::new();
        let mut ledger = SecretsLedger::new(&state);
        let mut cert = certificate();
        cert.passphrase = None;

        let err = create(&exec, &console, dir.path(), &cert, &mut ledger).unwrap_err();
        assert_eq!(
            err.to_string(),
            "code-sign-certificate requires code-sign-certificate-passphrase."
        );
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_failed_creation_keeps_path_for_cleanup() {
        let dir = TempDir::new().unwrap();
        let exec = MockExec::new().exit("/usr/bin/security -i", Termination::Code(1));
        let console = RecordingConsole::new();
        let state = MemoryState::new();
        let mut ledger = SecretsLedger::new(&state);

        let err = create(&exec, &console, dir.path(), &certificate(), &mut ledger).unwrap_err();
        assert!(matches!(
            err,
            Error::SecretSetup { ref step, .. } if step == "creating the keychain"
        ));
        assert!(state.get(KEYCHAIN_PATH).is_some());
        assert!(state.get(KEYCHAIN_SEARCH_PATH).is_some());
    }

    #[test]
    fn test_newline_in_argument_is_refused() {
        let exec = MockExec::new();
        let err = security(&exec, &["unlock-keychain", "-p", "a\nb", "/k"]).unwrap_err();
        assert!(matches!(err, Error::SecretSetup { .. }));
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_delete_missing_keychain_is_noop() {
        let exec = MockExec::new();
        let console = RecordingConsole::new();
        delete(&exec, &console, Path::new("/nonexistent/xcci.keychain-db")).unwrap();
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_delete_falls_back_to_removing_file() {
        let dir = TempDir::new().unwrap();
        let keychain = dir.path().join("k.keychain-db");
        fs::write(&keychain, b"").unwrap();
        let exec = MockExec::new().exit("/usr/bin/security -i", Termination::Code(50));
        let console = RecordingConsole::new();

        delete(&exec, &console, &keychain).unwrap();
        assert!(!keychain.exists());
        assert_eq!(console.errors().len(), 1);
    }
}
