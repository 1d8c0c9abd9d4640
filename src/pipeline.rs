//! Main and post phases
//!
//! The action runs twice per job as two separate processes. The first run
//! records `isPost` and performs the main phase: select Xcode, derive the
//! invocations, set up signing material and run xcodebuild. The second run
//! sees `isPost` and tears the signing material down again.

use std::env;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::Serialize;
use tracing::{debug, info, warn};
use xcci_invocation::{
    code_sign_identity, decide_action, plan, Action, AuthenticationKey, Invocation,
    InvocationTemplate, ResultBundles, Verbosity,
};

use crate::artifact::{upload_logs, ArtifactSink};
use crate::config::{ActionConfig, AuthenticationKeyInput, UploadLogs};
use crate::destination;
use crate::error::{Error, Result};
use crate::exec::Exec;
use crate::gha::{group, Console, HostEnv, Inputs, StateStore};
use crate::package::{
    generate_xcodeproj, is_swift_package, scheme_from_package, xcodeproj_reason,
};
use crate::secrets::{
    self, api_key, keychain, profiles, SecretsLedger, SecretsRecord, TeardownReport,
};
use crate::toolchain::{ActiveToolchain, ReadOnly, Selection, Selector};
use crate::xcodebuild;

/// State key marking that the main phase has started
pub const IS_POST: &str = "isPost";

/// First Xcode that accepts `-authenticationKey*` flags
pub const AUTHENTICATION_KEY_SINCE: Version = Version::new(13, 0, 0);

/// Capabilities a phase runs against
#[derive(Clone, Copy)]
pub struct Host<'a> {
    pub exec: &'a dyn Exec,
    pub console: &'a dyn Console,
    pub state: &'a dyn StateStore,
    pub active: &'a dyn ActiveToolchain,
    pub artifacts: &'a dyn ArtifactSink,
    pub env: &'a HostEnv,
}

/// Which phase a run performed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum Outcome {
    Main(MainReport),
    Post(TeardownReport),
}

/// What the main phase did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MainReport {
    pub selection: Selection,
    pub action: Action,
    pub invocations: Vec<Invocation>,
    pub secrets: SecretsRecord,
    /// Artifact names of uploaded result bundles
    pub uploaded: Vec<String>,
}

/// Planned work, derived without side effects beyond selecting Xcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub selection: Selection,
    pub working_directory: PathBuf,
    pub swift_package: bool,
    pub action: Action,
    pub destination: Vec<String>,
    /// Reason a `.xcodeproj` would be generated first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_xcodeproj: Option<String>,
    pub invocations: Vec<Invocation>,
}

/// Entry point when running as the action: dispatch on `isPost`
pub fn run(host: Host<'_>, inputs: &dyn Inputs) -> Result<Outcome> {
    if host.state.get(IS_POST).is_some() {
        return Ok(Outcome::Post(post_phase(host)));
    }
    host.state.save(IS_POST, "true")?;
    main_phase(host, inputs).map(Outcome::Main)
}

/// Main phase; on failure result bundles are uploaded before the error returns
///
/// With `upload-logs: always` a successful run uploads too, and a failed
/// upload is then the error of the phase.
pub fn main_phase(host: Host<'_>, inputs: &dyn Inputs) -> Result<MainReport> {
    let mut working_dir = None;
    match run_main(host, inputs, &mut working_dir) {
        Ok((mut report, UploadLogs::Always)) => {
            if let Some(dir) = working_dir {
                report.uploaded = upload_logs(
                    host.artifacts,
                    host.console,
                    &dir,
                    host.env.run_number.as_deref(),
                )?;
            }
            Ok(report)
        }
        Ok((report, UploadLogs::OnFailure)) => Ok(report),
        Err(e) => {
            warn!(error = %e, "main phase failed");
            match working_dir.or_else(|| env::current_dir().ok()) {
                Some(dir) => {
                    let run_number = host.env.run_number.as_deref();
                    let uploaded = upload_logs(host.artifacts, host.console, &dir, run_number);
                    if let Err(upload) = uploaded {
                        host.console.warning(&upload.to_string());
                    }
                }
                None => host.console.warning("cannot upload logs: no working directory"),
            }
            host.console.warning(&format!(
                "We feel you. CI failures suck. \
                 Download the `.xcresult` files we just artifact’d. \
                 They *really* help diagnose what went wrong! {}",
                host.env.artifact_href()
            ));
            Err(e)
        }
    }
}

/// Report a fatal error, with the command line that produced it if any
pub fn report_failure(console: &dyn Console, err: &Error) {
    console.error(&err.to_string());
    if let Some(command) = err.command() {
        console.info(&format!("failed command: {}", command));
    }
}

/// Post phase: tear down whatever the main phase recorded
///
/// Never fails. Running it again finds nothing left to do.
pub fn post_phase(host: Host<'_>) -> TeardownReport {
    let record = SecretsRecord::load(host.state);
    let report = secrets::teardown(&record, host.exec, host.console);
    if let Err(e) = SecretsRecord::clear(host.state) {
        host.console.warning(&format!("failed to clear saved state: {}", e));
    }
    report
}

/// Derive the invocations without running them or touching signing material
///
/// The active Xcode is not switched.
pub fn explain(host: Host<'_>, inputs: &dyn Inputs) -> Result<Explanation> {
    let config = ActionConfig::from_inputs(inputs, host.console)?;
    let working_dir = resolve_working_dir(config.working_directory.as_deref())?;
    let read_only = ReadOnly(host.active);
    let derived = derive(host, &read_only, &config, &working_dir)?;

    let scheme = match config.scheme.clone() {
        Some(scheme) => Some(scheme),
        None if derived.swift_package => {
            Some(scheme_from_package(host.exec, host.console, config.workspace.as_deref())?)
        }
        None => None,
    };
    let template = template(&config, &derived, scheme, None);
    let invocations = plan(&template, &derived.action, &mut ResultBundles::new());

    Ok(Explanation {
        selection: derived.selection,
        working_directory: working_dir,
        swift_package: derived.swift_package,
        action: derived.action,
        destination: derived.destination,
        generate_xcodeproj: derived.xcodeproj_reason.map(str::to_string),
        invocations,
    })
}

/// Everything decided before any secret is written
struct Derived {
    selection: Selection,
    swift_package: bool,
    action: Action,
    destination: Vec<String>,
    identity: Option<String>,
    xcodeproj_reason: Option<&'static str>,
}

fn derive(
    host: Host<'_>,
    active: &dyn ActiveToolchain,
    config: &ActionConfig,
    working_dir: &Path,
) -> Result<Derived> {
    let swift_package = is_swift_package(working_dir);
    let selection = Selector::new(host.exec, host.console, active).select(
        config.xcode.as_ref(),
        config.swift.as_ref(),
        working_dir,
    )?;

    let decision = decide_action(config.action.clone(), config.platform, &selection.xcode);
    if let Some(ref notice) = decision.notice {
        host.console.notice(notice);
    }

    let destination = destination::resolve(
        host.exec,
        host.console,
        config.platform,
        &selection.xcode,
        config.arch,
    )?;

    let identity = code_sign_identity(config.code_sign_identity.as_deref(), config.platform);
    if let Some(ref notice) = identity.notice {
        host.console.notice(notice);
    }

    host.console.info(&format!("» Selected Xcode {}", selection.xcode));

    let xcodeproj_reason = if swift_package {
        xcodeproj_reason(config.platform, &selection.xcode, config.warnings_as_errors)
    } else {
        None
    };

    Ok(Derived {
        selection,
        swift_package,
        action: decision.action,
        destination,
        identity: identity.token,
        xcodeproj_reason,
    })
}

fn template(
    config: &ActionConfig,
    derived: &Derived,
    scheme: Option<String>,
    authentication: Option<AuthenticationKey>,
) -> InvocationTemplate {
    InvocationTemplate {
        destination: derived.destination.clone(),
        scheme,
        arch: config.arch,
        workspace: config.workspace.clone(),
        identity: derived.identity.clone(),
        quiet: config.verbosity == Verbosity::Quiet,
        configuration: config.configuration.clone(),
        authentication,
        warnings_as_errors: config.warnings_as_errors,
        code_coverage: config.code_coverage,
    }
}

fn resolve_working_dir(input: Option<&Path>) -> Result<PathBuf> {
    Ok(match input {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => env::current_dir()?.join(dir),
        None => env::current_dir()?,
    })
}

/// Everything up to and including xcodebuild; uploads are left to the caller
fn run_main(
    host: Host<'_>,
    inputs: &dyn Inputs,
    working_dir_out: &mut Option<PathBuf>,
) -> Result<(MainReport, UploadLogs)> {
    let config = ActionConfig::from_inputs(inputs, host.console)?;

    let working_dir = resolve_working_dir(config.working_directory.as_deref())?;
    if config.working_directory.is_some() {
        env::set_current_dir(&working_dir)?;
        debug!(dir = %working_dir.display(), "changed working directory");
    }
    *working_dir_out = Some(working_dir.clone());

    let derived = derive(host, host.active, &config, &working_dir)?;

    if let Some(reason) = derived.xcodeproj_reason {
        generate_xcodeproj(host.exec, host.console, reason)?;
    }

    let mut ledger = SecretsLedger::new(host.state);

    let authentication = match config.authentication_key {
        Some(ref key) => authentication_key(host, key, &derived.selection.xcode, &mut ledger)?,
        None => None,
    };

    if let Some(ref certificate) = config.certificate {
        if !host.env.is_macos() {
            return Err(Error::setup(
                "configuring code signing",
                "code-sign-certificate requires macOS.",
            ));
        }
        group(host.console, "Configuring code signing", || {
            let temp = &host.env.runner_temp;
            keychain::create(host.exec, host.console, temp, certificate, &mut ledger)
        })?;
    }

    if !config.profiles.is_empty() {
        profiles::install(host.console, host.env.home.as_deref(), &config.profiles, &mut ledger)?;
    }

    let scheme = match config.scheme.clone() {
        Some(scheme) => Some(scheme),
        None if derived.swift_package => {
            Some(scheme_from_package(host.exec, host.console, config.workspace.as_deref())?)
        }
        None => None,
    };

    let template = template(&config, &derived, scheme, authentication);
    let invocations = plan(&template, &derived.action, &mut ResultBundles::new());
    info!(count = invocations.len(), action = %derived.action, "planned xcodebuild invocations");
    xcodebuild::run_all(host.exec, host.console, &invocations, config.verbosity)?;

    let report = MainReport {
        selection: derived.selection,
        action: derived.action,
        invocations,
        secrets: ledger.into_record(),
        uploaded: Vec::new(),
    };
    Ok((report, config.upload_logs))
}

fn authentication_key(
    host: Host<'_>,
    key: &AuthenticationKeyInput,
    xcode: &Version,
    ledger: &mut SecretsLedger<'_>,
) -> Result<Option<AuthenticationKey>> {
    if *xcode < AUTHENTICATION_KEY_SINCE {
        host.console
            .notice("Ignoring authentication-key-base64 because it requires Xcode 13 or later.");
        return Ok(None);
    }

    let (Some(key_id), Some(issuer_id)) = (&key.key_id, &key.issuer_id) else {
        return Err(Error::MissingRequiredPair {
            provided: "authentication-key-base64".to_string(),
            missing: "authentication-key-id and authentication-key-issuer-id".to_string(),
        });
    };

    let path = api_key::create(host.console, &host.env.runner_temp, key.base64.expose(), ledger)?;
    Ok(Some(AuthenticationKey {
        path: path.display().to_string(),
        key_id: key_id.expose().to_string(),
        issuer_id: issuer_id.expose().to_string(),
    }))
}
