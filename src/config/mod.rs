//! Typed action configuration
//!
//! [`ActionConfig::from_inputs`] is the only place raw input strings are
//! interpreted. Secret inputs are registered for masking as they are read.

mod secret;

pub use secret::Secret;

use std::path::PathBuf;

use serde::Serialize;
use xcci_invocation::{Action, Arch, Configuration, Platform, Verbosity};

use crate::error::{Error, Result};
use crate::gha::{Console, Inputs};
use crate::version::VersionRange;

/// When `.xcresult` bundles are packed as artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadLogs {
    /// After every main phase, successful or not
    Always,
    /// Only when the main phase fails
    #[default]
    OnFailure,
}

impl UploadLogs {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "always" => Some(UploadLogs::Always),
            "on-failure" => Some(UploadLogs::OnFailure),
            _ => None,
        }
    }
}

/// `.p12` signing certificate for the ephemeral keychain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInput {
    pub base64: Secret,
    pub passphrase: Option<Secret>,
}

/// App Store Connect API key inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationKeyInput {
    pub base64: Secret,
    pub key_id: Option<Secret>,
    pub issuer_id: Option<Secret>,
}

/// Provisioning profile payloads, base64 encoded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileInputs {
    /// `.mobileprovision` (iOS, tvOS, watchOS)
    pub mobile: Vec<Secret>,
    /// `.provisionprofile` (macOS, Mac Catalyst)
    pub mac: Vec<Secret>,
}

impl ProfileInputs {
    pub fn is_empty(&self) -> bool {
        self.mobile.is_empty() && self.mac.is_empty()
    }
}

/// Every input, validated
#[derive(Debug, Clone)]
pub struct ActionConfig {
    pub platform: Option<Platform>,
    pub arch: Option<Arch>,
    pub xcode: Option<VersionRange>,
    pub swift: Option<VersionRange>,
    pub working_directory: Option<PathBuf>,
    pub action: Action,
    pub configuration: Option<Configuration>,
    pub scheme: Option<String>,
    pub workspace: Option<String>,
    pub code_sign_identity: Option<String>,
    pub certificate: Option<CertificateInput>,
    pub authentication_key: Option<AuthenticationKeyInput>,
    pub profiles: ProfileInputs,
    pub warnings_as_errors: bool,
    pub code_coverage: bool,
    pub verbosity: Verbosity,
    pub upload_logs: UploadLogs,
}

impl ActionConfig {
    /// Read and validate every input
    ///
    /// Invalid closed-set values (platform, arch), unparseable version
    /// ranges and non-boolean flags are errors. Unknown `verbosity` and
    /// `upload-logs` values fall back to their defaults with a warning.
    pub fn from_inputs(inputs: &dyn Inputs, console: &dyn Console) -> Result<Self> {
        let secret = |name: &str| -> Option<Secret> {
            inputs.get(name).map(|value| {
                console.set_secret(&value);
                Secret::new(value)
            })
        };
        let secrets = |name: &str| -> Vec<Secret> {
            inputs
                .get_multiline(name)
                .into_iter()
                .map(|value| {
                    console.set_secret(&value);
                    Secret::new(value)
                })
                .collect()
        };

        let certificate = secret("code-sign-certificate").map(|base64| CertificateInput {
            base64,
            passphrase: secret("code-sign-certificate-passphrase"),
        });
        let authentication_key =
            secret("authentication-key-base64").map(|base64| AuthenticationKeyInput {
                base64,
                key_id: secret("authentication-key-id"),
                issuer_id: secret("authentication-key-issuer-id"),
            });
        let profiles = ProfileInputs {
            mobile: secrets("mobile-provisioning-profiles-base64"),
            mac: secrets("provisioning-profiles-base64"),
        };

        Ok(Self {
            platform: Platform::parse_optional(&inputs.get("platform").unwrap_or_default())?,
            arch: Arch::parse_optional(&inputs.get("arch").unwrap_or_default())?,
            xcode: range_input(inputs, "xcode")?,
            swift: range_input(inputs, "swift")?,
            working_directory: inputs.get("working-directory").map(PathBuf::from),
            action: inputs.get("action").map(Action::from).unwrap_or_default(),
            configuration: Configuration::parse_optional(
                &inputs.get("configuration").unwrap_or_default(),
            ),
            scheme: inputs.get("scheme"),
            workspace: inputs.get("workspace"),
            code_sign_identity: inputs.get("code-sign-identity"),
            certificate,
            authentication_key,
            profiles,
            warnings_as_errors: inputs.get_bool("warnings-as-errors")?,
            code_coverage: inputs.get_bool("code-coverage")?,
            verbosity: verbosity(inputs, console)?,
            upload_logs: upload_logs(inputs, console),
        })
    }

    /// Whether any signing material was supplied
    pub fn has_secrets(&self) -> bool {
        self.certificate.is_some() || self.authentication_key.is_some() || !self.profiles.is_empty()
    }
}

fn range_input(inputs: &dyn Inputs, name: &str) -> Result<Option<VersionRange>> {
    let Some(value) = inputs.get(name) else {
        return Ok(None);
    };
    VersionRange::parse(&value)
        .map(Some)
        .map_err(|e| Error::InvalidInput {
            name: name.to_string(),
            value,
            reason: format!("failed to parse semantic version range: {}", e),
        })
}

fn verbosity(inputs: &dyn Inputs, console: &dyn Console) -> Result<Verbosity> {
    let value = inputs.get("verbosity").unwrap_or_default();
    if let Some(verbosity) = Verbosity::parse(&value) {
        return Ok(verbosity);
    }
    // legacy boolean input
    if inputs.get_bool("quiet")? {
        return Ok(Verbosity::Quiet);
    }
    console.warning(&format!("invalid value for `verbosity` ({})", value));
    Ok(Verbosity::Xcpretty)
}

fn upload_logs(inputs: &dyn Inputs, console: &dyn Console) -> UploadLogs {
    let Some(value) = inputs.get("upload-logs") else {
        return UploadLogs::default();
    };
    UploadLogs::parse(&value).unwrap_or_else(|| {
        console.warning(&format!("invalid value for `upload-logs` ({})", value));
        UploadLogs::OnFailure
    })
}
