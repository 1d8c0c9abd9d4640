//! xcodebuild argv assembly.
//!
//! Flags are emitted in a fixed order: destination, scheme, arch,
//! workspace, signing identity, quiet, configuration, authentication,
//! result bundle, action-specific settings, and the action itself last.

use serde::Serialize;
use std::collections::HashSet;
use ulid::Ulid;

use crate::input::{Action, Arch, Configuration};

/// Build setting that turns Swift warnings into errors
pub const WARNINGS_AS_ERRORS_FLAG: &str = "OTHER_SWIFT_FLAGS=-warnings-as-errors";

/// Flags that enable code coverage collection
pub const CODE_COVERAGE_FLAGS: [&str; 2] = ["-enableCodeCoverage", "YES"];

/// App Store Connect API key registered for automatic provisioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationKey {
    /// Path of the `.p8` key file on disk
    pub path: String,
    pub key_id: String,
    pub issuer_id: String,
}

impl AuthenticationKey {
    /// xcodebuild flags that authenticate with this key
    pub fn flags(&self) -> Vec<String> {
        vec![
            "-allowProvisioningDeviceRegistration".to_string(),
            "-allowProvisioningUpdates".to_string(),
            "-authenticationKeyPath".to_string(),
            self.path.clone(),
            "-authenticationKeyID".to_string(),
            self.key_id.clone(),
            "-authenticationKeyIssuerID".to_string(),
            self.issuer_id.clone(),
        ]
    }
}

/// Everything about an invocation that does not depend on the action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationTemplate {
    /// Destination tokens, e.g. `["-destination", "platform=macOS"]`
    pub destination: Vec<String>,
    pub scheme: Option<String>,
    pub arch: Option<Arch>,
    pub workspace: Option<String>,
    /// Complete `CODE_SIGN_IDENTITY=...` token
    pub identity: Option<String>,
    pub quiet: bool,
    pub configuration: Option<Configuration>,
    pub authentication: Option<AuthenticationKey>,
    pub warnings_as_errors: bool,
    pub code_coverage: bool,
}

impl InvocationTemplate {
    /// Assemble the argv for one action. The action token is always last.
    pub fn argv(&self, action: &Action, result_bundle: &str) -> Vec<String> {
        let mut args = self.destination.clone();

        if let Some(ref scheme) = self.scheme {
            args.extend(["-scheme".to_string(), scheme.clone()]);
        }
        if let Some(arch) = self.arch {
            args.extend(["-arch".to_string(), arch.to_string()]);
        }
        if let Some(ref workspace) = self.workspace {
            args.extend(["-workspace".to_string(), workspace.clone()]);
        }
        if let Some(ref identity) = self.identity {
            args.push(identity.clone());
        }
        if self.quiet {
            args.push("-quiet".to_string());
        }
        if let Some(ref configuration) = self.configuration {
            args.extend(["-configuration".to_string(), configuration.to_string()]);
        }
        if let Some(ref key) = self.authentication {
            args.extend(key.flags());
        }

        args.extend(["-resultBundlePath".to_string(), result_bundle.to_string()]);

        match action {
            Action::Build => {
                if self.warnings_as_errors {
                    args.push(WARNINGS_AS_ERRORS_FLAG.to_string());
                }
            }
            Action::Test | Action::BuildForTesting => {
                if self.code_coverage {
                    args.extend(CODE_COVERAGE_FLAGS.iter().map(|s| s.to_string()));
                }
            }
            _ => {}
        }

        args.push(action.to_string());
        args
    }
}

/// Hands out result bundle paths that never repeat within a run
#[derive(Debug, Default)]
pub struct ResultBundles {
    issued: HashSet<String>,
}

impl ResultBundles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused `<action>.<ulid>.xcresult` path, relative to the working directory
    pub fn next(&mut self, action: &Action) -> String {
        loop {
            let name = format!(
                "{}.{}.xcresult",
                action,
                Ulid::new().to_string().to_lowercase()
            );
            if self.issued.insert(name.clone()) {
                return name;
            }
        }
    }

    /// Every path handed out so far
    pub fn issued(&self) -> impl Iterator<Item = &str> {
        self.issued.iter().map(String::as_str)
    }
}

/// A fully derived xcodebuild invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub action: Action,
    pub result_bundle: String,
    pub argv: Vec<String>,
}

impl Invocation {
    /// Log group title for this invocation
    pub fn title(&self) -> String {
        format!("xcodebuild {}", self.action)
    }
}

/// Plan the xcodebuild invocations for an action.
///
/// `none` plans nothing. With warnings-as-errors on, a testable action is
/// preceded by a plain `build` carrying the warnings-as-errors setting.
pub fn plan(
    template: &InvocationTemplate,
    action: &Action,
    bundles: &mut ResultBundles,
) -> Vec<Invocation> {
    if *action == Action::None {
        return Vec::new();
    }

    let mut actions = Vec::new();
    if template.warnings_as_errors && action.is_testable() {
        actions.push(Action::Build);
    }
    actions.push(action.clone());

    actions
        .into_iter()
        .map(|action| {
            let result_bundle = bundles.next(&action);
            let argv = template.argv(&action, &result_bundle);
            Invocation {
                action,
                result_bundle,
                argv,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_template() -> InvocationTemplate {
        InvocationTemplate {
            destination: vec!["-destination".to_string(), "id=ABC".to_string()],
            scheme: Some("App".to_string()),
            arch: Some(Arch::Arm64),
            workspace: Some("App.xcworkspace".to_string()),
            identity: Some("CODE_SIGN_IDENTITY=-".to_string()),
            quiet: true,
            configuration: Some(Configuration::Release),
            authentication: Some(AuthenticationKey {
                path: "/tmp/key.p8".to_string(),
                key_id: "KEYID".to_string(),
                issuer_id: "ISSUER".to_string(),
            }),
            warnings_as_errors: true,
            code_coverage: true,
        }
    }

    fn position(args: &[String], token: &str) -> usize {
        args.iter().position(|a| a == token).unwrap()
    }

    #[test]
    fn test_flag_order() {
        let args = full_template().argv(&Action::Test, "test.x.xcresult");

        let order = [
            "-destination",
            "-scheme",
            "-arch",
            "-workspace",
            "CODE_SIGN_IDENTITY=-",
            "-quiet",
            "-configuration",
            "-authenticationKeyPath",
            "-resultBundlePath",
            "-enableCodeCoverage",
            "test",
        ];
        let positions: Vec<usize> = order.iter().map(|t| position(&args, t)).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
        assert_eq!(args.last().unwrap(), "test");
    }

    #[test]
    fn test_minimal_argv() {
        let args = InvocationTemplate::default().argv(&Action::Build, "build.x.xcresult");
        assert_eq!(args, vec!["-resultBundlePath", "build.x.xcresult", "build"]);
    }

    #[test]
    fn test_build_gets_warnings_as_errors_only() {
        let args = full_template().argv(&Action::Build, "b.xcresult");
        assert!(args.contains(&WARNINGS_AS_ERRORS_FLAG.to_string()));
        assert!(!args.contains(&"-enableCodeCoverage".to_string()));
        assert_eq!(args.last().unwrap(), "build");
    }

    #[test]
    fn test_testable_actions_get_coverage_only() {
        for action in [Action::Test, Action::BuildForTesting] {
            let args = full_template().argv(&action, "t.xcresult");
            assert!(args.contains(&"-enableCodeCoverage".to_string()));
            assert!(!args.contains(&WARNINGS_AS_ERRORS_FLAG.to_string()));
        }
    }

    #[test]
    fn test_other_actions_get_neither() {
        let args = full_template().argv(&Action::Archive, "a.xcresult");
        assert!(!args.contains(&"-enableCodeCoverage".to_string()));
        assert!(!args.contains(&WARNINGS_AS_ERRORS_FLAG.to_string()));
        assert_eq!(args.last().unwrap(), "archive");
    }

    #[test]
    fn test_configuration_is_capitalized() {
        let template = InvocationTemplate {
            configuration: Some(Configuration::from("debug")),
            ..Default::default()
        };
        let args = template.argv(&Action::Build, "b.xcresult");
        assert_eq!(args[position(&args, "-configuration") + 1], "Debug");
    }

    #[test]
    fn test_result_bundles_are_unique() {
        let mut bundles = ResultBundles::new();
        let a = bundles.next(&Action::Test);
        let b = bundles.next(&Action::Test);
        assert_ne!(a, b);
        assert!(a.starts_with("test."));
        assert!(a.ends_with(".xcresult"));
        assert_eq!(bundles.issued().count(), 2);
    }

    #[test]
    fn test_plan_none_is_empty() {
        let mut bundles = ResultBundles::new();
        assert!(plan(&full_template(), &Action::None, &mut bundles).is_empty());
        assert_eq!(bundles.issued().count(), 0);
    }

    #[test]
    fn test_plan_prebuilds_for_warnings_as_errors() {
        let mut bundles = ResultBundles::new();
        let invocations = plan(&full_template(), &Action::Test, &mut bundles);
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].action, Action::Build);
        assert_eq!(invocations[1].action, Action::Test);
        assert_ne!(invocations[0].result_bundle, invocations[1].result_bundle);
        assert_eq!(invocations[1].title(), "xcodebuild test");
    }

    #[test]
    fn test_plan_single_invocation_without_warnings_as_errors() {
        let template = InvocationTemplate {
            warnings_as_errors: false,
            ..full_template()
        };
        let mut bundles = ResultBundles::new();
        let invocations = plan(&template, &Action::Test, &mut bundles);
        assert_eq!(invocations.len(), 1);

        let invocations = plan(&full_template(), &Action::Build, &mut bundles);
        assert_eq!(invocations.len(), 1);
    }
}
