//! Code-signing identity build setting.

use crate::input::Platform;

/// `CODE_SIGN_IDENTITY` token to pass, plus any notice about it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityDecision {
    pub token: Option<String>,
    pub notice: Option<String>,
}

/// Derive the code-signing identity build setting.
///
/// An explicit identity always wins. Mac Catalyst builds otherwise sign
/// ad hoc (`-`).
pub fn code_sign_identity(identity: Option<&str>, platform: Option<Platform>) -> IdentityDecision {
    if let Some(identity) = identity.filter(|s| !s.is_empty()) {
        return IdentityDecision {
            token: Some(format!("CODE_SIGN_IDENTITY=\"{}\"", identity)),
            notice: None,
        };
    }

    if platform == Some(Platform::MacCatalyst) {
        return IdentityDecision {
            token: Some("CODE_SIGN_IDENTITY=-".to_string()),
            notice: Some("Disabling code signing for Mac Catalyst.".to_string()),
        };
    }

    IdentityDecision::default()
}
