//! Effective action decision.

use semver::Version;

use crate::input::{Action, Platform};

/// First Xcode that can run testable actions for watchOS
pub const WATCHOS_TESTABLE_SINCE: Version = Version::new(12, 5, 0);

/// The action to run plus any notice the user should see about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDecision {
    pub action: Action,
    pub notice: Option<String>,
}

/// Decide which action to run for the requested one.
///
/// Xcode before 12.5 cannot build test bundles for watchOS, so testable
/// actions are downgraded to `build` there. Every other request, including
/// `none`, passes through unchanged.
pub fn decide_action(
    requested: Action,
    platform: Option<Platform>,
    xcode: &Version,
) -> ActionDecision {
    if platform == Some(Platform::WatchOs)
        && requested.is_testable()
        && *xcode < WATCHOS_TESTABLE_SINCE
    {
        return ActionDecision {
            action: Action::Build,
            notice: Some("Setting `action=build` for Apple Watch / Xcode <12.5".to_string()),
        };
    }

    ActionDecision {
        action: requested,
        notice: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watchos_old_xcode_downgrades_test() {
        let xcode = Version::new(12, 0, 0);
        let decision = decide_action(Action::Test, Some(Platform::WatchOs), &xcode);
        assert_eq!(decision.action, Action::Build);
        assert!(decision.notice.unwrap().contains("Apple Watch"));
    }

    #[test]
    fn test_watchos_old_xcode_downgrades_build_for_testing() {
        let decision = decide_action(
            Action::BuildForTesting,
            Some(Platform::WatchOs),
            &Version::new(12, 4, 9),
        );
        assert_eq!(decision.action, Action::Build);
    }

    #[test]
    fn test_watchos_threshold_is_inclusive() {
        let xcode = Version::new(12, 5, 0);
        let decision = decide_action(Action::Test, Some(Platform::WatchOs), &xcode);
        assert_eq!(decision.action, Action::Test);
        assert!(decision.notice.is_none());
    }

    #[test]
    fn test_watchos_new_xcode_keeps_test() {
        let xcode = Version::new(13, 0, 0);
        let decision = decide_action(Action::Test, Some(Platform::WatchOs), &xcode);
        assert_eq!(decision.action, Action::Test);
        assert!(decision.notice.is_none());
    }

    #[test]
    fn test_other_platforms_unaffected() {
        for platform in [None, Some(Platform::Ios), Some(Platform::MacOs)] {
            let decision = decide_action(Action::Test, platform, &Version::new(11, 0, 0));
            assert_eq!(decision.action, Action::Test);
        }
    }

    #[test]
    fn test_none_passes_through() {
        let xcode = Version::new(12, 0, 0);
        let decision = decide_action(Action::None, Some(Platform::WatchOs), &xcode);
        assert_eq!(decision.action, Action::None);
        assert!(decision.notice.is_none());
    }
}
