//! Typed inputs and argument derivation for xcodebuild invocations.
//!
//! Everything in this crate is pure: free-form action inputs are validated
//! into closed enums, the effective action is decided against the selected
//! Xcode version, and the final argv handed to `xcodebuild` is assembled.
//! Process execution lives in the `xcci` crate.

mod action;
mod args;
mod identity;
mod input;

pub use action::{decide_action, ActionDecision, WATCHOS_TESTABLE_SINCE};
pub use args::{
    plan, AuthenticationKey, Invocation, InvocationTemplate, ResultBundles,
    CODE_COVERAGE_FLAGS, WARNINGS_AS_ERRORS_FLAG,
};
pub use identity::{code_sign_identity, IdentityDecision};
pub use input::{Action, Arch, Configuration, InputError, Platform, Verbosity};
