//! xcci - Xcode on CI
//!
//! Selects an installed Xcode against version constraints, derives the
//! xcodebuild invocations for a platform and action, runs them, and
//! manages signing material across the action's main and post phases.
//!
//! Every external effect goes through an injected capability ([`exec::Exec`],
//! [`gha::Console`], [`gha::StateStore`], [`toolchain::ActiveToolchain`],
//! [`artifact::ArtifactSink`]), so [`mock`] can drive the whole pipeline.

pub mod artifact;
pub mod config;
pub mod destination;
pub mod error;
pub mod exec;
pub mod gha;
pub mod mock;
pub mod package;
pub mod pipeline;
pub mod secrets;
pub mod toolchain;
pub mod version;
pub mod xcodebuild;

pub use config::ActionConfig;
pub use error::{Error, Result, Termination};
pub use pipeline::{explain, main_phase, post_phase, run, Host, Outcome};
pub use version::VersionRange;
pub use xcci_invocation::{Action, Arch, Configuration, Platform, Verbosity};
