//! End-to-end runs of the main and post phases against scripted tools.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use xcci::artifact::TarArtifactSink;
use xcci::error::Error;
use xcci::gha::{HostEnv, MapInputs, MemoryState, StateStore};
use xcci::mock::{MockExec, RecordingConsole};
use xcci::pipeline::{self, Host, Outcome, IS_POST};
use xcci::secrets::{KEYCHAIN_PATH, KEY_PATH, PROVISIONING_PROFILE_PATHS};
use xcci::toolchain::XcodeSelect;
use xcci::{Action, Platform};

struct Runner {
    work: TempDir,
    temp: TempDir,
    env: HostEnv,
    state: MemoryState,
}

impl Runner {
    fn new() -> Self {
        let work = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        let env = HostEnv {
            runner_temp: temp.path().to_path_buf(),
            home: Some(temp.path().join("home")),
            runner_os: Some("macOS".to_string()),
            run_id: Some("1234".to_string()),
            run_number: Some("5".to_string()),
            repository: Some("acme/app".to_string()),
        };
        Self {
            work,
            temp,
            env,
            state: MemoryState::new(),
        }
    }

    fn inputs(&self) -> MapInputs {
        let work = self.work.path().display().to_string();
        MapInputs::builtin_defaults().with("working-directory", work)
    }

    fn sink(&self) -> TarArtifactSink {
        TarArtifactSink::in_runner_temp(self.temp.path())
    }
}

fn installed_xcodes() -> MockExec {
    MockExec::new()
        .respond(
            "mdfind",
            "/Applications/Xcode_14.3.app\n\
             /Applications/Xcode_15.2.app\n\
             /Applications/Xcode_13.4.app\n",
        )
        .respond("mdls -raw -name kMDItemVersion /Applications/Xcode_14.3.app", "14.3")
        .respond("mdls -raw -name kMDItemVersion /Applications/Xcode_15.2.app", "15.2")
        .respond("mdls -raw -name kMDItemVersion /Applications/Xcode_13.4.app", "13.4.1")
        .respond("xcode-select --print-path", "/Applications/Xcode_15.2.app/Contents/Developer\n")
}

#[test]
fn test_macos_release_test_has_no_secret_side_effects() {
    let runner = Runner::new();
    let exec = installed_xcodes();
    let console = RecordingConsole::new();
    let active = XcodeSelect::new(&exec);
    let sink = runner.sink();
    let host = Host {
        exec: &exec,
        console: &console,
        state: &runner.state,
        active: &active,
        artifacts: &sink,
        env: &runner.env,
    };
    let inputs = runner
        .inputs()
        .with("platform", "macOS")
        .with("action", "test")
        .with("configuration", "release");

    let Outcome::Main(report) = pipeline::run(host, &inputs).unwrap() else {
        panic!("expected the main phase");
    };

    assert_eq!(report.invocations.len(), 1);
    let argv = &report.invocations[0].argv;
    assert_eq!(&argv[..2], ["-destination", "platform=macOS"]);
    let configuration = argv.iter().position(|a| a == "-configuration").unwrap();
    assert_eq!(argv[configuration + 1], "Release");
    let bundle = argv.iter().position(|a| a == "-resultBundlePath").unwrap();
    assert_eq!(argv[bundle + 1], report.invocations[0].result_bundle);
    assert!(argv[bundle + 1].starts_with("test.") && argv[bundle + 1].ends_with(".xcresult"));
    assert_eq!(argv.last().map(String::as_str), Some("test"));

    // only the phase marker was persisted
    assert_eq!(runner.state.snapshot().keys().collect::<Vec<_>>(), vec![IS_POST]);
    assert!(report.secrets.is_empty());
    assert!(exec.calls_to("/usr/bin/security").is_empty());
    assert!(exec.calls_to("sudo").is_empty());
    assert!(console.lines().contains(&"» Selected Xcode 15.2.0".to_string()));

    let xcodebuild = exec.calls_to("xcodebuild");
    assert_eq!(xcodebuild.len(), 1);
    assert_eq!(&xcodebuild[0].args, argv);
}

#[test]
fn test_secrets_survive_into_post_phase_and_are_removed_once() {
    let runner = Runner::new();
    let console = RecordingConsole::new();
    let sink = runner.sink();
    let inputs = runner
        .inputs()
        .with("platform", "macOS")
        .with("xcode", "^15")
        // "cert"
        .with("code-sign-certificate", "Y2VydA==")
        .with("code-sign-certificate-passphrase", "pw")
        // "KEY"
        .with("authentication-key-base64", "S0VZ")
        .with("authentication-key-id", "KID")
        .with("authentication-key-issuer-id", "ISS")
        .with("mobile-provisioning-profiles-base64", "b25l\ndHdv")
        .with("provisioning-profiles-base64", "bWFj");

    // main phase, first process
    let main_exec = installed_xcodes().respond(
        "/usr/bin/security list-keychains -d user",
        "    \"/Users/runner/Library/Keychains/login.keychain-db\"\n",
    );
    let active = XcodeSelect::new(&main_exec);
    let host = Host {
        exec: &main_exec,
        console: &console,
        state: &runner.state,
        active: &active,
        artifacts: &sink,
        env: &runner.env,
    };
    let Outcome::Main(report) = pipeline::run(host, &inputs).unwrap() else {
        panic!("expected the main phase");
    };

    assert_eq!(
        main_exec.calls_to("sudo")[0].args,
        vec!["xcode-select", "--switch", "/Applications/Xcode_15.2.app"]
    );
    let key_path = PathBuf::from(runner.state.get(KEY_PATH).unwrap());
    assert!(key_path.exists());
    assert!(runner.state.get(KEYCHAIN_PATH).is_some());
    let profiles: Vec<PathBuf> =
        serde_json::from_str(&runner.state.get(PROVISIONING_PROFILE_PATHS).unwrap()).unwrap();
    assert_eq!(profiles.len(), 3);
    assert!(profiles.iter().all(|p| p.exists()));
    assert_eq!(report.secrets.provisioning_profile_paths, profiles);

    let argv = &report.invocations[0].argv;
    assert!(argv.contains(&"-allowProvisioningUpdates".to_string()));
    assert!(argv.contains(&key_path.display().to_string()));
    for secret in ["Y2VydA==", "pw", "S0VZ", "KID", "ISS", "b25l", "dHdv", "bWFj"] {
        assert!(console.secrets().contains(&secret.to_string()), "{} not masked", secret);
    }

    // post phase, second process: only the state store is shared
    let post_exec = MockExec::new();
    let post_console = RecordingConsole::new();
    let post_active = XcodeSelect::new(&post_exec);
    let host = Host {
        exec: &post_exec,
        console: &post_console,
        state: &runner.state,
        active: &post_active,
        artifacts: &sink,
        env: &runner.env,
    };
    let Outcome::Post(teardown) = pipeline::run(host, &MapInputs::new()).unwrap() else {
        panic!("expected the post phase");
    };

    assert!(teardown.is_clean());
    assert!(!key_path.exists());
    assert!(profiles.iter().all(|p| !p.exists()));
    let restored: Vec<String> = post_exec
        .calls_to("/usr/bin/security")
        .into_iter()
        .filter_map(|c| c.stdin)
        .collect();
    assert_eq!(
        restored,
        vec!["list-keychains -d user -s \"/Users/runner/Library/Keychains/login.keychain-db\"\n"]
    );

    // a repeated post phase finds nothing to do
    let again = pipeline::post_phase(host);
    assert!(again.attempted.is_empty());
    assert_eq!(post_exec.calls().len(), 1);
}

#[test]
fn test_post_without_main_is_a_noop() {
    let runner = Runner::new();
    runner.state.save(IS_POST, "true").unwrap();
    let exec = MockExec::new();
    let console = RecordingConsole::new();
    let active = XcodeSelect::new(&exec);
    let sink = runner.sink();
    let host = Host {
        exec: &exec,
        console: &console,
        state: &runner.state,
        active: &active,
        artifacts: &sink,
        env: &runner.env,
    };

    let outcome = pipeline::run(host, &MapInputs::new()).unwrap();
    assert!(matches!(outcome, Outcome::Post(ref r) if r.attempted.is_empty() && r.is_clean()));
    assert!(exec.calls().is_empty());
}

#[test]
fn test_invalid_platform_fails_before_any_tool_runs() {
    let runner = Runner::new();
    let exec = installed_xcodes();
    let console = RecordingConsole::new();
    let active = XcodeSelect::new(&exec);
    let sink = runner.sink();
    let host = Host {
        exec: &exec,
        console: &console,
        state: &runner.state,
        active: &active,
        artifacts: &sink,
        env: &runner.env,
    };

    let err = pipeline::main_phase(host, &runner.inputs().with("platform", "android")).unwrap_err();
    assert_eq!(err.to_string(), "Invalid platform: android");
    assert!(exec.calls().is_empty());
}

#[test]
fn test_unsatisfiable_xcode_fails_before_build() {
    let runner = Runner::new();
    let exec = installed_xcodes();
    let console = RecordingConsole::new();
    let active = XcodeSelect::new(&exec);
    let sink = runner.sink();
    let host = Host {
        exec: &exec,
        console: &console,
        state: &runner.state,
        active: &active,
        artifacts: &sink,
        env: &runner.env,
    };

    let err = pipeline::main_phase(host, &runner.inputs().with("xcode", ">=16")).unwrap_err();
    assert!(matches!(err, Error::NoMatchingToolchain { .. }));
    assert!(exec.calls_to("xcodebuild").is_empty());
    assert!(exec.calls_to("sudo").is_empty());
}

#[test]
fn test_old_watchos_downgrades_to_build() {
    let runner = Runner::new();
    let exec = installed_xcodes()
        .respond("mdfind", "/Applications/Xcode_12.app\n")
        .respond("mdls -raw -name kMDItemVersion /Applications/Xcode_12.app", "12.0")
        .respond(
            "xcrun simctl list",
            r#"{"devices": {"com.apple.CoreSimulator.SimRuntime.watchOS-7-0": [{"udid": "W7"}]}}"#,
        );
    let console = RecordingConsole::new();
    let active = XcodeSelect::new(&exec);
    let sink = runner.sink();
    let host = Host {
        exec: &exec,
        console: &console,
        state: &runner.state,
        active: &active,
        artifacts: &sink,
        env: &runner.env,
    };
    let inputs = runner
        .inputs()
        .with("platform", "watchOS")
        .with("xcode", "12")
        .with("scheme", "Watch");

    let report = pipeline::main_phase(host, &inputs).unwrap();
    assert_eq!(report.action, Action::Build);
    assert_eq!(report.invocations[0].argv[..2], ["-destination", "id=W7"]);
    assert_eq!(
        console.notices(),
        vec!["Setting `action=build` for Apple Watch / Xcode <12.5"]
    );
}

#[test]
fn test_upload_always_packs_result_bundles() {
    let runner = Runner::new();
    let bundle = runner.work.path().join("earlier.xcresult");
    fs::create_dir(&bundle).unwrap();
    fs::write(bundle.join("Info.plist"), "plist").unwrap();
    let exec = installed_xcodes();
    let console = RecordingConsole::new();
    let active = XcodeSelect::new(&exec);
    let sink = runner.sink();
    let host = Host {
        exec: &exec,
        console: &console,
        state: &runner.state,
        active: &active,
        artifacts: &sink,
        env: &runner.env,
    };
    let inputs = runner.inputs().with("upload-logs", "always").with("action", "build");

    let report = pipeline::main_phase(host, &inputs).unwrap();
    assert_eq!(report.uploaded.len(), 1);
    assert!(report.uploaded[0].starts_with("earlier#5."));
    assert!(sink.dir().join(format!("{}.tar", report.uploaded[0])).exists());
}

#[test]
fn test_platform_values_are_closed() {
    for value in ["iOS", "tvOS", "watchOS", "macOS", "mac-catalyst"] {
        assert!(value.parse::<Platform>().is_ok());
    }
    assert!("Linux".parse::<Platform>().is_err());
}
