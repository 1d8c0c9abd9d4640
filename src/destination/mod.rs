//! Destination resolution
//!
//! Maps the `platform` input to `-destination` arguments. Device-class
//! platforms resolve to a concrete simulator UDID from
//! `xcrun simctl list --json devices available`, keeping the newest runtime
//! per platform.

use std::collections::{BTreeMap, HashMap};

use semver::Version;
use serde::Deserialize;
use tracing::debug;
use xcci_invocation::{Arch, Platform};

use crate::error::Result;
use crate::exec::{parse_tool_json, Cmd, Exec};
use crate::gha::Console;
use crate::version::coerce_version;

/// Xcode from which an unset platform defaults to the host Mac
pub const MACOS_DEFAULT_SINCE: Version = Version::new(13, 0, 0);

/// Placeholder UDID when no simulator exists for a platform
///
/// xcodebuild rejects it with a clear "unable to find a destination" error.
pub const MISSING_DEVICE: &str = "undefined";

/// `simctl list --json devices` output
#[derive(Debug, Deserialize)]
struct DeviceList {
    /// Runtime identifier → devices on that runtime
    devices: BTreeMap<String, Vec<Device>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Device {
    udid: String,
}

/// The newest simulator found for one device-class platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulator {
    pub udid: String,
    pub runtime: Version,
}

/// Split a runtime identifier into platform and version
///
/// `com.apple.CoreSimulator.SimRuntime.iOS-17-2` → (`iOS`, 17.2.0)
pub fn parse_runtime_key(key: &str) -> Option<(Platform, Version)> {
    let last = key.rsplit('.').next()?;
    let (kind, version) = last.split_once('-')?;
    let platform: Platform = kind.parse().ok()?;
    if !platform.is_device_class() {
        return None;
    }
    Some((platform, coerce_version(&version.replace('-', "."))?))
}

/// Newest simulator per platform from `simctl` JSON
///
/// Only the first device listed under each runtime is considered.
pub fn newest_simulators(
    console: &dyn Console,
    json: &str,
) -> Result<HashMap<Platform, Simulator>> {
    let list: DeviceList = parse_tool_json(console, "xcrun simctl", json)?;

    let mut newest: HashMap<Platform, Simulator> = HashMap::new();
    for (key, devices) in list.devices {
        let Some(device) = devices.into_iter().next() else {
            continue;
        };
        let Some((platform, runtime)) = parse_runtime_key(&key) else {
            debug!(key, "skipping unrecognised runtime");
            continue;
        };
        let newer = newest
            .get(&platform)
            .map_or(true, |current| current.runtime < runtime);
        if newer {
            newest.insert(
                platform,
                Simulator {
                    udid: device.udid,
                    runtime,
                },
            );
        }
    }
    Ok(newest)
}

/// Enumerate available simulators
pub fn available_simulators(
    exec: &dyn Exec,
    console: &dyn Console,
) -> Result<HashMap<Platform, Simulator>> {
    let list = Cmd::new("xcrun").args(["simctl", "list", "--json", "devices", "available"]);
    let out = exec.capture(&list)?;
    newest_simulators(console, &out)
}

/// `-destination` arguments for a platform
///
/// Returns an empty list when xcodebuild should pick its own default.
pub fn resolve(
    exec: &dyn Exec,
    console: &dyn Console,
    platform: Option<Platform>,
    xcode: &Version,
    arch: Option<Arch>,
) -> Result<Vec<String>> {
    let destination = match platform {
        Some(platform) if platform.is_device_class() => {
            let simulators = available_simulators(exec, console)?;
            let udid = match simulators.get(&platform) {
                Some(sim) => {
                    debug!(
                        %platform,
                        udid = %sim.udid,
                        runtime = %sim.runtime,
                        "selected simulator"
                    );
                    sim.udid.as_str()
                }
                None => {
                    console.warning(&format!("No available {} simulator found", platform));
                    MISSING_DEVICE
                }
            };
            match arch {
                Some(arch) => format!("id={},arch={}", udid, arch),
                None => format!("id={}", udid),
            }
        }
        Some(Platform::MacCatalyst) => "platform=macOS,variant=Mac Catalyst".to_string(),
        Some(_) => "platform=macOS".to_string(),
        None if *xcode >= MACOS_DEFAULT_SINCE => "platform=macOS".to_string(),
        None => return Ok(Vec::new()),
    };
    Ok(vec!["-destination".to_string(), destination])
}
