//! `.xcresult` log artifacts
//!
//! Result bundles left in the working directory are packed for upload so a
//! failed run can be diagnosed from its `.xcresult` files.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;
use tar::Builder;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::gha::{group, Console};

pub const RESULT_BUNDLE_EXTENSION: &str = "xcresult";

/// Directory under `RUNNER_TEMP` that [`TarArtifactSink`] writes into
pub const ARTIFACT_DIR: &str = "xcci-artifacts";

/// Destination for named sets of files
pub trait ArtifactSink {
    /// Store `files` under `name`, with paths relative to `root`
    fn upload(&self, name: &str, root: &Path, files: &[PathBuf]) -> Result<()>;
}

/// Packs each artifact into `<dir>/<name>.tar`
///
/// The tarballs are picked up by a later upload-artifact step.
#[derive(Debug, Clone)]
pub struct TarArtifactSink {
    dir: PathBuf,
}

impl TarArtifactSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Sink writing to `$RUNNER_TEMP/xcci-artifacts`
    pub fn in_runner_temp(runner_temp: &Path) -> Self {
        Self::new(runner_temp.join(ARTIFACT_DIR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for TarArtifactSink {
    fn upload(&self, name: &str, root: &Path, files: &[PathBuf]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.tar", name));
        let mut builder = Builder::new(File::create(&path)?);

        for file in files {
            let rel_path = file.strip_prefix(root).map_err(|_| {
                Error::Artifact(format!("{} is outside {}", file.display(), root.display()))
            })?;
            builder.append_path_with_name(file, rel_path)?;
        }
        builder.finish()?;

        debug!(path = %path.display(), files = files.len(), "wrote artifact");
        Ok(())
    }
}

/// `.xcresult` bundles directly inside `dir`, sorted
pub fn find_result_bundles(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut bundles = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == RESULT_BUNDLE_EXTENSION) {
            bundles.push(path);
        }
    }
    bundles.sort();
    Ok(bundles)
}

/// Every file below `bundle`, in a stable order
pub fn bundle_files(bundle: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(bundle)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry.map_err(|e| Error::Artifact(e.to_string()))?;
        if !entry.file_type().is_dir() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Six random lowercase alphanumerics
///
/// Distinguishes uploads from matrix jobs sharing a run number.
pub fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// `<base>#<run number>.<nonce>.xcresult`
pub fn artifact_name(bundle: &Path, run_number: Option<&str>, nonce: &str) -> String {
    let base = bundle
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "{}#{}.{}.{}",
        base,
        run_number.unwrap_or_default(),
        nonce,
        RESULT_BUNDLE_EXTENSION
    )
}

/// Hand every result bundle in `working_dir` to `sink`
///
/// Returns the artifact names used.
pub fn upload_logs(
    sink: &dyn ArtifactSink,
    console: &dyn Console,
    working_dir: &Path,
    run_number: Option<&str>,
) -> Result<Vec<String>> {
    group(console, "Uploading Logs", || {
        let bundles = find_result_bundles(working_dir)?;
        if bundles.is_empty() {
            console.warning("strange… no `.xcresult` bundles found");
        }

        let mut names = Vec::with_capacity(bundles.len());
        for bundle in bundles {
            let name = artifact_name(&bundle, run_number, &nonce());
            let files = bundle_files(&bundle)?;
            sink.upload(&name, working_dir, &files)?;
            console.info(&format!("Uploaded {}", name));
            names.push(name);
        }
        Ok(names)
    })
}
