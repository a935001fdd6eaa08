use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BuildResult, BundleError};

/// File name of a bundle: its name followed by the configured extension.
pub fn bundle_file_name(name: &str, extension: &str) -> String {
    format!("{name}{extension}")
}

/// Location of a bundle file inside `root`.
pub fn bundle_path(root: &Path, name: &str, extension: &str) -> PathBuf {
    root.join(bundle_file_name(name, extension))
}

/// Last segment of a slash or backslash separated path.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// [`file_name`] without its final extension.
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// List the bundle files directly inside `dir`, sorted by path.
///
/// Hosts use this to stage the generated bundles next to a player build.
pub fn list_bundle_files(dir: &Path, extension: &str) -> BuildResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|err| BundleError::io(dir, err))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| BundleError::io(dir, err))?;
        if !entry.file_type().is_ok_and(|ft| ft.is_file()) {
            continue;
        }
        let name = entry.file_name();
        if name.to_string_lossy().ends_with(extension) {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}
