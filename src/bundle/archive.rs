//! Reference bundle format: a JSON archive with base64 payloads, written and read on disk.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use super::{AssetBundle, BundleLoader, BundlePacker, PackRequest, PackedBundle};
use crate::asset_paths::{bundle_path, file_name, file_stem};
use crate::error::{BuildResult, BundleError};
use crate::models::Compression;

#[derive(Debug, Deserialize, Serialize)]
struct ArchiveFile {
  name: String,
  compression: Compression,
  #[serde(default)]
  lookup_by_file_name: bool,
  #[serde(default)]
  assets: Vec<ArchivedAsset>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ArchivedAsset {
  path: String,
  data: String,
}

/// Packer writing [`ArchiveBundle`] files into a directory.
#[derive(Debug, Clone)]
pub struct FileSystemPacker {
  source_root: PathBuf,
  output_dir: PathBuf,
  extension: String,
}

impl FileSystemPacker {
  /// Relative asset paths are read from `source_root`; bundles land in `output_dir`.
  pub fn new(
    source_root: impl Into<PathBuf>,
    output_dir: impl Into<PathBuf>,
    extension: impl Into<String>,
  ) -> Self {
    Self {
      source_root: source_root.into(),
      output_dir: output_dir.into(),
      extension: extension.into(),
    }
  }
}

impl BundlePacker for FileSystemPacker {
  fn asset_root(&self) -> Option<&Path> {
    Some(&self.source_root)
  }

  fn pack(&mut self, request: &PackRequest) -> BuildResult<PackedBundle> {
    let mut assets = Vec::with_capacity(request.asset_paths.len());
    for asset_path in &request.asset_paths {
      let source = self.source_root.join(asset_path);
      let bytes = fs::read(&source).map_err(|err| BundleError::io(&source, err))?;
      assets.push(ArchivedAsset {
        path: asset_path.clone(),
        data: STANDARD.encode(bytes),
      });
    }

    let archive = ArchiveFile {
      name: request.bundle_name.clone(),
      compression: request.compression,
      lookup_by_file_name: request.lookup_by_file_name,
      assets,
    };

    let destination = bundle_path(&self.output_dir, &request.bundle_name, &self.extension);
    fs::create_dir_all(&self.output_dir).map_err(|err| BundleError::io(&self.output_dir, err))?;

    let encoded =
      serde_json::to_vec(&archive).map_err(|err| BundleError::json(&destination, err))?;
    let mut tmp =
      NamedTempFile::new_in(&self.output_dir).map_err(|err| BundleError::io(&self.output_dir, err))?;
    tmp
      .write_all(&encoded)
      .map_err(|err| BundleError::io(tmp.path().to_path_buf(), err))?;
    tmp
      .persist(&destination)
      .map_err(|err| BundleError::io(&destination, err.error))?;

    debug!(
      "packed '{}' ({} assets) into {}",
      request.bundle_name,
      archive.assets.len(),
      destination.display()
    );

    Ok(PackedBundle {
      name: request.bundle_name.clone(),
      path: destination,
      asset_count: archive.assets.len(),
    })
  }
}

/// Loader opening [`ArchiveBundle`] files from a directory.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
  root: PathBuf,
  extension: String,
}

impl FileSystemLoader {
  /// Bundles are read from `<root>/<name><extension>`.
  pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
    Self {
      root: root.into(),
      extension: extension.into(),
    }
  }
}

impl BundleLoader for FileSystemLoader {
  type Bundle = ArchiveBundle;

  fn open(&self, bundle_name: &str) -> BuildResult<ArchiveBundle> {
    let path = bundle_path(&self.root, bundle_name, &self.extension);
    let bytes = match fs::read(&path) {
      Ok(bytes) => bytes,
      Err(err) if err.kind() == ErrorKind::NotFound => {
        return Err(BundleError::BundleMissing(bundle_name.to_owned()));
      }
      Err(err) => return Err(BundleError::io(&path, err)),
    };

    let archive: ArchiveFile =
      serde_json::from_slice(&bytes).map_err(|err| BundleError::json(&path, err))?;

    let mut assets = HashMap::with_capacity(archive.assets.len());
    for asset in archive.assets {
      let data = STANDARD
        .decode(asset.data.as_bytes())
        .map_err(|source| BundleError::Base64 {
          bundle: archive.name.clone(),
          asset: asset.path.clone(),
          source,
        })?;
      assets.insert(asset.path, data);
    }

    Ok(ArchiveBundle {
      name: archive.name,
      compression: archive.compression,
      lookup_by_file_name: archive.lookup_by_file_name,
      assets,
    })
  }
}

/// In-memory view of an opened archive bundle.
#[derive(Debug, Clone)]
pub struct ArchiveBundle {
  name: String,
  compression: Compression,
  lookup_by_file_name: bool,
  assets: HashMap<String, Vec<u8>>,
}

impl ArchiveBundle {
  /// Bundle name recorded at pack time.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Compression policy recorded at pack time.
  pub fn compression(&self) -> Compression {
    self.compression
  }
}

impl AssetBundle for ArchiveBundle {
  fn asset(&self, name: &str) -> Option<&[u8]> {
    if let Some(bytes) = self.assets.get(name) {
      return Some(bytes.as_slice());
    }

    if !self.lookup_by_file_name {
      return None;
    }

    self
      .assets
      .iter()
      .find(|(path, _)| file_name(path) == name || file_stem(path) == name)
      .map(|(_, bytes)| bytes.as_slice())
  }

  fn asset_names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.assets.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }
}
