//! Seams between the manifest logic and whatever produces and opens bundle files.

mod archive;
#[cfg(test)]
pub(crate) mod memory;

use std::path::{Path, PathBuf};

use crate::error::BuildResult;
use crate::models::Compression;

pub use archive::{ArchiveBundle, FileSystemLoader, FileSystemPacker};

/// Request to package a set of assets into one bundle file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRequest {
  /// Bundle name; the file is named after it.
  pub bundle_name: String,
  /// Distinct source paths of the assets to package.
  pub asset_paths: Vec<String>,
  /// Compression policy to map onto the packer's own options.
  pub compression: Compression,
  /// Whether assets may also be looked up by bare file name.
  ///
  /// Only the manifest bundle enables this; group bundles are always read by full path.
  pub lookup_by_file_name: bool,
}

/// Outcome of a single [`BundlePacker::pack`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBundle {
  /// Bundle name.
  pub name: String,
  /// Location of the produced bundle file.
  pub path: PathBuf,
  /// Number of assets written into the bundle.
  pub asset_count: usize,
}

/// Host packaging operation: turn a list of source assets into one bundle file.
pub trait BundlePacker {
  /// Produce the bundle described by `request`.
  fn pack(&mut self, request: &PackRequest) -> BuildResult<PackedBundle>;

  /// Directory that relative asset paths are read from, when the packer reads from disk.
  fn asset_root(&self) -> Option<&Path> {
    None
  }
}

/// An opened bundle that can hand out the raw bytes of its assets.
pub trait AssetBundle: Send + Sync {
  /// Bytes of the named asset, if the bundle holds it.
  fn asset(&self, name: &str) -> Option<&[u8]>;

  /// Names of every asset in the bundle.
  fn asset_names(&self) -> Vec<&str>;
}

/// Opens bundles by name.
pub trait BundleLoader: Send + Sync {
  /// Bundle type handed out by this loader.
  type Bundle: AssetBundle;

  /// Open the bundle with the given name.
  fn open(&self, bundle_name: &str) -> BuildResult<Self::Bundle>;
}
