//! Error type shared by the builder, the packers and the resolver.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type BuildResult<T> = Result<T, BundleError>;

/// Failures raised while describing, packing or opening bundles.
#[derive(Debug, Error)]
pub enum BundleError {
  /// Reading or writing a file failed.
  #[error("failed to access {}: {source}", path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// A JSON document could not be parsed or written.
  #[error("invalid JSON in {}: {source}", path.display())]
  Json {
    /// Path (or bundle asset name) of the document.
    path: PathBuf,
    /// Source parse error.
    source: serde_json::Error,
  },
  /// A YAML packaging description could not be parsed.
  #[error("invalid YAML in {}: {source}", path.display())]
  Yaml {
    /// Path of the document.
    path: PathBuf,
    /// Source parse error.
    source: serde_yaml::Error,
  },
  /// An archived asset payload was not valid base64.
  #[error("corrupt payload for '{asset}' in bundle '{bundle}': {source}")]
  Base64 {
    /// Bundle holding the asset.
    bundle: String,
    /// Asset path inside the bundle.
    asset: String,
    /// Source decode error.
    source: base64::DecodeError,
  },
  /// No bundle file exists under the requested name.
  #[error("bundle not found: {0}")]
  BundleMissing(String),
  /// Neither the builder nor the packer names a directory for the manifest asset.
  #[error("no project root: set one on the builder or use a packer that reads from disk")]
  MissingProjectRoot,
  /// The bundle opened but does not contain the requested asset.
  #[error("asset '{asset}' not found in bundle '{bundle}'")]
  AssetMissing {
    /// Bundle that was searched.
    bundle: String,
    /// Asset name that was requested.
    asset: String,
  },
}

impl BundleError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
    Self::Json {
      path: path.into(),
      source,
    }
  }
}
