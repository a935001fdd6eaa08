//! Packaging description handed over by the asset host: groups and their entries.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{BuildResult, BundleError};

/// Group as described by the host, before it is matched against the configured names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceGroup {
  /// Group name as the host spells it.
  pub name: String,
  /// Entries of the group.
  #[serde(default)]
  pub entries: Vec<SourceEntry>,
}

/// `(address, path, guid)` triple describing one packaged asset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceEntry {
  /// Logical address.
  pub address: String,
  /// Source path of the asset, relative to the project root.
  pub path: String,
  /// Stable identifier assigned by the host.
  #[serde(default)]
  pub guid: String,
}

/// Parsed packaging description file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackagingDescription {
  /// Groups in host order.
  #[serde(default)]
  pub groups: Vec<SourceGroup>,
}

impl PackagingDescription {
  /// Load a description from YAML (`.yaml`/`.yml`) or JSON (anything else).
  pub fn load(path: impl AsRef<Path>) -> BuildResult<Self> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|err| BundleError::io(path, err))?;

    let is_yaml = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
      serde_yaml::from_str(&contents).map_err(|source| BundleError::Yaml {
        path: path.to_path_buf(),
        source,
      })
    } else {
      serde_json::from_str(&contents).map_err(|err| BundleError::json(path, err))
    }
  }
}

impl SourceGroup {
  /// Convenience constructor used by hosts that build descriptions in code.
  pub fn new(name: impl Into<String>, entries: Vec<SourceEntry>) -> Self {
    Self {
      name: name.into(),
      entries,
    }
  }
}

impl SourceEntry {
  /// Convenience constructor for a single triple.
  pub fn new(address: impl Into<String>, path: impl Into<String>, guid: impl Into<String>) -> Self {
    Self {
      address: address.into(),
      path: path.into(),
      guid: guid.into(),
    }
  }
}
