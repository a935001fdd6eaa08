//! Packaging configuration: recognized groups, omit policy and naming.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::models::Compression;

/// File searched for by [`BundleConfig::discover`].
pub const DEFAULT_CONFIG_FILE: &str = "simplebundle.config.json";

/// Configuration shared by the builder and the resolver.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
  /// Known group names, in manifest order. Source groups with other names are dropped.
  pub group_names: Vec<String>,
  /// Groups whose entries stay in the manifest but whose bundle is not regenerated.
  ///
  /// The bundle from a previous build is assumed to still match; nothing checks this.
  pub omit_groups: Vec<String>,
  /// Compression policy forwarded to the packer.
  pub compression: Compression,
  /// Name of the manifest bundle and of the manifest asset inside it.
  pub manifest_name: String,
  /// Extension appended to every bundle file name.
  pub bundle_extension: String,
  /// Directory where the manifest asset is written before it is packed.
  pub build_folder: String,
  /// Rules used to turn caller paths into addresses.
  pub normalizer: NormalizerConfig,
}

/// Settings for [`crate::asset_paths::PathNormalizer`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
  /// Regular expressions matching paths that never have a packaged counterpart.
  pub ignored_patterns: Vec<String>,
  /// Extension (without dot) of source data files that are pre-compiled before packing.
  pub source_extension: String,
  /// Directory segment holding source data files.
  pub source_dir: String,
  /// Directory segment holding the pre-compiled counterparts.
  pub packaged_dir: String,
  /// Extension (without dot) of the pre-compiled counterparts.
  pub packaged_extension: String,
}

impl Default for BundleConfig {
  fn default() -> Self {
    Self {
      group_names: [
        "animations",
        "battleback",
        "characters",
        "objects",
        "enemies",
        "titles",
        "movies",
        "sounds",
        "others",
      ]
      .into_iter()
      .map(String::from)
      .collect(),
      omit_groups: Vec::new(),
      compression: Compression::Compressed,
      manifest_name: "simplebundle".into(),
      bundle_extension: ".unity3d".into(),
      build_folder: "target/simplebundle".into(),
      normalizer: NormalizerConfig::default(),
    }
  }
}

impl Default for NormalizerConfig {
  fn default() -> Self {
    Self {
      ignored_patterns: vec![r"\.meta$".into()],
      source_extension: "json".into(),
      source_dir: "JSON".into(),
      packaged_dir: "SO".into(),
      packaged_extension: "asset".into(),
    }
  }
}

impl BundleConfig {
  /// Attempt to load configuration from the provided directory.
  ///
  /// A missing or unparsable file falls back to the defaults.
  pub fn discover(dir: &Path) -> Self {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    Self::from_path(&candidate).unwrap_or_default()
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Option<Self> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
  }

  /// Whether source groups with this name are kept.
  pub fn is_recognized(&self, group_name: &str) -> bool {
    self.group_names.iter().any(|name| name == group_name)
  }

  /// Whether bundle generation is skipped for this group.
  pub fn is_omitted(&self, group_name: &str) -> bool {
    self.omit_groups.iter().any(|name| name == group_name)
  }

  /// Project-relative path of the manifest asset written before packing the manifest bundle.
  pub fn manifest_asset_path(&self) -> String {
    format!(
      "{}/{}.asset",
      self.build_folder.replace('\\', "/").trim_end_matches('/'),
      self.manifest_name
    )
  }
}
