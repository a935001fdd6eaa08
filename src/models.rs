//! Data structures persisted in the manifest bundle.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BuildResult, BundleError};

/// Format used for [`Manifest::stamp`].
pub const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Index of every group and entry produced by one packaging pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Manifest {
  /// Creation time of the manifest, formatted with [`STAMP_FORMAT`].
  pub stamp: String,
  /// Groups in configured order.
  #[serde(default)]
  pub groups: Vec<Group>,
}

/// A named partition of addresses packaged together into one bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Group {
  /// Group name, also used as the bundle name.
  pub name: String,
  /// Entries packaged into the group's bundle.
  #[serde(default)]
  pub entries: Vec<Entry>,
}

/// One address's record within a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Entry {
  /// Logical key callers use to request the asset.
  pub address: String,
  /// Location of the packaged asset inside its group's bundle.
  pub path: String,
  /// Stable content identifier (informational only).
  pub id: String,
}

/// Compression policy forwarded to the packer, which maps it onto its own flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
  /// Smaller files, slower packing.
  #[default]
  Compressed,
  /// Bigger files, faster packing.
  Uncompressed,
}

impl Manifest {
  /// Create an empty manifest with the given stamp.
  pub fn new(stamp: impl Into<String>) -> Self {
    Self {
      stamp: stamp.into(),
      groups: Vec::new(),
    }
  }

  /// Find a group by exact name.
  pub fn group(&self, name: &str) -> Option<&Group> {
    self.groups.iter().find(|group| group.name == name)
  }

  pub(crate) fn group_mut(&mut self, name: &str) -> Option<&mut Group> {
    self.groups.iter_mut().find(|group| group.name == name)
  }

  /// Total number of entries across all groups.
  pub fn entry_count(&self) -> usize {
    self.groups.iter().map(|group| group.entries.len()).sum()
  }

  /// Decode a manifest from its JSON representation.
  ///
  /// `origin` is only used to label errors.
  pub fn from_json(bytes: &[u8], origin: &Path) -> BuildResult<Self> {
    serde_json::from_slice(bytes).map_err(|err| BundleError::json(origin, err))
  }

  /// Encode the manifest as prettified JSON.
  pub fn to_json_pretty(&self, origin: &Path) -> BuildResult<String> {
    serde_json::to_string_pretty(self).map_err(|err| BundleError::json(origin, err))
  }
}

impl Group {
  /// Create a group with no entries.
  pub fn empty(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      entries: Vec::new(),
    }
  }

  /// Returns `true` when the group contributes nothing to the bundle set.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Asset paths of the group without duplicates, in first-seen order.
  ///
  /// Several addresses may point at the same packaged asset.
  pub fn distinct_paths(&self) -> Vec<String> {
    let mut seen = HashSet::new();
    self
      .entries
      .iter()
      .filter(|entry| seen.insert(entry.path.as_str()))
      .map(|entry| entry.path.clone())
      .collect()
  }
}
