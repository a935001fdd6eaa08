//! Packaging pass: assemble the manifest from a host description and pack every bundle.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info};

use crate::bundle::{BundlePacker, PackRequest, PackedBundle};
use crate::config::BundleConfig;
use crate::description::SourceGroup;
use crate::error::{BuildResult, BundleError};
use crate::models::{Entry, Group, Manifest, STAMP_FORMAT};

/// Summary of a completed packaging pass.
#[derive(Debug, Clone)]
pub struct BuildReport {
  /// Manifest that was written and packed.
  pub manifest: Manifest,
  /// Bundles produced, group bundles first and the manifest bundle last.
  pub packed: Vec<PackedBundle>,
  /// Groups with entries whose bundle generation was skipped by the omit policy.
  pub omitted: Vec<String>,
}

/// Builds the manifest and issues pack requests according to a [`BundleConfig`].
pub struct ManifestBuilder<'a> {
  config: &'a BundleConfig,
  project_root: Option<PathBuf>,
  stamp: Option<String>,
}

impl<'a> ManifestBuilder<'a> {
  /// Create a builder that writes its manifest asset under the packer's asset root.
  pub fn new(config: &'a BundleConfig) -> Self {
    Self {
      config,
      project_root: None,
      stamp: None,
    }
  }

  /// Root that the manifest asset path (and every entry path) is relative to.
  ///
  /// Without one, [`ManifestBuilder::build`] uses [`BundlePacker::asset_root`].
  pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
    self.project_root = Some(root.into());
    self
  }

  /// Use a fixed stamp instead of the current local time.
  pub fn with_stamp(mut self, stamp: impl Into<String>) -> Self {
    self.stamp = Some(stamp.into());
    self
  }

  /// Create one group per configured name and copy matching source entries into it.
  ///
  /// Source groups with unrecognized names are dropped on purpose; they are never queried.
  pub fn assemble(&self, sources: &[SourceGroup]) -> Manifest {
    let mut manifest = Manifest::new(self.stamp());
    manifest.groups = self
      .config
      .group_names
      .iter()
      .map(|name| Group::empty(name.as_str()))
      .collect();

    for source in sources {
      if !self.config.is_recognized(&source.name) {
        debug!("skipping unrecognized group '{}'", source.name);
        continue;
      }
      if source.entries.is_empty() {
        continue;
      }

      let Some(group) = manifest.group_mut(&source.name) else {
        continue;
      };
      group.entries = source
        .entries
        .iter()
        .map(|entry| Entry {
          address: entry.address.clone(),
          path: entry.path.clone(),
          id: entry.guid.clone(),
        })
        .collect();
    }

    manifest
  }

  /// Pack requests for every non-empty, non-omitted group, in manifest order.
  pub fn pack_requests(&self, manifest: &Manifest) -> Vec<PackRequest> {
    manifest
      .groups
      .iter()
      .filter(|group| !group.is_empty() && !self.config.is_omitted(&group.name))
      .map(|group| PackRequest {
        bundle_name: group.name.clone(),
        asset_paths: group.distinct_paths(),
        compression: self.config.compression,
        lookup_by_file_name: false,
      })
      .collect()
  }

  /// Run the whole packaging pass: group bundles first, then the manifest bundle.
  ///
  /// The manifest destination is settled before any group bundle is packed, so a build
  /// without a usable root fails without touching existing bundles.
  pub fn build<P: BundlePacker>(
    &self,
    sources: &[SourceGroup],
    packer: &mut P,
  ) -> BuildResult<BuildReport> {
    let started = Instant::now();
    let target = self.manifest_target(packer)?;

    let mut manifest = self.assemble(sources);
    info!(
      "assembled manifest with {} entries across {} groups",
      manifest.entry_count(),
      manifest.groups.len()
    );

    let omitted: Vec<String> = manifest
      .groups
      .iter()
      .filter(|group| !group.is_empty() && self.config.is_omitted(&group.name))
      .map(|group| group.name.clone())
      .collect();
    for name in &omitted {
      info!("omitting bundle generation for '{name}', reusing the previous bundle");
    }

    let mut packed = Vec::new();
    for request in self.pack_requests(&manifest) {
      info!(
        "building '{}' with {} assets",
        request.bundle_name,
        request.asset_paths.len()
      );
      let bundle = packer.pack(&request)?;
      info!("generated {}", bundle.path.display());
      packed.push(bundle);
    }

    // Stamped once the group bundles exist.
    manifest.stamp = self.stamp();
    self.write_manifest_asset(&manifest, &target)?;
    let manifest_request = PackRequest {
      bundle_name: self.config.manifest_name.clone(),
      asset_paths: vec![target.request_path],
      compression: self.config.compression,
      lookup_by_file_name: true,
    };
    let bundle = packer.pack(&manifest_request)?;
    info!("generated manifest bundle {}", bundle.path.display());
    packed.push(bundle);

    info!(
      "packaging finished in {:.3}s ({} bundles)",
      started.elapsed().as_secs_f64(),
      packed.len()
    );

    Ok(BuildReport {
      manifest,
      packed,
      omitted,
    })
  }

  fn stamp(&self) -> String {
    self
      .stamp
      .clone()
      .unwrap_or_else(|| chrono::Local::now().format(STAMP_FORMAT).to_string())
  }

  /// Decide where the manifest asset goes and how the packer should be told about it.
  ///
  /// When the packer reads from the same root the relative path is kept; otherwise the
  /// packer gets the absolute path of the written file.
  fn manifest_target<P: BundlePacker>(&self, packer: &P) -> BuildResult<ManifestTarget> {
    let root = match (&self.project_root, packer.asset_root()) {
      (Some(root), _) => root.clone(),
      (None, Some(root)) => root.to_path_buf(),
      (None, None) => return Err(BundleError::MissingProjectRoot),
    };

    let relative = self.config.manifest_asset_path();
    let joined = root.join(&relative);
    let destination = std::path::absolute(&joined).map_err(|err| BundleError::io(&joined, err))?;
    if let Some(parent) = destination.parent() {
      fs::create_dir_all(parent).map_err(|err| BundleError::io(parent, err))?;
    }

    let request_path = if packer.asset_root() == Some(root.as_path()) {
      relative
    } else {
      destination.to_string_lossy().into_owned()
    };

    Ok(ManifestTarget {
      destination,
      request_path,
    })
  }

  fn write_manifest_asset(&self, manifest: &Manifest, target: &ManifestTarget) -> BuildResult<()> {
    let destination = &target.destination;
    let json = manifest.to_json_pretty(destination)?;
    fs::write(destination, json).map_err(|err| BundleError::io(destination, err))?;
    debug!("wrote manifest asset {}", destination.display());
    Ok(())
  }
}

struct ManifestTarget {
  destination: PathBuf,
  request_path: String,
}
