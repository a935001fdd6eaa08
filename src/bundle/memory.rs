//! In-memory loader for resolver tests: counts opens and can fail chosen bundles.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{AssetBundle, BundleLoader};
use crate::error::{BuildResult, BundleError};
use crate::models::Manifest;

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryBundle {
  assets: HashMap<String, Vec<u8>>,
}

impl MemoryBundle {
  pub(crate) fn with_asset(mut self, name: &str, bytes: &[u8]) -> Self {
    self.assets.insert(name.to_owned(), bytes.to_vec());
    self
  }
}

impl AssetBundle for MemoryBundle {
  fn asset(&self, name: &str) -> Option<&[u8]> {
    self.assets.get(name).map(Vec::as_slice)
  }

  fn asset_names(&self) -> Vec<&str> {
    self.assets.keys().map(String::as_str).collect()
  }
}

#[derive(Debug, Default)]
pub(crate) struct MemoryLoader {
  bundles: Mutex<HashMap<String, MemoryBundle>>,
  failing: Mutex<HashSet<String>>,
  opens: Mutex<HashMap<String, usize>>,
  total_opens: AtomicUsize,
}

impl MemoryLoader {
  /// Loader holding a manifest bundle plus one bundle per non-empty group.
  pub(crate) fn with_manifest(manifest_name: &str, manifest: &Manifest) -> Self {
    let loader = Self::default();
    let json = serde_json::to_vec(manifest).unwrap();
    loader.insert(
      manifest_name,
      MemoryBundle::default().with_asset(manifest_name, &json),
    );
    for group in &manifest.groups {
      if group.is_empty() {
        continue;
      }
      let mut bundle = MemoryBundle::default();
      for entry in &group.entries {
        bundle = bundle.with_asset(&entry.path, entry.address.as_bytes());
      }
      loader.insert(&group.name, bundle);
    }
    loader
  }

  pub(crate) fn insert(&self, name: &str, bundle: MemoryBundle) {
    self.bundles.lock().unwrap().insert(name.to_owned(), bundle);
  }

  pub(crate) fn fail(&self, name: &str) {
    self.failing.lock().unwrap().insert(name.to_owned());
  }

  pub(crate) fn heal(&self, name: &str) {
    self.failing.lock().unwrap().remove(name);
  }

  pub(crate) fn opens_of(&self, name: &str) -> usize {
    self.opens.lock().unwrap().get(name).copied().unwrap_or(0)
  }

  pub(crate) fn total_opens(&self) -> usize {
    self.total_opens.load(Ordering::SeqCst)
  }
}

impl BundleLoader for MemoryLoader {
  type Bundle = MemoryBundle;

  fn open(&self, bundle_name: &str) -> BuildResult<MemoryBundle> {
    self.total_opens.fetch_add(1, Ordering::SeqCst);
    *self
      .opens
      .lock()
      .unwrap()
      .entry(bundle_name.to_owned())
      .or_default() += 1;

    if self.failing.lock().unwrap().contains(bundle_name) {
      return Err(BundleError::BundleMissing(bundle_name.to_owned()));
    }

    self
      .bundles
      .lock()
      .unwrap()
      .get(bundle_name)
      .cloned()
      .ok_or_else(|| BundleError::BundleMissing(bundle_name.to_owned()))
  }
}
