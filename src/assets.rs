//! Asset-loading facade: normalise a caller path, resolve it and read the packaged bytes.

use tracing::error;

use crate::asset_paths::PathNormalizer;
use crate::bundle::{AssetBundle, BundleLoader};
use crate::config::BundleConfig;
use crate::resolver::Resolver;

/// Front door for callers that know assets by their source path.
pub struct AssetLookup<L: BundleLoader> {
  normalizer: PathNormalizer,
  resolver: Resolver<L>,
}

impl<L: BundleLoader> AssetLookup<L> {
  /// Combine a normaliser with a resolver.
  pub fn new(normalizer: PathNormalizer, resolver: Resolver<L>) -> Self {
    Self {
      normalizer,
      resolver,
    }
  }

  /// Build both halves from a configuration.
  pub fn from_config(loader: L, config: &BundleConfig) -> Self {
    Self::new(
      PathNormalizer::new(&config.normalizer),
      Resolver::from_config(loader, config),
    )
  }

  /// Underlying resolver.
  pub fn resolver(&self) -> &Resolver<L> {
    &self.resolver
  }

  /// Address that `raw_path` maps to; empty when it can never resolve.
  pub fn address(&self, raw_path: &str) -> String {
    self.normalizer.normalize(raw_path)
  }

  /// Read the packaged bytes for `raw_path`.
  ///
  /// Misses are logged here, at the call site that asked for the asset.
  pub fn load(&self, raw_path: &str) -> Option<Vec<u8>> {
    let address = self.address(raw_path);
    if address.is_empty() {
      return None;
    }

    let bytes = self.resolver.query(&address).and_then(|resolved| {
      resolved
        .bundle
        .asset(&resolved.entry.entry.path)
        .map(<[u8]>::to_vec)
    });

    if bytes.is_none() {
      error!("failed to load: {raw_path}");
    }
    bytes
  }

  /// Whether `raw_path` resolves to an available asset. Never logs.
  pub fn exists(&self, raw_path: &str) -> bool {
    let address = self.address(raw_path);
    !address.is_empty() && self.resolver.query(&address).is_some()
  }

  /// Drop everything the resolver holds; the next lookup reloads.
  pub fn force_reload(&self) {
    self.resolver.force_reload();
  }
}
