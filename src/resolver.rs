//! Address resolution over a packed manifest, loaded lazily once per epoch.
//!
//! A [`Resolver`] starts uninitialized. The first query opens the manifest bundle, opens
//! every non-empty group bundle and builds a flat address index; later queries only read
//! that index. Loading is guarded by a mutex so concurrent first callers trigger a single
//! load. [`Resolver::force_reload`] drops the index and the bundle handles and bumps the
//! epoch, so the next query loads again.
//!
//! Failures never surface through [`Resolver::query`]: an unavailable manifest or group
//! bundle is logged and the query reports not-found. Unknown addresses are silent.
//!
//! Once ready, a query takes the index `RwLock` for reading just long enough to clone an
//! `Arc` and never touches the load mutex. The write side is only taken to publish a freshly
//! loaded index or to drop it on reload, so readers contend with each other on the lock's
//! reader count and nothing else.
//!
//! There is no timeout on loading; a stalled read blocks the initializing caller.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, error, info, warn};

use crate::bundle::{AssetBundle, BundleLoader};
use crate::config::BundleConfig;
use crate::error::{BuildResult, BundleError};
use crate::models::{Entry, Group, Manifest};

/// Lifecycle of a [`Resolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
  /// No manifest loaded; the next query attempts a load.
  Uninitialized,
  /// A caller is currently loading the manifest and bundles.
  Loading,
  /// The index is built and queries are answered from it.
  Ready,
}

/// Index record: the entry and the group whose bundle holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEntry {
  /// Group (and bundle) name.
  pub group: String,
  /// Manifest entry.
  pub entry: Entry,
}

/// Successful query result.
pub struct Resolved<B> {
  /// Index record for the address.
  pub entry: Arc<IndexedEntry>,
  /// Shared handle to the bundle containing the entry.
  pub bundle: Arc<B>,
  /// Epoch of the index that produced this result.
  pub epoch: u64,
}

struct LoadedIndex<B> {
  epoch: u64,
  stamp: String,
  entries: HashMap<String, Arc<IndexedEntry>>,
  bundles: HashMap<String, Arc<B>>,
}

/// Lazily initialized address index over the bundles produced by a packaging pass.
///
/// Meant to be created once per process and shared (for example behind an `Arc`).
pub struct Resolver<L: BundleLoader> {
  loader: L,
  manifest_name: String,
  index: RwLock<Option<Arc<LoadedIndex<L::Bundle>>>>,
  init: Mutex<()>,
  loading: AtomicBool,
  epoch: AtomicU64,
  loads: AtomicUsize,
}

impl<L: BundleLoader> Resolver<L> {
  /// Create an uninitialized resolver reading the manifest bundle named `manifest_name`.
  pub fn new(loader: L, manifest_name: impl Into<String>) -> Self {
    Self {
      loader,
      manifest_name: manifest_name.into(),
      index: RwLock::new(None),
      init: Mutex::new(()),
      loading: AtomicBool::new(false),
      epoch: AtomicU64::new(0),
      loads: AtomicUsize::new(0),
    }
  }

  /// Create a resolver using the manifest name from `config`.
  pub fn from_config(loader: L, config: &BundleConfig) -> Self {
    Self::new(loader, config.manifest_name.as_str())
  }

  /// Loader used to open bundles.
  pub fn loader(&self) -> &L {
    &self.loader
  }

  /// Current lifecycle state.
  pub fn state(&self) -> ResolverState {
    if self.snapshot().is_some() {
      ResolverState::Ready
    } else if self.loading.load(Ordering::SeqCst) {
      ResolverState::Loading
    } else {
      ResolverState::Uninitialized
    }
  }

  /// Current epoch; incremented by every [`Resolver::force_reload`].
  pub fn epoch(&self) -> u64 {
    self.epoch.load(Ordering::SeqCst)
  }

  /// Number of load attempts made so far, successful or not.
  pub fn load_count(&self) -> usize {
    self.loads.load(Ordering::SeqCst)
  }

  /// Stamp of the loaded manifest, loading it if necessary.
  pub fn manifest_stamp(&self) -> Option<String> {
    self.ready_index().map(|index| index.stamp.clone())
  }

  /// Resolve an address to its entry and the bundle holding it.
  ///
  /// Returns `None` for unknown addresses and for known addresses whose group bundle
  /// failed to open; only the latter is logged.
  pub fn query(&self, address: &str) -> Option<Resolved<L::Bundle>> {
    let index = self.ready_index()?;
    let entry = index.entries.get(address)?;

    let Some(bundle) = index.bundles.get(&entry.group) else {
      warn!(
        "'{address}' is known but bundle '{}' is unavailable",
        entry.group
      );
      return None;
    };

    Some(Resolved {
      entry: Arc::clone(entry),
      bundle: Arc::clone(bundle),
      epoch: index.epoch,
    })
  }

  /// Look up an address in the index without requiring its bundle to be open.
  pub fn entry(&self, address: &str) -> Option<Arc<IndexedEntry>> {
    self.ready_index()?.entries.get(address).map(Arc::clone)
  }

  /// Whether `resolved` came from the index of the current epoch.
  pub fn is_current(&self, resolved: &Resolved<L::Bundle>) -> bool {
    resolved.epoch == self.epoch()
  }

  /// Drop the index and every bundle handle held by the resolver.
  ///
  /// Handles already returned by [`Resolver::query`] stay valid until their holders drop
  /// them, but belong to the previous epoch.
  pub fn force_reload(&self) {
    let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
    let previous = self
      .index
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
    if previous.is_some() {
      info!("resolver invalidated, next query loads epoch {epoch}");
    }
  }

  fn snapshot(&self) -> Option<Arc<LoadedIndex<L::Bundle>>> {
    self
      .index
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .as_ref()
      .map(Arc::clone)
  }

  fn ready_index(&self) -> Option<Arc<LoadedIndex<L::Bundle>>> {
    if let Some(index) = self.snapshot() {
      return Some(index);
    }

    let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(index) = self.snapshot() {
      return Some(index);
    }

    self.loading.store(true, Ordering::SeqCst);
    let result = self.load(self.epoch());
    self.loads.fetch_add(1, Ordering::SeqCst);

    let index = match result {
      Ok(index) => Some(Arc::new(index)),
      Err(err) => {
        error!("failed to load '{}': {err}", self.manifest_name);
        None
      }
    };

    if let Some(index) = &index {
      *self.index.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(index));
    }
    self.loading.store(false, Ordering::SeqCst);
    index
  }

  fn load(&self, epoch: u64) -> BuildResult<LoadedIndex<L::Bundle>> {
    let manifest = {
      let manifest_bundle = self.loader.open(&self.manifest_name)?;
      let bytes = manifest_bundle
        .asset(&self.manifest_name)
        .ok_or_else(|| BundleError::AssetMissing {
          bundle: self.manifest_name.clone(),
          asset: self.manifest_name.clone(),
        })?;
      Manifest::from_json(bytes, Path::new(&self.manifest_name))?
    };

    let mut bundles = HashMap::new();
    let mut entries = HashMap::new();
    let mut failed = 0usize;

    for Group { name, entries: group_entries } in manifest.groups {
      if group_entries.is_empty() {
        continue;
      }

      debug!("loading bundle '{name}'");
      match self.loader.open(&name) {
        Ok(bundle) => {
          bundles.insert(name.clone(), Arc::new(bundle));
        }
        Err(err) => {
          failed += 1;
          error!("failed to open '{name}': {err}");
        }
      }

      for entry in group_entries {
        entries.insert(
          entry.address.clone(),
          Arc::new(IndexedEntry {
            group: name.clone(),
            entry,
          }),
        );
      }
    }

    info!(
      "resolver ready: {} addresses, {} bundles open, {} unavailable (manifest {})",
      entries.len(),
      bundles.len(),
      failed,
      manifest.stamp
    );

    Ok(LoadedIndex {
      epoch,
      stamp: manifest.stamp,
      entries,
      bundles,
    })
  }
}

impl<B> Clone for Resolved<B> {
  fn clone(&self) -> Self {
    Self {
      entry: Arc::clone(&self.entry),
      bundle: Arc::clone(&self.bundle),
      epoch: self.epoch,
    }
  }
}

impl<B> fmt::Debug for Resolved<B> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Resolved")
      .field("entry", &self.entry)
      .field("epoch", &self.epoch)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bundle::memory::{MemoryBundle, MemoryLoader};
  use std::sync::Barrier;
  use std::thread;

  const MANIFEST: &str = "simplebundle";

  fn entry(address: &str, path: &str) -> Entry {
    Entry {
      address: address.to_owned(),
      path: path.to_owned(),
      id: format!("guid-{address}"),
    }
  }

  fn manifest() -> Manifest {
    Manifest {
      stamp: "2024-05-01 12:00:00.000000".into(),
      groups: vec![
        Group {
          name: "enemies".into(),
          entries: vec![
            entry("enemy/Slime.asset", "Assets/SO/enemy/Slime.asset"),
            entry("enemy/Bat.asset", "Assets/SO/enemy/Bat.asset"),
          ],
        },
        Group::empty("titles"),
        Group {
          name: "sounds".into(),
          entries: vec![entry("sounds/theme.ogg", "Assets/sounds/theme.ogg")],
        },
      ],
    }
  }

  fn resolver() -> Resolver<MemoryLoader> {
    Resolver::new(MemoryLoader::with_manifest(MANIFEST, &manifest()), MANIFEST)
  }

  #[test]
  fn resolves_every_built_address() {
    let resolver = resolver();
    assert_eq!(resolver.state(), ResolverState::Uninitialized);

    for group in &manifest().groups {
      for expected in &group.entries {
        let resolved = resolver.query(&expected.address).expect("address should resolve");
        assert_eq!(&resolved.entry.entry, expected);
        assert_eq!(resolved.entry.group, group.name);
        assert_eq!(
          resolved.bundle.asset(&expected.path),
          Some(expected.address.as_bytes())
        );
      }
    }
    assert_eq!(resolver.state(), ResolverState::Ready);
    assert_eq!(
      resolver.manifest_stamp().as_deref(),
      Some("2024-05-01 12:00:00.000000")
    );
  }

  #[test]
  fn unknown_addresses_are_not_found() {
    let resolver = resolver();
    assert!(resolver.query("missing/thing.png").is_none());
    assert_eq!(resolver.state(), ResolverState::Ready);
    assert!(resolver.query("missing/thing.png").is_none());
  }

  #[test]
  fn repeated_queries_load_once() {
    let resolver = resolver();
    let first = resolver.query("sounds/theme.ogg").unwrap();
    let opens = resolver.loader().total_opens();

    for _ in 0..10 {
      let again = resolver.query("sounds/theme.ogg").unwrap();
      assert_eq!(again.entry, first.entry);
      assert!(Arc::ptr_eq(&again.bundle, &first.bundle));
    }

    assert_eq!(resolver.loader().total_opens(), opens);
    assert_eq!(resolver.loader().opens_of(MANIFEST), 1);
    assert_eq!(resolver.load_count(), 1);
  }

  #[test]
  fn empty_groups_are_never_opened() {
    let resolver = resolver();
    resolver.query("enemy/Bat.asset").unwrap();
    assert_eq!(resolver.loader().opens_of("titles"), 0);
    assert_eq!(resolver.loader().opens_of("enemies"), 1);
  }

  #[test]
  fn unavailable_manifest_leaves_resolver_uninitialized_until_retry() {
    let resolver = resolver();
    resolver.loader().fail(MANIFEST);

    assert!(resolver.query("sounds/theme.ogg").is_none());
    assert!(resolver.query("sounds/theme.ogg").is_none());
    assert_eq!(resolver.state(), ResolverState::Uninitialized);
    assert_eq!(resolver.load_count(), 2);

    resolver.loader().heal(MANIFEST);
    assert!(resolver.query("sounds/theme.ogg").is_some());
    assert_eq!(resolver.load_count(), 3);
  }

  #[test]
  fn manifest_bundle_without_manifest_asset_is_unavailable() {
    let resolver = resolver();
    resolver.loader().insert(
      MANIFEST,
      MemoryBundle::default().with_asset("other", b"{}"),
    );

    assert!(resolver.query("sounds/theme.ogg").is_none());
    assert_eq!(resolver.state(), ResolverState::Uninitialized);
    assert_eq!(resolver.loader().opens_of("sounds"), 0);
  }

  #[test]
  fn malformed_manifest_is_unavailable() {
    let resolver = resolver();
    resolver.loader().insert(
      MANIFEST,
      MemoryBundle::default().with_asset(MANIFEST, b"not json"),
    );
    assert!(resolver.query("sounds/theme.ogg").is_none());
    assert_eq!(resolver.state(), ResolverState::Uninitialized);
  }

  #[test]
  fn failed_group_bundle_is_isolated() {
    let resolver = resolver();
    resolver.loader().fail("sounds");

    assert!(resolver.query("sounds/theme.ogg").is_none());
    assert!(resolver.query("enemy/Slime.asset").is_some());
    assert!(resolver.query("enemy/Bat.asset").is_some());

    let known = resolver.entry("sounds/theme.ogg").expect("entry stays indexed");
    assert_eq!(known.group, "sounds");
    assert!(resolver.entry("missing/thing.png").is_none());
    assert_eq!(resolver.state(), ResolverState::Ready);
  }

  #[test]
  fn duplicate_addresses_resolve_to_the_last_group() {
    let mut manifest = manifest();
    manifest.groups[2]
      .entries
      .push(entry("enemy/Slime.asset", "Assets/sounds/slime.ogg"));
    let resolver = Resolver::new(MemoryLoader::with_manifest(MANIFEST, &manifest), MANIFEST);

    let resolved = resolver.query("enemy/Slime.asset").unwrap();
    assert_eq!(resolved.entry.group, "sounds");
    assert_eq!(resolved.entry.entry.path, "Assets/sounds/slime.ogg");
  }

  #[test]
  fn force_reload_starts_a_new_epoch() {
    let resolver = resolver();
    let before = resolver.query("enemy/Slime.asset").unwrap();
    assert!(resolver.is_current(&before));

    resolver.force_reload();
    assert_eq!(resolver.state(), ResolverState::Uninitialized);
    assert_eq!(resolver.epoch(), 1);
    assert!(!resolver.is_current(&before));
    assert_eq!(
      before.bundle.asset("Assets/SO/enemy/Slime.asset"),
      Some(&b"enemy/Slime.asset"[..])
    );

    let after = resolver.query("enemy/Slime.asset").unwrap();
    assert!(resolver.is_current(&after));
    assert!(!Arc::ptr_eq(&before.bundle, &after.bundle));
    assert_eq!(resolver.loader().opens_of(MANIFEST), 2);
  }

  #[test]
  fn force_reload_picks_up_regenerated_bundles() {
    let resolver = resolver();
    assert!(resolver.query("titles/logo.png").is_none());

    let mut rebuilt = manifest();
    rebuilt.groups[1]
      .entries
      .push(entry("titles/logo.png", "Assets/titles/logo.png"));
    let regenerated = MemoryLoader::with_manifest(MANIFEST, &rebuilt);
    resolver.loader().insert(MANIFEST, regenerated.open(MANIFEST).unwrap());
    resolver.loader().insert("titles", regenerated.open("titles").unwrap());

    assert!(resolver.query("titles/logo.png").is_none());
    resolver.force_reload();
    assert!(resolver.query("titles/logo.png").is_some());
  }

  #[test]
  fn concurrent_first_queries_load_once() {
    let resolver = resolver();
    let barrier = Barrier::new(8);

    thread::scope(|scope| {
      for _ in 0..8 {
        scope.spawn(|| {
          barrier.wait();
          assert!(resolver.query("enemy/Bat.asset").is_some());
        });
      }
    });

    assert_eq!(resolver.loader().opens_of(MANIFEST), 1);
    assert_eq!(resolver.load_count(), 1);
  }

  #[test]
  fn ready_queries_do_not_wait_on_the_load_barrier() {
    let resolver = resolver();
    resolver.query("enemy/Bat.asset").unwrap();

    let guard = resolver.init.lock().unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    thread::scope(|scope| {
      scope.spawn(|| {
        let found = resolver.query("sounds/theme.ogg").is_some();
        tx.send(found).unwrap();
      });
      let answered = rx.recv_timeout(std::time::Duration::from_secs(5));
      drop(guard);
      assert_eq!(answered, Ok(true));
    });
    assert_eq!(resolver.load_count(), 1);
  }

  #[test]
  fn concurrent_queries_after_reload_load_once_per_epoch() {
    let resolver = resolver();
    resolver.query("enemy/Bat.asset").unwrap();
    resolver.force_reload();

    let barrier = Barrier::new(8);
    thread::scope(|scope| {
      for _ in 0..8 {
        scope.spawn(|| {
          barrier.wait();
          let resolved = resolver.query("sounds/theme.ogg").unwrap();
          assert_eq!(resolved.epoch, 1);
        });
      }
    });

    assert_eq!(resolver.loader().opens_of(MANIFEST), 2);
    assert_eq!(resolver.loader().opens_of("sounds"), 2);
    assert_eq!(resolver.load_count(), 2);
  }
}
