#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod asset_paths;
pub mod assets;
pub mod builder;
pub mod bundle;
pub mod config;
pub mod description;
pub mod error;
pub mod models;
pub mod resolver;

pub use assets::AssetLookup;
pub use builder::{BuildReport, ManifestBuilder};
pub use bundle::{
  AssetBundle, BundleLoader, BundlePacker, FileSystemLoader, FileSystemPacker, PackRequest,
  PackedBundle,
};
pub use config::{BundleConfig, NormalizerConfig};
pub use description::{PackagingDescription, SourceEntry, SourceGroup};
pub use error::{BuildResult, BundleError};
pub use models::{Compression, Entry, Group, Manifest};
pub use resolver::{IndexedEntry, Resolved, Resolver, ResolverState};
