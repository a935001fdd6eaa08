//! Helpers for turning caller paths into manifest addresses and naming bundle files.
//!
//! Filtering, bundle naming and address normalisation live in separate submodules so each
//! can be tested on its own. The builder, the file-system packer and the resolver facade all
//! share them.

mod bundle;
mod filters;
mod normalize;

pub use bundle::{bundle_file_name, bundle_path, file_name, file_stem, list_bundle_files};
pub use filters::IgnoreRules;
pub use normalize::PathNormalizer;
