use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use simple_bundler::asset_paths::{PathNormalizer, list_bundle_files};
use simple_bundler::{
  BundleConfig, FileSystemLoader, FileSystemPacker, ManifestBuilder, PackagingDescription,
  Resolver,
};

#[derive(Debug, Parser)]
#[command(
  name = "simplebundle",
  version,
  about = "Pack assets into per-group bundles and resolve addresses against them"
)]
struct Cli {
  /// Configuration file (defaults to simplebundle.config.json in the working directory).
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Enable debug logging.
  #[arg(short, long, default_value_t = false, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
  /// Build group bundles and the manifest bundle from a packaging description.
  Build {
    /// Packaging description (YAML or JSON).
    description: PathBuf,
    /// Directory that entry paths are relative to.
    #[arg(long, default_value = ".")]
    source_root: PathBuf,
    /// Directory receiving the bundle files.
    #[arg(long, default_value = "target/bundles")]
    out: PathBuf,
    /// Fixed manifest stamp instead of the current time.
    #[arg(long)]
    stamp: Option<String>,
  },
  /// Resolve an address against previously built bundles.
  Query {
    address: String,
    /// Directory holding the bundle files.
    #[arg(long, default_value = "target/bundles")]
    bundles: PathBuf,
  },
  /// Print the address a path normalises to.
  Normalize { path: String },
  /// List the bundle files in a directory.
  List {
    #[arg(long, default_value = "target/bundles")]
    bundles: PathBuf,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_env("SIMPLEBUNDLE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
    )
    .with_target(false)
    .init();

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("error: {err:#}");
      ExitCode::FAILURE
    }
  }
}

fn run(cli: Cli) -> Result<()> {
  let config = match &cli.config {
    Some(path) => BundleConfig::from_path(path)
      .with_context(|| format!("failed to read configuration {}", path.display()))?,
    None => BundleConfig::discover(&std::env::current_dir()?),
  };

  match cli.command {
    Commands::Build {
      description,
      source_root,
      out,
      stamp,
    } => {
      let description = PackagingDescription::load(&description)?;
      let mut packer = FileSystemPacker::new(&source_root, &out, config.bundle_extension.as_str());
      let mut builder = ManifestBuilder::new(&config);
      if let Some(stamp) = stamp {
        builder = builder.with_stamp(stamp);
      }

      let report = builder
        .build(&description.groups, &mut packer)
        .context("packaging failed")?;
      println!(
        "manifest {} with {} entries",
        report.manifest.stamp,
        report.manifest.entry_count()
      );
      for bundle in &report.packed {
        println!("  {} ({} assets) -> {}", bundle.name, bundle.asset_count, bundle.path.display());
      }
      for name in &report.omitted {
        println!("  {name} (omitted, previous bundle reused)");
      }
    }
    Commands::Query { address, bundles } => {
      let resolver = Resolver::from_config(
        FileSystemLoader::new(&bundles, config.bundle_extension.as_str()),
        &config,
      );
      let Some(resolved) = resolver.query(&address) else {
        bail!("address not found: {address}");
      };
      println!("group: {}", resolved.entry.group);
      println!("path:  {}", resolved.entry.entry.path);
      println!("id:    {}", resolved.entry.entry.id);
    }
    Commands::Normalize { path } => {
      let address = PathNormalizer::new(&config.normalizer).normalize(&path);
      if !address.is_empty() {
        println!("{address}");
      }
    }
    Commands::List { bundles } => {
      for file in list_bundle_files(&bundles, &config.bundle_extension)? {
        println!("{}", file.display());
      }
    }
  }

  Ok(())
}
