//! `igcat` — operator CLI for the IG catalog.
//!
//! Every command prints one JSON document to stdout; logs go to stderr.
//!
//! # Usage
//!
//! ```
//! igcat import --ig ps-ca --ig-version 2.1.1 --dir packages/ps-ca/package
//! igcat load-facts --ig ps-ca --ig-version 2.1.1 --kind elements --truncate
//! igcat resolve --canonical http://example.org/StructureDefinition/ca-patient
//! igcat ask "Which elements are must support?" --canonical http://example.org/StructureDefinition/ca-patient
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use igcat_core::{fact::FactKind, settings::Settings};
use igcat_router::Mode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "igcat", about = "Catalog and query FHIR implementation guide profiles")]
struct Args {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "igcat.toml", global = true)]
  config: PathBuf,

  /// SQLite database file; overrides `database_path` from the settings.
  #[arg(long, value_name = "FILE", global = true)]
  database: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

/// Identifies one imported package.
#[derive(ClapArgs, Debug)]
struct PackageArgs {
  /// IG code, e.g. `ps-ca`.
  #[arg(long)]
  ig:         String,
  /// IG version, e.g. `2.1.1`.
  #[arg(long)]
  ig_version: String,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Import the StructureDefinitions of a package directory.
  Import {
    #[command(flatten)]
    package: PackageArgs,
    /// Directory holding the package's `*.json` resources.
    #[arg(long)]
    dir:     PathBuf,
  },

  /// Extract element, binding and constraint facts for an imported package.
  LoadFacts {
    #[command(flatten)]
    package:  PackageArgs,
    /// Fact kind to load; repeat for several. Defaults to all kinds.
    #[arg(long = "kind", value_name = "KIND")]
    kinds:    Vec<FactKind>,
    /// Delete the package's existing facts of each loaded kind first.
    #[arg(long, alias = "reset")]
    truncate: bool,
  },

  /// Resolve a canonical URL to artifact metadata and its stored resource.
  Resolve {
    #[arg(long)]
    canonical: String,
    #[arg(long)]
    version:   Option<String>,
  },

  /// Route a natural-language question to the structured queries.
  Ask {
    question:   String,
    #[arg(long, default_value = "deterministic")]
    mode:       Mode,
    #[arg(long)]
    canonical:  Option<String>,
    #[arg(long)]
    version:    Option<String>,
    #[arg(long)]
    path:       Option<String>,
    #[arg(long)]
    value_set:  Option<String>,
    /// Run the plan against a running API server instead of the local
    /// database.
    #[arg(long, value_name = "URL")]
    api_url:    Option<String>,
    /// Per-call timeout when `--api-url` is set.
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,
  },

  /// List imported packages.
  Packages,

  /// Delete a package with all of its artifacts and facts.
  DropPackage {
    #[command(flatten)]
    package: PackageArgs,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let mut settings: Settings = config::Config::builder()
    .add_source(config::File::from(args.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("IGCAT").separator("__"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise Settings")?;

  // Flags override settings.
  if let Some(database) = args.database {
    settings.database_path = database;
  }

  commands::run(args.command, &settings).await
}
