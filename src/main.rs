//! # fundreg CLI
//!
//! Builds and queries the funder search index.
//!
//! ## Usage
//!
//! ```bash
//! fundreg --config ./config/fundreg.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fundreg build` | Parse/resolve the taxonomy and write a new index |
//! | `fundreg fetch` | Download a fresh copy of the taxonomy |
//! | `fundreg parse` | Print the parsed (unresolved) record set as JSON |
//! | `fundreg search "<query>"` | Query a built index |
//! | `fundreg get <id>` | Show one funder from a built index |
//!
//! ## Exit status
//!
//! `2` when the build destination already exists, `32` when the taxonomy is
//! internally inconsistent, `1` for anything else.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use fundreg::config::{self, Config};
use fundreg::error::exit_code;
use fundreg::pipeline::{self, BuildOptions};
use fundreg::progress::ProgressMode;
use fundreg::{get, search};

/// fundreg: build a search index over the Open Funder Registry.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "fundreg",
    about = "fundreg: build a search index over the Open Funder Registry",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/fundreg.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Build a new index.
    ///
    /// Refuses to run if the destination exists: build into a fresh path and
    /// swap it into place afterwards.
    Build {
        /// Download a fresh taxonomy before building (implies --rebuild-snapshot).
        #[arg(long)]
        fetch: bool,

        /// Re-parse the RDF instead of loading the JSON snapshot.
        #[arg(long)]
        rebuild_snapshot: bool,

        /// Index destination; overrides `index.path`.
        #[arg(long)]
        index_path: Option<PathBuf>,

        /// Progress output on stderr: `off`, `human` or `json`.
        /// Defaults to `human` on a terminal, otherwise `off`.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Download a fresh copy of the taxonomy into `source.rdf_path`.
    Fetch,

    /// Parse the taxonomy and print the unresolved record set as JSON.
    Parse,

    /// Search a built index.
    Search {
        /// Free-text query, or `id:<identifier>` for an exact lookup.
        query: Option<String>,

        /// Location query (country name, ISO3 code or region).
        #[arg(long)]
        location: Option<String>,

        /// Number of results to skip.
        #[arg(long, default_value_t = 0)]
        offset: i64,

        /// Index to query; overrides `index.path`.
        #[arg(long)]
        index_path: Option<PathBuf>,

        /// Print the raw result page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one funder by identifier.
    Get {
        /// Concept identifier (the DOI suffix).
        id: String,

        /// Index to query; overrides `index.path`.
        #[arg(long)]
        index_path: Option<PathBuf>,

        /// Print the stored record as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        Config::minimal()
    };

    match cli.command {
        Commands::Build {
            fetch,
            rebuild_snapshot,
            index_path,
            progress,
        } => {
            let mode = match progress.as_deref() {
                None => ProgressMode::default_for_tty(),
                Some(s) => ProgressMode::parse(s).ok_or_else(|| {
                    anyhow::anyhow!("Unknown progress mode: '{}'. Use off, human, or json.", s)
                })?,
            };
            let opts = BuildOptions {
                fetch,
                rebuild_snapshot,
                index_path,
            };
            pipeline::run_build(&cfg, &opts, mode.reporter().as_ref()).await?;
        }
        Commands::Fetch => {
            pipeline::run_fetch(&cfg).await?;
        }
        Commands::Parse => {
            pipeline::run_parse(&cfg)?;
        }
        Commands::Search {
            query,
            location,
            offset,
            index_path,
            json,
        } => {
            let path = index_path.unwrap_or_else(|| cfg.index.path.clone());
            search::run_search(
                &path,
                query.as_deref(),
                location.as_deref(),
                offset,
                cfg.index.page_size,
                json,
            )
            .await?;
        }
        Commands::Get {
            id,
            index_path,
            json,
        } => {
            let path = index_path.unwrap_or_else(|| cfg.index.path.clone());
            get::run_get(&path, &id, json).await?;
        }
    }

    Ok(())
}
