//! # Image Harvest CLI (`harvest`)
//!
//! ## Usage
//!
//! ```bash
//! harvest --config ./config/harvest.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `harvest fetch <keyword>` | Resolve image URLs and download them |
//! | `harvest urls <keyword>` | Resolve image URLs and print them as JSON |
//! | `harvest completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! # Download 20 images (original quality first) into ./download
//! harvest fetch "sunset"
//!
//! # Thumbnails and mid-size only, PNG and JPEG, 50 at a time
//! harvest fetch "sunset" --count 200 --thumbnails-only --allow png,jpg --concurrency 50
//! ```

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use image_harvest::config;
use image_harvest::harvest_cmd::{self, FetchOverrides};
use image_harvest::progress::ProgressMode;

/// Image Harvest CLI: keyword image search harvester.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "harvest",
    about = "Image Harvest: keyword image search harvester with fallback-quality downloads",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/harvest.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Search for a keyword and download the results.
    ///
    /// Resolves half again as many candidate chains as `--count`, downloads
    /// each through its fallback chain, and keeps the first `--count`
    /// accepted files as `01.jpg`, `02.png`, ...
    Fetch {
        /// Search keyword.
        keyword: String,

        /// Number of images to request (clamped to what the provider reports).
        #[arg(long, default_value_t = 20)]
        count: usize,

        /// Destination directory (overrides `download.output_dir`).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Skip original-quality URLs; use mid-resolution and thumbnails only.
        #[arg(long)]
        thumbnails_only: bool,

        /// Comma-separated allowed extensions, e.g. `png,jpg`.
        #[arg(long)]
        allow: Option<String>,

        /// Per-request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Number of downloads in flight per batch.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Progress output on stderr. Defaults to `human` on a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Resolve image URLs without downloading and print them as JSON.
    Urls {
        /// Search keyword.
        keyword: String,

        /// Number of images to request.
        #[arg(long, default_value_t = 20)]
        count: usize,

        /// Skip original-quality URLs.
        #[arg(long)]
        thumbnails_only: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "harvest", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Fetch {
            keyword,
            count,
            out,
            thumbnails_only,
            allow,
            timeout,
            concurrency,
            progress,
        } => {
            let overrides = FetchOverrides {
                output_dir: out,
                allow,
                timeout_secs: timeout,
                concurrency,
                thumbnails_only,
            };
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            harvest_cmd::run_fetch(&cfg, &keyword, count, &overrides, progress).await?;
        }
        Commands::Urls {
            keyword,
            count,
            thumbnails_only,
        } => {
            harvest_cmd::run_urls(&cfg, &keyword, count, thumbnails_only).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
