//! # slugforge CLI Entry Point
//!
//! Parses arguments with clap and routes to the command handlers. The
//! buildpack contract commands (`detect`, `compile`, `release`) take the
//! directories the platform passes; `cache` is for maintenance.
//!
//! Any error reaching `main` prints a failure notice and exits nonzero.

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use slugforge::commands;
use slugforge::package::PackageProfile;
use slugforge::ui;

#[derive(Parser)]
#[command(name = "slugforge")]
#[command(about = "Compile and cache vendored server binaries for buildpack slugs", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Hide compiler output and progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether this buildpack applies (always does)
    Detect {
        build_dir: PathBuf,
    },
    /// Build or restore the binary and write runtime files
    Compile {
        build_dir: PathBuf,
        cache_dir: PathBuf,
        /// Directory of per-variable override files
        env_dir: Option<PathBuf>,
    },
    /// Print default process types
    Release {
        build_dir: PathBuf,
    },
    /// Inspect or clear the artifact cache
    Cache {
        #[command(subcommand)]
        op: CacheOp,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheOp {
    /// Show the cached fingerprint and binary
    Status {
        cache_dir: Option<PathBuf>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the cached artifact
    Purge {
        cache_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::failure("Build failed");
            for cause in e.chain() {
                ui::warn(&cause.to_string());
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("slugforge=warn"),
        1 => EnvFilter::new("slugforge=info"),
        _ => EnvFilter::new("slugforge=debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let profile = PackageProfile::nginx();

    match cli.command {
        Commands::Detect { build_dir } => {
            commands::detect(&profile, &build_dir);
            Ok(())
        }
        Commands::Compile {
            build_dir,
            cache_dir,
            env_dir,
        } => commands::compile::run_compile(
            &profile,
            &build_dir,
            &cache_dir,
            env_dir.as_deref(),
            cli.quiet,
        ),
        Commands::Release { build_dir } => {
            commands::release(&profile, &build_dir);
            Ok(())
        }
        Commands::Cache { op } => match op {
            CacheOp::Status { cache_dir, json } => {
                commands::cache::status(&profile, cache_dir.as_deref(), json)
            }
            CacheOp::Purge { cache_dir } => commands::cache::purge(&profile, cache_dir.as_deref()),
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}
