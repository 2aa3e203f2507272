//! ngxconf - validate, format and inspect nginx-style configuration files
//!
//! This is the main entry point for the ngxconf CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use ngxconf_parser::{parse, render_report, Config};
use std::io::{IsTerminal, Read};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ngxconf - nginx-style configuration tool
#[derive(Parser)]
#[command(name = "ngxconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file (`-` for stdin)
        config: String,
    },

    /// Print a configuration file in canonical form
    Fmt {
        /// Path to the configuration file (`-` for stdin)
        config: String,

        /// Exit with an error instead of printing when the file is not canonical
        #[arg(long)]
        check: bool,
    },

    /// Print the parsed tree as JSON
    Dump {
        /// Path to the configuration file (`-` for stdin)
        config: String,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --verbose selects debug output
    let default_directive = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Validate { config: path } => {
            tracing::info!("Validating config: {}", path);
            let config = load(&path)?;
            tracing::debug!(statements = config.len(), "validated");
            println!("✅ Configuration '{}' is valid!", path);
        }

        Commands::Fmt { config: path, check } => {
            let source = read_source(&path)?;
            let config = parse_or_exit(&path, &source);
            let rendered = config.to_string();

            if check {
                if rendered != source {
                    eprintln!("❌ Configuration '{}' is not canonically formatted", path);
                    std::process::exit(1);
                }
                tracing::info!("'{}' is canonically formatted", path);
            } else {
                print!("{}", rendered);
            }
        }

        Commands::Dump { config: path } => {
            let config = load(&path)?;
            let json = serde_json::to_string_pretty(&config)
                .context("failed to serialize configuration tree")?;
            println!("{}", json);
        }

        Commands::Version => {
            println!("ngxconf v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Read the configuration text from a path, or stdin for `-`
fn read_source(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read configuration from stdin")?;
        return Ok(source);
    }

    std::fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path))
}

fn load(path: &str) -> anyhow::Result<Config> {
    let source = read_source(path)?;
    Ok(parse_or_exit(path, &source))
}

/// Parse `source`, printing a diagnostic and exiting with status 1 on failure
fn parse_or_exit(path: &str, source: &str) -> Config {
    match parse(source) {
        Ok(config) => config,
        Err(e) => {
            let name = if path == "-" { "<stdin>" } else { path };
            let color = std::io::stderr().is_terminal();
            eprintln!("❌ Configuration Error: {}", e);
            eprint!("{}", render_report(&e, name, source, color));
            std::process::exit(1);
        }
    }
}
