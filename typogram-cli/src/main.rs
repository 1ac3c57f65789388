//! Typogram CLI - render text diagrams through a typogram wasm module.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use typogram_bridge::observability::{TracingConfig, init_tracing};

/// Typogram - turn ASCII diagrams into SVG with a WebAssembly converter.
#[derive(Parser)]
#[command(name = "typogram")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Bridge configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one diagram and print the result
    Convert {
        /// Path or URL of the wasm module
        #[arg(short, long)]
        module: String,

        /// Diagram source file (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Render every diagram block embedded in an HTML document
    Render {
        /// Path or URL of the wasm module
        #[arg(short, long)]
        module: String,

        /// HTML document containing `<script type="text/typogram">` blocks
        document: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load a module and report its memory and exports
    Inspect {
        /// Path or URL of the wasm module
        #[arg(short, long)]
        module: String,
    },

    /// Show version information
    Version,
}

fn setup_logging(verbosity: u8) -> Result<typogram_bridge::observability::TracingGuard> {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // TYPOGRAM_LOG_LEVEL or RUST_LOG override the -v flags
    init_tracing(TracingConfig::from_env().with_default_filter(filter))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = setup_logging(cli.verbose)?;
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Convert { module, input } => {
            commands::convert::run(config, &module, input.as_deref()).await
        }
        Commands::Render {
            module,
            document,
            output,
        } => commands::render::run(config, &module, &document, output.as_deref()).await,
        Commands::Inspect { module } => commands::inspect::run(config, &module).await,
        Commands::Version => commands::version::run(),
    }
}
