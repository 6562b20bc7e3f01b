mod commands;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::build::BuildOverrides;

#[derive(Parser)]
#[command(name = "pagesnap")]
#[command(version, about = "Snapshot a running web app into a static site", long_about = None)]
struct Cli {
    /// Print debug diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Capture the running server into the output directory
    Build {
        /// Path to snapshot.toml (defaults to ./snapshot.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: BuildOverrides,
    },

    /// Write a default snapshot.toml
    Init {
        /// Directory to write snapshot.toml into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing snapshot.toml
        #[arg(long)]
        force: bool,
    },

    /// Check a built snapshot for missing or placeholder files
    Validate {
        /// Snapshot directory (defaults to the configured output directory)
        path: Option<PathBuf>,

        /// Path to snapshot.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Serve a built snapshot locally
    Preview {
        /// Snapshot directory (defaults to the configured output directory)
        path: Option<PathBuf>,

        /// Port to serve on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Path to snapshot.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,pagesnap=debug,pagesnap_origin=debug,tower_http=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build { config, overrides } => commands::build::run(config, overrides).await,
        Command::Init { path, force } => commands::init::run(path, force).await,
        Command::Validate { path, config } => commands::validate::run(path, config).await,
        Command::Preview { path, port, config } => {
            commands::preview::run(path, port, config).await
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "pagesnap", &mut io::stdout());
            Ok(())
        }
    }
}
