//! The condor-launcher command line tool.

use std::io::IsTerminal;
use std::io::stderr;

use clap::Parser;
use clap::Subcommand;
use clap_verbosity_flag::Verbosity;
use colored::Colorize;
use condor_launcher::commands;
use tracing_log::AsTrace;

#[derive(Subcommand)]
enum Commands {
    /// Provisions a job's credentials and renders its submission artifacts.
    ///
    /// The job's runtime configuration is stored in the secret store where
    /// only the job's child token can read it, and the path of the rendered
    /// submission descriptor is printed.
    Launch(commands::launch::LaunchArgs),

    /// Renders a job's submission artifacts without contacting the secret
    /// store.
    Render(commands::render::RenderArgs),
}

#[derive(Parser)]
#[command(author, version, propagate_version = true, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    verbose: Verbosity,
}

pub async fn inner() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_log::LogTracer::init()?;

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(cli.verbose.log_level_filter().as_trace())
        .with_writer(std::io::stderr)
        .with_ansi(stderr().is_terminal())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Launch(args) => commands::launch::launch(args).await,
        Commands::Render(args) => commands::render::render(args),
    }
}

#[tokio::main]
pub async fn main() {
    if let Err(e) = inner().await {
        eprintln!(
            "{error}: {e:?}",
            error = if std::io::stderr().is_terminal() {
                "error".red().bold()
            } else {
                "error".normal()
            }
        );
        std::process::exit(1);
    }
}
