//! Implementation of the `render` command.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::commands::read_job;
use crate::commands::renderer;
use crate::config::Settings;

/// Arguments for the `render` command.
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// The path to the launcher configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// The path to the job submission JSON.
    #[arg(short, long, value_name = "JSON")]
    pub job: PathBuf,

    /// The existing staging directory to render into.
    #[arg(short, long, value_name = "DIR")]
    pub dir: PathBuf,
}

/// Renders a job's artifacts without provisioning its credentials.
///
/// The runtime configuration of the job has no child token.
pub fn render(args: RenderArgs) -> anyhow::Result<()> {
    let settings = Settings::load(&args.config)?;
    let renderer = renderer(&settings)?;
    let mut job = read_job(&args.job)?;

    let path = renderer
        .render(&mut job, settings.source(), &args.dir)
        .with_context(|| format!("failed to render job `{}`", job.invocation_id))?;

    println!("{}", path.display());
    Ok(())
}
