//! Implementation of the launcher CLI commands.

use std::fs;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use condor_jobs::JobRenderer;
use condor_jobs::JobSubmission;

use crate::config::Settings;

pub mod launch;
pub mod render;

/// Reads a job submission from a JSON file.
fn read_job(path: &Path) -> Result<JobSubmission> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read job submission `{}`", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid job submission `{}`", path.display()))
}

/// Creates the job renderer for the configured submission dialect.
fn renderer(settings: &Settings) -> Result<JobRenderer> {
    JobRenderer::new(settings.config().condor.clone()).context("failed to compile job templates")
}
