//! Implementation of the `launch` command.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use condor_vault::CredentialBroker;
use condor_vault::TlsBundle;
use condor_vault::VaultClient;
use secrecy::ExposeSecret;
use tracing::info;

use crate::commands::read_job;
use crate::commands::renderer;
use crate::config::Settings;

/// The name of the certificate chain file written to the TLS directory.
pub const TLS_CERT_FILE_NAME: &str = "tls.crt";

/// The name of the private key file written to the TLS directory.
pub const TLS_KEY_FILE_NAME: &str = "tls.key";

/// Arguments for the `launch` command.
#[derive(Parser, Debug)]
pub struct LaunchArgs {
    /// The path to the launcher configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// The path to the job submission JSON.
    #[arg(short, long, value_name = "JSON")]
    pub job: PathBuf,

    /// The path to the runtime configuration stored for the job.
    #[arg(short, long, value_name = "FILE")]
    pub runtime_config: PathBuf,

    /// The existing staging directory to render into.
    #[arg(short, long, value_name = "DIR")]
    pub dir: PathBuf,

    /// The directory to write the job's TLS certificate chain and key to.
    #[arg(long, value_name = "DIR")]
    pub tls_dir: Option<PathBuf>,
}

/// Writes a TLS bundle to a directory.
///
/// The private key is only readable by its owner.
fn write_tls(dir: &Path, tls: &TlsBundle) -> Result<()> {
    let cert = dir.join(TLS_CERT_FILE_NAME);
    fs::write(&cert, &tls.cert_chain)
        .with_context(|| format!("failed to write `{}`", cert.display()))?;

    let key = dir.join(TLS_KEY_FILE_NAME);
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options
        .open(&key)
        .and_then(|mut f| f.write_all(tls.private_key.expose_secret().as_bytes()))
        .with_context(|| format!("failed to write `{}`", key.display()))
}

/// Provisions a job's credentials and renders its artifacts.
pub async fn launch(args: LaunchArgs) -> Result<()> {
    let settings = Settings::load(&args.config)?;
    let vault = settings.vault()?;
    let renderer = renderer(&settings)?;
    let mut job = read_job(&args.job)?;
    let runtime_config = fs::read(&args.runtime_config).with_context(|| {
        format!(
            "failed to read runtime configuration `{}`",
            args.runtime_config.display()
        )
    })?;

    let client =
        VaultClient::new(&vault.client_config()).context("failed to create secret store client")?;
    let broker = CredentialBroker::new(client, vault.broker_config());
    let provisioned = broker
        .provision_job(&job.invocation_id, &runtime_config)
        .await
        .with_context(|| {
            format!(
                "failed to provision credentials for job `{}`",
                job.invocation_id
            )
        })?;

    let job_settings = settings.with_child_token(&provisioned.token)?;
    let path = renderer
        .render(&mut job, &job_settings, &args.dir)
        .with_context(|| format!("failed to render job `{}`", job.invocation_id))?;

    if let Some(dir) = &args.tls_dir {
        write_tls(dir, &provisioned.tls)?;
        info!(dir = %dir.display(), "wrote job TLS certificate");
    }

    println!("{}", path.display());
    Ok(())
}
