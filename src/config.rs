//! Implementation of the launcher configuration.
//!
//! The configuration file (YAML or TOML, chosen by extension) is layered with
//! environment variables prefixed with `CONDOR_LAUNCHER__`, using `__` to
//! separate nested keys (e.g. `CONDOR_LAUNCHER__VAULT__TOKEN`).
//!
//! Only the sections the launcher itself acts on are deserialized; the whole
//! configuration is also handed to the renderer, which projects the runtime
//! configuration of the job out of it.

use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use condor_jobs::RendererConfig;
use condor_vault::BrokerConfig;
use condor_vault::ChildToken;
use condor_vault::DEFAULT_NUM_USES;
use condor_vault::VaultClientConfig;
use secrecy::ExposeSecret;
use secrecy::SecretString;
use serde::Deserialize;

/// The prefix of environment variables overriding configuration values.
pub const ENV_PREFIX: &str = "CONDOR_LAUNCHER";

/// The separator of nested keys in environment variable names.
const ENV_SEPARATOR: &str = "__";

/// The configuration key the child token of a job is placed under.
pub const CHILD_TOKEN_KEY: &str = "vault.child_token.token";

/// Represents the configuration of the launcher.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LauncherConfig {
    /// Configuration of the secret store.
    ///
    /// Only required when provisioning credentials.
    #[serde(default)]
    pub vault: Option<VaultSettings>,
    /// Configuration of the submission descriptor.
    #[serde(default)]
    pub condor: RendererConfig,
}

/// Represents the secret store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VaultSettings {
    /// The base URL of the secret store.
    pub url: String,
    /// The token the launcher authenticates with.
    pub token: SecretString,
    /// Configuration of the child tokens created for jobs.
    #[serde(default)]
    pub child_token: ChildTokenSettings,
    /// Configuration of the job configuration cubbyhole.
    #[serde(default)]
    pub irods: IrodsSettings,
    /// Configuration of job certificates.
    pub tls: TlsSettings,
}

/// Represents the configuration of child tokens.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChildTokenSettings {
    /// The number of uses of each child token.
    pub num_uses: u32,
}

impl Default for ChildTokenSettings {
    fn default() -> Self {
        Self {
            num_uses: DEFAULT_NUM_USES,
        }
    }
}

/// Represents the configuration of the job configuration cubbyhole.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IrodsSettings {
    /// The mount path of the cubbyhole.
    pub mount_path: String,
}

impl Default for IrodsSettings {
    fn default() -> Self {
        Self {
            mount_path: "irods-configs".to_string(),
        }
    }
}

/// Represents the configuration of job certificates.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TlsSettings {
    /// The mount path of the PKI secrets engine.
    pub mount: String,
    /// The PKI role certificates are issued under.
    pub role: String,
    /// The common name of issued certificates.
    pub common_name: String,
}

impl VaultSettings {
    /// Validates the secret store configuration.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("configuration value `vault.url` cannot be empty");
        }

        if self.token.expose_secret().is_empty() {
            bail!("configuration value `vault.token` cannot be empty");
        }

        if self.child_token.num_uses == 0 {
            bail!("configuration value `vault.child_token.num_uses` cannot be zero");
        }

        if self.irods.mount_path.is_empty() {
            bail!("configuration value `vault.irods.mount_path` cannot be empty");
        }

        for (key, value) in [
            ("mount", &self.tls.mount),
            ("role", &self.tls.role),
            ("common_name", &self.tls.common_name),
        ] {
            if value.is_empty() {
                bail!("configuration value `vault.tls.{key}` cannot be empty");
            }
        }

        Ok(())
    }

    /// Gets the configuration of the secret store client.
    pub fn client_config(&self) -> VaultClientConfig {
        VaultClientConfig {
            url: self.url.clone(),
            token: self.token.clone(),
        }
    }

    /// Gets the configuration of the credential broker.
    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            cubbyhole_mount: self.irods.mount_path.clone(),
            num_uses: self.child_token.num_uses,
            tls_mount: self.tls.mount.clone(),
            tls_role: self.tls.role.clone(),
            tls_common_name: self.tls.common_name.clone(),
        }
    }
}

/// The loaded configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The layered configuration values.
    source: config::Config,
    /// The deserialized launcher configuration.
    config: LauncherConfig,
}

impl Settings {
    /// Loads the configuration file at the given path, layered with the
    /// environment.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_source(
            config::Config::builder()
                .add_source(config::File::from(path))
                .add_source(
                    config::Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR),
                )
                .build()
                .with_context(|| {
                    format!("failed to read configuration file `{}`", path.display())
                })?,
        )
    }

    /// Creates settings from configuration values.
    pub fn from_source(source: config::Config) -> Result<Self> {
        let config = source
            .clone()
            .try_deserialize()
            .context("invalid launcher configuration")?;
        Ok(Self { source, config })
    }

    /// Gets the launcher configuration.
    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Gets the configuration values.
    pub fn source(&self) -> &config::Config {
        &self.source
    }

    /// Gets the validated secret store configuration.
    pub fn vault(&self) -> Result<&VaultSettings> {
        let vault = self
            .config
            .vault
            .as_ref()
            .context("configuration section `vault` is missing")?;
        vault.validate()?;
        Ok(vault)
    }

    /// Gets the configuration values with a job's child token overlaid.
    pub fn with_child_token(&self, token: &ChildToken) -> Result<config::Config> {
        config::Config::builder()
            .add_source(self.source.clone())
            .set_override(CHILD_TOKEN_KEY, token.expose())
            .and_then(|b| b.build())
            .context("failed to set the job's child token")
    }
}
