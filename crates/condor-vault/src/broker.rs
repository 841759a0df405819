//! Provisioning of the credentials a job needs before it is submitted.
//!
//! For every job the broker
//!
//! 1. ensures the configuration cubbyhole is mounted,
//! 2. creates a use-limited child token,
//! 3. stores the job's runtime configuration in the child token's cubbyhole,
//! 4. creates (or updates) the PKI role, and
//! 5. issues a TLS certificate for the job.
//!
//! The steps run in that order and the first failure stops the protocol.

use secrecy::SecretString;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::ChildToken;
use crate::ConfigSecret;
use crate::Error;
use crate::IssueCertRequest;
use crate::IssuedCert;
use crate::MountConfig;
use crate::ProvisionError;
use crate::ProvisionStep;
use crate::Result;
use crate::RoleConfig;
use crate::SecretStore;
use crate::TokenRequest;
use crate::store::DEFAULT_NUM_USES;

/// The description given to the configuration cubbyhole when it is mounted.
pub const CUBBYHOLE_DESCRIPTION: &str = "A cubbyhole for the iRODS configs used in jobs";

/// Gets the default cubbyhole mount path.
fn default_cubbyhole_mount() -> String {
    "irods-configs".to_string()
}

/// Gets the default number of uses of a child token.
fn default_num_uses() -> u32 {
    DEFAULT_NUM_USES
}

/// Configuration of a [`CredentialBroker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// The mount path of the cubbyhole holding job configurations.
    #[serde(default = "default_cubbyhole_mount")]
    pub cubbyhole_mount: String,
    /// The number of uses of each child token.
    #[serde(default = "default_num_uses")]
    pub num_uses: u32,
    /// The mount path of the PKI secrets engine.
    pub tls_mount: String,
    /// The PKI role certificates are issued under.
    pub tls_role: String,
    /// The common name of issued certificates.
    pub tls_common_name: String,
}

/// A TLS certificate chain and private key issued for a job.
#[derive(Clone)]
pub struct TlsBundle {
    /// The PEM encoded certificate followed by the PEM encoded certificate of
    /// its issuer.
    pub cert_chain: String,
    /// The PEM encoded private key.
    pub private_key: SecretString,
}

impl TlsBundle {
    /// Assembles a bundle from an issued certificate.
    ///
    /// The chain is the certificate and the issuing CA, each followed by a
    /// newline. The PEM text itself is not normalized.
    pub fn from_issued(cert: IssuedCert) -> Self {
        Self {
            cert_chain: format!("{}\n{}\n", cert.certificate, cert.issuing_ca),
            private_key: cert.private_key,
        }
    }
}

impl std::fmt::Debug for TlsBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsBundle")
            .field("cert_chain", &self.cert_chain)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// The credentials provisioned for a job.
#[derive(Debug, Clone)]
pub struct Provisioned {
    /// The child token that can read the job's configuration.
    pub token: ChildToken,
    /// The job's TLS certificate chain and key.
    pub tls: TlsBundle,
}

/// Provisions the credentials of jobs from a secret store.
#[derive(Debug)]
pub struct CredentialBroker<S> {
    /// The secret store.
    store: S,
    /// The broker configuration.
    config: BrokerConfig,
}

impl<S: SecretStore> CredentialBroker<S> {
    /// Creates a new broker for the given store.
    pub fn new(store: S, config: BrokerConfig) -> Self {
        Self { store, config }
    }

    /// Gets the secret store of the broker.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Gets the configuration of the broker.
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Gets the path a job's configuration is stored at.
    pub fn config_path(&self, job_id: &str) -> String {
        format!(
            "{}/{job_id}",
            self.config.cubbyhole_mount.trim_end_matches('/')
        )
    }

    /// Mounts the configuration cubbyhole unless it is already mounted.
    pub async fn mount_cubbyhole(&self) -> Result<()> {
        let mount = &self.config.cubbyhole_mount;
        if self.store.is_mounted(mount).await? {
            debug!(mount = %mount, "configuration cubbyhole is already mounted");
            return Ok(());
        }

        match self
            .store
            .mount(mount, &MountConfig::cubbyhole(CUBBYHOLE_DESCRIPTION))
            .await
        {
            Ok(()) => {
                info!(mount = %mount, "mounted configuration cubbyhole");
                Ok(())
            }
            Err(Error::AlreadyExists) => {
                warn!(mount = %mount, "configuration cubbyhole was mounted concurrently");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Creates a child token with the configured number of uses.
    pub async fn child_token(&self) -> Result<ChildToken> {
        let token = self
            .store
            .create_child_token(&TokenRequest {
                num_uses: self.config.num_uses,
            })
            .await?;
        debug!(num_uses = self.config.num_uses, "created child token");
        Ok(token)
    }

    /// Stores a job's runtime configuration in the cubbyhole of a child
    /// token.
    ///
    /// This consumes one use of the token.
    pub async fn store_config(
        &self,
        token: &ChildToken,
        job_id: &str,
        config: &[u8],
    ) -> Result<()> {
        let path = self.config_path(job_id);
        self.store
            .write_config(&path, token, &ConfigSecret::new(config))
            .await?;
        debug!(path = %path, len = config.len(), "stored job configuration");
        Ok(())
    }

    /// Creates the PKI role and issues a certificate under it.
    pub async fn generate_tls(&self) -> Result<TlsBundle> {
        self.create_role().await?;
        self.issue_cert().await
    }

    /// Creates or updates the PKI role.
    async fn create_role(&self) -> Result<()> {
        let role = &self.config.tls_role;
        self.store
            .create_role(&self.config.tls_mount, role, &RoleConfig::default())
            .await
            .map_err(|e| Error::RoleCreateFailed {
                role: role.clone(),
                source: Box::new(e),
            })?;
        debug!(mount = %self.config.tls_mount, role = %role, "created PKI role");
        Ok(())
    }

    /// Issues a certificate under the PKI role.
    async fn issue_cert(&self) -> Result<TlsBundle> {
        let role = &self.config.tls_role;
        let cert = self
            .store
            .issue_cert(
                &self.config.tls_mount,
                role,
                &IssueCertRequest::pem(&self.config.tls_common_name),
            )
            .await
            .map_err(|e| Error::CertIssueFailed {
                role: role.clone(),
                source: Box::new(e),
            })?;
        debug!(
            common_name = %self.config.tls_common_name,
            "issued TLS certificate"
        );
        Ok(TlsBundle::from_issued(cert))
    }

    /// Provisions the credentials of a job.
    ///
    /// The runtime configuration is stored in the cubbyhole of the returned
    /// child token at [`config_path`](Self::config_path). Storing it consumes
    /// one of the token's uses; the rest are left for the job.
    ///
    /// Nothing done by earlier steps is undone when a later step fails.
    pub async fn provision_job(
        &self,
        job_id: &str,
        runtime_config: &[u8],
    ) -> std::result::Result<Provisioned, ProvisionError> {
        self.mount_cubbyhole()
            .await
            .map_err(failed_at(ProvisionStep::MountCubbyhole))?;

        let token = self
            .child_token()
            .await
            .map_err(failed_at(ProvisionStep::ChildToken))?;

        self.store_config(&token, job_id, runtime_config)
            .await
            .map_err(failed_at(ProvisionStep::StoreConfig))?;

        self.create_role()
            .await
            .map_err(failed_at(ProvisionStep::CreateRole))?;

        let tls = self
            .issue_cert()
            .await
            .map_err(failed_at(ProvisionStep::IssueCert))?;

        info!(job = %job_id, "provisioned job credentials");
        Ok(Provisioned { token, tls })
    }
}

/// Attributes an error to a provisioning step.
fn failed_at(step: ProvisionStep) -> impl FnOnce(Error) -> ProvisionError {
    move |source| ProvisionError { step, source }
}
