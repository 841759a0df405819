//! Secret-store client and per-job credential provisioning.
//!
//! A [`CredentialBroker`] drives a [`SecretStore`] through the provisioning
//! protocol of a job: it stores the job's runtime configuration where only a
//! use-limited child token can read it, and issues the job a TLS certificate.
//! [`VaultClient`] implements the store over the Vault HTTP API.
//!
//! ```no_run
//! use condor_vault::BrokerConfig;
//! use condor_vault::CredentialBroker;
//! use condor_vault::VaultClient;
//! use condor_vault::VaultClientConfig;
//!
//! # async fn provision() -> Result<(), Box<dyn std::error::Error>> {
//! let client = VaultClient::new(&VaultClientConfig {
//!     url: "https://vault.example.org:8200".to_string(),
//!     token: "s.parent".into(),
//! })?;
//! let broker = CredentialBroker::new(
//!     client,
//!     BrokerConfig {
//!         cubbyhole_mount: "irods-configs".to_string(),
//!         num_uses: 2,
//!         tls_mount: "pki".to_string(),
//!         tls_role: "condor-jobs".to_string(),
//!         tls_common_name: "jobs.example.org".to_string(),
//!     },
//! );
//! let provisioned = broker.provision_job("job-id", b"irods: {}\n").await?;
//! println!("{}", provisioned.tls.cert_chain);
//! # Ok(())
//! # }
//! ```

mod broker;
mod client;
mod error;
mod store;

pub use broker::*;
pub use client::*;
pub use error::*;
pub use store::*;
