//! Errors raised by the secret store and the credential broker.

use std::fmt;

use thiserror::Error;

/// An error from the secret store.
#[derive(Debug, Error)]
pub enum Error {
    /// The secret store address is not a valid URL.
    #[error("invalid secret store address")]
    Config(#[source] url::ParseError),

    /// The request could not be sent or its response could not be read.
    #[error("failed to communicate with the secret store")]
    Transport(#[from] reqwest::Error),

    /// The secret store rejected the request.
    #[error("secret store responded with status {status}: {}", .errors.join("; "))]
    Api {
        /// The HTTP status code of the response.
        status: u16,
        /// The errors reported by the secret store.
        errors: Vec<String>,
    },

    /// A mount already exists at the requested path.
    #[error("a secrets engine is already mounted at the path")]
    AlreadyExists,

    /// A token creation response had no `auth` section.
    #[error("auth field was nil")]
    MissingAuth,

    /// A token creation response had an empty client token.
    #[error("client token was empty")]
    EmptyToken,

    /// A response lacked a required field or the field was not a string.
    #[error("response field `{0}` is missing or is not a string")]
    MalformedSecret(&'static str),

    /// A PKI role could not be created.
    #[error("failed to create role `{role}`")]
    RoleCreateFailed {
        /// The name of the role.
        role: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    /// A certificate could not be issued.
    #[error("failed to issue a certificate for role `{role}`")]
    CertIssueFailed {
        /// The name of the role.
        role: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    /// A response body was not the expected JSON.
    #[error("failed to decode the secret store response")]
    Decode(#[source] serde_json::Error),

    /// A stored configuration was not valid base64.
    #[error("stored job configuration is not valid base64")]
    ConfigEncoding(#[source] base64::DecodeError),
}

/// The result type for secret store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A step of the job provisioning protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisionStep {
    /// Ensuring the configuration cubbyhole is mounted.
    MountCubbyhole,
    /// Creating the job's child token.
    ChildToken,
    /// Storing the job's runtime configuration.
    StoreConfig,
    /// Creating the PKI role.
    CreateRole,
    /// Issuing the job's TLS certificate.
    IssueCert,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MountCubbyhole => write!(f, "mount cubbyhole"),
            Self::ChildToken => write!(f, "create child token"),
            Self::StoreConfig => write!(f, "store job configuration"),
            Self::CreateRole => write!(f, "create PKI role"),
            Self::IssueCert => write!(f, "issue TLS certificate"),
        }
    }
}

/// An error from provisioning a job.
///
/// Provisioning stops at the first failing step; steps after it never run.
#[derive(Debug, Error)]
#[error("job provisioning failed: could not {step}")]
pub struct ProvisionError {
    /// The step that failed.
    pub step: ProvisionStep,
    /// The underlying secret store error.
    #[source]
    pub source: Error,
}
