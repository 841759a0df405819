//! The secret store seam and the values that cross it.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::ExposeSecret;
use secrecy::SecretString;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::Result;

/// The default number of uses of a child token.
///
/// One use stores the job's configuration; the other is left for the job to
/// read it back.
pub const DEFAULT_NUM_USES: u32 = 2;

/// The default maximum lifetime of certificates issued under a role.
pub const DEFAULT_MAX_TTL: &str = "8760h";

/// The default size of the keys of issued certificates.
pub const DEFAULT_KEY_BITS: u32 = 4096;

/// The configuration of a secrets engine mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// The type of the secrets engine.
    #[serde(rename = "type")]
    pub mount_type: String,
    /// A human readable description of the mount.
    #[serde(default)]
    pub description: String,
}

impl MountConfig {
    /// Creates the configuration of a cubbyhole mount.
    pub fn cubbyhole(description: impl Into<String>) -> Self {
        Self {
            mount_type: "cubbyhole".to_string(),
            description: description.into(),
        }
    }
}

/// A request for a child token of the store's own token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    /// The number of requests the token may make before it is revoked.
    pub num_uses: u32,
}

impl Default for TokenRequest {
    fn default() -> Self {
        Self {
            num_uses: DEFAULT_NUM_USES,
        }
    }
}

/// A use-limited child token.
///
/// The token value is redacted from `Debug` output.
#[derive(Debug, Clone)]
pub struct ChildToken(SecretString);

impl ChildToken {
    /// Creates a child token from its value.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Exposes the value of the token.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// A job's runtime configuration as stored in a cubbyhole.
///
/// The bytes are base64 encoded in the `config` field on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSecret {
    /// The configuration bytes.
    #[serde(serialize_with = "serialize_base64")]
    #[serde(deserialize_with = "deserialize_base64")]
    pub config: Vec<u8>,
}

impl ConfigSecret {
    /// Creates a configuration secret from its bytes.
    pub fn new(config: impl Into<Vec<u8>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// Decodes the base64 text of a stored configuration.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        STANDARD
            .decode(encoded)
            .map(Self::new)
            .map_err(crate::Error::ConfigEncoding)
    }
}

/// Serializes bytes as base64 text.
fn serialize_base64<S: Serializer>(
    bytes: &[u8],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

/// Deserializes bytes from base64 text.
fn deserialize_base64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}

/// The configuration of a PKI role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// The size of the keys of issued certificates.
    pub key_bits: u32,
    /// The maximum lifetime of issued certificates.
    pub max_ttl: String,
    /// Whether certificates may be issued for any common name.
    pub allow_any_name: bool,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            key_bits: DEFAULT_KEY_BITS,
            max_ttl: DEFAULT_MAX_TTL.to_string(),
            allow_any_name: true,
        }
    }
}

/// A request to issue a certificate under a PKI role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCertRequest {
    /// The common name of the certificate.
    pub common_name: String,
    /// The requested lifetime of the certificate.
    pub ttl: String,
    /// The encoding of the returned certificate and key.
    pub format: String,
}

impl IssueCertRequest {
    /// Creates a request for a PEM encoded certificate with the default
    /// lifetime.
    pub fn pem(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ttl: DEFAULT_MAX_TTL.to_string(),
            format: "pem".to_string(),
        }
    }
}

/// A certificate issued under a PKI role.
#[derive(Clone)]
pub struct IssuedCert {
    /// The PEM encoded certificate.
    pub certificate: String,
    /// The PEM encoded private key.
    pub private_key: SecretString,
    /// The PEM encoded certificate of the issuing authority.
    pub issuing_ca: String,
}

impl std::fmt::Debug for IssuedCert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCert")
            .field("certificate", &self.certificate)
            .field("private_key", &"[REDACTED]")
            .field("issuing_ca", &self.issuing_ca)
            .finish()
    }
}

/// A store of secrets.
///
/// The store authenticates with its own (parent) token except where an
/// operation takes a [`ChildToken`].
#[async_trait]
pub trait SecretStore: Send + Sync + std::fmt::Debug {
    /// Determines whether a secrets engine is mounted at the given path.
    async fn is_mounted(&self, path: &str) -> Result<bool>;

    /// Mounts a secrets engine at the given path.
    ///
    /// Returns [`Error::AlreadyExists`](crate::Error::AlreadyExists) if the
    /// path is in use.
    async fn mount(&self, path: &str, config: &MountConfig) -> Result<()>;

    /// Creates a child token of the store's own token.
    async fn create_child_token(&self, request: &TokenRequest) -> Result<ChildToken>;

    /// Writes a configuration secret to the given path using the child token.
    ///
    /// A cubbyhole is private to the token that writes to it, so the secret
    /// can only be read back with the same token.
    async fn write_config(
        &self,
        path: &str,
        token: &ChildToken,
        secret: &ConfigSecret,
    ) -> Result<()>;

    /// Reads a configuration secret from the given path using the child
    /// token.
    async fn read_config(&self, path: &str, token: &ChildToken) -> Result<ConfigSecret>;

    /// Creates or updates a PKI role.
    async fn create_role(&self, mount: &str, role: &str, config: &RoleConfig) -> Result<()>;

    /// Issues a certificate under a PKI role.
    async fn issue_cert(
        &self,
        mount: &str,
        role: &str,
        request: &IssueCertRequest,
    ) -> Result<IssuedCert>;
}
