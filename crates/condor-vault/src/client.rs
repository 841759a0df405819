//! Implementation of a secret store client for the Vault HTTP API.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::Method;
use reqwest::RequestBuilder;
use secrecy::ExposeSecret;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::ChildToken;
use crate::ConfigSecret;
use crate::Error;
use crate::IssueCertRequest;
use crate::IssuedCert;
use crate::MountConfig;
use crate::Result;
use crate::RoleConfig;
use crate::SecretStore;
use crate::TokenRequest;

/// The header carrying the token a request is authenticated with.
const TOKEN_HEADER: &str = "X-Vault-Token";

/// The message Vault responds with when mounting at a path already in use.
const PATH_IN_USE: &str = "path is already in use";

/// Configuration of a [`VaultClient`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VaultClientConfig {
    /// The base URL of the Vault server (e.g. `https://vault:8200`).
    pub url: String,
    /// The token used for every request not made with a child token.
    pub token: SecretString,
}

/// The body of an error response.
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    /// The reported errors.
    #[serde(default)]
    errors: Vec<String>,
}

/// The body of a token creation response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    /// The authentication information of the new token.
    auth: Option<TokenAuth>,
}

/// The authentication section of a token creation response.
#[derive(Debug, Deserialize)]
struct TokenAuth {
    /// The new token.
    #[serde(default)]
    client_token: String,
}

/// A secret store client for the Vault HTTP API.
///
/// The client holds no state besides its address and token; it may be
/// cloned and shared freely.
#[derive(Debug, Clone)]
pub struct VaultClient {
    /// The HTTP client used to send requests.
    client: Client,
    /// The base URL of the server, always ending in `/`.
    base: Url,
    /// The token of the client.
    token: SecretString,
}

impl VaultClient {
    /// Creates a new client with a default HTTP client.
    ///
    /// Returns [`Error::Config`] if the address is not a valid URL; no request
    /// is made.
    pub fn new(config: &VaultClientConfig) -> Result<Self> {
        Self::with_http_client(config, Client::new())
    }

    /// Creates a new client sending requests with the given HTTP client.
    ///
    /// Timeouts, proxies, and TLS roots are configured on `client`.
    pub fn with_http_client(config: &VaultClientConfig, client: Client) -> Result<Self> {
        let mut base = Url::parse(&config.url).map_err(Error::Config)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client,
            base,
            token: config.token.clone(),
        })
    }

    /// Gets the base URL of the server.
    pub fn url(&self) -> &Url {
        &self.base
    }

    /// Builds a request for an API path, authenticated with the given token.
    fn request(&self, method: Method, path: &str, token: &str) -> Result<RequestBuilder> {
        let url = self
            .base
            .join(&format!("v1/{}", path.trim_matches('/')))
            .map_err(Error::Config)?;

        debug!(%method, path = url.path(), "sending secret store request");
        Ok(self
            .client
            .request(method, url)
            .header(TOKEN_HEADER, token))
    }

    /// Sends a request and returns its JSON body.
    ///
    /// An empty body (such as a `204` response) is returned as `null`.
    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let errors = serde_json::from_slice::<ErrorResponse>(&body)
                .unwrap_or_default()
                .errors;
            return Err(Error::Api {
                status: status.as_u16(),
                errors,
            });
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&body).map_err(Error::Decode)
    }
}

/// Gets a required string field of a response section.
fn string_field(section: &Value, name: &'static str) -> Result<String> {
    section
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(Error::MalformedSecret(name))
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn is_mounted(&self, path: &str) -> Result<bool> {
        let key = format!("{}/", path.trim_end_matches('/'));
        let mounts = self
            .send(self.request(Method::GET, "sys/mounts", self.token.expose_secret())?)
            .await?;

        // Newer servers nest the mount table under `data` as well
        Ok(mounts.get(&key).is_some()
            || mounts
                .get("data")
                .and_then(|d| d.get(&key))
                .is_some())
    }

    async fn mount(&self, path: &str, config: &MountConfig) -> Result<()> {
        let request = self.request(
            Method::POST,
            &format!("sys/mounts/{}", path.trim_matches('/')),
            self.token.expose_secret(),
        )?;
        match self.send(request.json(config)).await {
            Ok(_) => Ok(()),
            Err(Error::Api { errors, .. }) if errors.iter().any(|e| e.contains(PATH_IN_USE)) => {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_child_token(&self, request: &TokenRequest) -> Result<ChildToken> {
        let response = self
            .send(
                self.request(Method::POST, "auth/token/create", self.token.expose_secret())?
                    .json(request),
            )
            .await?;

        let response: TokenResponse = serde_json::from_value(response).map_err(Error::Decode)?;
        let auth = response.auth.ok_or(Error::MissingAuth)?;
        if auth.client_token.is_empty() {
            return Err(Error::EmptyToken);
        }

        Ok(ChildToken::new(auth.client_token))
    }

    async fn write_config(
        &self,
        path: &str,
        token: &ChildToken,
        secret: &ConfigSecret,
    ) -> Result<()> {
        let request = self.request(Method::POST, path, token.expose())?;
        self.send(request.json(secret)).await?;
        Ok(())
    }

    async fn read_config(&self, path: &str, token: &ChildToken) -> Result<ConfigSecret> {
        let response = self
            .send(self.request(Method::GET, path, token.expose())?)
            .await?;

        let data = response.get("data").unwrap_or(&Value::Null);
        ConfigSecret::from_base64(&string_field(data, "config")?)
    }

    async fn create_role(&self, mount: &str, role: &str, config: &RoleConfig) -> Result<()> {
        let request = self.request(
            Method::POST,
            &format!("{}/roles/{role}", mount.trim_matches('/')),
            self.token.expose_secret(),
        )?;
        self.send(request.json(config)).await?;
        Ok(())
    }

    async fn issue_cert(
        &self,
        mount: &str,
        role: &str,
        request: &IssueCertRequest,
    ) -> Result<IssuedCert> {
        let response = self
            .send(
                self.request(
                    Method::POST,
                    &format!("{}/issue/{role}", mount.trim_matches('/')),
                    self.token.expose_secret(),
                )?
                .json(request),
            )
            .await?;

        let data = response.get("data").unwrap_or(&Value::Null);
        Ok(IssuedCert {
            certificate: string_field(data, "certificate")?,
            private_key: string_field(data, "private_key")?.into(),
            issuing_ca: string_field(data, "issuing_ca")?,
        })
    }
}
