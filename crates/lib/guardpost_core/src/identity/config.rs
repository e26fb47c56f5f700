//! Identity-provider configuration.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use super::gateway::DEFAULT_PROVIDER_TIMEOUT;
use super::{
    CredentialVerifier, HttpProfileSource, IntrospectionVerifier, JwtVerifier, ProfileSource,
    provider_http_client,
};

/// How bearer credentials are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityMode {
    /// Verify provider session JWTs locally.
    #[default]
    Jwt,
    /// Ask the provider's introspection endpoint.
    Introspection,
}

impl FromStr for IdentityMode {
    type Err = IdentityConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jwt" => Ok(IdentityMode::Jwt),
            "introspection" => Ok(IdentityMode::Introspection),
            other => Err(IdentityConfigError::Invalid(format!(
                "IDP_MODE must be 'jwt' or 'introspection', got {other:?}"
            ))),
        }
    }
}

/// Identity configuration errors.
#[derive(Debug, Error)]
pub enum IdentityConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for talking to the external identity provider.
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    pub mode: IdentityMode,
    /// HS256 shared secret for session JWTs.
    pub jwt_secret: Option<String>,
    /// RS256 public key (PEM) for session JWTs. Takes precedence over the secret.
    pub jwt_public_key_pem: Option<String>,
    /// Expected `iss` claim.
    pub issuer: Option<String>,
    /// Token introspection endpoint.
    pub introspection_url: Option<String>,
    /// Base URL of the provider's user API.
    pub api_url: Option<String>,
    /// Provider secret key used for backend calls.
    pub secret_key: Option<String>,
    /// Bound on each provider call.
    pub timeout: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            mode: IdentityMode::default(),
            jwt_secret: None,
            jwt_public_key_pem: None,
            issuer: None,
            introspection_url: None,
            api_url: None,
            secret_key: None,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl IdentityConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                 | Default |
    /// |--------------------------|---------|
    /// | `IDP_MODE`               | `jwt`   |
    /// | `IDP_JWT_SECRET`         | unset   |
    /// | `IDP_JWT_PUBLIC_KEY_PEM` | unset   |
    /// | `IDP_ISSUER`             | unset   |
    /// | `IDP_INTROSPECTION_URL`  | unset   |
    /// | `IDP_API_URL`            | unset   |
    /// | `IDP_SECRET_KEY`         | unset   |
    /// | `IDP_TIMEOUT_MS`         | `5000`  |
    pub fn from_env() -> Result<Self, IdentityConfigError> {
        let mode = match env_opt("IDP_MODE") {
            Some(raw) => raw.parse()?,
            None => IdentityMode::default(),
        };
        let timeout = match env_opt("IDP_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(raw.trim().parse().map_err(|_| {
                IdentityConfigError::Invalid(format!("IDP_TIMEOUT_MS is not a number: {raw:?}"))
            })?),
            None => DEFAULT_PROVIDER_TIMEOUT,
        };
        Ok(Self {
            mode,
            jwt_secret: env_opt("IDP_JWT_SECRET"),
            jwt_public_key_pem: env_opt("IDP_JWT_PUBLIC_KEY_PEM"),
            issuer: env_opt("IDP_ISSUER"),
            introspection_url: env_opt("IDP_INTROSPECTION_URL"),
            api_url: env_opt("IDP_API_URL"),
            secret_key: env_opt("IDP_SECRET_KEY"),
            timeout,
        })
    }

    fn http_client(&self) -> Result<reqwest::Client, IdentityConfigError> {
        provider_http_client(self.timeout)
            .map_err(|e| IdentityConfigError::Invalid(format!("HTTP client: {e}")))
    }

    /// Build the credential verifier for the configured mode.
    pub fn build_verifier(&self) -> Result<Arc<dyn CredentialVerifier>, IdentityConfigError> {
        match self.mode {
            IdentityMode::Jwt => {
                let issuer = self.issuer.as_deref();
                if let Some(pem) = &self.jwt_public_key_pem {
                    let verifier = JwtVerifier::rs256_pem(pem.as_bytes(), issuer).map_err(|e| {
                        IdentityConfigError::Invalid(format!("IDP_JWT_PUBLIC_KEY_PEM: {e}"))
                    })?;
                    return Ok(Arc::new(verifier));
                }
                let secret = self
                    .jwt_secret
                    .as_deref()
                    .ok_or(IdentityConfigError::Missing(
                        "IDP_JWT_SECRET or IDP_JWT_PUBLIC_KEY_PEM",
                    ))?;
                Ok(Arc::new(JwtVerifier::hs256(secret.as_bytes(), issuer)))
            }
            IdentityMode::Introspection => {
                let raw = self
                    .introspection_url
                    .as_deref()
                    .ok_or(IdentityConfigError::Missing("IDP_INTROSPECTION_URL"))?;
                let endpoint = parse_url("IDP_INTROSPECTION_URL", raw)?;
                Ok(Arc::new(IntrospectionVerifier::new(
                    self.http_client()?,
                    endpoint,
                    self.secret_key.clone(),
                )))
            }
        }
    }

    /// Build the profile source used for provisioning sync.
    pub fn build_profile_source(&self) -> Result<Arc<dyn ProfileSource>, IdentityConfigError> {
        let raw = self
            .api_url
            .as_deref()
            .ok_or(IdentityConfigError::Missing("IDP_API_URL"))?;
        let api_base = parse_url("IDP_API_URL", raw)?;
        let secret_key = self
            .secret_key
            .clone()
            .ok_or(IdentityConfigError::Missing("IDP_SECRET_KEY"))?;
        Ok(Arc::new(HttpProfileSource::new(
            self.http_client()?,
            api_base,
            secret_key,
        )))
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url, IdentityConfigError> {
    Url::parse(raw).map_err(|e| IdentityConfigError::Invalid(format!("{name}: {e}")))
}
