//! Request identity: credential verification, local user resolution and the
//! authentication gateway composing the two.
//!
//! The external identity provider is consumed through two seams,
//! [`CredentialVerifier`] and [`ProfileSource`], so that the gateway and
//! resolver can be exercised without network access.

pub mod config;
pub mod gateway;
pub mod profile;
pub mod resolver;
pub mod verifier;

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

pub use config::{IdentityConfig, IdentityMode};
pub use gateway::AuthGateway;
pub use profile::{HttpProfileSource, ProfileSource, ProviderProfile};
pub use resolver::IdentityResolver;
pub use verifier::{CredentialVerifier, IntrospectionVerifier, JwtVerifier};

/// Stable subject identifier issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalId(String);

impl ExternalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Credential verification failures. Logged distinctly, surfaced uniformly.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("missing credential")]
    MissingCredential,

    #[error("malformed credential: {0}")]
    Malformed(String),

    #[error("invalid credential: {0}")]
    Invalid(String),

    #[error("expired credential")]
    Expired,

    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("identity provider timed out after {0:?}")]
    Timeout(Duration),
}

/// Profile lookup failures.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("no provider profile for {0}")]
    NotFound(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// Failures while resolving or provisioning a local user.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("profile fetch failed: {0}")]
    Profile(#[from] ProfileError),

    #[error("user store failed: {0}")]
    Store(#[from] StoreError),

    #[error("identity sync timed out after {0:?}")]
    Timeout(Duration),
}

/// Why the gateway refused a request.
///
/// Callers only ever see "unauthorized"; [`AuthRejection::code`] is for logs.
#[derive(Debug, Error)]
pub enum AuthRejection {
    #[error("credential rejected: {0}")]
    Credential(#[from] VerifyError),

    #[error("identity could not be resolved: {0}")]
    Sync(#[from] SyncError),
}

impl AuthRejection {
    /// Machine-readable cause, for operators.
    pub fn code(&self) -> &'static str {
        match self {
            AuthRejection::Credential(VerifyError::MissingCredential) => "missing_credential",
            AuthRejection::Credential(VerifyError::Malformed(_)) => "malformed_credential",
            AuthRejection::Credential(VerifyError::Invalid(_)) => "invalid_credential",
            AuthRejection::Credential(VerifyError::Expired) => "expired_credential",
            AuthRejection::Credential(VerifyError::ProviderUnavailable(_))
            | AuthRejection::Credential(VerifyError::Timeout(_)) => "provider_unavailable",
            AuthRejection::Sync(SyncError::Profile(_)) => "profile_sync_failed",
            AuthRejection::Sync(SyncError::Store(_)) => "user_store_failed",
            AuthRejection::Sync(SyncError::Timeout(_)) => "identity_sync_timeout",
        }
    }

    /// Whether the cause is operational (provider or store) rather than a bad
    /// credential. Operational causes are logged at error level.
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            AuthRejection::Credential(VerifyError::ProviderUnavailable(_))
                | AuthRejection::Credential(VerifyError::Timeout(_))
                | AuthRejection::Sync(_)
        )
    }
}

/// Build the shared HTTP client used to talk to the identity provider.
pub fn provider_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
}


/// Local HTTP server standing in for the identity provider.
#[cfg(test)]
pub(crate) mod stub_provider {
    use axum::Router;
    use tokio::net::TcpListener;
    use url::Url;

    /// Serve `router` on an ephemeral loopback port and return its base URL.
    pub async fn serve(router: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }
}
