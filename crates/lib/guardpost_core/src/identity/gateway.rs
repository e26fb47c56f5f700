//! Authentication gateway: the mandatory entry gate for every operation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::verifier::bearer_token;
use super::{
    AuthRejection, CredentialVerifier, ExternalId, IdentityResolver, SyncError, VerifyError,
};
use crate::models::user::User;

/// Default bound on each provider-facing step.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Verifier then resolver, strictly in that order.
///
/// A verifier rejection short-circuits without touching the store. Both
/// steps are bounded by a timeout and fail closed.
#[derive(Clone)]
pub struct AuthGateway {
    verifier: Arc<dyn CredentialVerifier>,
    resolver: IdentityResolver,
    timeout: Duration,
}

impl AuthGateway {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, resolver: IdentityResolver) -> Self {
        Self {
            verifier,
            resolver,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Override the per-step timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Authenticate a request from its raw `Authorization` header value.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<User, AuthRejection> {
        let result = self.run(authorization).await;
        if let Err(rejection) = &result {
            log_rejection(rejection);
        }
        result
    }

    /// Authenticate and re-sync the caller's profile from the provider.
    ///
    /// Unlike [`AuthGateway::authenticate`] the provider is always consulted.
    pub async fn authenticate_and_refresh(
        &self,
        authorization: Option<&str>,
    ) -> Result<User, AuthRejection> {
        let result = self.run_refresh(authorization).await;
        if let Err(rejection) = &result {
            log_rejection(rejection);
        }
        result
    }

    async fn run(&self, authorization: Option<&str>) -> Result<User, AuthRejection> {
        let external_id = self.verify_inner(authorization).await?;

        let user = tokio::time::timeout(self.timeout, self.resolver.resolve(&external_id))
            .await
            .map_err(|_| SyncError::Timeout(self.timeout))??;

        debug!(user_id = %user.id, %external_id, "request authenticated");
        Ok(user)
    }

    async fn run_refresh(&self, authorization: Option<&str>) -> Result<User, AuthRejection> {
        let external_id = self.verify_inner(authorization).await?;
        let user = tokio::time::timeout(self.timeout, self.resolver.refresh(&external_id))
            .await
            .map_err(|_| SyncError::Timeout(self.timeout))??;
        Ok(user)
    }

    async fn verify_inner(&self, authorization: Option<&str>) -> Result<ExternalId, AuthRejection> {
        let token = bearer_token(authorization)?;
        let external_id = tokio::time::timeout(self.timeout, self.verifier.verify(token))
            .await
            .map_err(|_| VerifyError::Timeout(self.timeout))??;
        Ok(external_id)
    }
}

fn log_rejection(rejection: &AuthRejection) {
    let code = rejection.code();
    if rejection.is_operational() {
        error!(code, "authentication failed: {rejection}");
    } else {
        warn!(code, "authentication rejected: {rejection}");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::identity::{ProfileError, ProfileSource, ProviderProfile};
    use crate::store::MemoryStore;

    /// Token table: "good-<sub>" verifies as <sub>, "expired" is expired,
    /// "slow" never answers, anything else is invalid.
    struct TableVerifier {
        calls: AtomicU32,
    }

    #[async_trait]
    impl CredentialVerifier for TableVerifier {
        async fn verify(&self, credential: &str) -> Result<ExternalId, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match credential {
                "expired" => Err(VerifyError::Expired),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(VerifyError::Invalid("unreachable".into()))
                }
                other => other
                    .strip_prefix("good-")
                    .map(ExternalId::new)
                    .ok_or_else(|| VerifyError::Invalid("unknown token".into())),
            }
        }
    }

    /// Profiles exist only for subjects starting with "known".
    struct Profiles {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ProfileSource for Profiles {
        async fn fetch_profile(
            &self,
            external_id: &ExternalId,
        ) -> Result<ProviderProfile, ProfileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if external_id.as_str().starts_with("known") {
                Ok(ProviderProfile::default())
            } else {
                Err(ProfileError::NotFound(external_id.to_string()))
            }
        }
    }

    struct Fixture {
        gateway: AuthGateway,
        verifier: Arc<TableVerifier>,
        profiles: Arc<Profiles>,
        store: Arc<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let verifier = Arc::new(TableVerifier {
            calls: AtomicU32::new(0),
        });
        let profiles = Arc::new(Profiles {
            calls: AtomicU32::new(0),
        });
        let store = Arc::new(MemoryStore::new());
        let resolver = IdentityResolver::new(store.clone(), profiles.clone());
        let gateway = AuthGateway::new(verifier.clone(), resolver)
            .with_timeout(Duration::from_millis(50));
        Fixture {
            gateway,
            verifier,
            profiles,
            store,
        }
    }

    #[tokio::test]
    async fn valid_credential_resolves_user() {
        let f = fixture();
        let user = f
            .gateway
            .authenticate(Some("Bearer good-known_1"))
            .await
            .unwrap();
        assert_eq!(user.external_id, "known_1");
        assert_eq!(f.store.user_count().await, 1);
    }

    #[tokio::test]
    async fn missing_credential_never_calls_provider() {
        let f = fixture();
        let err = f.gateway.authenticate(None).await.unwrap_err();
        assert_eq!(err.code(), "missing_credential");
        assert_eq!(f.verifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.profiles.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_credential_short_circuits_resolver() {
        let f = fixture();
        let err = f
            .gateway
            .authenticate(Some("Bearer expired"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthRejection::Credential(VerifyError::Expired)));
        assert_eq!(f.profiles.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.store.user_count().await, 0);
    }

    #[tokio::test]
    async fn unprovisionable_identity_is_rejected() {
        let f = fixture();
        let err = f
            .gateway
            .authenticate(Some("Bearer good-stranger"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthRejection::Sync(SyncError::Profile(_))));
        assert_eq!(f.store.user_count().await, 0);
    }

    #[tokio::test]
    async fn slow_provider_fails_closed() {
        let f = fixture();
        let err = f
            .gateway
            .authenticate(Some("Bearer slow"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthRejection::Credential(VerifyError::Timeout(_))));
    }

    #[tokio::test]
    async fn refresh_always_consults_provider() {
        let f = fixture();
        f.gateway
            .authenticate(Some("Bearer good-known_2"))
            .await
            .unwrap();
        let user = f
            .gateway
            .authenticate_and_refresh(Some("Bearer good-known_2"))
            .await
            .unwrap();
        assert_eq!(user.external_id, "known_2");
        assert_eq!(f.profiles.calls.load(Ordering::SeqCst), 2);
        assert_eq!(f.store.user_count().await, 1);
    }

    #[tokio::test]
    async fn refresh_rejects_bad_credential() {
        let f = fixture();
        let err = f
            .gateway
            .authenticate_and_refresh(Some("Bearer nope"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_credential");
        assert_eq!(f.profiles.calls.load(Ordering::SeqCst), 0);
    }
}
