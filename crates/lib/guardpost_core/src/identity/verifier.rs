//! Bearer credential verification against the identity provider.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{ExternalId, VerifyError};

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively; an empty token is malformed.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, VerifyError> {
    let header = authorization.ok_or(VerifyError::MissingCredential)?;
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or_else(|| VerifyError::Malformed("invalid authorization header".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(VerifyError::Malformed(format!(
            "unsupported authorization scheme {scheme:?}"
        )));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(VerifyError::Malformed("empty bearer token".into()));
    }
    Ok(token)
}

/// Checks an opaque bearer credential, yielding the provider subject.
///
/// Implementations must not have side effects; verification is retryable.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<ExternalId, VerifyError>;
}

// ---------------------------------------------------------------------------
// Provider-issued session JWTs, verified locally
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
}

/// Verifies provider session JWTs with a shared secret or a public key.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// HS256 with a shared secret.
    pub fn hs256(secret: &[u8], issuer: Option<&str>) -> Self {
        Self::with_key(DecodingKey::from_secret(secret), Algorithm::HS256, issuer)
    }

    /// RS256 with a PEM-encoded public key.
    pub fn rs256_pem(pem: &[u8], issuer: Option<&str>) -> jsonwebtoken::errors::Result<Self> {
        let key = DecodingKey::from_rsa_pem(pem)?;
        Ok(Self::with_key(key, Algorithm::RS256, issuer))
    }

    fn with_key(key: DecodingKey, algorithm: Algorithm, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.validate_aud = false;
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }
        Self { key, validation }
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, credential: &str) -> Result<ExternalId, VerifyError> {
        let data = decode::<SessionClaims>(credential, &self.key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => VerifyError::Expired,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => VerifyError::Malformed(e.to_string()),
                _ => VerifyError::Invalid(e.to_string()),
            },
        )?;
        if data.claims.sub.is_empty() {
            return Err(VerifyError::Invalid("empty subject".into()));
        }
        Ok(ExternalId::new(data.claims.sub))
    }
}

// ---------------------------------------------------------------------------
// Token introspection over HTTP
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    active: bool,
    sub: Option<String>,
    exp: Option<i64>,
}

/// Verifies opaque tokens via the provider's introspection endpoint.
pub struct IntrospectionVerifier {
    client: Client,
    endpoint: Url,
    client_secret: Option<String>,
}

impl IntrospectionVerifier {
    pub fn new(client: Client, endpoint: Url, client_secret: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            client_secret,
        }
    }
}

#[async_trait]
impl CredentialVerifier for IntrospectionVerifier {
    async fn verify(&self, credential: &str) -> Result<ExternalId, VerifyError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .form(&[("token", credential), ("token_type_hint", "access_token")]);
        if let Some(secret) = &self.client_secret {
            request = request.bearer_auth(secret);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| VerifyError::ProviderUnavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(VerifyError::ProviderUnavailable(format!(
                "introspection returned {status}"
            )));
        }
        let body: IntrospectionResponse = resp.json().await.map_err(|e| {
            VerifyError::ProviderUnavailable(format!("introspection response parse error: {e}"))
        })?;

        if !body.active {
            debug!("introspection: token inactive");
            return Err(VerifyError::Invalid("token is not active".into()));
        }
        if let Some(exp) = body.exp
            && exp <= Utc::now().timestamp()
        {
            return Err(VerifyError::Expired);
        }
        match body.sub {
            Some(sub) if !sub.is_empty() => Ok(ExternalId::new(sub)),
            _ => Err(VerifyError::Invalid("introspection returned no subject".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::http::header::AUTHORIZATION;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;
    use serde_json::{Value, json};

    use super::*;
    use crate::identity::stub_provider;

    const SECRET: &[u8] = b"test-provider-secret";

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: i64,
        iss: &'a str,
    }

    fn mint(sub: &str, exp_offset: Duration, iss: &str) -> String {
        let claims = Claims {
            sub,
            exp: (Utc::now() + exp_offset).timestamp(),
            iss,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[test]
    fn bearer_token_requires_header() {
        assert!(matches!(bearer_token(None), Err(VerifyError::MissingCredential)));
    }

    #[test]
    fn bearer_token_rejects_other_schemes() {
        assert!(matches!(
            bearer_token(Some("Basic dXNlcjpwYXNz")),
            Err(VerifyError::Malformed(_))
        ));
        assert!(matches!(bearer_token(Some("Bearer")), Err(VerifyError::Malformed(_))));
        assert!(matches!(bearer_token(Some("Bearer   ")), Err(VerifyError::Malformed(_))));
    }

    #[test]
    fn bearer_token_extracts_token() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(Some("bearer abc")).unwrap(), "abc");
    }

    #[tokio::test]
    async fn jwt_verifier_accepts_valid_token() {
        let verifier = JwtVerifier::hs256(SECRET, Some("https://idp.test"));
        let token = mint("user_2abc", Duration::minutes(5), "https://idp.test");
        let id = verifier.verify(&token).await.unwrap();
        assert_eq!(id.as_str(), "user_2abc");
    }

    #[tokio::test]
    async fn jwt_verifier_rejects_expired_token() {
        let verifier = JwtVerifier::hs256(SECRET, None);
        let token = mint("user_2abc", Duration::minutes(-10), "https://idp.test");
        assert!(matches!(
            verifier.verify(&token).await,
            Err(VerifyError::Expired)
        ));
    }

    #[tokio::test]
    async fn jwt_verifier_rejects_wrong_issuer_and_key() {
        let verifier = JwtVerifier::hs256(SECRET, Some("https://idp.test"));
        let token = mint("user_2abc", Duration::minutes(5), "https://evil.test");
        assert!(matches!(
            verifier.verify(&token).await,
            Err(VerifyError::Invalid(_))
        ));

        let other = JwtVerifier::hs256(b"another-secret", None);
        let token = mint("user_2abc", Duration::minutes(5), "https://idp.test");
        assert!(matches!(
            other.verify(&token).await,
            Err(VerifyError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn jwt_verifier_rejects_garbage() {
        let verifier = JwtVerifier::hs256(SECRET, None);
        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(VerifyError::Malformed(_))
        ));
    }

    /// Introspection endpoint that always answers with `status` and `body`.
    async fn introspection(status: StatusCode, body: Value) -> IntrospectionVerifier {
        let router = Router::new().route(
            "/introspect",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let base = stub_provider::serve(router).await;
        IntrospectionVerifier::new(Client::new(), base.join("introspect").unwrap(), None)
    }

    #[tokio::test]
    async fn introspection_forwards_token_and_secret() {
        let router = Router::new().route(
            "/introspect",
            post(
                |headers: HeaderMap, Form(form): Form<HashMap<String, String>>| async move {
                    let authorized = headers
                        .get(AUTHORIZATION)
                        .is_some_and(|v| v.as_bytes() == b"Bearer sk_test");
                    let known = form.get("token").map(String::as_str) == Some("opaque-1");
                    Json(json!({ "active": authorized && known, "sub": "user_9" }))
                },
            ),
        );
        let base = stub_provider::serve(router).await;
        let verifier = IntrospectionVerifier::new(
            Client::new(),
            base.join("introspect").unwrap(),
            Some("sk_test".into()),
        );

        assert_eq!(verifier.verify("opaque-1").await.unwrap().as_str(), "user_9");
        assert!(matches!(
            verifier.verify("opaque-2").await,
            Err(VerifyError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn introspection_inactive_token_is_invalid() {
        let verifier = introspection(StatusCode::OK, json!({ "active": false })).await;
        assert!(matches!(
            verifier.verify("opaque").await,
            Err(VerifyError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn introspection_past_exp_is_expired() {
        let exp = (Utc::now() - Duration::minutes(1)).timestamp();
        let verifier = introspection(
            StatusCode::OK,
            json!({ "active": true, "sub": "user_1", "exp": exp }),
        )
        .await;
        assert!(matches!(
            verifier.verify("opaque").await,
            Err(VerifyError::Expired)
        ));
    }

    #[tokio::test]
    async fn introspection_without_subject_is_invalid() {
        let verifier = introspection(StatusCode::OK, json!({ "active": true, "sub": "" })).await;
        assert!(matches!(
            verifier.verify("opaque").await,
            Err(VerifyError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn introspection_error_status_is_provider_unavailable() {
        for status in [StatusCode::INTERNAL_SERVER_ERROR, StatusCode::UNAUTHORIZED] {
            let verifier = introspection(status, json!({ "active": true, "sub": "user_1" })).await;
            assert!(
                matches!(
                    verifier.verify("opaque").await,
                    Err(VerifyError::ProviderUnavailable(_))
                ),
                "{status}"
            );
        }
    }

    #[tokio::test]
    async fn introspection_unparseable_body_is_provider_unavailable() {
        let verifier = introspection(StatusCode::OK, json!(["not", "an", "object"])).await;
        assert!(matches!(
            verifier.verify("opaque").await,
            Err(VerifyError::ProviderUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn introspection_unreachable_is_provider_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let endpoint = Url::parse(&format!("http://{addr}/introspect")).unwrap();
        let verifier = IntrospectionVerifier::new(Client::new(), endpoint, None);
        assert!(matches!(
            verifier.verify("opaque").await,
            Err(VerifyError::ProviderUnavailable(_))
        ));
    }
}
