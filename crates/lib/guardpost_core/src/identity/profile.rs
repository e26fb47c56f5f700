//! Profile lookups against the identity provider's user API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::warn;
use url::Url;

use super::{ExternalId, ProfileError};
use crate::models::user::{Role, UserProfile};

/// Provider-supplied profile for one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderProfile {
    pub profile: UserProfile,
    /// Role named in provider metadata, if any and if recognised.
    pub role: Option<Role>,
}

/// Source of provider profile data used during provisioning sync.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, external_id: &ExternalId)
    -> Result<ProviderProfile, ProfileError>;
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct PhoneNumber {
    phone_number: String,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetadata {
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    phone_numbers: Vec<PhoneNumber>,
    first_name: Option<String>,
    last_name: Option<String>,
    username: Option<String>,
    #[serde(default)]
    public_metadata: PublicMetadata,
}

impl From<ProviderUser> for ProviderProfile {
    fn from(user: ProviderUser) -> Self {
        let role = user.public_metadata.role.as_deref().and_then(|raw| {
            raw.parse::<Role>()
                .map_err(|e| warn!(external_id = %user.id, "ignoring provider role: {e}"))
                .ok()
        });
        ProviderProfile {
            profile: UserProfile {
                email: user.email_addresses.into_iter().next().map(|e| e.email_address),
                first_name: user.first_name,
                last_name: user.last_name,
                username: user.username,
                phone_number: user.phone_numbers.into_iter().next().map(|p| p.phone_number),
            },
            role,
        }
    }
}

/// Fetches `GET {api_base}/users/{external_id}` authenticated with the
/// provider secret key.
pub struct HttpProfileSource {
    client: Client,
    api_base: Url,
    secret_key: String,
}

impl HttpProfileSource {
    pub fn new(client: Client, api_base: Url, secret_key: String) -> Self {
        Self {
            client,
            api_base,
            secret_key,
        }
    }

    fn user_url(&self, external_id: &ExternalId) -> Result<Url, ProfileError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| ProfileError::InvalidResponse("provider API URL cannot be a base".into()))?
            .pop_if_empty()
            .push("users")
            .push(external_id.as_str());
        Ok(url)
    }
}

#[async_trait]
impl ProfileSource for HttpProfileSource {
    async fn fetch_profile(
        &self,
        external_id: &ExternalId,
    ) -> Result<ProviderProfile, ProfileError> {
        let url = self.user_url(external_id)?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| ProfileError::Unavailable(e.to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(ProfileError::NotFound(external_id.to_string())),
            status if !status.is_success() => {
                return Err(ProfileError::Unavailable(format!(
                    "user lookup returned {status}"
                )));
            }
            _ => {}
        }

        let user: ProviderUser = resp
            .json()
            .await
            .map_err(|e| ProfileError::InvalidResponse(e.to_string()))?;
        if user.id != external_id.as_str() {
            return Err(ProfileError::InvalidResponse(format!(
                "asked for {external_id}, provider answered with {}",
                user.id
            )));
        }
        Ok(user.into())
    }
}
