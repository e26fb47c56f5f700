//! Maps external identities to local users, provisioning on first sighting.

use std::sync::Arc;

use tracing::{debug, info};

use super::{ExternalId, ProfileSource, SyncError};
use crate::models::user::{NewUser, User};
use crate::store::UserStore;

/// Resolves an external identity to its local [`User`].
///
/// The only writer of user rows. Provisioning goes through the store's atomic
/// find-or-create, so concurrent first requests from one new identity end up
/// with a single row. The provider is consulted before any store write.
#[derive(Clone)]
pub struct IdentityResolver {
    users: Arc<dyn UserStore>,
    profiles: Arc<dyn ProfileSource>,
}

impl IdentityResolver {
    pub fn new(users: Arc<dyn UserStore>, profiles: Arc<dyn ProfileSource>) -> Self {
        Self { users, profiles }
    }

    /// Return the local user for `external_id`, provisioning it if absent.
    pub async fn resolve(&self, external_id: &ExternalId) -> Result<User, SyncError> {
        if let Some(user) = self
            .users
            .find_user_by_external_id(external_id.as_str())
            .await?
        {
            return Ok(user);
        }

        debug!(%external_id, "user not found locally, provisioning from identity provider");
        let fetched = self.profiles.fetch_profile(external_id).await?;
        let new_user = NewUser {
            external_id: external_id.as_str().to_string(),
            profile: fetched.profile,
            role: fetched.role.unwrap_or_default(),
        };
        let user = self.users.insert_user_if_absent(&new_user).await?;
        info!(%external_id, user_id = %user.id, role = %user.role, "user provisioned");
        Ok(user)
    }

    /// Re-sync profile fields from the provider, creating the user if needed.
    ///
    /// Never changes the role of an existing user.
    pub async fn refresh(&self, external_id: &ExternalId) -> Result<User, SyncError> {
        let fetched = self.profiles.fetch_profile(external_id).await?;
        let user = self
            .users
            .upsert_user_profile(
                external_id.as_str(),
                &fetched.profile,
                fetched.role.unwrap_or_default(),
            )
            .await?;
        info!(%external_id, user_id = %user.id, "user profile refreshed");
        Ok(user)
    }
}
