//! Identity service
//!
//! Resolves provider identities to local users, creating them on first sight.

use std::sync::Arc;

use crate::data::{Database, EntityId, NewUser, Provider, User};
use crate::error::AppError;
use crate::metrics::USERS_CREATED_TOTAL;

/// Identity service
#[derive(Clone)]
pub struct IdentityService {
    db: Arc<Database>,
}

impl IdentityService {
    /// Create new identity service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Find the user for a provider identity, creating it if absent.
    ///
    /// An existing user is returned unchanged: `access_token` and
    /// `avatar_url` keep the values captured on the first login.
    ///
    /// # Errors
    /// `Validation` for an empty `provider_user_id`; store errors propagate.
    pub async fn resolve(
        &self,
        provider: Provider,
        provider_user_id: &str,
        access_token: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<User, AppError> {
        if provider_user_id.trim().is_empty() {
            return Err(AppError::Validation(
                "provider_user_id cannot be empty".to_string(),
            ));
        }

        if let Some(user) = self
            .db
            .find_user_by_provider(provider, provider_user_id)
            .await?
        {
            return Ok(user);
        }

        let id = EntityId::new().0;
        let new_user = NewUser {
            provider,
            provider_user_id: provider_user_id.to_string(),
            access_token,
            avatar_url,
        };

        if self.db.insert_user_if_absent(&id, &new_user).await? {
            USERS_CREATED_TOTAL
                .with_label_values(&[provider.as_str()])
                .inc();
            tracing::info!(
                user_id = %id,
                provider = %provider,
                provider_user_id = %provider_user_id,
                "User created"
            );
            // Return the stored row
            return self.db.get_user_by_id(&id).await?.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("user {id} vanished after insert"))
            });
        }

        // Lost the race to a concurrent first login for the same identity
        tracing::debug!(provider = %provider, "Identity inserted concurrently; re-reading");
        self.db
            .find_user_by_provider(provider, provider_user_id)
            .await?
            .ok_or(AppError::IdentityNotFound)
    }

    /// Get a user by local ID
    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        self.db.get_user_by_id(id).await
    }
}
