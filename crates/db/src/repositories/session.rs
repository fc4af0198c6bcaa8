//! Session repository.
//!
//! Sessions carry an opaque bearer token. Only the SHA-256 hash is stored;
//! the plaintext token exists once, in the create response.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use sha2::{Digest, Sha256};
use tally_shared::types::{SessionId, UserId};

use super::StoreError;
use crate::entities::sessions;

/// A freshly created session with its one-time plaintext token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// The stored session row.
    pub session: sessions::Model,
    /// The bearer token to hand to the client. Never stored.
    pub token: String,
}

/// Session repository for token issuance and lookup.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    /// Creates a new session repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Hashes a bearer token for storage and lookup.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Generates a random URL-safe bearer token.
    #[must_use]
    pub fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        base64_url::encode(&bytes)
    }

    /// Issues a session for `user_id` valid for `ttl_hours`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        ttl_hours: i64,
    ) -> Result<IssuedSession, StoreError> {
        let token = Self::generate_token();
        let now = Utc::now();

        let session = sessions::ActiveModel {
            id: Set(SessionId::new().into_inner()),
            user_id: Set(user_id.into_inner()),
            token_hash: Set(Self::hash_token(&token)),
            expires_at: Set((now + Duration::hours(ttl_hours)).into()),
            revoked_at: Set(None),
            created_at: Set(now.into()),
        };
        let model = session.insert(&self.db).await?;

        Ok(IssuedSession {
            session: model,
            token,
        })
    }

    /// Finds the live session for a bearer token, if any.
    ///
    /// Expired and revoked sessions are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_valid(&self, token: &str) -> Result<Option<sessions::Model>, StoreError> {
        let token_hash = Self::hash_token(token);
        let now: DateTime<Utc> = Utc::now();

        let found = sessions::Entity::find()
            .filter(sessions::Column::TokenHash.eq(token_hash))
            .filter(sessions::Column::RevokedAt.is_null())
            .filter(sessions::Column::ExpiresAt.gt(now))
            .one(&self.db)
            .await?;
        Ok(found)
    }

    /// Revokes the session for a bearer token. A miss is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        if let Some(session) = self.find_valid(token).await? {
            let mut active: sessions::ActiveModel = session.into();
            active.revoked_at = Set(Some(Utc::now().into()));
            active.update(&self.db).await?;
        }
        Ok(())
    }
}
