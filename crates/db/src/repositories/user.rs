//! User repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use tally_core::ledger::LedgerError;
use tally_shared::types::{CurrencyCode, UserId};
use uuid::Uuid;

use super::StoreError;
use crate::entities::users;

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    /// Unique email address.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Reference currency all balances are normalized into.
    pub reference_currency: CurrencyCode,
}

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including unique violations on
    /// the email address.
    pub async fn create(&self, input: CreateUserInput) -> Result<users::Model, StoreError> {
        let now = chrono::Utc::now().into();
        let user = users::ActiveModel {
            id: Set(UserId::new().into_inner()),
            email: Set(input.email),
            display_name: Set(input.display_name),
            reference_currency: Set(input.reference_currency.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(user.insert(&self.db).await?)
    }

    /// Fetches a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for unknown IDs.
    pub async fn get(&self, user_id: UserId) -> Result<users::Model, StoreError> {
        fetch_by_id(&self.db, user_id.into_inner()).await
    }

    /// Finds a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, StoreError> {
        let found = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(found)
    }
}

/// Fetches a user by ID on any connection.
pub(crate) async fn fetch_by_id<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<users::Model, StoreError> {
    users::Entity::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or_else(|| StoreError::Ledger(LedgerError::UserNotFound(user_id)))
}
