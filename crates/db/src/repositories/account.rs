//! Account repository.

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tally_core::ledger::{AccountSnapshot, LedgerError, LedgerService};
use tally_shared::types::{AccountId, CurrencyCode, UserId};
use uuid::Uuid;

use super::{exchange_rate, user, StoreError};
use crate::entities::{accounts, balance_entries};

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Owning user.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Native currency of the account.
    pub currency: CurrencyCode,
    /// Opening balance in native minor units.
    pub initial_balance: i64,
    /// Date the opening balance is valued at.
    pub opened_on: NaiveDate,
}

/// An account paired with its current reference-currency balance.
#[derive(Debug, Clone)]
pub struct AccountWithBalance {
    /// The account row.
    pub account: accounts::Model,
    /// Current balance in reference-currency minor units.
    pub current_balance: i64,
}

/// Account repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account, normalizing the opening balance into the user's
    /// reference currency at `opened_on`.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound`, `ExchangeRateMissing`, or a database error.
    pub async fn create(&self, input: CreateAccountInput) -> Result<accounts::Model, StoreError> {
        let txn = self.db.begin().await?;

        let owner = user::fetch_by_id(&txn, input.user_id.into_inner()).await?;
        let reference = parse_currency(&owner.reference_currency)?;

        let rate = exchange_rate::find_rate_on(
            &txn,
            &input.currency,
            &reference,
            input.opened_on,
        )
        .await?;
        let ref_initial = LedgerService::normalize(
            input.initial_balance,
            &input.currency,
            &reference,
            input.opened_on,
            |_, _, _| rate,
        )?;

        let now = chrono::Utc::now().into();
        let account = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            user_id: Set(input.user_id.into_inner()),
            name: Set(input.name),
            currency: Set(input.currency.to_string()),
            is_enabled: Set(true),
            initial_balance: Set(input.initial_balance),
            ref_initial_balance: Set(ref_initial),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = account.insert(&txn).await?;

        txn.commit().await?;
        Ok(model)
    }

    /// Fetches an account owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for missing or foreign accounts.
    pub async fn get(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<accounts::Model, StoreError> {
        fetch_owned(&self.db, user_id.into_inner(), account_id.into_inner()).await
    }

    /// Lists the user's accounts with their current balances.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn list_with_balances(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AccountWithBalance>, StoreError> {
        let accounts = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id.into_inner()))
            .order_by_asc(accounts::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut result = Vec::with_capacity(accounts.len());
        for account in accounts {
            let latest = balance_entries::Entity::find()
                .filter(balance_entries::Column::AccountId.eq(account.id))
                .order_by_desc(balance_entries::Column::EntryDate)
                .one(&self.db)
                .await?;
            let current_balance =
                latest.map_or(account.ref_initial_balance, |entry| entry.cumulative);
            result.push(AccountWithBalance {
                account,
                current_balance,
            });
        }
        Ok(result)
    }

    /// Enables or disables an account. Disabling keeps history intact and
    /// only blocks new postings.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for missing or foreign accounts.
    pub async fn set_enabled(
        &self,
        user_id: UserId,
        account_id: AccountId,
        enabled: bool,
    ) -> Result<accounts::Model, StoreError> {
        let account =
            fetch_owned(&self.db, user_id.into_inner(), account_id.into_inner()).await?;

        let mut active: accounts::ActiveModel = account.into();
        active.is_enabled = Set(enabled);
        active.updated_at = Set(chrono::Utc::now().into());
        Ok(active.update(&self.db).await?)
    }
}

/// Builds a domain snapshot from an account row.
pub(crate) fn snapshot_of(model: &accounts::Model) -> Result<AccountSnapshot, StoreError> {
    Ok(AccountSnapshot {
        id: AccountId::from_uuid(model.id),
        user_id: UserId::from_uuid(model.user_id),
        currency: parse_currency(&model.currency)?,
        is_enabled: model.is_enabled,
        ref_initial_balance: model.ref_initial_balance,
    })
}

/// Parses a stored currency code; the schema guarantees validity, so a
/// failure here means corrupted data.
pub(crate) fn parse_currency(code: &str) -> Result<CurrencyCode, StoreError> {
    CurrencyCode::parse(code)
        .map_err(|err| StoreError::Ledger(LedgerError::Internal(err.to_string())))
}

/// Fetches an account owned by `user_id` without locking.
pub(crate) async fn fetch_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    account_id: Uuid,
) -> Result<accounts::Model, StoreError> {
    accounts::Entity::find_by_id(account_id)
        .filter(accounts::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| StoreError::Ledger(LedgerError::AccountNotFound(account_id)))
}

/// Fetches an account owned by `user_id` with a `FOR UPDATE` row lock.
///
/// Callers touching multiple accounts must lock in ascending account ID
/// order to avoid deadlocks.
pub(crate) async fn fetch_owned_locked<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    account_id: Uuid,
) -> Result<accounts::Model, StoreError> {
    accounts::Entity::find_by_id(account_id)
        .filter(accounts::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| StoreError::Ledger(LedgerError::AccountNotFound(account_id)))
}
