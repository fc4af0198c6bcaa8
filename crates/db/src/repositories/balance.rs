//! Balance entry store.
//!
//! Persists the per-account daily cumulative series that `tally-core`'s
//! `BalanceTimeline` models in memory. Writes happen only inside the ledger
//! and transfer transactions, under the account's `FOR UPDATE` lock, so the
//! series never drifts from the transaction rows it summarizes.

use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tally_core::ledger::{BalanceDelta, BalancePoint, BalanceTimeline, LedgerError};
use tally_shared::types::{AccountId, BalanceEntryId, UserId};
use uuid::Uuid;

use super::{account, StoreError};
use crate::entities::{balance_entries, transactions};

/// Balance repository for read queries and rebuilds.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    db: DatabaseConnection,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// End-of-day balance for an account on `date`, in reference-currency
    /// minor units. Days before the first entry report the opening balance.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for missing or foreign accounts.
    pub async fn balance_as_of(
        &self,
        user_id: UserId,
        account_id: AccountId,
        date: NaiveDate,
    ) -> Result<i64, StoreError> {
        let account =
            account::fetch_owned(&self.db, user_id.into_inner(), account_id.into_inner()).await?;
        Ok(as_of(
            &self.db,
            account.id,
            account.ref_initial_balance,
            date,
        )
        .await?)
    }

    /// Current balance for an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for missing or foreign accounts.
    pub async fn current(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<i64, StoreError> {
        let account =
            account::fetch_owned(&self.db, user_id.into_inner(), account_id.into_inner()).await?;
        Ok(current(&self.db, account.id, account.ref_initial_balance).await?)
    }

    /// Daily balance points between `from` and `to` inclusive. Only days
    /// with recorded activity appear.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for missing or foreign accounts.
    pub async fn history(
        &self,
        user_id: UserId,
        account_id: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BalancePoint>, StoreError> {
        let account =
            account::fetch_owned(&self.db, user_id.into_inner(), account_id.into_inner()).await?;

        let entries = balance_entries::Entity::find()
            .filter(balance_entries::Column::AccountId.eq(account.id))
            .filter(balance_entries::Column::EntryDate.gte(from))
            .filter(balance_entries::Column::EntryDate.lte(to))
            .order_by_asc(balance_entries::Column::EntryDate)
            .all(&self.db)
            .await?;

        Ok(entries
            .into_iter()
            .map(|entry| BalancePoint {
                date: entry.entry_date,
                cumulative: entry.cumulative,
            })
            .collect())
    }

    /// Rebuilds the full balance series for an account from its transaction
    /// rows, replacing whatever entries exist.
    ///
    /// Recovery path. The incremental path inside ledger mutations keeps the
    /// series consistent on its own; this exists to repair external damage
    /// and to let integrity checks compare stored against derived.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for missing or foreign accounts.
    pub async fn rebuild(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<usize, StoreError> {
        self.rebuild_from(user_id, account_id, NaiveDate::MIN).await
    }

    /// Rebuilds the balance series from `from` onward: entries before the
    /// cutoff are kept as the seed, entries on or after it are dropped and
    /// replayed from the transaction rows dated on or after `from`.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for missing or foreign accounts.
    pub async fn rebuild_from(
        &self,
        user_id: UserId,
        account_id: AccountId,
        from: NaiveDate,
    ) -> Result<usize, StoreError> {
        let txn = self.db.begin().await?;

        let account =
            account::fetch_owned_locked(&txn, user_id.into_inner(), account_id.into_inner())
                .await?;

        let kept = balance_entries::Entity::find()
            .filter(balance_entries::Column::AccountId.eq(account.id))
            .filter(balance_entries::Column::EntryDate.lt(from))
            .all(&txn)
            .await?;
        let mut timeline = BalanceTimeline::from_entries(
            account.ref_initial_balance,
            kept.into_iter()
                .map(|entry| (entry.entry_date, entry.cumulative)),
        );

        let rows = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account.id))
            .filter(transactions::Column::OccurredOn.gte(from))
            .all(&txn)
            .await?;
        timeline.rebuild_from(
            from,
            rows.into_iter().map(|row| (row.occurred_on, row.ref_amount)),
        );

        balance_entries::Entity::delete_many()
            .filter(balance_entries::Column::AccountId.eq(account.id))
            .filter(balance_entries::Column::EntryDate.gte(from))
            .exec(&txn)
            .await?;

        let now = chrono::Utc::now().into();
        let mut inserted = 0;
        for point in timeline.points().filter(|point| point.date >= from) {
            let entry = balance_entries::ActiveModel {
                id: Set(BalanceEntryId::new().into_inner()),
                account_id: Set(account.id),
                entry_date: Set(point.date),
                cumulative: Set(point.cumulative),
                updated_at: Set(now),
            };
            entry.insert(&txn).await?;
            inserted += 1;
        }

        txn.commit().await?;
        tracing::info!(account_id = %account_id, entries = inserted, "rebuilt balance series");
        Ok(inserted)
    }
}

/// End-of-day cumulative balance on `date` for any connection.
pub(crate) async fn as_of<C: ConnectionTrait>(
    conn: &C,
    account_id: Uuid,
    ref_initial: i64,
    date: NaiveDate,
) -> Result<i64, sea_orm::DbErr> {
    let found = balance_entries::Entity::find()
        .filter(balance_entries::Column::AccountId.eq(account_id))
        .filter(balance_entries::Column::EntryDate.lte(date))
        .order_by_desc(balance_entries::Column::EntryDate)
        .one(conn)
        .await?;
    Ok(found.map_or(ref_initial, |entry| entry.cumulative))
}

/// Current cumulative balance for any connection.
pub(crate) async fn current<C: ConnectionTrait>(
    conn: &C,
    account_id: Uuid,
    ref_initial: i64,
) -> Result<i64, sea_orm::DbErr> {
    let found = balance_entries::Entity::find()
        .filter(balance_entries::Column::AccountId.eq(account_id))
        .order_by_desc(balance_entries::Column::EntryDate)
        .one(conn)
        .await?;
    Ok(found.map_or(ref_initial, |entry| entry.cumulative))
}

/// Applies one balance delta to the stored series: adjust or insert the
/// entry on the delta's date, then shift every later entry by the same
/// amount.
///
/// Must run inside the transaction that mutates the transaction rows, with
/// the account row already locked.
pub(crate) async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    ref_initial: i64,
    delta: BalanceDelta,
) -> Result<(), StoreError> {
    if delta.ref_amount == 0 {
        return Ok(());
    }
    let account_id = delta.account_id.into_inner();
    let now = chrono::Utc::now().into();

    let existing = balance_entries::Entity::find()
        .filter(balance_entries::Column::AccountId.eq(account_id))
        .filter(balance_entries::Column::EntryDate.eq(delta.date))
        .one(conn)
        .await?;

    if let Some(entry) = existing {
        let cumulative = entry
            .cumulative
            .checked_add(delta.ref_amount)
            .ok_or(LedgerError::AmountOverflow)?;
        let mut active: balance_entries::ActiveModel = entry.into();
        active.cumulative = Set(cumulative);
        active.updated_at = Set(now);
        active.update(conn).await?;
    } else {
        let seed = as_of(conn, account_id, ref_initial, delta.date).await?;
        let cumulative = seed
            .checked_add(delta.ref_amount)
            .ok_or(LedgerError::AmountOverflow)?;
        let entry = balance_entries::ActiveModel {
            id: Set(BalanceEntryId::new().into_inner()),
            account_id: Set(account_id),
            entry_date: Set(delta.date),
            cumulative: Set(cumulative),
            updated_at: Set(now),
        };
        entry.insert(conn).await?;
    }

    // Ripple the delta through every later day in one statement.
    balance_entries::Entity::update_many()
        .col_expr(
            balance_entries::Column::Cumulative,
            Expr::col(balance_entries::Column::Cumulative).add(delta.ref_amount),
        )
        .col_expr(balance_entries::Column::UpdatedAt, Expr::value(now))
        .filter(balance_entries::Column::AccountId.eq(account_id))
        .filter(balance_entries::Column::EntryDate.gt(delta.date))
        .exec(conn)
        .await?;

    Ok(())
}
