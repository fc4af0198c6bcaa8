//! Transaction repository: the guarded write path for plain transactions.
//!
//! Every mutation runs as one database transaction: lock the touched
//! account rows `FOR UPDATE` in ascending ID order, resolve the change
//! through `tally-core`, persist the row, and apply the balance deltas.
//! Either everything commits or nothing does, so the balance series and the
//! transaction rows cannot diverge.
//!
//! Serialization failures and deadlocks roll the whole transaction back and
//! retry up to the configured bound before surfacing a conflict.

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tally_core::ledger::validation::guard_plain_mutation;
use tally_core::ledger::{
    BalanceDelta, CreateTransactionInput, LedgerError, LedgerService, ResolvedTransaction,
    TransactionChanges, TransactionRecord,
};
use tally_core::transfer::lock_order;
use tally_shared::types::{AccountId, TransactionId, UserId};

use super::{account, balance, exchange_rate, refund, user, StoreError};
use crate::entities::transactions;

/// Filter for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Restrict to one account.
    pub account_id: Option<AccountId>,
    /// Earliest ledger date, inclusive.
    pub from: Option<NaiveDate>,
    /// Latest ledger date, inclusive.
    pub to: Option<NaiveDate>,
}

/// Transaction repository for plain (non-transfer) ledger operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
    conflict_retries: u32,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, conflict_retries: u32) -> Self {
        Self {
            db,
            conflict_retries,
        }
    }

    /// Creates a plain transaction and applies its balance effect.
    ///
    /// # Errors
    ///
    /// Returns validation errors from the domain, `ConsistencyConflict`
    /// after retries are exhausted, or a database error.
    pub async fn create(
        &self,
        input: CreateTransactionInput,
    ) -> Result<TransactionRecord, StoreError> {
        let mut attempt = 0;
        loop {
            match self.create_once(&input).await {
                Err(err) if err.is_conflict() && attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "conflict creating transaction, retrying");
                }
                other => return other.map_err(StoreError::normalize_conflict),
            }
        }
    }

    async fn create_once(
        &self,
        input: &CreateTransactionInput,
    ) -> Result<TransactionRecord, StoreError> {
        let txn = self.db.begin().await?;

        let owner = user::fetch_by_id(&txn, input.user_id.into_inner()).await?;
        let reference = account::parse_currency(&owner.reference_currency)?;

        let account_row =
            account::fetch_owned_locked(&txn, owner.id, input.account_id.into_inner()).await?;
        let snapshot = account::snapshot_of(&account_row)?;

        let rate =
            exchange_rate::find_rate_on(&txn, &snapshot.currency, &reference, input.occurred_on)
                .await?;
        let resolved = LedgerService::resolve_new(input, &snapshot, &reference, |_, _, _| rate)?;

        let model = insert_resolved(&txn, TransactionId::new(), &resolved).await?;
        balance::apply_delta(
            &txn,
            snapshot.ref_initial_balance,
            BalanceDelta {
                account_id: resolved.account_id,
                date: resolved.occurred_on,
                ref_amount: resolved.ref_amount,
            },
        )
        .await?;

        txn.commit().await?;
        Ok(model.to_record())
    }

    /// Updates a plain transaction, reversing the old balance effect and
    /// applying the new one atomically.
    ///
    /// # Errors
    ///
    /// Returns `TransferBoundary` for transfer legs, `TransactionNotFound`
    /// for missing or foreign rows, and the usual validation errors.
    pub async fn update(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
        changes: TransactionChanges,
    ) -> Result<TransactionRecord, StoreError> {
        let mut attempt = 0;
        loop {
            match self.update_once(user_id, transaction_id, &changes).await {
                Err(err) if err.is_conflict() && attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "conflict updating transaction, retrying");
                }
                other => return other.map_err(StoreError::normalize_conflict),
            }
        }
    }

    async fn update_once(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
        changes: &TransactionChanges,
    ) -> Result<TransactionRecord, StoreError> {
        let txn = self.db.begin().await?;

        let row = fetch_owned_transaction(&txn, user_id, transaction_id).await?;
        let existing = row.to_record();

        // Note-only edits must not touch the amounts: renormalizing against
        // a rate that was re-upserted since creation would change the row's
        // ref_amount without a matching balance delta.
        if !changes.affects_balance() {
            guard_plain_mutation(&existing)?;
            let mut active: transactions::ActiveModel = row.into();
            if let Some(note) = &changes.note {
                active.note = Set(Some(note.clone()));
            }
            active.updated_at = Set(chrono::Utc::now().into());
            let updated = active.update(&txn).await?;
            txn.commit().await?;
            return Ok(updated.to_record());
        }

        let owner = user::fetch_by_id(&txn, user_id.into_inner()).await?;
        let reference = account::parse_currency(&owner.reference_currency)?;

        let target_id = changes.account_id.unwrap_or(existing.account_id);

        // Lock in ascending account ID order; same-account updates lock once.
        let (source_row, target_row) = if target_id == existing.account_id {
            let only =
                account::fetch_owned_locked(&txn, owner.id, existing.account_id.into_inner())
                    .await?;
            (only.clone(), only)
        } else {
            let (first, second) = lock_order(existing.account_id, target_id);
            let first_row =
                account::fetch_owned_locked(&txn, owner.id, first.into_inner()).await?;
            let second_row =
                account::fetch_owned_locked(&txn, owner.id, second.into_inner()).await?;
            if first == existing.account_id {
                (first_row, second_row)
            } else {
                (second_row, first_row)
            }
        };
        let target_snapshot = account::snapshot_of(&target_row)?;

        let occurred_on = changes.occurred_on.unwrap_or(existing.occurred_on);
        let rate =
            exchange_rate::find_rate_on(&txn, &target_snapshot.currency, &reference, occurred_on)
                .await?;
        let effect = LedgerService::resolve_update(
            &existing,
            changes,
            &target_snapshot,
            &reference,
            |_, _, _| rate,
        )?;

        let mut active: transactions::ActiveModel = row.into();
        active.account_id = Set(target_snapshot.id.into_inner());
        active.amount = Set(effect.amount);
        active.ref_amount = Set(effect.ref_amount);
        active.kind = Set(effect.kind.into());
        active.occurred_on = Set(effect.occurred_on);
        if let Some(note) = &changes.note {
            active.note = Set(Some(note.clone()));
        }
        active.updated_at = Set(chrono::Utc::now().into());
        let updated = active.update(&txn).await?;

        balance::apply_delta(&txn, source_row.ref_initial_balance, effect.reversal).await?;
        balance::apply_delta(&txn, target_row.ref_initial_balance, effect.application).await?;

        txn.commit().await?;
        Ok(updated.to_record())
    }

    /// Deletes a plain transaction, reversing its balance effect and
    /// removing any refund links that reference it.
    ///
    /// # Errors
    ///
    /// Returns `TransferBoundary` for transfer legs and
    /// `TransactionNotFound` for missing or foreign rows.
    pub async fn delete(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<(), StoreError> {
        let mut attempt = 0;
        loop {
            match self.delete_once(user_id, transaction_id).await {
                Err(err) if err.is_conflict() && attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "conflict deleting transaction, retrying");
                }
                other => return other.map_err(StoreError::normalize_conflict),
            }
        }
    }

    async fn delete_once(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;

        let row = fetch_owned_transaction(&txn, user_id, transaction_id).await?;
        let existing = row.to_record();
        let delta = LedgerService::resolve_delete(&existing)?;

        let account_row =
            account::fetch_owned_locked(&txn, user_id.into_inner(), row.account_id).await?;

        refund::delete_links_for(&txn, transaction_id).await?;
        transactions::Entity::delete_by_id(row.id).exec(&txn).await?;
        balance::apply_delta(&txn, account_row.ref_initial_balance, delta).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Fetches a transaction owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` for missing or foreign rows.
    pub async fn get(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<TransactionRecord, StoreError> {
        let row = fetch_owned_transaction(&self.db, user_id, transaction_id).await?;
        Ok(row.to_record())
    }

    /// Lists the user's transactions, newest ledger date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        user_id: UserId,
        filter: TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id.into_inner()));

        if let Some(account_id) = filter.account_id {
            query = query.filter(transactions::Column::AccountId.eq(account_id.into_inner()));
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::OccurredOn.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::OccurredOn.lte(to));
        }

        let rows = query
            .order_by_desc(transactions::Column::OccurredOn)
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(rows.iter().map(transactions::Model::to_record).collect())
    }
}

/// Inserts a resolved transaction row.
pub(crate) async fn insert_resolved<C: ConnectionTrait>(
    conn: &C,
    id: TransactionId,
    resolved: &ResolvedTransaction,
) -> Result<transactions::Model, StoreError> {
    let now = chrono::Utc::now().into();
    let row = transactions::ActiveModel {
        id: Set(id.into_inner()),
        user_id: Set(resolved.user_id.into_inner()),
        account_id: Set(resolved.account_id.into_inner()),
        amount: Set(resolved.amount),
        ref_amount: Set(resolved.ref_amount),
        kind: Set(resolved.kind.into()),
        occurred_on: Set(resolved.occurred_on),
        transfer_id: Set(resolved.transfer_id.map(tally_shared::types::TransferId::into_inner)),
        external_ref: Set(resolved.external_ref.clone()),
        note: Set(resolved.note.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(row.insert(conn).await?)
}

/// Fetches a transaction owned by `user_id` on any connection.
pub(crate) async fn fetch_owned_transaction<C: ConnectionTrait>(
    conn: &C,
    user_id: UserId,
    transaction_id: TransactionId,
) -> Result<transactions::Model, StoreError> {
    transactions::Entity::find_by_id(transaction_id.into_inner())
        .filter(transactions::Column::UserId.eq(user_id.into_inner()))
        .one(conn)
        .await?
        .ok_or_else(|| {
            StoreError::Ledger(LedgerError::TransactionNotFound(transaction_id.into_inner()))
        })
}
