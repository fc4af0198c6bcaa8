//! Transfer repository: the only write path for transfer legs.
//!
//! A transfer is two transaction rows sharing one `transfer_id`. Both legs
//! are created, updated, and deleted together inside one database
//! transaction, with the two account rows locked `FOR UPDATE` in ascending
//! ID order. The plain transaction path refuses to touch these rows, so a
//! half-mutated transfer cannot exist.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use tally_core::ledger::{BalanceDelta, LedgerError, TransactionRecord};
use tally_core::transfer::{plan_transfer, TransferInput};
use tally_shared::types::{CurrencyCode, TransactionId, TransferId, UserId};

use super::{account, balance, exchange_rate, refund, user, StoreError};
use crate::entities::{accounts, transactions};

/// Changes to apply to an existing transfer.
///
/// `None` fields are left untouched. The amount is the positive magnitude
/// in the source account's native minor units; changing it or the date
/// re-derives both legs.
#[derive(Debug, Clone, Default)]
pub struct TransferChanges {
    /// New positive magnitude.
    pub amount: Option<i64>,
    /// New ledger date for both legs.
    pub occurred_on: Option<NaiveDate>,
    /// Replace the note on both legs.
    pub note: Option<String>,
}

/// A transfer viewed as its two legs.
#[derive(Debug, Clone)]
pub struct TransferRecord {
    /// The shared transfer ID.
    pub transfer_id: TransferId,
    /// Outgoing leg.
    pub source: TransactionRecord,
    /// Incoming leg.
    pub destination: TransactionRecord,
}

/// Transfer repository for paired two-leg operations.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    db: DatabaseConnection,
    conflict_retries: u32,
}

impl TransferRepository {
    /// Creates a new transfer repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, conflict_retries: u32) -> Self {
        Self {
            db,
            conflict_retries,
        }
    }

    /// Creates a transfer: both legs and both balance effects, atomically.
    ///
    /// # Errors
    ///
    /// Returns `SelfTransfer`, validation errors, `ExchangeRateMissing`,
    /// `ConsistencyConflict` after retries, or a database error.
    pub async fn create(&self, input: TransferInput) -> Result<TransferRecord, StoreError> {
        let mut attempt = 0;
        loop {
            match self.create_once(&input).await {
                Err(err) if err.is_conflict() && attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "conflict creating transfer, retrying");
                }
                other => return other.map_err(StoreError::normalize_conflict),
            }
        }
    }

    async fn create_once(&self, input: &TransferInput) -> Result<TransferRecord, StoreError> {
        if input.from_account_id == input.to_account_id {
            return Err(LedgerError::SelfTransfer.into());
        }

        let txn = self.db.begin().await?;

        let owner = user::fetch_by_id(&txn, input.user_id.into_inner()).await?;
        let reference = account::parse_currency(&owner.reference_currency)?;

        let (from_row, to_row) = lock_pair(
            &txn,
            owner.id,
            input.from_account_id.into_inner(),
            input.to_account_id.into_inner(),
        )
        .await?;
        let from_snapshot = account::snapshot_of(&from_row)?;
        let to_snapshot = account::snapshot_of(&to_row)?;

        let rates = prefetch_rates(
            &txn,
            &from_snapshot.currency,
            &to_snapshot.currency,
            &reference,
            input.occurred_on,
        )
        .await?;
        let plan = plan_transfer(
            input,
            &from_snapshot,
            &to_snapshot,
            &reference,
            TransferId::new(),
            rate_table(&rates),
        )?;

        let source_row =
            super::ledger::insert_resolved(&txn, TransactionId::new(), &plan.source).await?;
        let dest_row =
            super::ledger::insert_resolved(&txn, TransactionId::new(), &plan.destination).await?;

        balance::apply_delta(
            &txn,
            from_row.ref_initial_balance,
            BalanceDelta {
                account_id: plan.source.account_id,
                date: plan.source.occurred_on,
                ref_amount: plan.source.ref_amount,
            },
        )
        .await?;
        balance::apply_delta(
            &txn,
            to_row.ref_initial_balance,
            BalanceDelta {
                account_id: plan.destination.account_id,
                date: plan.destination.occurred_on,
                ref_amount: plan.destination.ref_amount,
            },
        )
        .await?;

        txn.commit().await?;
        Ok(TransferRecord {
            transfer_id: plan.transfer_id,
            source: source_row.to_record(),
            destination: dest_row.to_record(),
        })
    }

    /// Fetches a transfer owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `TransferNotFound` for missing or foreign transfers.
    pub async fn get(
        &self,
        user_id: UserId,
        transfer_id: TransferId,
    ) -> Result<TransferRecord, StoreError> {
        let (source, destination) = fetch_legs(&self.db, user_id, transfer_id).await?;
        Ok(TransferRecord {
            transfer_id,
            source: source.to_record(),
            destination: destination.to_record(),
        })
    }

    /// Updates a transfer's amount, date, or note, re-deriving both legs.
    ///
    /// # Errors
    ///
    /// Returns `TransferNotFound`, validation errors, or a database error.
    pub async fn update(
        &self,
        user_id: UserId,
        transfer_id: TransferId,
        changes: TransferChanges,
    ) -> Result<TransferRecord, StoreError> {
        let mut attempt = 0;
        loop {
            match self.update_once(user_id, transfer_id, &changes).await {
                Err(err) if err.is_conflict() && attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "conflict updating transfer, retrying");
                }
                other => return other.map_err(StoreError::normalize_conflict),
            }
        }
    }

    async fn update_once(
        &self,
        user_id: UserId,
        transfer_id: TransferId,
        changes: &TransferChanges,
    ) -> Result<TransferRecord, StoreError> {
        let txn = self.db.begin().await?;

        let owner = user::fetch_by_id(&txn, user_id.into_inner()).await?;
        let reference = account::parse_currency(&owner.reference_currency)?;

        let (source, destination) = fetch_legs(&txn, user_id, transfer_id).await?;
        let (from_row, to_row) =
            lock_pair(&txn, owner.id, source.account_id, destination.account_id).await?;
        let from_snapshot = account::snapshot_of(&from_row)?;
        let to_snapshot = account::snapshot_of(&to_row)?;

        let input = TransferInput {
            user_id,
            from_account_id: from_snapshot.id,
            to_account_id: to_snapshot.id,
            amount: changes.amount.unwrap_or_else(|| source.amount.abs()),
            occurred_on: changes.occurred_on.unwrap_or(source.occurred_on),
            note: changes.note.clone().or_else(|| source.note.clone()),
        };

        let rates = prefetch_rates(
            &txn,
            &from_snapshot.currency,
            &to_snapshot.currency,
            &reference,
            input.occurred_on,
        )
        .await?;
        let plan = plan_transfer(
            &input,
            &from_snapshot,
            &to_snapshot,
            &reference,
            transfer_id,
            rate_table(&rates),
        )?;

        // Reverse both old legs, then apply the re-derived ones.
        balance::apply_delta(
            &txn,
            from_row.ref_initial_balance,
            BalanceDelta {
                account_id: from_snapshot.id,
                date: source.occurred_on,
                ref_amount: -source.ref_amount,
            },
        )
        .await?;
        balance::apply_delta(
            &txn,
            to_row.ref_initial_balance,
            BalanceDelta {
                account_id: to_snapshot.id,
                date: destination.occurred_on,
                ref_amount: -destination.ref_amount,
            },
        )
        .await?;

        let now = chrono::Utc::now().into();
        let mut source_active: transactions::ActiveModel = source.into();
        source_active.amount = Set(plan.source.amount);
        source_active.ref_amount = Set(plan.source.ref_amount);
        source_active.occurred_on = Set(plan.source.occurred_on);
        source_active.note = Set(plan.source.note.clone());
        source_active.updated_at = Set(now);
        let new_source = source_active.update(&txn).await?;

        let mut dest_active: transactions::ActiveModel = destination.into();
        dest_active.amount = Set(plan.destination.amount);
        dest_active.ref_amount = Set(plan.destination.ref_amount);
        dest_active.occurred_on = Set(plan.destination.occurred_on);
        dest_active.note = Set(plan.destination.note.clone());
        dest_active.updated_at = Set(now);
        let new_dest = dest_active.update(&txn).await?;

        balance::apply_delta(
            &txn,
            from_row.ref_initial_balance,
            BalanceDelta {
                account_id: plan.source.account_id,
                date: plan.source.occurred_on,
                ref_amount: plan.source.ref_amount,
            },
        )
        .await?;
        balance::apply_delta(
            &txn,
            to_row.ref_initial_balance,
            BalanceDelta {
                account_id: plan.destination.account_id,
                date: plan.destination.occurred_on,
                ref_amount: plan.destination.ref_amount,
            },
        )
        .await?;

        txn.commit().await?;
        Ok(TransferRecord {
            transfer_id,
            source: new_source.to_record(),
            destination: new_dest.to_record(),
        })
    }

    /// Deletes a transfer: both legs, both balance reversals, and any
    /// refund links referencing either leg.
    ///
    /// # Errors
    ///
    /// Returns `TransferNotFound` for missing or foreign transfers.
    pub async fn delete(
        &self,
        user_id: UserId,
        transfer_id: TransferId,
    ) -> Result<(), StoreError> {
        let mut attempt = 0;
        loop {
            match self.delete_once(user_id, transfer_id).await {
                Err(err) if err.is_conflict() && attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "conflict deleting transfer, retrying");
                }
                other => return other.map_err(StoreError::normalize_conflict),
            }
        }
    }

    async fn delete_once(
        &self,
        user_id: UserId,
        transfer_id: TransferId,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;

        let (source, destination) = fetch_legs(&txn, user_id, transfer_id).await?;
        let (from_row, to_row) =
            lock_pair(&txn, user_id.into_inner(), source.account_id, destination.account_id)
                .await?;

        refund::delete_links_for(&txn, TransactionId::from_uuid(source.id)).await?;
        refund::delete_links_for(&txn, TransactionId::from_uuid(destination.id)).await?;

        transactions::Entity::delete_by_id(source.id).exec(&txn).await?;
        transactions::Entity::delete_by_id(destination.id)
            .exec(&txn)
            .await?;

        balance::apply_delta(
            &txn,
            from_row.ref_initial_balance,
            BalanceDelta {
                account_id: tally_shared::types::AccountId::from_uuid(source.account_id),
                date: source.occurred_on,
                ref_amount: -source.ref_amount,
            },
        )
        .await?;
        balance::apply_delta(
            &txn,
            to_row.ref_initial_balance,
            BalanceDelta {
                account_id: tally_shared::types::AccountId::from_uuid(destination.account_id),
                date: destination.occurred_on,
                ref_amount: -destination.ref_amount,
            },
        )
        .await?;

        txn.commit().await?;
        Ok(())
    }
}

/// Locks two account rows in ascending ID order and returns them as
/// `(first_requested, second_requested)`.
async fn lock_pair<C: ConnectionTrait>(
    conn: &C,
    user_id: uuid::Uuid,
    a: uuid::Uuid,
    b: uuid::Uuid,
) -> Result<(accounts::Model, accounts::Model), StoreError> {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let first_row = account::fetch_owned_locked(conn, user_id, first).await?;
    let second_row = if first == second {
        first_row.clone()
    } else {
        account::fetch_owned_locked(conn, user_id, second).await?
    };
    if first == a {
        Ok((first_row, second_row))
    } else {
        Ok((second_row, first_row))
    }
}

/// Fetches both legs of a transfer as `(source, destination)`.
async fn fetch_legs<C: ConnectionTrait>(
    conn: &C,
    user_id: UserId,
    transfer_id: TransferId,
) -> Result<(transactions::Model, transactions::Model), StoreError> {
    let legs = transactions::Entity::find()
        .filter(transactions::Column::UserId.eq(user_id.into_inner()))
        .filter(transactions::Column::TransferId.eq(transfer_id.into_inner()))
        .all(conn)
        .await?;

    let mut source = None;
    let mut destination = None;
    for leg in legs {
        if leg.amount < 0 {
            source = Some(leg);
        } else {
            destination = Some(leg);
        }
    }
    match (source, destination) {
        (Some(source), Some(destination)) => Ok((source, destination)),
        _ => Err(LedgerError::TransferNotFound(transfer_id.into_inner()).into()),
    }
}

/// Fetches every rate a transfer plan may ask for at `date`.
async fn prefetch_rates<C: ConnectionTrait>(
    conn: &C,
    from: &CurrencyCode,
    to: &CurrencyCode,
    reference: &CurrencyCode,
    date: chrono::NaiveDate,
) -> Result<Vec<(CurrencyCode, CurrencyCode, Decimal)>, StoreError> {
    let mut rates = Vec::new();
    for (base, quote) in [(from, to), (from, reference), (to, reference)] {
        if base == quote || rates.iter().any(|(b, q, _)| b == base && q == quote) {
            continue;
        }
        if let Some(rate) = exchange_rate::find_rate_on(conn, base, quote, date).await? {
            rates.push((base.clone(), quote.clone(), rate));
        }
    }
    Ok(rates)
}

/// Builds the lookup closure the transfer planner expects over prefetched
/// rates.
fn rate_table(
    rates: &[(CurrencyCode, CurrencyCode, Decimal)],
) -> impl Fn(&CurrencyCode, &CurrencyCode, chrono::NaiveDate) -> Option<Decimal> + '_ {
    move |base, quote, _| {
        if base == quote {
            return Some(Decimal::ONE);
        }
        rates
            .iter()
            .find(|(b, q, _)| b == base && q == quote)
            .map(|(_, _, rate)| *rate)
    }
}
