//! Refund link repository.
//!
//! Links are stored canonically with the smaller transaction UUID first, so
//! one unique index covers both directions. Unlinking is idempotent; a
//! second unlink of the same pair is a no-op.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use tally_core::refund::{validate_link, RefundPair};
use tally_shared::types::{RefundLinkId, TransactionId, UserId};

use super::{ledger, StoreError};
use crate::entities::refund_links;

/// Refund link repository.
#[derive(Debug, Clone)]
pub struct RefundRepository {
    db: DatabaseConnection,
}

impl RefundRepository {
    /// Creates a new refund link repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Links two transactions as original and refund.
    ///
    /// The link is informational: amounts and balances are untouched.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound`, `SelfRefundLink`, `CrossUser`, or
    /// `AlreadyLinked`.
    pub async fn link(
        &self,
        user_id: UserId,
        original_id: TransactionId,
        refund_id: TransactionId,
    ) -> Result<refund_links::Model, StoreError> {
        let txn = self.db.begin().await?;

        let original = ledger::fetch_owned_transaction(&txn, user_id, original_id)
            .await?
            .to_record();
        let refund = ledger::fetch_owned_transaction(&txn, user_id, refund_id)
            .await?
            .to_record();

        let existing = pairs_involving(&txn, original_id).await?;
        let pair = validate_link(&original, &refund, user_id, &existing)?;

        let link = refund_links::ActiveModel {
            id: Set(RefundLinkId::new().into_inner()),
            user_id: Set(user_id.into_inner()),
            first_transaction_id: Set(pair.first().into_inner()),
            second_transaction_id: Set(pair.second().into_inner()),
            created_at: Set(chrono::Utc::now().into()),
        };
        let model = link.insert(&txn).await?;

        txn.commit().await?;
        Ok(model)
    }

    /// Removes the link between two transactions. Returns whether a link
    /// existed; unlinking an unlinked pair is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn unlink(
        &self,
        user_id: UserId,
        a: TransactionId,
        b: TransactionId,
    ) -> Result<bool, StoreError> {
        let pair = RefundPair::new(a, b);
        let result = refund_links::Entity::delete_many()
            .filter(refund_links::Column::UserId.eq(user_id.into_inner()))
            .filter(refund_links::Column::FirstTransactionId.eq(pair.first().into_inner()))
            .filter(refund_links::Column::SecondTransactionId.eq(pair.second().into_inner()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Lists the transactions linked to `transaction_id`, in either
    /// direction.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` for missing or foreign transactions.
    pub async fn links_for(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<Vec<TransactionId>, StoreError> {
        ledger::fetch_owned_transaction(&self.db, user_id, transaction_id).await?;

        let pairs = pairs_involving(&self.db, transaction_id).await?;
        Ok(pairs
            .into_iter()
            .map(|pair| {
                if pair.first() == transaction_id {
                    pair.second()
                } else {
                    pair.first()
                }
            })
            .collect())
    }
}

/// All stored pairs that involve `transaction_id`.
async fn pairs_involving<C: ConnectionTrait>(
    conn: &C,
    transaction_id: TransactionId,
) -> Result<Vec<RefundPair>, StoreError> {
    let id = transaction_id.into_inner();
    let rows = refund_links::Entity::find()
        .filter(
            Condition::any()
                .add(refund_links::Column::FirstTransactionId.eq(id))
                .add(refund_links::Column::SecondTransactionId.eq(id)),
        )
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            RefundPair::new(
                TransactionId::from_uuid(row.first_transaction_id),
                TransactionId::from_uuid(row.second_transaction_id),
            )
        })
        .collect())
}

/// Deletes every link referencing `transaction_id`. Called when the
/// transaction itself is deleted so no dangling links survive.
pub(crate) async fn delete_links_for<C: ConnectionTrait>(
    conn: &C,
    transaction_id: TransactionId,
) -> Result<(), StoreError> {
    let id = transaction_id.into_inner();
    refund_links::Entity::delete_many()
        .filter(
            Condition::any()
                .add(refund_links::Column::FirstTransactionId.eq(id))
                .add(refund_links::Column::SecondTransactionId.eq(id)),
        )
        .exec(conn)
        .await?;
    Ok(())
}
