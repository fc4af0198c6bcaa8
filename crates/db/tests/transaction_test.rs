//! Transaction repository behavior over a mocked database backend.

use chrono::NaiveDate;
use sea_orm::{DatabaseBackend, MockDatabase};
use tally_core::ledger::{LedgerError, TransactionChanges};
use tally_db::entities::{sea_orm_active_enums, transactions};
use tally_db::repositories::StoreError;
use tally_db::TransactionRepository;
use tally_shared::types::{TransactionId, UserId};
use uuid::Uuid;

fn stored_row(user_id: Uuid, transfer_id: Option<Uuid>) -> transactions::Model {
    let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
    let kind = if transfer_id.is_some() {
        sea_orm_active_enums::TransactionKind::Transfer
    } else {
        sea_orm_active_enums::TransactionKind::Expense
    };
    transactions::Model {
        id: Uuid::now_v7(),
        user_id,
        account_id: Uuid::now_v7(),
        amount: -1500,
        ref_amount: -1650,
        kind,
        occurred_on: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
        transfer_id,
        external_ref: None,
        note: Some("lunch".to_string()),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_note_only_update_leaves_amounts_untouched() {
    let user_id = Uuid::now_v7();
    let row = stored_row(user_id, None);
    let mut returned = row.clone();
    returned.note = Some("team lunch".to_string());

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![row.clone()]])
        .append_query_results([vec![returned]])
        .into_connection();
    let repo = TransactionRepository::new(db.clone(), 3);

    let changes = TransactionChanges {
        note: Some("team lunch".to_string()),
        ..TransactionChanges::default()
    };
    let record = repo
        .update(
            UserId::from_uuid(user_id),
            TransactionId::from_uuid(row.id),
            changes,
        )
        .await
        .unwrap();

    // the stored amounts survive even when the rate table has changed since
    // the row was created
    assert_eq!(record.amount, -1500);
    assert_eq!(record.ref_amount, -1650);

    let log = format!("{:?}", db.into_transaction_log());
    let start = log.find("UPDATE").expect("update statement in log");
    let tail = &log[start..];
    let set_clause = &tail[..tail.find("WHERE").expect("where clause after update")];
    assert!(set_clause.contains("note"));
    assert!(!set_clause.contains("amount"));
    assert!(!set_clause.contains("occurred_on"));
    assert!(!set_clause.contains("kind"));
    assert!(!set_clause.contains("account_id"));
}

#[tokio::test]
async fn test_note_only_update_blocked_on_transfer_legs() {
    let user_id = Uuid::now_v7();
    let row = stored_row(user_id, Some(Uuid::now_v7()));

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![row.clone()]])
        .into_connection();
    let repo = TransactionRepository::new(db, 3);

    let changes = TransactionChanges {
        note: Some("still a transfer leg".to_string()),
        ..TransactionChanges::default()
    };
    let err = repo
        .update(
            UserId::from_uuid(user_id),
            TransactionId::from_uuid(row.id),
            changes,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Ledger(LedgerError::TransferBoundary(_))
    ));
}
