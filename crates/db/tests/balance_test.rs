//! Balance repository behavior over a mocked database backend.

use chrono::NaiveDate;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use tally_db::entities::{accounts, balance_entries, sea_orm_active_enums, transactions};
use tally_db::BalanceRepository;
use tally_shared::types::{AccountId, UserId};
use uuid::Uuid;

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

#[tokio::test]
async fn test_rebuild_from_keeps_prefix_and_replays_tail() {
    let user_id = Uuid::now_v7();
    let account_id = Uuid::now_v7();
    let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();

    let account = accounts::Model {
        id: account_id,
        user_id,
        name: "Checking".to_string(),
        currency: "USD".to_string(),
        is_enabled: true,
        initial_balance: 0,
        ref_initial_balance: 0,
        created_at: now,
        updated_at: now,
    };
    // entry before the cutoff stays and seeds the replay
    let kept_entry = balance_entries::Model {
        id: Uuid::now_v7(),
        account_id,
        entry_date: date(1, 5),
        cumulative: 1000,
        updated_at: now,
    };
    let tail_transaction = transactions::Model {
        id: Uuid::now_v7(),
        user_id,
        account_id,
        amount: 50,
        ref_amount: 50,
        kind: sea_orm_active_enums::TransactionKind::Income,
        occurred_on: date(2, 3),
        transfer_id: None,
        external_ref: None,
        note: None,
        created_at: now,
        updated_at: now,
    };
    let rebuilt_entry = balance_entries::Model {
        id: Uuid::now_v7(),
        account_id,
        entry_date: date(2, 3),
        cumulative: 1050,
        updated_at: now,
    };

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![account]])
        .append_query_results([vec![kept_entry]])
        .append_query_results([vec![tail_transaction]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .append_query_results([vec![rebuilt_entry]])
        .into_connection();
    let repo = BalanceRepository::new(db.clone());

    let inserted = repo
        .rebuild_from(
            UserId::from_uuid(user_id),
            AccountId::from_uuid(account_id),
            date(2, 1),
        )
        .await
        .unwrap();

    // only the tail is replayed; its cumulative continues from the kept
    // January entry (1000 + 50)
    assert_eq!(inserted, 1);
    let log = format!("{:?}", db.into_transaction_log());
    assert!(log.contains("1050"));
}
