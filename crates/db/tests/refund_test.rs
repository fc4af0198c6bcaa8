//! Refund link repository behavior over a mocked database backend.

use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use tally_db::RefundRepository;
use tally_shared::types::{TransactionId, UserId};

#[tokio::test]
async fn test_unlink_twice_succeeds_both_times() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ])
        .into_connection();
    let repo = RefundRepository::new(db);

    let user = UserId::new();
    let a = TransactionId::new();
    let b = TransactionId::new();

    assert!(repo.unlink(user, a, b).await.unwrap());
    // the second unlink targets the same canonical pair regardless of
    // argument order and is a no-op, not an error
    assert!(!repo.unlink(user, b, a).await.unwrap());
}
