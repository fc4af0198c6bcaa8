//! Database seeder for Tally development and testing.
//!
//! Seeds a demo user with two accounts, a few exchange rates, and a handful
//! of transactions. Goes through the repositories so balance entries are
//! derived the same way the API derives them.
//!
//! Usage: cargo run --bin seeder

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use tally_core::ledger::{CreateTransactionInput, TransactionKind};
use tally_core::transfer::TransferInput;
use tally_db::repositories::account::CreateAccountInput;
use tally_db::repositories::exchange_rate::UpsertRateInput;
use tally_db::repositories::user::CreateUserInput;
use tally_db::{
    AccountRepository, ExchangeRateRepository, TransactionRepository, TransferRepository,
    UserRepository,
};
use tally_shared::types::{AccountId, CurrencyCode, UserId};

const DEMO_EMAIL: &str = "demo@tally.dev";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = tally_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let users = UserRepository::new(db.clone());
    if users
        .find_by_email(DEMO_EMAIL)
        .await
        .expect("Failed to query users")
        .is_some()
    {
        println!("Demo user already exists, nothing to do.");
        return;
    }

    println!("Seeding exchange rates...");
    let rates = ExchangeRateRepository::new(db.clone());
    for (base, quote, rate, date) in [
        ("EUR", "USD", "1.09", date(2026, 1, 1)),
        ("EUR", "USD", "1.11", date(2026, 2, 1)),
        ("GBP", "USD", "1.27", date(2026, 1, 1)),
    ] {
        rates
            .upsert(UpsertRateInput {
                base: currency(base),
                quote: currency(quote),
                rate: Decimal::from_str(rate).expect("Invalid seed rate"),
                effective_date: date,
            })
            .await
            .expect("Failed to seed exchange rate");
        println!("  {base}/{quote} = {rate} from {date}");
    }

    println!("Seeding demo user...");
    let user = users
        .create(CreateUserInput {
            email: DEMO_EMAIL.to_string(),
            display_name: "Demo User".to_string(),
            reference_currency: currency("USD"),
        })
        .await
        .expect("Failed to create demo user");
    let user_id = UserId::from_uuid(user.id);
    println!("  Created {DEMO_EMAIL}");

    println!("Seeding accounts...");
    let accounts = AccountRepository::new(db.clone());
    let checking = accounts
        .create(CreateAccountInput {
            user_id,
            name: "Checking".to_string(),
            currency: currency("USD"),
            initial_balance: 250_000,
            opened_on: date(2026, 1, 1),
        })
        .await
        .expect("Failed to create checking account");
    let savings = accounts
        .create(CreateAccountInput {
            user_id,
            name: "EUR Savings".to_string(),
            currency: currency("EUR"),
            initial_balance: 100_000,
            opened_on: date(2026, 1, 1),
        })
        .await
        .expect("Failed to create savings account");
    println!("  Checking (USD) and EUR Savings");

    println!("Seeding transactions...");
    let transactions = TransactionRepository::new(db.clone(), 3);
    for (kind, amount, day, note) in [
        (TransactionKind::Income, 500_000_i64, 5, "Salary"),
        (TransactionKind::Expense, 8_250, 7, "Groceries"),
        (TransactionKind::Expense, 12_900, 12, "Utilities"),
        (TransactionKind::Income, 15_000, 20, "Refund from store"),
    ] {
        transactions
            .create(CreateTransactionInput {
                user_id,
                account_id: AccountId::from_uuid(checking.id),
                kind,
                amount,
                occurred_on: date(2026, 1, day),
                note: Some(note.to_string()),
                external_ref: None,
            })
            .await
            .expect("Failed to seed transaction");
    }

    let transfers = TransferRepository::new(db.clone(), 3);
    transfers
        .create(TransferInput {
            user_id,
            from_account_id: AccountId::from_uuid(checking.id),
            to_account_id: AccountId::from_uuid(savings.id),
            amount: 100_000,
            occurred_on: date(2026, 1, 25),
            note: Some("Monthly savings".to_string()),
        })
        .await
        .expect("Failed to seed transfer");
    println!("  4 transactions and 1 cross-currency transfer");

    println!("Seeding complete!");
}

fn currency(code: &str) -> CurrencyCode {
    CurrencyCode::parse(code).expect("Invalid seed currency")
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("Invalid seed date")
}
