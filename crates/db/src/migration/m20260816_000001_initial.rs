//! Initial database migration.
//!
//! Creates the full ledger schema: users, sessions, accounts, transactions,
//! balance entries, refund links, and exchange rates.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(SESSIONS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(BALANCE_ENTRIES_SQL).await?;
        db.execute_unprepared(REFUND_LINKS_SQL).await?;
        db.execute_unprepared(EXCHANGE_RATES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DROP_ALL_SQL)
            .await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE transaction_kind AS ENUM ('income', 'expense', 'transfer');
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    reference_currency CHAR(3) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const SESSIONS_SQL: &str = r"
CREATE TABLE sessions (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token_hash TEXT NOT NULL UNIQUE,
    expires_at TIMESTAMPTZ NOT NULL,
    revoked_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_sessions_user ON sessions(user_id);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK (char_length(name) > 0),
    currency CHAR(3) NOT NULL,
    is_enabled BOOLEAN NOT NULL DEFAULT TRUE,
    initial_balance BIGINT NOT NULL DEFAULT 0,
    ref_initial_balance BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_accounts_user ON accounts(user_id);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    amount BIGINT NOT NULL CHECK (amount <> 0),
    ref_amount BIGINT NOT NULL,
    kind transaction_kind NOT NULL,
    occurred_on DATE NOT NULL,
    transfer_id UUID,
    external_ref TEXT,
    note TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CHECK ((kind = 'transfer') = (transfer_id IS NOT NULL))
);

CREATE INDEX idx_transactions_user_date ON transactions(user_id, occurred_on);
CREATE INDEX idx_transactions_account_date ON transactions(account_id, occurred_on);
CREATE INDEX idx_transactions_transfer ON transactions(transfer_id)
    WHERE transfer_id IS NOT NULL;
";

const BALANCE_ENTRIES_SQL: &str = r"
CREATE TABLE balance_entries (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    entry_date DATE NOT NULL,
    cumulative BIGINT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (account_id, entry_date)
);

CREATE INDEX idx_balance_entries_account_date ON balance_entries(account_id, entry_date);
";

const REFUND_LINKS_SQL: &str = r"
CREATE TABLE refund_links (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    first_transaction_id UUID NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    second_transaction_id UUID NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (first_transaction_id, second_transaction_id),
    CHECK (first_transaction_id < second_transaction_id)
);

CREATE INDEX idx_refund_links_first ON refund_links(first_transaction_id);
CREATE INDEX idx_refund_links_second ON refund_links(second_transaction_id);
";

const EXCHANGE_RATES_SQL: &str = r"
CREATE TABLE exchange_rates (
    id UUID PRIMARY KEY,
    base_currency CHAR(3) NOT NULL,
    quote_currency CHAR(3) NOT NULL,
    rate NUMERIC(20, 10) NOT NULL CHECK (rate > 0),
    effective_date DATE NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (base_currency, quote_currency, effective_date),
    CHECK (base_currency <> quote_currency)
);

CREATE INDEX idx_exchange_rates_lookup
    ON exchange_rates(base_currency, quote_currency, effective_date DESC);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS exchange_rates;
DROP TABLE IF EXISTS refund_links;
DROP TABLE IF EXISTS balance_entries;
DROP TABLE IF EXISTS transactions;
DROP TABLE IF EXISTS accounts;
DROP TABLE IF EXISTS sessions;
DROP TABLE IF EXISTS users;
DROP TYPE IF EXISTS transaction_kind;
";
