//! Initial ledger schema.
//!
//! Creates the pool singleton, accounts, and the append-only transaction,
//! audit, notification and flag tables. CHECK constraints mirror the ledger
//! invariants so a faulty write fails at commit instead of corrupting state.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(LEDGER_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
DROP TABLE IF EXISTS transaction_flags CASCADE;
DROP TABLE IF EXISTS notifications CASCADE;
DROP TABLE IF EXISTS audit_log CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS bank_pool CASCADE;
",
        )
        .await?;
        Ok(())
    }
}

const LEDGER_SQL: &str = r"
-- Pool singleton; the row itself is created by the server at startup
CREATE TABLE bank_pool (
    id SMALLINT PRIMARY KEY,
    total_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    reserve_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_pool_singleton CHECK (id = 1),
    CONSTRAINT chk_pool_total_non_negative CHECK (total_amount >= 0),
    CONSTRAINT chk_pool_reserve_non_negative CHECK (reserve_amount >= 0)
);

-- One account per external identity
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    account_number VARCHAR(16) NOT NULL,
    full_name TEXT,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    held_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    is_frozen BOOLEAN NOT NULL DEFAULT false,
    freeze_reason TEXT,
    daily_limit NUMERIC(19, 4),
    kyc_status VARCHAR(16) NOT NULL DEFAULT 'pending',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_accounts_account_number UNIQUE (account_number),
    CONSTRAINT chk_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_held_non_negative CHECK (held_amount >= 0),
    CONSTRAINT chk_held_within_balance CHECK (held_amount <= balance),
    CONSTRAINT chk_daily_limit_positive CHECK (daily_limit IS NULL OR daily_limit > 0),
    CONSTRAINT chk_kyc_status CHECK (kyc_status IN ('pending', 'verified', 'rejected'))
);

CREATE INDEX idx_accounts_balance ON accounts(balance DESC);

-- Immutable ledger transactions; NULL account means the pool
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    kind VARCHAR(16) NOT NULL,
    from_account VARCHAR(16),
    to_account VARCHAR(16),
    from_user UUID REFERENCES accounts(id),
    to_user UUID REFERENCES accounts(id),
    from_name TEXT,
    to_name TEXT,
    amount NUMERIC(19, 4) NOT NULL,
    pool_delta NUMERIC(19, 4) NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'completed',
    reference TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_kind CHECK (kind IN ('transfer', 'grant', 'adjust')),
    CONSTRAINT chk_has_account CHECK (from_account IS NOT NULL OR to_account IS NOT NULL)
);

CREATE INDEX idx_transactions_from_user ON transactions(from_user, created_at DESC);
CREATE INDEX idx_transactions_to_user ON transactions(to_user, created_at DESC);
CREATE INDEX idx_transactions_from_account ON transactions(from_account);
CREATE INDEX idx_transactions_to_account ON transactions(to_account);

-- Audit trail, one row per committed mutation
CREATE TABLE audit_log (
    id UUID PRIMARY KEY,
    actor_id UUID,
    actor_role VARCHAR(16) NOT NULL,
    action VARCHAR(32) NOT NULL,
    target_account VARCHAR(16),
    amount NUMERIC(19, 4),
    reason TEXT,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_actor_role CHECK (actor_role IN ('admin', 'system', 'user'))
);

CREATE INDEX idx_audit_log_created ON audit_log(created_at DESC);

-- User-facing notifications
CREATE TABLE notifications (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    account_number VARCHAR(16),
    kind VARCHAR(32) NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    is_read BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_notifications_user ON notifications(user_id, created_at DESC);

-- Advisory review markers, no ledger effect
CREATE TABLE transaction_flags (
    id UUID PRIMARY KEY,
    transaction_id UUID NOT NULL REFERENCES transactions(id),
    reason TEXT,
    status VARCHAR(16) NOT NULL DEFAULT 'OPEN',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_transaction_flags_created ON transaction_flags(created_at DESC);
";
