//! Append-only guards for the ledger history tables.
//!
//! Audit rows can never change. Transaction rows can only have their
//! denormalized counterparty names rewritten.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(APPEND_ONLY_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
DROP TRIGGER IF EXISTS trg_transactions_append_only ON transactions;
DROP TRIGGER IF EXISTS trg_audit_log_append_only ON audit_log;
DROP FUNCTION IF EXISTS prevent_transaction_modification();
DROP FUNCTION IF EXISTS prevent_audit_log_modification();
",
        )
        .await?;
        Ok(())
    }
}

const APPEND_ONLY_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_audit_log_modification
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_audit_log_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'audit_log is append-only (% rejected)', TG_OP;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_audit_log_append_only
BEFORE UPDATE OR DELETE ON audit_log
FOR EACH ROW
EXECUTE FUNCTION prevent_audit_log_modification();

-- ============================================================
-- FUNCTION: prevent_transaction_modification
-- Only from_name and to_name may be rewritten
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_transaction_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF TG_OP = 'DELETE' THEN
        RAISE EXCEPTION 'Cannot delete ledger transaction %', OLD.id;
    END IF;

    IF (NEW.id, NEW.kind, NEW.from_account, NEW.to_account, NEW.from_user, NEW.to_user,
        NEW.amount, NEW.pool_delta, NEW.status, NEW.reference, NEW.created_at)
       IS DISTINCT FROM
       (OLD.id, OLD.kind, OLD.from_account, OLD.to_account, OLD.from_user, OLD.to_user,
        OLD.amount, OLD.pool_delta, OLD.status, OLD.reference, OLD.created_at) THEN
        RAISE EXCEPTION 'Ledger transaction % is immutable apart from counterparty names', OLD.id;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_transactions_append_only
BEFORE UPDATE OR DELETE ON transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_transaction_modification();
";
