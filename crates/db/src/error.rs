//! Mapping of database errors onto the ledger error taxonomy.

use poolbank_core::ledger::LedgerError;
use sea_orm::{DbErr, RuntimeErr, SqlErr};
use tracing::warn;

/// SQLSTATE raised when a SERIALIZABLE transaction cannot commit.
pub const SERIALIZATION_FAILURE: &str = "40001";

/// SQLSTATE raised when Postgres breaks a deadlock.
pub const DEADLOCK_DETECTED: &str = "40P01";

/// Name of the unique constraint on `accounts.account_number`.
pub const ACCOUNT_NUMBER_CONSTRAINT: &str = "uq_accounts_account_number";

/// Returns the SQLSTATE code carried by a driver error, if any.
#[must_use]
pub fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Conn(RuntimeErr::SqlxError(e))
        | DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Query(RuntimeErr::SqlxError(e)) => e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned()),
        _ => None,
    }
}

/// Maps a database error to a ledger error.
///
/// Serialization failures and deadlocks become `ConcurrencyConflict`; every
/// other fault is reported as `Database` and masked at the API boundary.
#[must_use]
pub fn map_db_err(err: DbErr) -> LedgerError {
    match sqlstate(&err).as_deref() {
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
            warn!(error = %err, "Serialization conflict, transaction rolled back");
            LedgerError::ConcurrencyConflict
        }
        _ => LedgerError::Database(err.to_string()),
    }
}

/// Maps an error raised while inserting an account row.
///
/// A duplicate account number becomes `AccountNumberTaken`; a duplicate
/// identity means a concurrent provisioning call won, which the caller
/// retries and then observes as an existing account.
#[must_use]
pub fn map_account_insert_err(err: DbErr, account_number: &str) -> LedgerError {
    if let Some(SqlErr::UniqueConstraintViolation(message)) = err.sql_err() {
        if message.contains(ACCOUNT_NUMBER_CONSTRAINT) {
            return LedgerError::AccountNumberTaken(account_number.to_string());
        }
        return LedgerError::ConcurrencyConflict;
    }
    map_db_err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_driver_errors_map_to_database() {
        let err = map_db_err(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, LedgerError::Database(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_sqlstate_absent_for_custom_errors() {
        assert_eq!(sqlstate(&DbErr::RecordNotFound("x".to_string())), None);
    }

    #[test]
    fn test_account_insert_err_falls_back_to_database() {
        let err = map_account_insert_err(DbErr::Custom("boom".to_string()), "7712345678");
        assert!(matches!(err, LedgerError::Database(_)));
    }
}
