//! `SeaORM` entity definitions.
//!
//! Enumerated columns are stored as text and parsed into the core ledger
//! enums when a model is converted into its domain type.

pub mod accounts;
pub mod audit_log;
pub mod bank_pool;
pub mod notifications;
pub mod transaction_flags;
pub mod transactions;

use chrono::{DateTime, Utc};
use poolbank_core::ledger::LedgerError;
use sea_orm::prelude::DateTimeWithTimeZone;

pub(crate) fn to_utc(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

pub(crate) fn parse_text<T>(value: &str) -> Result<T, LedgerError>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse().map_err(LedgerError::Internal)
}
