//! Pool-first ledger logic.
//!
//! This module implements the core ledger functionality:
//! - Domain types (pool, accounts, transactions, audit entries, notifications, flags)
//! - Error taxonomy for ledger operations
//! - Input validation performed before any store access
//! - Balance transition rules producing atomic mutations
//! - The transactional store contract and committed-event fan-out
//! - Account provisioning with bounded number generation

pub mod error;
pub mod events;
pub mod provisioning;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;

pub use error::LedgerError;
pub use events::{CommittedEvent, EventBus, LedgerEvent};
pub use provisioning::{AccountNumberGenerator, Provisioner};
pub use service::{LedgerMutation, LedgerService};
pub use store::{
    AllocationRequest, InsertOutcome, LedgerStore, NewAccount, PoolUpdate, TransferRequest,
};
pub use types::{
    Account, AccountSummary, Actor, ActorRole, AuditAction, AuditEntry, Flag, FlagStatus,
    KycStatus, Notification, NotificationKind, Overview, Pool, Transaction, TransactionKind,
    TransactionStatus,
};
