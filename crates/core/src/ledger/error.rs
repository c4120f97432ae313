//! Ledger error types for validation and state errors.
//!
//! This module defines all errors that can occur during ledger operations,
//! including input validation, account state, pool capacity, provisioning
//! and storage errors.

use poolbank_shared::types::{NotificationId, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// Per-transaction limit is not a positive amount.
    #[error("Limit must be greater than zero, got {0}")]
    InvalidLimit(Decimal),

    /// Sender and receiver are the same account.
    #[error("Cannot transfer to your own account")]
    SelfTransfer,

    // ========== Account Errors ==========
    /// Sender account is frozen.
    #[error("Account is frozen: {}", reason.as_deref().unwrap_or("contact support"))]
    AccountFrozen {
        /// Reason recorded with the freeze.
        reason: Option<String>,
    },

    /// Available balance is below the requested amount.
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Spendable balance.
        available: Decimal,
        /// Requested amount.
        requested: Decimal,
    },

    /// Transfer exceeds the per-transaction limit.
    #[error("Amount {requested} exceeds the transfer limit of {limit}")]
    LimitExceeded {
        /// Configured limit.
        limit: Decimal,
        /// Requested amount.
        requested: Decimal,
    },

    /// Receiving account number does not exist.
    #[error("Receiver account not found: {0}")]
    ReceiverNotFound(String),

    /// Account does not exist.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    // ========== Pool Errors ==========
    /// Allocatable pool total is below the requested amount.
    #[error("Pool has insufficient funds: available {available}, requested {requested}")]
    PoolInsufficient {
        /// Allocatable pool total.
        available: Decimal,
        /// Requested amount.
        requested: Decimal,
    },

    /// Pool singleton has not been initialized.
    #[error("Bank pool is not initialized")]
    PoolNotInitialized,

    // ========== Record Errors ==========
    /// Transaction does not exist.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Notification does not exist or belongs to another user.
    #[error("Notification not found: {0}")]
    NotificationNotFound(NotificationId),

    // ========== Provisioning Errors ==========
    /// Account number is already assigned to another identity.
    #[error("Account number {0} is already taken")]
    AccountNumberTaken(String),

    /// Account-number generation kept colliding.
    #[error("Could not allocate an account number after {attempts} attempts")]
    ProvisioningExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    // ========== Concurrency Errors ==========
    /// Serialization failure or deadlock; the caller should retry.
    #[error("Concurrent modification detected, please retry")]
    ConcurrencyConflict,

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidLimit(_) => "INVALID_LIMIT",
            Self::SelfTransfer => "SELF_TRANSFER",
            Self::AccountFrozen { .. } => "ACCOUNT_FROZEN",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            Self::ReceiverNotFound(_) => "RECEIVER_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::PoolInsufficient { .. } => "POOL_INSUFFICIENT",
            Self::PoolNotInitialized => "POOL_NOT_INITIALIZED",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::NotificationNotFound(_) => "NOTIFICATION_NOT_FOUND",
            Self::AccountNumberTaken(_) => "ACCOUNT_NUMBER_TAKEN",
            Self::ProvisioningExhausted { .. } => "PROVISIONING_EXHAUSTED",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::Validation(_) | Self::InvalidLimit(_) | Self::SelfTransfer => 400,

            // 404 Not Found
            Self::ReceiverNotFound(_)
            | Self::AccountNotFound(_)
            | Self::TransactionNotFound(_)
            | Self::NotificationNotFound(_) => 404,

            // 409 Conflict - concurrency errors and taken numbers
            Self::AccountNumberTaken(_) | Self::ConcurrencyConflict => 409,

            // 422 Unprocessable - well-formed request refused by ledger state
            Self::AccountFrozen { .. }
            | Self::InsufficientFunds { .. }
            | Self::LimitExceeded { .. }
            | Self::PoolInsufficient { .. } => 422,

            // 500 Internal Server Error
            Self::PoolNotInitialized
            | Self::ProvisioningExhausted { .. }
            | Self::Database(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict)
    }

    /// Returns true if the error hides storage details from clients.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::PoolNotInitialized | Self::Database(_) | Self::Internal(_)
        )
    }

    /// Returns the message safe to show to a client.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        }
    }
}
