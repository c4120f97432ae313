//! Storage boundary for the ledger.
//!
//! Every mutating method is one atomic unit: the balance or pool change, the
//! transaction row, the audit entry and the notifications commit together or
//! not at all. Events are published only after the commit succeeds.

use async_trait::async_trait;
use poolbank_shared::types::{NotificationId, TransactionId, UserId};
use rust_decimal::Decimal;
use tokio::sync::broadcast;

use super::error::LedgerError;
use super::events::{CommittedEvent, EventBus};
use super::types::{
    Account, AccountSummary, Actor, AuditEntry, Flag, KycStatus, Notification, Overview, Pool,
    Transaction,
};

/// Peer-to-peer transfer request.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Sending user; the sender account shares this identity.
    pub from: UserId,
    /// Receiving account number.
    pub to_account_number: String,
    /// Amount to move.
    pub amount: Decimal,
    /// Free-text reference.
    pub reference: Option<String>,
}

/// Grant or adjustment request.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    /// Target account number.
    pub account_number: String,
    /// Positive for grants; signed for adjustments.
    pub amount: Decimal,
    /// Free-text reason.
    pub reason: Option<String>,
    /// Who asked.
    pub actor: Actor,
}

/// Pool administration request. Omitted values are left unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolUpdate {
    /// New pool total.
    pub total: Option<Decimal>,
    /// New reserve.
    pub reserve: Option<Decimal>,
}

/// Account row to create during provisioning.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Owning identity.
    pub id: UserId,
    /// Candidate account number.
    pub account_number: String,
    /// Holder's display name.
    pub full_name: Option<String>,
}

/// Result of [`LedgerStore::insert_account`].
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// A new account was created.
    Created(Account),
    /// The identity already had an account; it is returned unchanged apart
    /// from its display name.
    Existing(Account),
}

impl InsertOutcome {
    /// Returns the account regardless of outcome.
    #[must_use]
    pub fn into_account(self) -> Account {
        match self {
            Self::Created(account) | Self::Existing(account) => account,
        }
    }

    /// Returns true if a new account was created.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Durable ledger state with atomic read-modify-write operations.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns the bus committed events are published on.
    fn events(&self) -> &EventBus;

    /// Subscribes to events committed from now on.
    fn subscribe(&self) -> broadcast::Receiver<CommittedEvent> {
        self.events().subscribe()
    }

    // ========== Pool ==========

    /// Creates the pool singleton if missing and returns the current pool.
    async fn initialize_pool(&self, total: Decimal, reserve: Decimal) -> Result<Pool, LedgerError>;

    /// Overwrites the pool total.
    async fn set_pool_total(&self, amount: Decimal, actor: Actor) -> Result<Pool, LedgerError>;

    /// Overwrites the reserve.
    async fn set_reserve(&self, amount: Decimal, actor: Actor) -> Result<Pool, LedgerError>;

    /// Overwrites the total and the reserve together in one atomic unit.
    async fn update_pool(&self, update: PoolUpdate, actor: Actor) -> Result<Pool, LedgerError>;

    // ========== Balance mutations ==========

    /// Moves funds between two accounts.
    async fn transfer(&self, request: TransferRequest) -> Result<Transaction, LedgerError>;

    /// Credits an account from the pool.
    async fn grant(&self, request: AllocationRequest) -> Result<Transaction, LedgerError>;

    /// Applies a signed correction between the pool and an account.
    async fn adjust(&self, request: AllocationRequest) -> Result<Transaction, LedgerError>;

    // ========== Account control ==========

    /// Freezes an account.
    async fn freeze(
        &self,
        account_number: &str,
        reason: Option<String>,
        actor: Actor,
    ) -> Result<Account, LedgerError>;

    /// Unfreezes an account.
    async fn unfreeze(
        &self,
        account_number: &str,
        reason: Option<String>,
        actor: Actor,
    ) -> Result<Account, LedgerError>;

    /// Sets the per-transaction transfer limit.
    async fn set_limit(
        &self,
        account_number: &str,
        limit: Decimal,
        reason: Option<String>,
        actor: Actor,
    ) -> Result<Account, LedgerError>;

    /// Sets the KYC status.
    async fn set_kyc_status(
        &self,
        account_number: &str,
        status: KycStatus,
        actor: Actor,
    ) -> Result<Account, LedgerError>;

    /// Flags a transaction for review.
    async fn flag_transaction(
        &self,
        transaction_id: TransactionId,
        reason: Option<String>,
        actor: Actor,
    ) -> Result<Flag, LedgerError>;

    // ========== Provisioning ==========

    /// Inserts an account, unique on identity and on account number.
    ///
    /// Returns `Existing` if the identity already has an account, and
    /// `AccountNumberTaken` if the number belongs to someone else.
    async fn insert_account(&self, account: NewAccount) -> Result<InsertOutcome, LedgerError>;

    /// Marks one of the user's notifications as read.
    async fn mark_notification_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> Result<Notification, LedgerError>;

    // ========== Reads ==========

    /// Returns the pool.
    async fn pool(&self) -> Result<Pool, LedgerError>;

    /// Returns the account owned by the given identity.
    async fn account_by_id(&self, id: UserId) -> Result<Option<Account>, LedgerError>;

    /// Resolves an account number to its public summary.
    async fn lookup_account(&self, account_number: &str) -> Result<Option<AccountSummary>, LedgerError>;

    /// Returns all accounts ordered by balance, largest first.
    async fn list_accounts(&self) -> Result<Vec<Account>, LedgerError>;

    /// Returns the most recent audit entries, newest first.
    async fn recent_audit(&self, limit: u64) -> Result<Vec<AuditEntry>, LedgerError>;

    /// Returns the most recent flags, newest first.
    async fn recent_flags(&self, limit: u64) -> Result<Vec<Flag>, LedgerError>;

    /// Returns the user's most recent transactions, newest first.
    async fn transactions_for_user(
        &self,
        user: UserId,
        limit: u64,
    ) -> Result<Vec<Transaction>, LedgerError>;

    /// Returns the user's most recent notifications, newest first.
    async fn notifications_for_user(
        &self,
        user: UserId,
        limit: u64,
    ) -> Result<Vec<Notification>, LedgerError>;

    /// Returns the administrative overview.
    ///
    /// The default composes the individual reads; stores that can read a
    /// single snapshot override it.
    async fn overview(&self, limit: u64) -> Result<Overview, LedgerError> {
        let pool = self.pool().await?;
        let accounts = self.list_accounts().await?;
        let audit = self.recent_audit(limit).await?;
        let flags = self.recent_flags(limit).await?;
        Ok(Overview::new(&pool, accounts, audit, flags))
    }
}
