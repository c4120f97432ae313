//! Ledger domain types.
//!
//! One pool singleton, one account per user, and append-only logs of
//! transactions, audit entries, notifications and flags.

use chrono::{DateTime, Utc};
use poolbank_shared::types::{AuditEntryId, FlagId, NotificationId, TransactionId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Generates `as_str`, `Display` and `FromStr` for enums persisted as text.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Returns the persisted text form.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($name), ": {}"),
                        other
                    )),
                }
            }
        }
    };
}

// ============================================================================
// Pool
// ============================================================================

/// The bank pool singleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Allocatable total; grants and positive adjustments draw from it.
    pub total_amount: Decimal,
    /// Administrator-managed reserve, never spent by grants or adjustments.
    pub reserve_amount: Decimal,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Pool {
    /// Creates a pool with the given totals.
    #[must_use]
    pub fn new(total_amount: Decimal, reserve_amount: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            total_amount,
            reserve_amount,
            updated_at: now,
        }
    }

    /// Returns the amount grants and adjustments may spend.
    #[must_use]
    pub fn allocatable(&self) -> Decimal {
        self.total_amount
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// KYC verification state of an account holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    /// Documents not yet reviewed.
    Pending,
    /// Identity verified.
    Verified,
    /// Verification rejected.
    Rejected,
}

text_enum!(KycStatus {
    Pending => "pending",
    Verified => "verified",
    Rejected => "rejected",
});

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identity, shared with the owning user.
    pub id: UserId,
    /// Unique, immutable account number.
    pub account_number: String,
    /// Holder's display name.
    pub full_name: Option<String>,
    /// Total balance, never negative.
    pub balance: Decimal,
    /// Portion of the balance that cannot be spent.
    pub held_amount: Decimal,
    /// Whether outbound transfers are blocked.
    pub is_frozen: bool,
    /// Reason recorded with the last freeze.
    pub freeze_reason: Option<String>,
    /// Per-transaction ceiling for outbound transfers.
    pub daily_limit: Option<Decimal>,
    /// KYC state.
    pub kyc_status: KycStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates an empty, unfrozen account.
    #[must_use]
    pub fn new(
        id: UserId,
        account_number: String,
        full_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_number,
            full_name,
            balance: Decimal::ZERO,
            held_amount: Decimal::ZERO,
            is_frozen: false,
            freeze_reason: None,
            daily_limit: None,
            kyc_status: KycStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the spendable balance (`balance - held_amount`).
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.balance - self.held_amount
    }

    /// Returns the public view used for receiver lookups.
    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            full_name: self.full_name.clone(),
            account_number: self.account_number.clone(),
        }
    }
}

/// Read-only account resolution result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Holder's display name.
    pub full_name: Option<String>,
    /// Account number.
    pub account_number: String,
}

// ============================================================================
// Transactions
// ============================================================================

/// What produced a transaction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Account-to-account transfer.
    Transfer,
    /// Pool-to-account allocation.
    Grant,
    /// Signed administrative correction.
    Adjust,
}

text_enum!(TransactionKind {
    Transfer => "transfer",
    Grant => "grant",
    Adjust => "adjust",
});

/// Transaction status. Rows are only written on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Fully applied.
    Completed,
}

text_enum!(TransactionStatus {
    Completed => "completed",
});

/// An immutable ledger transaction. `None` on either side means the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Origin of the movement.
    pub kind: TransactionKind,
    /// Debited account number.
    pub from_account: Option<String>,
    /// Credited account number.
    pub to_account: Option<String>,
    /// Debited user.
    pub from_user: Option<UserId>,
    /// Credited user.
    pub to_user: Option<UserId>,
    /// Display name of the debited side.
    pub from_name: Option<String>,
    /// Display name of the credited side.
    pub to_name: Option<String>,
    /// Amount moved, always positive.
    pub amount: Decimal,
    /// Change of the pool total caused by this transaction.
    pub pool_delta: Decimal,
    /// Status.
    pub status: TransactionStatus,
    /// Free-text reference.
    pub reference: Option<String>,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns true if the user is on either side of the transaction.
    #[must_use]
    pub fn involves(&self, user: UserId) -> bool {
        self.from_user == Some(user) || self.to_user == Some(user)
    }
}

// ============================================================================
// Audit
// ============================================================================

/// Who performed an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    /// Bank administrator.
    Admin,
    /// Automated process.
    System,
    /// Account holder.
    User,
}

text_enum!(ActorRole {
    Admin => "admin",
    System => "system",
    User => "user",
});

/// The actor behind a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Acting user, if any.
    pub id: Option<UserId>,
    /// Acting role.
    pub role: ActorRole,
}

impl Actor {
    /// An administrator.
    #[must_use]
    pub const fn admin(id: UserId) -> Self {
        Self {
            id: Some(id),
            role: ActorRole::Admin,
        }
    }

    /// An account holder acting on their own account.
    #[must_use]
    pub const fn user(id: UserId) -> Self {
        Self {
            id: Some(id),
            role: ActorRole::User,
        }
    }

    /// The system itself.
    #[must_use]
    pub const fn system() -> Self {
        Self {
            id: None,
            role: ActorRole::System,
        }
    }
}

/// Audited operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Peer-to-peer transfer.
    Transfer,
    /// Pool-to-account grant.
    Grant,
    /// Signed adjustment.
    Adjust,
    /// Account frozen.
    Freeze,
    /// Account unfrozen.
    Unfreeze,
    /// Per-transaction limit set.
    SetLimit,
    /// Pool total overwritten.
    SetPoolTotal,
    /// Reserve overwritten.
    SetReserve,
    /// KYC status changed.
    SetKyc,
    /// Transaction flagged.
    FlagTransaction,
    /// Account provisioned for a new identity.
    ProvisionAccount,
}

text_enum!(AuditAction {
    Transfer => "transfer",
    Grant => "grant",
    Adjust => "adjust",
    Freeze => "freeze",
    Unfreeze => "unfreeze",
    SetLimit => "set_limit",
    SetPoolTotal => "set_pool_total",
    SetReserve => "set_reserve",
    SetKyc => "set_kyc",
    FlagTransaction => "flag_transaction",
    ProvisionAccount => "provision_account",
});

/// Immutable audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry ID.
    pub id: AuditEntryId,
    /// Acting user.
    pub actor_id: Option<UserId>,
    /// Acting role.
    pub actor_role: ActorRole,
    /// Operation performed.
    pub action: AuditAction,
    /// Affected account number.
    pub target_account: Option<String>,
    /// Amount involved.
    pub amount: Option<Decimal>,
    /// Free-text reason.
    pub reason: Option<String>,
    /// Operation-specific details.
    pub metadata: JsonValue,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Starts an entry for `action` performed by `actor`.
    #[must_use]
    pub fn new(actor: Actor, action: AuditAction, now: DateTime<Utc>) -> Self {
        Self {
            id: AuditEntryId::new(),
            actor_id: actor.id,
            actor_role: actor.role,
            action,
            target_account: None,
            amount: None,
            reason: None,
            metadata: JsonValue::Object(serde_json::Map::new()),
            created_at: now,
        }
    }

    /// Sets the affected account number.
    #[must_use]
    pub fn target(mut self, account_number: &str) -> Self {
        self.target_account = Some(account_number.to_string());
        self
    }

    /// Sets the amount involved.
    #[must_use]
    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Sets the reason.
    #[must_use]
    pub fn reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// Sets the metadata object.
    #[must_use]
    pub fn metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Kind of user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Incoming transfer.
    TransferReceived,
    /// Outgoing transfer.
    TransferSent,
    /// Funds credited by the bank.
    Credit,
    /// Funds debited by the bank.
    Debit,
    /// Account frozen.
    AccountFrozen,
    /// Account unfrozen.
    AccountUnfrozen,
    /// Transfer limit changed.
    LimitChanged,
}

text_enum!(NotificationKind {
    TransferReceived => "transfer_received",
    TransferSent => "transfer_sent",
    Credit => "credit",
    Debit => "debit",
    AccountFrozen => "account_frozen",
    AccountUnfrozen => "account_unfrozen",
    LimitChanged => "limit_changed",
});

/// A notification for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification ID.
    pub id: NotificationId,
    /// Recipient.
    pub user_id: UserId,
    /// Recipient's account number.
    pub account_number: Option<String>,
    /// Kind.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Human-readable message.
    pub message: String,
    /// Structured details.
    pub metadata: JsonValue,
    /// Whether the recipient has read it.
    pub is_read: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Flags
// ============================================================================

/// Review state of a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlagStatus {
    /// Awaiting review.
    Open,
    /// Reviewed and closed.
    Resolved,
}

text_enum!(FlagStatus {
    Open => "OPEN",
    Resolved => "RESOLVED",
});

/// Advisory anomaly marker on a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    /// Flag ID.
    pub id: FlagId,
    /// Flagged transaction.
    pub transaction_id: TransactionId,
    /// Why it was flagged.
    pub reason: Option<String>,
    /// Review state.
    pub status: FlagStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Overview
// ============================================================================

/// Administrative snapshot of the whole bank.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    /// Allocatable pool total.
    pub pool_total: Decimal,
    /// Reserve.
    pub reserve_amount: Decimal,
    /// `pool_total + reserve_amount + total_balances`.
    pub bank_total: Decimal,
    /// Number of accounts.
    pub total_users: usize,
    /// Sum of all account balances.
    pub total_balances: Decimal,
    /// Number of frozen accounts.
    pub frozen_users: usize,
    /// Accounts ordered by balance, largest first.
    pub accounts: Vec<Account>,
    /// Most recent audit entries, newest first.
    pub audit: Vec<AuditEntry>,
    /// Most recent flags, newest first.
    pub flags: Vec<Flag>,
}

impl Overview {
    /// Builds the overview and its aggregates.
    #[must_use]
    pub fn new(pool: &Pool, mut accounts: Vec<Account>, audit: Vec<AuditEntry>, flags: Vec<Flag>) -> Self {
        accounts.sort_by(|a, b| {
            b.balance
                .cmp(&a.balance)
                .then_with(|| a.account_number.cmp(&b.account_number))
        });

        let total_balances: Decimal = accounts.iter().map(|a| a.balance).sum();
        let frozen_users = accounts.iter().filter(|a| a.is_frozen).count();

        Self {
            pool_total: pool.total_amount,
            reserve_amount: pool.reserve_amount,
            bank_total: pool.total_amount + pool.reserve_amount + total_balances,
            total_users: accounts.len(),
            total_balances,
            frozen_users,
            accounts,
            audit,
            flags,
        }
    }
}
