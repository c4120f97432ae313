//! Ledger service for state transitions.
//!
//! This module holds the business rules of every mutating operation. Each
//! function takes the rows a store has already locked, checks preconditions
//! in order, and returns the complete set of writes as a [`LedgerMutation`].
//! It has no database dependencies; stores persist the mutation atomically.

use chrono::{DateTime, Utc};
use poolbank_shared::types::{FlagId, NotificationId, TransactionId};
use rust_decimal::Decimal;
use serde_json::{Value as JsonValue, json};

use super::error::LedgerError;
use super::events::LedgerEvent;
use super::store::PoolUpdate;
use super::types::{
    Account, Actor, AuditAction, AuditEntry, Flag, FlagStatus, KycStatus, Notification,
    NotificationKind, Pool, Transaction, TransactionKind, TransactionStatus,
};
use super::validation;

/// Every write produced by one ledger operation.
///
/// Stores must apply all of it in a single atomic unit.
#[derive(Debug, Clone)]
pub struct LedgerMutation {
    /// New pool state, if the pool changed.
    pub pool: Option<Pool>,
    /// New state of every changed account.
    pub accounts: Vec<Account>,
    /// Transaction row to insert.
    pub transaction: Option<Transaction>,
    /// Audit entry to insert.
    pub audit: AuditEntry,
    /// Further audit entries when one request performs several audited steps.
    pub extra_audit: Vec<AuditEntry>,
    /// Notifications to insert.
    pub notifications: Vec<Notification>,
    /// Flag to insert.
    pub flag: Option<Flag>,
}

impl LedgerMutation {
    fn new(audit: AuditEntry) -> Self {
        Self {
            pool: None,
            accounts: Vec::new(),
            transaction: None,
            audit,
            extra_audit: Vec::new(),
            notifications: Vec::new(),
            flag: None,
        }
    }

    /// Returns every audit entry, in write order.
    #[must_use = "iterators are lazy"]
    pub fn audit_entries(&self) -> impl Iterator<Item = &AuditEntry> {
        std::iter::once(&self.audit).chain(&self.extra_audit)
    }

    /// Folds a later pool-only mutation into this one.
    fn then_pool(mut self, next: Self) -> Self {
        self.pool = next.pool.or(self.pool);
        self.extra_audit.push(next.audit);
        self.extra_audit.extend(next.extra_audit);
        self
    }

    /// Returns the realtime events describing this mutation, in write order.
    #[must_use]
    pub fn events(&self) -> Vec<LedgerEvent> {
        let mut events = Vec::new();
        if let Some(pool) = &self.pool {
            events.push(LedgerEvent::PoolChanged(pool.clone()));
        }
        events.extend(self.accounts.iter().cloned().map(LedgerEvent::AccountChanged));
        if let Some(tx) = &self.transaction {
            events.push(LedgerEvent::TransactionRecorded(tx.clone()));
        }
        events.extend(
            self.notifications
                .iter()
                .cloned()
                .map(LedgerEvent::NotificationCreated),
        );
        events.extend(self.audit_entries().cloned().map(LedgerEvent::AuditRecorded));
        if let Some(flag) = &self.flag {
            events.push(LedgerEvent::FlagRaised(flag.clone()));
        }
        events
    }
}

fn notification(
    account: &Account,
    kind: NotificationKind,
    title: &str,
    message: String,
    metadata: JsonValue,
    now: DateTime<Utc>,
) -> Notification {
    Notification {
        id: NotificationId::new(),
        user_id: account.id,
        account_number: Some(account.account_number.clone()),
        kind,
        title: title.to_string(),
        message,
        metadata,
        is_read: false,
        created_at: now,
    }
}

fn display_name(account: &Account) -> &str {
    account
        .full_name
        .as_deref()
        .unwrap_or(account.account_number.as_str())
}

/// Ledger service for state transitions.
///
/// This service contains pure business logic with no database dependencies.
pub struct LedgerService;

impl LedgerService {
    /// Moves `amount` from `sender` to `receiver`. The pool is untouched.
    ///
    /// Checks, first failure wins: positive amount, distinct accounts,
    /// sender not frozen, per-transaction limit, available balance.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `SelfTransfer`, `AccountFrozen`, `LimitExceeded`
    /// or `InsufficientFunds`.
    pub fn transfer(
        sender: &Account,
        receiver: &Account,
        amount: Decimal,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<LedgerMutation, LedgerError> {
        validation::validate_positive_amount(amount)?;

        if sender.id == receiver.id {
            return Err(LedgerError::SelfTransfer);
        }
        if sender.is_frozen {
            return Err(LedgerError::AccountFrozen {
                reason: sender.freeze_reason.clone(),
            });
        }
        if let Some(limit) = sender.daily_limit
            && amount > limit
        {
            return Err(LedgerError::LimitExceeded {
                limit,
                requested: amount,
            });
        }
        if sender.available() < amount {
            return Err(LedgerError::InsufficientFunds {
                available: sender.available(),
                requested: amount,
            });
        }

        let mut from = sender.clone();
        from.balance -= amount;
        from.updated_at = now;

        let mut to = receiver.clone();
        to.balance += amount;
        to.updated_at = now;

        let tx = Transaction {
            id: TransactionId::new(),
            kind: TransactionKind::Transfer,
            from_account: Some(from.account_number.clone()),
            to_account: Some(to.account_number.clone()),
            from_user: Some(from.id),
            to_user: Some(to.id),
            from_name: from.full_name.clone(),
            to_name: to.full_name.clone(),
            amount,
            pool_delta: Decimal::ZERO,
            status: TransactionStatus::Completed,
            reference: reference.clone(),
            created_at: now,
        };

        let audit = AuditEntry::new(Actor::user(from.id), AuditAction::Transfer, now)
            .target(&from.account_number)
            .amount(amount)
            .reason(reference)
            .metadata(json!({
                "from": from.account_number,
                "to": to.account_number,
                "transaction_id": tx.id,
            }));

        let details = json!({ "transaction_id": tx.id, "amount": amount });
        let notifications = vec![
            notification(
                &to,
                NotificationKind::TransferReceived,
                "Money received",
                format!("You received {amount} from {}", display_name(&from)),
                details.clone(),
                now,
            ),
            notification(
                &from,
                NotificationKind::TransferSent,
                "Money sent",
                format!("You sent {amount} to {}", display_name(&to)),
                details,
                now,
            ),
        ];

        let mut mutation = LedgerMutation::new(audit);
        mutation.accounts = vec![from, to];
        mutation.transaction = Some(tx);
        mutation.notifications = notifications;
        Ok(mutation)
    }

    /// Credits `amount` from the pool's allocatable total to `account`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a non-positive amount, `PoolInsufficient` if
    /// the pool cannot cover it.
    pub fn grant(
        pool: &Pool,
        account: &Account,
        amount: Decimal,
        reason: Option<String>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<LedgerMutation, LedgerError> {
        validation::validate_positive_amount(amount)?;
        Self::credit_from_pool(pool, account, amount, TransactionKind::Grant, reason, actor, now)
    }

    /// Applies a signed correction between the pool and `account`.
    ///
    /// Positive amounts behave like a grant. Negative amounts debit the
    /// account's available balance back into the pool.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for zero, `PoolInsufficient` or `InsufficientFunds`.
    pub fn adjust(
        pool: &Pool,
        account: &Account,
        signed_amount: Decimal,
        reason: Option<String>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<LedgerMutation, LedgerError> {
        validation::validate_adjustment(signed_amount)?;

        if signed_amount > Decimal::ZERO {
            return Self::credit_from_pool(
                pool,
                account,
                signed_amount,
                TransactionKind::Adjust,
                reason,
                actor,
                now,
            );
        }

        let amount = signed_amount.abs();
        if account.available() < amount {
            return Err(LedgerError::InsufficientFunds {
                available: account.available(),
                requested: amount,
            });
        }

        let mut new_pool = pool.clone();
        new_pool.total_amount += amount;
        new_pool.updated_at = now;

        let mut acc = account.clone();
        acc.balance -= amount;
        acc.updated_at = now;

        let tx = Transaction {
            id: TransactionId::new(),
            kind: TransactionKind::Adjust,
            from_account: Some(acc.account_number.clone()),
            to_account: None,
            from_user: Some(acc.id),
            to_user: None,
            from_name: acc.full_name.clone(),
            to_name: None,
            amount,
            pool_delta: amount,
            status: TransactionStatus::Completed,
            reference: reason.clone(),
            created_at: now,
        };

        let audit = AuditEntry::new(actor, AuditAction::Adjust, now)
            .target(&acc.account_number)
            .amount(signed_amount)
            .reason(reason)
            .metadata(json!({ "transaction_id": tx.id, "pool_delta": amount }));

        let debit = notification(
            &acc,
            NotificationKind::Debit,
            "Account debited",
            format!("{amount} was debited from your account"),
            json!({ "transaction_id": tx.id, "amount": amount }),
            now,
        );

        let mut mutation = LedgerMutation::new(audit);
        mutation.pool = Some(new_pool);
        mutation.accounts = vec![acc];
        mutation.transaction = Some(tx);
        mutation.notifications = vec![debit];
        Ok(mutation)
    }

    fn credit_from_pool(
        pool: &Pool,
        account: &Account,
        amount: Decimal,
        kind: TransactionKind,
        reason: Option<String>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<LedgerMutation, LedgerError> {
        if pool.allocatable() < amount {
            return Err(LedgerError::PoolInsufficient {
                available: pool.allocatable(),
                requested: amount,
            });
        }

        let mut new_pool = pool.clone();
        new_pool.total_amount -= amount;
        new_pool.updated_at = now;

        let mut acc = account.clone();
        acc.balance += amount;
        acc.updated_at = now;

        let tx = Transaction {
            id: TransactionId::new(),
            kind,
            from_account: None,
            to_account: Some(acc.account_number.clone()),
            from_user: None,
            to_user: Some(acc.id),
            from_name: None,
            to_name: acc.full_name.clone(),
            amount,
            pool_delta: -amount,
            status: TransactionStatus::Completed,
            reference: reason.clone(),
            created_at: now,
        };

        let action = match kind {
            TransactionKind::Adjust => AuditAction::Adjust,
            TransactionKind::Grant | TransactionKind::Transfer => AuditAction::Grant,
        };
        let audit = AuditEntry::new(actor, action, now)
            .target(&acc.account_number)
            .amount(amount)
            .reason(reason)
            .metadata(json!({ "transaction_id": tx.id, "pool_delta": -amount }));

        let credit = notification(
            &acc,
            NotificationKind::Credit,
            "Account credited",
            format!("{amount} was credited to your account"),
            json!({ "transaction_id": tx.id, "amount": amount }),
            now,
        );

        let mut mutation = LedgerMutation::new(audit);
        mutation.pool = Some(new_pool);
        mutation.accounts = vec![acc];
        mutation.transaction = Some(tx);
        mutation.notifications = vec![credit];
        Ok(mutation)
    }

    /// Freezes `account`. Freezing a frozen account only replaces the reason.
    #[must_use]
    pub fn freeze(
        account: &Account,
        reason: Option<String>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> LedgerMutation {
        let was_frozen = account.is_frozen;

        let mut acc = account.clone();
        acc.is_frozen = true;
        acc.freeze_reason.clone_from(&reason);
        acc.updated_at = now;

        let audit = AuditEntry::new(actor, AuditAction::Freeze, now)
            .target(&acc.account_number)
            .reason(reason.clone())
            .metadata(json!({ "was_frozen": was_frozen }));

        let mut mutation = LedgerMutation::new(audit);
        if !was_frozen {
            mutation.notifications.push(notification(
                &acc,
                NotificationKind::AccountFrozen,
                "Account frozen",
                match &reason {
                    Some(reason) => format!("Your account has been frozen: {reason}"),
                    None => "Your account has been frozen. Please contact support".to_string(),
                },
                json!({}),
                now,
            ));
        }
        mutation.accounts = vec![acc];
        mutation
    }

    /// Unfreezes `account`. Unfreezing an active account is a no-op success.
    #[must_use]
    pub fn unfreeze(
        account: &Account,
        reason: Option<String>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> LedgerMutation {
        let was_frozen = account.is_frozen;

        let audit = AuditEntry::new(actor, AuditAction::Unfreeze, now)
            .target(&account.account_number)
            .reason(reason)
            .metadata(json!({ "was_frozen": was_frozen }));

        let mut mutation = LedgerMutation::new(audit);
        if was_frozen {
            let mut acc = account.clone();
            acc.is_frozen = false;
            acc.freeze_reason = None;
            acc.updated_at = now;

            mutation.notifications.push(notification(
                &acc,
                NotificationKind::AccountUnfrozen,
                "Account unfrozen",
                "Your account is active again".to_string(),
                json!({}),
                now,
            ));
            mutation.accounts = vec![acc];
        }
        mutation
    }

    /// Overwrites the per-transaction transfer limit.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the limit is not positive.
    pub fn set_limit(
        account: &Account,
        limit: Decimal,
        reason: Option<String>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<LedgerMutation, LedgerError> {
        validation::validate_limit(limit)?;

        let previous = account.daily_limit;
        let mut acc = account.clone();
        acc.daily_limit = Some(limit);
        acc.updated_at = now;

        let audit = AuditEntry::new(actor, AuditAction::SetLimit, now)
            .target(&acc.account_number)
            .amount(limit)
            .reason(reason)
            .metadata(json!({ "previous": previous, "limit": limit }));

        let mut mutation = LedgerMutation::new(audit);
        mutation.notifications.push(notification(
            &acc,
            NotificationKind::LimitChanged,
            "Transfer limit changed",
            format!("Your transfer limit is now {limit}"),
            json!({ "limit": limit }),
            now,
        ));
        mutation.accounts = vec![acc];
        Ok(mutation)
    }

    /// Records a KYC review outcome.
    #[must_use]
    pub fn set_kyc(
        account: &Account,
        status: KycStatus,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> LedgerMutation {
        let mut acc = account.clone();
        acc.kyc_status = status;
        acc.updated_at = now;

        let audit = AuditEntry::new(actor, AuditAction::SetKyc, now)
            .target(&acc.account_number)
            .reason(Some(status.as_str().to_string()))
            .metadata(json!({ "previous": account.kyc_status, "status": status }));

        let mut mutation = LedgerMutation::new(audit);
        mutation.accounts = vec![acc];
        mutation
    }

    /// Overwrites the pool total. Reserve and balances are untouched.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the amount is negative.
    pub fn set_pool_total(
        pool: &Pool,
        amount: Decimal,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<LedgerMutation, LedgerError> {
        validation::validate_pool_amount(amount)?;

        let mut new_pool = pool.clone();
        new_pool.total_amount = amount;
        new_pool.updated_at = now;

        let audit = AuditEntry::new(actor, AuditAction::SetPoolTotal, now)
            .amount(amount)
            .metadata(json!({ "previous": pool.total_amount, "total": amount }));

        let mut mutation = LedgerMutation::new(audit);
        mutation.pool = Some(new_pool);
        Ok(mutation)
    }

    /// Overwrites the reserve. The allocatable total is untouched.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the amount is negative.
    pub fn set_reserve(
        pool: &Pool,
        amount: Decimal,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<LedgerMutation, LedgerError> {
        validation::validate_pool_amount(amount)?;

        let mut new_pool = pool.clone();
        new_pool.reserve_amount = amount;
        new_pool.updated_at = now;

        let audit = AuditEntry::new(actor, AuditAction::SetReserve, now)
            .amount(amount)
            .metadata(json!({ "previous": pool.reserve_amount, "reserve": amount }));

        let mut mutation = LedgerMutation::new(audit);
        mutation.pool = Some(new_pool);
        Ok(mutation)
    }

    /// Overwrites the pool total, the reserve, or both as one unit.
    ///
    /// Each overwritten value gets its own audit entry, total first.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if neither value is given or either is negative.
    pub fn update_pool(
        pool: &Pool,
        update: PoolUpdate,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<LedgerMutation, LedgerError> {
        match (update.total, update.reserve) {
            (Some(total), Some(reserve)) => {
                validation::validate_pool_amount(reserve)?;
                let first = Self::set_pool_total(pool, total, actor, now)?;
                let staged = first.pool.clone().unwrap_or_else(|| pool.clone());
                let second = Self::set_reserve(&staged, reserve, actor, now)?;
                Ok(first.then_pool(second))
            }
            (Some(total), None) => Self::set_pool_total(pool, total, actor, now),
            (None, Some(reserve)) => Self::set_reserve(pool, reserve, actor, now),
            (None, None) => Err(LedgerError::Validation(
                "Provide a total, a reserve, or both".to_string(),
            )),
        }
    }

    /// Marks a transaction for review. No balance effect.
    #[must_use]
    pub fn flag(
        transaction: &Transaction,
        reason: Option<String>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> LedgerMutation {
        let flag = Flag {
            id: FlagId::new(),
            transaction_id: transaction.id,
            reason: reason.clone(),
            status: FlagStatus::Open,
            created_at: now,
        };

        let target = transaction
            .from_account
            .as_deref()
            .or(transaction.to_account.as_deref());
        let mut audit = AuditEntry::new(actor, AuditAction::FlagTransaction, now)
            .amount(transaction.amount)
            .reason(reason)
            .metadata(json!({ "transaction_id": transaction.id, "flag_id": flag.id }));
        if let Some(target) = target {
            audit = audit.target(target);
        }

        let mut mutation = LedgerMutation::new(audit);
        mutation.flag = Some(flag);
        mutation
    }

    /// Records creation of a freshly provisioned account.
    #[must_use]
    pub fn provision(account: &Account, now: DateTime<Utc>) -> LedgerMutation {
        let audit = AuditEntry::new(Actor::system(), AuditAction::ProvisionAccount, now)
            .target(&account.account_number)
            .metadata(json!({ "user_id": account.id }));

        let mut mutation = LedgerMutation::new(audit);
        mutation.accounts = vec![account.clone()];
        mutation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolbank_shared::types::UserId;
    use rust_decimal_macros::dec;

    fn account(number: &str, balance: Decimal) -> Account {
        let mut acc = Account::new(UserId::new(), number.to_string(), Some(number.to_string()), Utc::now());
        acc.balance = balance;
        acc
    }

    fn pool(total: Decimal) -> Pool {
        Pool::new(total, Decimal::ZERO, Utc::now())
    }

    fn admin() -> Actor {
        Actor::admin(UserId::new())
    }

    #[test]
    fn test_grant_moves_value_from_pool() {
        let pool = pool(dec!(1000));
        let a = account("7700000001", dec!(0));

        let m = LedgerService::grant(&pool, &a, dec!(300), None, admin(), Utc::now()).unwrap();

        assert_eq!(m.pool.as_ref().unwrap().total_amount, dec!(700));
        assert_eq!(m.accounts[0].balance, dec!(300));
        let tx = m.transaction.unwrap();
        assert_eq!(tx.pool_delta, dec!(-300));
        assert_eq!(tx.from_account, None);
        assert_eq!(tx.kind, TransactionKind::Grant);
        assert_eq!(m.audit.action, AuditAction::Grant);
        assert_eq!(m.notifications[0].kind, NotificationKind::Credit);
    }

    #[test]
    fn test_grant_cannot_spend_reserve() {
        let pool = Pool::new(dec!(100), dec!(500), Utc::now());
        let a = account("7700000001", dec!(0));

        let err = LedgerService::grant(&pool, &a, dec!(150), None, admin(), Utc::now()).unwrap_err();

        assert_eq!(
            err,
            LedgerError::PoolInsufficient {
                available: dec!(100),
                requested: dec!(150),
            }
        );
    }

    #[test]
    fn test_transfer_is_pool_neutral() {
        let a = account("7700000001", dec!(300));
        let b = account("7700000002", dec!(0));

        let m = LedgerService::transfer(&a, &b, dec!(120), Some("lunch".into()), Utc::now()).unwrap();

        assert!(m.pool.is_none());
        assert_eq!(m.accounts[0].balance, dec!(180));
        assert_eq!(m.accounts[1].balance, dec!(120));
        let tx = m.transaction.unwrap();
        assert_eq!(tx.pool_delta, Decimal::ZERO);
        assert_eq!(tx.reference.as_deref(), Some("lunch"));
        assert_eq!(m.audit.metadata["from"], "7700000001");
        assert_eq!(m.audit.metadata["to"], "7700000002");
        assert_eq!(m.notifications.len(), 2);
        assert_eq!(m.notifications[0].user_id, b.id);
    }

    #[test]
    fn test_transfer_rejects_self() {
        let a = account("7700000001", dec!(300));
        let err = LedgerService::transfer(&a, &a, dec!(1), None, Utc::now()).unwrap_err();
        assert_eq!(err, LedgerError::SelfTransfer);
    }

    #[test]
    fn test_transfer_precondition_order() {
        // Frozen wins over limit and funds.
        let mut a = account("7700000001", dec!(10));
        a.is_frozen = true;
        a.freeze_reason = Some("fraud review".into());
        a.daily_limit = Some(dec!(5));
        let b = account("7700000002", dec!(0));

        let err = LedgerService::transfer(&a, &b, dec!(50), None, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            LedgerError::AccountFrozen {
                reason: Some("fraud review".into())
            }
        );

        // Limit wins over funds.
        a.is_frozen = false;
        let err = LedgerService::transfer(&a, &b, dec!(50), None, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::LimitExceeded { .. }));

        a.daily_limit = None;
        let err = LedgerService::transfer(&a, &b, dec!(50), None, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_transfer_respects_held_amount() {
        let mut a = account("7700000001", dec!(100));
        a.held_amount = dec!(60);
        let b = account("7700000002", dec!(0));

        let err = LedgerService::transfer(&a, &b, dec!(50), None, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                available: dec!(40),
                requested: dec!(50),
            }
        );
    }

    #[test]
    fn test_frozen_account_can_receive_and_be_adjusted() {
        let a = account("7700000001", dec!(100));
        let mut b = account("7700000002", dec!(0));
        b.is_frozen = true;

        assert!(LedgerService::transfer(&a, &b, dec!(10), None, Utc::now()).is_ok());
        assert!(LedgerService::grant(&pool(dec!(10)), &b, dec!(10), None, admin(), Utc::now()).is_ok());
    }

    #[test]
    fn test_negative_adjust_returns_value_to_pool() {
        let pool = pool(dec!(700));
        let a = account("7700000001", dec!(180));

        let m = LedgerService::adjust(&pool, &a, dec!(-80), None, admin(), Utc::now()).unwrap();

        assert_eq!(m.pool.as_ref().unwrap().total_amount, dec!(780));
        assert_eq!(m.accounts[0].balance, dec!(100));
        let tx = m.transaction.unwrap();
        assert_eq!(tx.pool_delta, dec!(80));
        assert_eq!(tx.to_account, None);
        assert_eq!(m.audit.amount, Some(dec!(-80)));
        assert_eq!(m.notifications[0].kind, NotificationKind::Debit);
    }

    #[test]
    fn test_negative_adjust_beyond_balance_fails() {
        let pool = pool(dec!(700));
        let a = account("7700000001", dec!(180));

        let err = LedgerService::adjust(&pool, &a, dec!(-400), None, admin(), Utc::now()).unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_positive_adjust_matches_grant() {
        let pool = pool(dec!(50));
        let a = account("7700000001", dec!(0));

        let m = LedgerService::adjust(&pool, &a, dec!(20), None, admin(), Utc::now()).unwrap();
        assert_eq!(m.transaction.unwrap().pool_delta, dec!(-20));
        assert_eq!(m.audit.action, AuditAction::Adjust);

        let err = LedgerService::adjust(&pool, &a, dec!(60), None, admin(), Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::PoolInsufficient { .. }));
    }

    #[test]
    fn test_zero_adjust_is_validation_error() {
        let err = LedgerService::adjust(
            &pool(dec!(1)),
            &account("7700000001", dec!(1)),
            Decimal::ZERO,
            None,
            admin(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_freeze_is_idempotent_and_updates_reason() {
        let a = account("7700000001", dec!(0));

        let first = LedgerService::freeze(&a, Some("kyc".into()), admin(), Utc::now());
        let frozen = first.accounts[0].clone();
        assert!(frozen.is_frozen);
        assert_eq!(first.notifications.len(), 1);

        let second = LedgerService::freeze(&frozen, Some("fraud".into()), admin(), Utc::now());
        assert_eq!(second.accounts[0].freeze_reason.as_deref(), Some("fraud"));
        assert!(second.notifications.is_empty());
        assert_eq!(second.audit.action, AuditAction::Freeze);
    }

    #[test]
    fn test_unfreeze_active_account_is_noop() {
        let a = account("7700000001", dec!(0));
        let m = LedgerService::unfreeze(&a, None, admin(), Utc::now());
        assert!(m.accounts.is_empty());
        assert!(m.notifications.is_empty());
        assert_eq!(m.audit.action, AuditAction::Unfreeze);
    }

    #[test]
    fn test_set_limit_requires_positive() {
        let a = account("7700000001", dec!(0));
        assert!(LedgerService::set_limit(&a, dec!(0), None, admin(), Utc::now()).is_err());

        let m = LedgerService::set_limit(&a, dec!(50), None, admin(), Utc::now()).unwrap();
        assert_eq!(m.accounts[0].daily_limit, Some(dec!(50)));
        assert_eq!(m.audit.action, AuditAction::SetLimit);
    }

    #[test]
    fn test_set_pool_total_leaves_reserve() {
        let pool = Pool::new(dec!(100), dec!(40), Utc::now());
        let m = LedgerService::set_pool_total(&pool, dec!(5000), admin(), Utc::now()).unwrap();
        let new_pool = m.pool.unwrap();
        assert_eq!(new_pool.total_amount, dec!(5000));
        assert_eq!(new_pool.reserve_amount, dec!(40));
        assert!(m.accounts.is_empty());

        assert!(LedgerService::set_pool_total(&pool, dec!(-1), admin(), Utc::now()).is_err());
    }

    #[test]
    fn test_set_reserve_leaves_total() {
        let pool = Pool::new(dec!(100), dec!(40), Utc::now());
        let m = LedgerService::set_reserve(&pool, dec!(0), admin(), Utc::now()).unwrap();
        let new_pool = m.pool.unwrap();
        assert_eq!(new_pool.total_amount, dec!(100));
        assert_eq!(new_pool.reserve_amount, dec!(0));
        assert_eq!(m.audit.action, AuditAction::SetReserve);
    }

    #[test]
    fn test_update_pool_writes_both_values_in_one_mutation() {
        let pool = Pool::new(dec!(100), dec!(40), Utc::now());
        let update = PoolUpdate {
            total: Some(dec!(900)),
            reserve: Some(dec!(60)),
        };

        let m = LedgerService::update_pool(&pool, update, admin(), Utc::now()).unwrap();

        let new_pool = m.pool.clone().unwrap();
        assert_eq!(new_pool.total_amount, dec!(900));
        assert_eq!(new_pool.reserve_amount, dec!(60));
        let actions: Vec<_> = m.audit_entries().map(|a| a.action).collect();
        assert_eq!(actions, vec![AuditAction::SetPoolTotal, AuditAction::SetReserve]);

        let events = m.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], LedgerEvent::PoolChanged(_)));
    }

    #[test]
    fn test_update_pool_rejects_before_writing_anything() {
        let pool = Pool::new(dec!(100), dec!(40), Utc::now());

        let negative_reserve = PoolUpdate {
            total: Some(dec!(900)),
            reserve: Some(dec!(-1)),
        };
        assert!(matches!(
            LedgerService::update_pool(&pool, negative_reserve, admin(), Utc::now()),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            LedgerService::update_pool(&pool, PoolUpdate::default(), admin(), Utc::now()),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_flag_has_no_balance_effect() {
        let a = account("7700000001", dec!(300));
        let b = account("7700000002", dec!(0));
        let tx = LedgerService::transfer(&a, &b, dec!(1), None, Utc::now())
            .unwrap()
            .transaction
            .unwrap();

        let m = LedgerService::flag(&tx, Some("velocity".into()), admin(), Utc::now());

        assert!(m.pool.is_none());
        assert!(m.accounts.is_empty());
        let flag = m.flag.unwrap();
        assert_eq!(flag.status, FlagStatus::Open);
        assert_eq!(flag.transaction_id, tx.id);
        assert_eq!(m.audit.target_account.as_deref(), Some("7700000001"));
    }

    #[test]
    fn test_events_follow_write_order() {
        let m = LedgerService::grant(
            &pool(dec!(10)),
            &account("7700000001", dec!(0)),
            dec!(5),
            None,
            admin(),
            Utc::now(),
        )
        .unwrap();

        let names: Vec<_> = m.events().iter().map(LedgerEvent::name).collect();
        assert_eq!(
            names,
            vec![
                "pool_changed",
                "account_changed",
                "transaction_recorded",
                "notification_created",
                "audit_recorded",
            ]
        );
    }
}
