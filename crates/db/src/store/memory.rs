//! In-process ledger store.
//!
//! All state sits behind one async mutex, which makes every operation
//! trivially serializable. Events are published before the lock is released
//! so delivery order matches commit order. Used by tests and local runs
//! without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use poolbank_core::ledger::validation::{self, normalize_text};
use poolbank_core::ledger::{
    Account, AccountSummary, Actor, AllocationRequest, AuditEntry, EventBus, Flag, InsertOutcome,
    KycStatus, LedgerError, LedgerEvent, LedgerMutation, LedgerService, LedgerStore, NewAccount,
    Notification, Overview, Pool, PoolUpdate, Transaction, TransferRequest,
};
use poolbank_shared::types::{NotificationId, TransactionId, UserId};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Default)]
struct State {
    pool: Option<Pool>,
    accounts: HashMap<UserId, Account>,
    numbers: HashMap<String, UserId>,
    transactions: Vec<Transaction>,
    audit: Vec<AuditEntry>,
    notifications: Vec<Notification>,
    flags: Vec<Flag>,
}

impl State {
    fn pool(&self) -> Result<&Pool, LedgerError> {
        self.pool.as_ref().ok_or(LedgerError::PoolNotInitialized)
    }

    fn account_by_number(&self, account_number: &str) -> Option<&Account> {
        self.numbers
            .get(account_number)
            .and_then(|id| self.accounts.get(id))
    }

    fn require_account(&self, account_number: &str) -> Result<&Account, LedgerError> {
        self.account_by_number(account_number)
            .ok_or_else(|| LedgerError::AccountNotFound(account_number.to_string()))
    }

    fn apply(&mut self, mutation: &LedgerMutation) {
        if let Some(pool) = &mutation.pool {
            self.pool = Some(pool.clone());
        }
        for account in &mutation.accounts {
            self.numbers
                .insert(account.account_number.clone(), account.id);
            self.accounts.insert(account.id, account.clone());
        }
        if let Some(tx) = &mutation.transaction {
            self.transactions.push(tx.clone());
        }
        self.audit.extend(mutation.audit_entries().cloned());
        self.notifications
            .extend(mutation.notifications.iter().cloned());
        if let Some(flag) = &mutation.flag {
            self.flags.push(flag.clone());
        }
    }
}

/// Returns the last `limit` items of an append-only log, newest first.
fn newest<T: Clone>(items: impl DoubleEndedIterator<Item = T>, limit: u64) -> Vec<T> {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    items.rev().take(limit).collect()
}

/// Ledger store held in memory.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: Mutex<State>,
    events: EventBus,
}

impl MemoryLedgerStore {
    /// Creates an empty store without a pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose pool is already initialized.
    #[must_use]
    pub fn with_pool(total: Decimal, reserve: Decimal) -> Self {
        Self {
            state: Mutex::new(State {
                pool: Some(Pool::new(total, reserve, Utc::now())),
                ..State::default()
            }),
            events: EventBus::default(),
        }
    }

    /// Applies `mutation` and publishes its events under the state lock.
    fn commit(&self, state: &mut State, mutation: &LedgerMutation) {
        state.apply(mutation);
        self.events.publish(mutation.events());
    }

    async fn control<F>(&self, account_number: &str, op: F) -> Result<Account, LedgerError>
    where
        F: FnOnce(&Account) -> Result<LedgerMutation, LedgerError> + Send,
    {
        let mut state = self.state.lock().await;
        let account = state.require_account(account_number)?.clone();
        let mutation = op(&account)?;
        self.commit(&mut state, &mutation);

        info!(action = %mutation.audit.action, account = %account_number, "Account control committed");
        Ok(mutation.accounts.first().cloned().unwrap_or(account))
    }

    async fn allocate<F>(&self, request: AllocationRequest, op: F) -> Result<Transaction, LedgerError>
    where
        F: FnOnce(&Pool, &Account, Option<String>) -> Result<LedgerMutation, LedgerError> + Send,
    {
        let reason = normalize_text(request.reason.as_deref());

        let mut state = self.state.lock().await;
        let account = state.require_account(&request.account_number)?.clone();
        let pool = state.pool()?.clone();
        let mutation = op(&pool, &account, reason)?;
        let tx = mutation
            .transaction
            .clone()
            .ok_or_else(|| LedgerError::Internal("allocation produced no transaction".into()))?;
        self.commit(&mut state, &mutation);

        info!(
            action = %mutation.audit.action,
            account = %request.account_number,
            amount = %request.amount,
            "Allocation committed"
        );
        Ok(tx)
    }

    async fn administer<F>(&self, op: F) -> Result<Pool, LedgerError>
    where
        F: FnOnce(&Pool) -> Result<LedgerMutation, LedgerError> + Send,
    {
        let mut state = self.state.lock().await;
        let pool = state.pool()?.clone();
        let mutation = op(&pool)?;
        self.commit(&mut state, &mutation);

        let updated = mutation.pool.unwrap_or(pool);
        info!(
            action = %mutation.audit.action,
            total = %updated.total_amount,
            reserve = %updated.reserve_amount,
            "Pool administration committed"
        );
        Ok(updated)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    fn events(&self) -> &EventBus {
        &self.events
    }

    async fn initialize_pool(&self, total: Decimal, reserve: Decimal) -> Result<Pool, LedgerError> {
        validation::validate_pool_amount(total)?;
        validation::validate_pool_amount(reserve)?;

        let mut state = self.state.lock().await;
        if let Some(pool) = &state.pool {
            return Ok(pool.clone());
        }
        let pool = Pool::new(total, reserve, Utc::now());
        state.pool = Some(pool.clone());
        self.events.publish([LedgerEvent::PoolChanged(pool.clone())]);
        Ok(pool)
    }

    async fn set_pool_total(&self, amount: Decimal, actor: Actor) -> Result<Pool, LedgerError> {
        validation::validate_pool_amount(amount)?;
        self.administer(|pool| LedgerService::set_pool_total(pool, amount, actor, Utc::now()))
            .await
    }

    async fn set_reserve(&self, amount: Decimal, actor: Actor) -> Result<Pool, LedgerError> {
        validation::validate_pool_amount(amount)?;
        self.administer(|pool| LedgerService::set_reserve(pool, amount, actor, Utc::now()))
            .await
    }

    async fn update_pool(&self, update: PoolUpdate, actor: Actor) -> Result<Pool, LedgerError> {
        for amount in [update.total, update.reserve].into_iter().flatten() {
            validation::validate_pool_amount(amount)?;
        }
        self.administer(|pool| LedgerService::update_pool(pool, update, actor, Utc::now()))
            .await
    }

    async fn transfer(&self, request: TransferRequest) -> Result<Transaction, LedgerError> {
        validation::validate_positive_amount(request.amount)?;
        let reference = normalize_text(request.reference.as_deref());

        let mut state = self.state.lock().await;
        let receiver = state
            .account_by_number(&request.to_account_number)
            .cloned()
            .ok_or_else(|| LedgerError::ReceiverNotFound(request.to_account_number.clone()))?;
        let sender = state
            .accounts
            .get(&request.from)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound(request.from.to_string()))?;

        let mutation =
            LedgerService::transfer(&sender, &receiver, request.amount, reference, Utc::now())?;
        let tx = mutation
            .transaction
            .clone()
            .ok_or_else(|| LedgerError::Internal("transfer produced no transaction".into()))?;
        self.commit(&mut state, &mutation);

        info!(
            action = "transfer",
            from = %sender.account_number,
            to = %receiver.account_number,
            amount = %request.amount,
            "Transfer committed"
        );
        Ok(tx)
    }

    async fn grant(&self, request: AllocationRequest) -> Result<Transaction, LedgerError> {
        validation::validate_positive_amount(request.amount)?;
        let (amount, actor) = (request.amount, request.actor);
        self.allocate(request, |pool, account, reason| {
            LedgerService::grant(pool, account, amount, reason, actor, Utc::now())
        })
        .await
    }

    async fn adjust(&self, request: AllocationRequest) -> Result<Transaction, LedgerError> {
        validation::validate_adjustment(request.amount)?;
        let (amount, actor) = (request.amount, request.actor);
        self.allocate(request, |pool, account, reason| {
            LedgerService::adjust(pool, account, amount, reason, actor, Utc::now())
        })
        .await
    }

    async fn freeze(
        &self,
        account_number: &str,
        reason: Option<String>,
        actor: Actor,
    ) -> Result<Account, LedgerError> {
        let reason = normalize_text(reason.as_deref());
        self.control(account_number, |account| {
            Ok(LedgerService::freeze(account, reason, actor, Utc::now()))
        })
        .await
    }

    async fn unfreeze(
        &self,
        account_number: &str,
        reason: Option<String>,
        actor: Actor,
    ) -> Result<Account, LedgerError> {
        let reason = normalize_text(reason.as_deref());
        self.control(account_number, |account| {
            Ok(LedgerService::unfreeze(account, reason, actor, Utc::now()))
        })
        .await
    }

    async fn set_limit(
        &self,
        account_number: &str,
        limit: Decimal,
        reason: Option<String>,
        actor: Actor,
    ) -> Result<Account, LedgerError> {
        validation::validate_limit(limit)?;
        let reason = normalize_text(reason.as_deref());
        self.control(account_number, |account| {
            LedgerService::set_limit(account, limit, reason, actor, Utc::now())
        })
        .await
    }

    async fn set_kyc_status(
        &self,
        account_number: &str,
        status: KycStatus,
        actor: Actor,
    ) -> Result<Account, LedgerError> {
        self.control(account_number, |account| {
            Ok(LedgerService::set_kyc(account, status, actor, Utc::now()))
        })
        .await
    }

    async fn flag_transaction(
        &self,
        transaction_id: TransactionId,
        reason: Option<String>,
        actor: Actor,
    ) -> Result<Flag, LedgerError> {
        let reason = normalize_text(reason.as_deref());

        let mut state = self.state.lock().await;
        let tx = state
            .transactions
            .iter()
            .find(|tx| tx.id == transaction_id)
            .cloned()
            .ok_or(LedgerError::TransactionNotFound(transaction_id))?;

        let mutation = LedgerService::flag(&tx, reason, actor, Utc::now());
        let flag = mutation
            .flag
            .clone()
            .ok_or_else(|| LedgerError::Internal("flag operation produced no flag".into()))?;
        self.commit(&mut state, &mutation);

        info!(action = "flag_transaction", transaction_id = %transaction_id, "Transaction flagged");
        Ok(flag)
    }

    async fn insert_account(&self, account: NewAccount) -> Result<InsertOutcome, LedgerError> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.accounts.get(&account.id).cloned() {
            let Some(name) = account
                .full_name
                .filter(|name| existing.full_name.as_ref() != Some(name))
            else {
                return Ok(InsertOutcome::Existing(existing));
            };

            let mut updated = existing;
            updated.full_name = Some(name.clone());
            updated.updated_at = Utc::now();
            for tx in &mut state.transactions {
                if tx.from_account.as_deref() == Some(updated.account_number.as_str()) {
                    tx.from_name = Some(name.clone());
                }
                if tx.to_account.as_deref() == Some(updated.account_number.as_str()) {
                    tx.to_name = Some(name.clone());
                }
            }
            state.accounts.insert(updated.id, updated.clone());
            self.events
                .publish([LedgerEvent::AccountChanged(updated.clone())]);
            return Ok(InsertOutcome::Existing(updated));
        }

        if state.numbers.contains_key(&account.account_number) {
            return Err(LedgerError::AccountNumberTaken(account.account_number));
        }

        let now = Utc::now();
        let created = Account::new(account.id, account.account_number, account.full_name, now);
        let mutation = LedgerService::provision(&created, now);
        self.commit(&mut state, &mutation);

        info!(action = "provision_account", account = %created.account_number, "Account created");
        Ok(InsertOutcome::Created(created))
    }

    async fn mark_notification_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> Result<Notification, LedgerError> {
        let mut state = self.state.lock().await;
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user)
            .ok_or(LedgerError::NotificationNotFound(id))?;
        notification.is_read = true;
        let updated = notification.clone();

        self.events
            .publish([LedgerEvent::NotificationRead { id, user_id: user }]);
        Ok(updated)
    }

    async fn pool(&self) -> Result<Pool, LedgerError> {
        self.state.lock().await.pool().cloned()
    }

    async fn account_by_id(&self, id: UserId) -> Result<Option<Account>, LedgerError> {
        Ok(self.state.lock().await.accounts.get(&id).cloned())
    }

    async fn lookup_account(
        &self,
        account_number: &str,
    ) -> Result<Option<AccountSummary>, LedgerError> {
        Ok(self
            .state
            .lock()
            .await
            .account_by_number(account_number)
            .map(Account::summary))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let state = self.state.lock().await;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| {
            b.balance
                .cmp(&a.balance)
                .then_with(|| a.account_number.cmp(&b.account_number))
        });
        Ok(accounts)
    }

    async fn recent_audit(&self, limit: u64) -> Result<Vec<AuditEntry>, LedgerError> {
        let state = self.state.lock().await;
        Ok(newest(state.audit.iter().cloned(), limit))
    }

    async fn recent_flags(&self, limit: u64) -> Result<Vec<Flag>, LedgerError> {
        let state = self.state.lock().await;
        Ok(newest(state.flags.iter().cloned(), limit))
    }

    async fn transactions_for_user(
        &self,
        user: UserId,
        limit: u64,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let state = self.state.lock().await;
        Ok(newest(
            state.transactions.iter().filter(|tx| tx.involves(user)).cloned(),
            limit,
        ))
    }

    async fn notifications_for_user(
        &self,
        user: UserId,
        limit: u64,
    ) -> Result<Vec<Notification>, LedgerError> {
        let state = self.state.lock().await;
        Ok(newest(
            state
                .notifications
                .iter()
                .filter(|n| n.user_id == user)
                .cloned(),
            limit,
        ))
    }

    async fn overview(&self, limit: u64) -> Result<Overview, LedgerError> {
        let state = self.state.lock().await;
        let pool = state.pool()?.clone();
        let accounts = state.accounts.values().cloned().collect();
        let audit = newest(state.audit.iter().cloned(), limit);
        let flags = newest(state.flags.iter().cloned(), limit);
        Ok(Overview::new(&pool, accounts, audit, flags))
    }
}
