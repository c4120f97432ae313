//! Postgres-backed ledger store.
//!
//! Every mutation runs in one SERIALIZABLE transaction. Rows are locked with
//! `SELECT ... FOR UPDATE`: transfers lock both accounts in ascending id
//! order, grants and adjustments lock the account first and the pool row
//! last. Events are published while holding the publish gate so that the
//! delivery order matches the commit order.
//!
//! The gate is process-wide: the final `COMMIT` of every mutation, including
//! transfers on unrelated accounts, waits for the one before it. Row locks
//! and all reads and writes happen before the gate is taken, so only the
//! commit round trip is serialized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poolbank_core::ledger::validation::{self, normalize_text};
use poolbank_core::ledger::{
    Account, AccountSummary, Actor, AllocationRequest, AuditEntry, EventBus, Flag, InsertOutcome,
    KycStatus, LedgerError, LedgerEvent, LedgerMutation, LedgerService, LedgerStore, NewAccount,
    Notification, Overview, Pool, PoolUpdate, Transaction, TransferRequest,
};
use poolbank_shared::types::{NotificationId, TransactionId, UserId};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    AccessMode, ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DatabaseTransaction, EntityTrait, IsolationLevel, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use tokio::sync::Mutex;
use tracing::info;

use crate::entities::bank_pool::POOL_ID;
use crate::entities::{
    accounts, audit_log, bank_pool, notifications, transaction_flags, transactions,
};
use crate::error::{map_account_insert_err, map_db_err};

async fn read_pool<C: ConnectionTrait>(db: &C) -> Result<Pool, LedgerError> {
    bank_pool::Entity::find_by_id(POOL_ID)
        .one(db)
        .await
        .map_err(map_db_err)?
        .map(Pool::from)
        .ok_or(LedgerError::PoolNotInitialized)
}

async fn read_accounts<C: ConnectionTrait>(db: &C) -> Result<Vec<Account>, LedgerError> {
    accounts::Entity::find()
        .order_by_desc(accounts::Column::Balance)
        .order_by_asc(accounts::Column::AccountNumber)
        .all(db)
        .await
        .map_err(map_db_err)?
        .into_iter()
        .map(Account::try_from)
        .collect()
}

async fn read_audit<C: ConnectionTrait>(
    db: &C,
    limit: u64,
) -> Result<Vec<AuditEntry>, LedgerError> {
    audit_log::Entity::find()
        .order_by_desc(audit_log::Column::CreatedAt)
        .order_by_desc(audit_log::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(map_db_err)?
        .into_iter()
        .map(AuditEntry::try_from)
        .collect()
}

async fn read_flags<C: ConnectionTrait>(db: &C, limit: u64) -> Result<Vec<Flag>, LedgerError> {
    transaction_flags::Entity::find()
        .order_by_desc(transaction_flags::Column::CreatedAt)
        .order_by_desc(transaction_flags::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(map_db_err)?
        .into_iter()
        .map(Flag::try_from)
        .collect()
}

/// Ledger store on Postgres.
pub struct PgLedgerStore {
    db: DatabaseConnection,
    events: EventBus,
    publish_gate: Mutex<()>,
}

impl std::fmt::Debug for PgLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgLedgerStore")
            .field("last_sequence", &self.events.last_sequence())
            .finish_non_exhaustive()
    }
}

impl PgLedgerStore {
    /// Creates a store on an established connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            events: EventBus::default(),
            publish_gate: Mutex::new(()),
        }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn begin(&self) -> Result<DatabaseTransaction, LedgerError> {
        self.db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
            .map_err(map_db_err)
    }

    /// Commits and publishes under the gate.
    async fn commit(
        &self,
        txn: DatabaseTransaction,
        events: Vec<LedgerEvent>,
    ) -> Result<(), LedgerError> {
        let _gate = self.publish_gate.lock().await;
        txn.commit().await.map_err(map_db_err)?;
        self.events.publish(events);
        Ok(())
    }

    async fn lock_pool(txn: &DatabaseTransaction) -> Result<Pool, LedgerError> {
        bank_pool::Entity::find_by_id(POOL_ID)
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(map_db_err)?
            .map(Pool::from)
            .ok_or(LedgerError::PoolNotInitialized)
    }

    async fn lock_account(
        txn: &DatabaseTransaction,
        id: UserId,
    ) -> Result<Option<Account>, LedgerError> {
        accounts::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(map_db_err)?
            .map(Account::try_from)
            .transpose()
    }

    async fn lock_account_by_number(
        txn: &DatabaseTransaction,
        account_number: &str,
    ) -> Result<Account, LedgerError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::AccountNumber.eq(account_number))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| LedgerError::AccountNotFound(account_number.to_string()))?;
        Account::try_from(model)
    }

    /// Writes every part of a mutation inside `txn`.
    async fn apply(txn: &DatabaseTransaction, mutation: &LedgerMutation) -> Result<(), LedgerError> {
        if let Some(pool) = &mutation.pool {
            bank_pool::ActiveModel::from(pool)
                .update(txn)
                .await
                .map_err(map_db_err)?;
        }

        for account in &mutation.accounts {
            accounts::ActiveModel::for_update(account)
                .update(txn)
                .await
                .map_err(map_db_err)?;
        }

        if let Some(tx) = &mutation.transaction {
            transactions::Entity::insert(transactions::ActiveModel::from(tx))
                .exec_without_returning(txn)
                .await
                .map_err(map_db_err)?;
        }

        audit_log::Entity::insert_many(
            mutation
                .audit_entries()
                .map(audit_log::ActiveModel::from),
        )
        .exec_without_returning(txn)
        .await
        .map_err(map_db_err)?;

        if !mutation.notifications.is_empty() {
            notifications::Entity::insert_many(
                mutation
                    .notifications
                    .iter()
                    .map(notifications::ActiveModel::from),
            )
            .exec_without_returning(txn)
            .await
            .map_err(map_db_err)?;
        }

        if let Some(flag) = &mutation.flag {
            transaction_flags::Entity::insert(transaction_flags::ActiveModel::from(flag))
                .exec_without_returning(txn)
                .await
                .map_err(map_db_err)?;
        }

        Ok(())
    }

    /// Runs a single-account control operation.
    async fn control<F>(&self, account_number: &str, op: F) -> Result<Account, LedgerError>
    where
        F: FnOnce(&Account, DateTime<Utc>) -> Result<LedgerMutation, LedgerError> + Send,
    {
        let txn = self.begin().await?;
        let account = Self::lock_account_by_number(&txn, account_number).await?;
        let mutation = op(&account, Utc::now())?;
        Self::apply(&txn, &mutation).await?;

        let action = mutation.audit.action;
        let updated = mutation.accounts.first().cloned().unwrap_or(account);
        self.commit(txn, mutation.events()).await?;

        info!(action = %action, account = %account_number, "Account control committed");
        Ok(updated)
    }

    /// Runs a grant or adjustment: account locked first, pool last.
    async fn allocate<F>(&self, request: AllocationRequest, op: F) -> Result<Transaction, LedgerError>
    where
        F: FnOnce(
                &Pool,
                &Account,
                Decimal,
                Option<String>,
                Actor,
                DateTime<Utc>,
            ) -> Result<LedgerMutation, LedgerError>
            + Send,
    {
        let reason = normalize_text(request.reason.as_deref());

        let txn = self.begin().await?;
        let account = Self::lock_account_by_number(&txn, &request.account_number).await?;
        let pool = Self::lock_pool(&txn).await?;

        let mutation = op(&pool, &account, request.amount, reason, request.actor, Utc::now())?;
        Self::apply(&txn, &mutation).await?;

        let tx = mutation
            .transaction
            .clone()
            .ok_or_else(|| LedgerError::Internal("allocation produced no transaction".into()))?;
        let action = mutation.audit.action;
        self.commit(txn, mutation.events()).await?;

        info!(
            action = %action,
            account = %request.account_number,
            amount = %request.amount,
            "Allocation committed"
        );
        Ok(tx)
    }

    /// Runs a pool administration operation.
    async fn administer<F>(&self, op: F) -> Result<Pool, LedgerError>
    where
        F: FnOnce(&Pool, DateTime<Utc>) -> Result<LedgerMutation, LedgerError> + Send,
    {
        let txn = self.begin().await?;
        let pool = Self::lock_pool(&txn).await?;
        let mutation = op(&pool, Utc::now())?;
        Self::apply(&txn, &mutation).await?;

        let action = mutation.audit.action;
        let updated = mutation.pool.clone().unwrap_or(pool);
        self.commit(txn, mutation.events()).await?;

        info!(
            action = %action,
            total = %updated.total_amount,
            reserve = %updated.reserve_amount,
            "Pool administration committed"
        );
        Ok(updated)
    }

    /// Updates the display name of an existing account and of the
    /// transactions that reference it.
    async fn refresh_profile(
        &self,
        txn: DatabaseTransaction,
        mut account: Account,
        full_name: Option<String>,
    ) -> Result<Account, LedgerError> {
        let Some(name) = full_name.filter(|name| account.full_name.as_ref() != Some(name)) else {
            txn.commit().await.map_err(map_db_err)?;
            return Ok(account);
        };

        account.full_name = Some(name.clone());
        account.updated_at = Utc::now();
        accounts::ActiveModel::for_update(&account)
            .update(&txn)
            .await
            .map_err(map_db_err)?;

        transactions::Entity::update_many()
            .col_expr(transactions::Column::FromName, Expr::value(name.as_str()))
            .filter(transactions::Column::FromAccount.eq(account.account_number.as_str()))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        transactions::Entity::update_many()
            .col_expr(transactions::Column::ToName, Expr::value(name.as_str()))
            .filter(transactions::Column::ToAccount.eq(account.account_number.as_str()))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        self.commit(txn, vec![LedgerEvent::AccountChanged(account.clone())])
            .await?;
        Ok(account)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    fn events(&self) -> &EventBus {
        &self.events
    }

    async fn initialize_pool(&self, total: Decimal, reserve: Decimal) -> Result<Pool, LedgerError> {
        validation::validate_pool_amount(total)?;
        validation::validate_pool_amount(reserve)?;

        let pool = Pool::new(total, reserve, Utc::now());
        let model = bank_pool::ActiveModel {
            id: Set(POOL_ID),
            total_amount: Set(pool.total_amount),
            reserve_amount: Set(pool.reserve_amount),
            updated_at: Set(pool.updated_at.into()),
        };

        let gate = self.publish_gate.lock().await;
        let inserted = bank_pool::Entity::insert(model)
            .on_conflict(OnConflict::column(bank_pool::Column::Id).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)?;
        if inserted > 0 {
            info!(total = %total, reserve = %reserve, "Bank pool initialized");
            self.events.publish([LedgerEvent::PoolChanged(pool)]);
        }
        drop(gate);

        self.pool().await
    }

    async fn set_pool_total(&self, amount: Decimal, actor: Actor) -> Result<Pool, LedgerError> {
        validation::validate_pool_amount(amount)?;
        self.administer(|pool, now| LedgerService::set_pool_total(pool, amount, actor, now))
            .await
    }

    async fn set_reserve(&self, amount: Decimal, actor: Actor) -> Result<Pool, LedgerError> {
        validation::validate_pool_amount(amount)?;
        self.administer(|pool, now| LedgerService::set_reserve(pool, amount, actor, now))
            .await
    }

    async fn update_pool(&self, update: PoolUpdate, actor: Actor) -> Result<Pool, LedgerError> {
        for amount in [update.total, update.reserve].into_iter().flatten() {
            validation::validate_pool_amount(amount)?;
        }
        self.administer(|pool, now| LedgerService::update_pool(pool, update, actor, now))
            .await
    }

    async fn transfer(&self, request: TransferRequest) -> Result<Transaction, LedgerError> {
        validation::validate_positive_amount(request.amount)?;
        let reference = normalize_text(request.reference.as_deref());

        let txn = self.begin().await?;

        let receiver_id = accounts::Entity::find()
            .filter(accounts::Column::AccountNumber.eq(request.to_account_number.as_str()))
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .map(|model| UserId::from_uuid(model.id))
            .ok_or_else(|| LedgerError::ReceiverNotFound(request.to_account_number.clone()))?;

        let mut ids = vec![request.from, receiver_id];
        ids.sort();
        ids.dedup();

        let mut locked = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(account) = Self::lock_account(&txn, id).await? {
                locked.push(account);
            }
        }

        let sender = locked
            .iter()
            .find(|a| a.id == request.from)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound(request.from.to_string()))?;
        let receiver = locked
            .iter()
            .find(|a| a.id == receiver_id)
            .cloned()
            .ok_or_else(|| LedgerError::ReceiverNotFound(request.to_account_number.clone()))?;

        let mutation =
            LedgerService::transfer(&sender, &receiver, request.amount, reference, Utc::now())?;
        Self::apply(&txn, &mutation).await?;

        let tx = mutation
            .transaction
            .clone()
            .ok_or_else(|| LedgerError::Internal("transfer produced no transaction".into()))?;
        self.commit(txn, mutation.events()).await?;

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
        self.allocate(request, LedgerService::grant).await
    }

    async fn adjust(&self, request: AllocationRequest) -> Result<Transaction, LedgerError> {
        validation::validate_adjustment(request.amount)?;
        self.allocate(request, LedgerService::adjust).await
    }

    async fn freeze(
        &self,
        account_number: &str,
        reason: Option<String>,
        actor: Actor,
    ) -> Result<Account, LedgerError> {
        let reason = normalize_text(reason.as_deref());
        self.control(account_number, |account, now| {
            Ok(LedgerService::freeze(account, reason, actor, now))
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
        self.control(account_number, |account, now| {
            Ok(LedgerService::unfreeze(account, reason, actor, now))
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
        self.control(account_number, |account, now| {
            LedgerService::set_limit(account, limit, reason, actor, now)
        })
        .await
    }

    async fn set_kyc_status(
        &self,
        account_number: &str,
        status: KycStatus,
        actor: Actor,
    ) -> Result<Account, LedgerError> {
        self.control(account_number, |account, now| {
            Ok(LedgerService::set_kyc(account, status, actor, now))
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

        let txn = self.begin().await?;
        let model = transactions::Entity::find_by_id(transaction_id.into_inner())
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::TransactionNotFound(transaction_id))?;
        let tx = Transaction::try_from(model)?;

        let mutation = LedgerService::flag(&tx, reason, actor, Utc::now());
        Self::apply(&txn, &mutation).await?;

        let flag = mutation
            .flag
            .clone()
            .ok_or_else(|| LedgerError::Internal("flag operation produced no flag".into()))?;
        self.commit(txn, mutation.events()).await?;

        info!(action = "flag_transaction", transaction_id = %transaction_id, "Transaction flagged");
        Ok(flag)
    }

    async fn insert_account(&self, account: NewAccount) -> Result<InsertOutcome, LedgerError> {
        let txn = self.begin().await?;

        if let Some(existing) = Self::lock_account(&txn, account.id).await? {
            let refreshed = self
                .refresh_profile(txn, existing, account.full_name)
                .await?;
            return Ok(InsertOutcome::Existing(refreshed));
        }

        // A number collision surfaces as a unique violation on insert.
        let now = Utc::now();
        let created = Account::new(account.id, account.account_number, account.full_name, now);
        accounts::Entity::insert(accounts::ActiveModel::for_insert(&created))
            .exec_without_returning(&txn)
            .await
            .map_err(|e| map_account_insert_err(e, &created.account_number))?;

        let mutation = LedgerService::provision(&created, now);
        audit_log::Entity::insert(audit_log::ActiveModel::from(&mutation.audit))
            .exec_without_returning(&txn)
            .await
            .map_err(map_db_err)?;
        self.commit(txn, mutation.events()).await?;

        info!(action = "provision_account", account = %created.account_number, "Account created");
        Ok(InsertOutcome::Created(created))
    }

    async fn mark_notification_read(
        &self,
        user: UserId,
        id: NotificationId,
    ) -> Result<Notification, LedgerError> {
        let txn = self.begin().await?;
        let model = notifications::Entity::find_by_id(id.into_inner())
            .filter(notifications::Column::UserId.eq(user.into_inner()))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or(LedgerError::NotificationNotFound(id))?;

        let mut active: notifications::ActiveModel = model.into();
        active.is_read = Set(true);
        let updated = active.update(&txn).await.map_err(map_db_err)?;

        self.commit(txn, vec![LedgerEvent::NotificationRead { id, user_id: user }])
            .await?;
        Notification::try_from(updated)
    }

    async fn pool(&self) -> Result<Pool, LedgerError> {
        read_pool(&self.db).await
    }

    async fn account_by_id(&self, id: UserId) -> Result<Option<Account>, LedgerError> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(Account::try_from)
            .transpose()
    }

    async fn lookup_account(
        &self,
        account_number: &str,
    ) -> Result<Option<AccountSummary>, LedgerError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::AccountNumber.eq(account_number))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(|m| AccountSummary {
            full_name: m.full_name,
            account_number: m.account_number,
        }))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        read_accounts(&self.db).await
    }

    async fn recent_audit(&self, limit: u64) -> Result<Vec<AuditEntry>, LedgerError> {
        read_audit(&self.db, limit).await
    }

    async fn recent_flags(&self, limit: u64) -> Result<Vec<Flag>, LedgerError> {
        read_flags(&self.db, limit).await
    }

    async fn transactions_for_user(
        &self,
        user: UserId,
        limit: u64,
    ) -> Result<Vec<Transaction>, LedgerError> {
        transactions::Entity::find()
            .filter(
                Condition::any()
                    .add(transactions::Column::FromUser.eq(user.into_inner()))
                    .add(transactions::Column::ToUser.eq(user.into_inner())),
            )
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    async fn notifications_for_user(
        &self,
        user: UserId,
        limit: u64,
    ) -> Result<Vec<Notification>, LedgerError> {
        notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user.into_inner()))
            .order_by_desc(notifications::Column::CreatedAt)
            .order_by_desc(notifications::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(Notification::try_from)
            .collect()
    }

    async fn overview(&self, limit: u64) -> Result<Overview, LedgerError> {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::RepeatableRead),
                Some(AccessMode::ReadOnly),
            )
            .await
            .map_err(map_db_err)?;

        let pool = read_pool(&txn).await?;
        let accounts = read_accounts(&txn).await?;
        let audit = read_audit(&txn, limit).await?;
        let flags = read_flags(&txn, limit).await?;
        txn.commit().await.map_err(map_db_err)?;

        Ok(Overview::new(&pool, accounts, audit, flags))
    }
}
