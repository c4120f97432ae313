//! Property-based tests for LedgerService.
//!
//! - Conservation: transfers, grants and adjustments never change
//!   `pool.total + pool.reserve + sum(balances)`.
//! - Non-negativity: no accepted operation leaves a balance or the pool
//!   total below zero, and rejected operations change nothing.
//! - Frozen accounts and limits block outbound transfers.

use chrono::Utc;
use poolbank_shared::types::UserId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::service::{LedgerMutation, LedgerService};
use super::types::{Account, Actor, Pool};

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate non-zero signed amounts (-10,000.00 to 10,000.00).
fn signed_amount() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        positive_amount(),
        positive_amount().prop_map(|amount| -amount),
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Transfer { from: usize, to: usize, amount: Decimal },
    Grant { to: usize, amount: Decimal },
    Adjust { target: usize, amount: Decimal },
}

fn op_strategy(accounts: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..accounts, 0..accounts, positive_amount())
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        (0..accounts, positive_amount()).prop_map(|(to, amount)| Op::Grant { to, amount }),
        (0..accounts, signed_amount()).prop_map(|(target, amount)| Op::Adjust { target, amount }),
    ]
}

/// In-process model applying mutations the way a store would.
struct Model {
    pool: Pool,
    accounts: Vec<Account>,
}

impl Model {
    fn new(pool_total: Decimal, reserve: Decimal, balances: &[Decimal]) -> Self {
        let now = Utc::now();
        let accounts = balances
            .iter()
            .enumerate()
            .map(|(i, balance)| {
                let mut acc = Account::new(UserId::new(), format!("77{i:08}"), None, now);
                acc.balance = *balance;
                acc
            })
            .collect();
        Self {
            pool: Pool::new(pool_total, reserve, now),
            accounts,
        }
    }

    fn bank_total(&self) -> Decimal {
        self.pool.total_amount
            + self.pool.reserve_amount
            + self.accounts.iter().map(|a| a.balance).sum::<Decimal>()
    }

    fn apply(&mut self, mutation: LedgerMutation) {
        if let Some(pool) = mutation.pool {
            self.pool = pool;
        }
        for updated in mutation.accounts {
            if let Some(slot) = self.accounts.iter_mut().find(|a| a.id == updated.id) {
                *slot = updated;
            }
        }
    }

    fn run(&mut self, op: &Op) -> Result<(), LedgerError> {
        let now = Utc::now();
        let actor = Actor::system();
        let mutation = match *op {
            Op::Transfer { from, to, amount } => LedgerService::transfer(
                &self.accounts[from],
                &self.accounts[to],
                amount,
                None,
                now,
            )?,
            Op::Grant { to, amount } => {
                LedgerService::grant(&self.pool, &self.accounts[to], amount, None, actor, now)?
            }
            Op::Adjust { target, amount } => {
                LedgerService::adjust(&self.pool, &self.accounts[target], amount, None, actor, now)?
            }
        };
        self.apply(mutation);
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The bank total is invariant under any sequence of ledger operations.
    #[test]
    fn prop_conservation(
        pool_total in positive_amount(),
        reserve in positive_amount(),
        balances in prop::collection::vec(positive_amount(), 2..5),
        ops in prop::collection::vec(op_strategy(2), 1..40),
    ) {
        let mut model = Model::new(pool_total, reserve, &balances);
        let before = model.bank_total();

        for op in &ops {
            let _ = model.run(op);
            prop_assert_eq!(model.bank_total(), before);
        }
    }

    /// Balances and the pool total never go negative; failures change nothing.
    #[test]
    fn prop_non_negativity(
        pool_total in positive_amount(),
        balances in prop::collection::vec(positive_amount(), 2..5),
        ops in prop::collection::vec(op_strategy(2), 1..40),
    ) {
        let mut model = Model::new(pool_total, Decimal::ZERO, &balances);

        for op in &ops {
            let pool_before = model.pool.clone();
            let accounts_before = model.accounts.clone();

            if model.run(op).is_err() {
                prop_assert_eq!(&model.pool, &pool_before);
                prop_assert_eq!(&model.accounts, &accounts_before);
            }

            prop_assert!(model.pool.total_amount >= Decimal::ZERO);
            for account in &model.accounts {
                prop_assert!(account.balance >= Decimal::ZERO);
                prop_assert!(account.available() >= Decimal::ZERO);
            }
        }
    }

    /// A frozen sender always fails with AccountFrozen.
    #[test]
    fn prop_frozen_blocks_outbound(
        balance in positive_amount(),
        amount in positive_amount(),
    ) {
        let mut model = Model::new(Decimal::ZERO, Decimal::ZERO, &[balance, Decimal::ZERO]);
        model.accounts[0].is_frozen = true;

        let result = model.run(&Op::Transfer { from: 0, to: 1, amount });

        prop_assert!(
            matches!(result, Err(LedgerError::AccountFrozen { .. })),
            "expected AccountFrozen"
        );
        prop_assert_eq!(model.accounts[0].balance, balance);
        prop_assert_eq!(model.accounts[1].balance, Decimal::ZERO);
    }

    /// An amount above the per-transaction limit always fails with LimitExceeded.
    #[test]
    fn prop_limit_enforced(
        limit in positive_amount(),
        excess in positive_amount(),
    ) {
        let amount = limit + excess;
        let mut model = Model::new(Decimal::ZERO, Decimal::ZERO, &[amount, Decimal::ZERO]);
        model.accounts[0].daily_limit = Some(limit);

        let result = model.run(&Op::Transfer { from: 0, to: 1, amount });

        prop_assert!(
            matches!(result, Err(LedgerError::LimitExceeded { .. })),
            "expected LimitExceeded"
        );
        prop_assert_eq!(model.accounts[0].balance, amount);
    }
}
