//! Account provisioning.
//!
//! An account number is a fixed prefix followed by 8 random digits. Uniqueness
//! is enforced by the store; on collision a new number is drawn, up to a fixed
//! number of attempts. Provisioning is idempotent on identity.

use rand::Rng;
use tracing::{info, warn};

use poolbank_shared::types::UserId;

use super::error::LedgerError;
use super::store::{LedgerStore, NewAccount};
use super::types::Account;
use super::validation::{self, normalize_text};

const RANDOM_DIGITS: u32 = 100_000_000;

/// Draws random account numbers with a fixed prefix.
#[derive(Debug, Clone)]
pub struct AccountNumberGenerator {
    prefix: String,
}

impl AccountNumberGenerator {
    /// Creates a generator for the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Draws a number: the prefix followed by 8 zero-padded random digits.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let digits = rng.random_range(0..RANDOM_DIGITS);
        format!("{}{digits:08}", self.prefix)
    }

    /// Returns true if `number` has this generator's shape.
    #[must_use]
    pub fn is_valid(&self, number: &str) -> bool {
        validation::validate_account_number(number, &self.prefix).is_ok()
    }
}

/// Bounded retry loop around [`LedgerStore::insert_account`].
#[derive(Debug, Clone)]
pub struct Provisioner {
    generator: AccountNumberGenerator,
    max_attempts: u32,
}

impl Provisioner {
    /// Creates a provisioner making at most `max_attempts` insert attempts.
    #[must_use]
    pub fn new(generator: AccountNumberGenerator, max_attempts: u32) -> Self {
        Self {
            generator,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Returns the account number generator.
    #[must_use]
    pub const fn generator(&self) -> &AccountNumberGenerator {
        &self.generator
    }

    /// Ensures `identity` has an account, creating one if needed.
    ///
    /// A requested account number is tried first; later attempts draw random
    /// numbers.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed requested number and
    /// `ProvisioningExhausted` when every attempt collided.
    pub async fn provision(
        &self,
        store: &dyn LedgerStore,
        identity: UserId,
        full_name: Option<&str>,
        requested: Option<&str>,
    ) -> Result<Account, LedgerError> {
        self.provision_with(store, identity, full_name, requested, || {
            self.generator.generate(&mut rand::rng())
        })
        .await
    }

    /// Same as [`Provisioner::provision`] with a caller-supplied number source.
    ///
    /// # Errors
    ///
    /// See [`Provisioner::provision`].
    pub async fn provision_with<F>(
        &self,
        store: &dyn LedgerStore,
        identity: UserId,
        full_name: Option<&str>,
        requested: Option<&str>,
        mut next_number: F,
    ) -> Result<Account, LedgerError>
    where
        F: FnMut() -> String + Send,
    {
        let full_name = normalize_text(full_name);
        let mut requested = normalize_text(requested);
        if let Some(number) = &requested {
            validation::validate_account_number(number, self.generator.prefix())?;
        }

        for attempt in 1..=self.max_attempts {
            let account_number = requested.take().unwrap_or_else(&mut next_number);

            let candidate = NewAccount {
                id: identity,
                account_number: account_number.clone(),
                full_name: full_name.clone(),
            };

            match store.insert_account(candidate).await {
                Ok(outcome) => {
                    let created = outcome.is_created();
                    let account = outcome.into_account();
                    info!(
                        user_id = %identity,
                        account = %account.account_number,
                        created,
                        "Account provisioned"
                    );
                    return Ok(account);
                }
                Err(LedgerError::AccountNumberTaken(_)) => {
                    warn!(
                        user_id = %identity,
                        account = %account_number,
                        attempt,
                        "Account number collision, retrying"
                    );
                }
                Err(LedgerError::ConcurrencyConflict) => {
                    warn!(user_id = %identity, attempt, "Provisioning conflict, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(LedgerError::ProvisioningExhausted {
            attempts: self.max_attempts,
        })
    }
}
