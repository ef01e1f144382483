//! Authoritative karma balances
//!
//! The ledger is the single source of truth for balances and the only
//! component permitted to mutate them. Mutations are *staged* into a
//! [`Batch`](crate::storage::Batch) and become visible only when the caller
//! commits; an engine operation that fails a later precondition therefore
//! leaves balances untouched.
//!
//! # Concurrency
//!
//! Staging reads the current balance and writes the new one, so concurrent
//! staging against the same account would race. The marketplace routes every
//! mutating operation through its single-writer actor, which gives all
//! ledger mutations one total order; callers embedding this crate elsewhere
//! must provide the same discipline.

use crate::{
    error::{Error, Result},
    storage::{Batch, Storage},
    types::{Account, Karma, UserId},
};
use chrono::Utc;
use std::sync::Arc;

/// Balance authority over the accounts column family
#[derive(Clone)]
pub struct Ledger {
    storage: Arc<Storage>,
}

impl Ledger {
    /// Create a ledger over the shared storage
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Current balance for a user
    ///
    /// Accounts are created lazily; an unknown user has a zero balance.
    pub fn balance(&self, user: &UserId) -> Result<Karma> {
        Ok(self
            .storage
            .get_account(user)?
            .map(|account| account.balance)
            .unwrap_or(0))
    }

    /// Stage a credit, returning the balance the commit will establish
    ///
    /// A zero amount is a caller error. Always succeeds otherwise (overflow
    /// of a `u64` balance is treated as a caller error as well).
    pub fn stage_credit(&self, batch: &mut Batch, user: &UserId, amount: Karma) -> Result<Karma> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }

        let balance = self.balance(user)?;
        let new_balance = balance
            .checked_add(amount)
            .ok_or(Error::BalanceOverflow { balance, amount })?;

        self.storage.stage_account(
            batch,
            &Account {
                user_id: user.clone(),
                balance: new_balance,
                updated_at: Utc::now(),
            },
        )?;

        tracing::debug!(user = %user, amount, new_balance, "credit staged");

        Ok(new_balance)
    }

    /// Stage a debit, returning the balance the commit will establish
    ///
    /// Fails with [`Error::InsufficientFunds`] if the balance cannot cover
    /// the amount; balances never go negative.
    pub fn stage_debit(&self, batch: &mut Batch, user: &UserId, amount: Karma) -> Result<Karma> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }

        let balance = self.balance(user)?;
        if balance < amount {
            return Err(Error::InsufficientFunds {
                required: amount,
                balance,
            });
        }

        let new_balance = balance - amount;
        self.storage.stage_account(
            batch,
            &Account {
                user_id: user.clone(),
                balance: new_balance,
                updated_at: Utc::now(),
            },
        )?;

        tracing::debug!(user = %user, amount, new_balance, "debit staged");

        Ok(new_balance)
    }
}
