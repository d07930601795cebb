use super::money::{Amount, Balance};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's internal cash balance, identified by a generated account number.
///
/// One wallet per user. The balance is only ever mutated through the store's
/// settle primitive, never written directly by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    /// The owning user's id, resolved by the caller.
    pub owner: String,
    /// Unique 10-digit numeric string.
    pub account_number: String,
    pub account_name: String,
    pub balance: Balance,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn open(
        owner: impl Into<String>,
        account_number: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.into(),
            account_number: account_number.into(),
            account_name: account_name.into(),
            balance: Balance::ZERO,
            created_at: Utc::now(),
        }
    }

    /// Credits the balance.
    pub fn credit(&mut self, amount: Amount) {
        self.balance += amount.into();
    }

    /// Debits the balance if sufficient.
    pub fn debit(&mut self, amount: Amount) -> Result<()> {
        let required = amount.value();
        if self.balance.0 >= required {
            self.balance -= amount.into();
            Ok(())
        } else {
            Err(LedgerError::InsufficientFunds {
                required,
                available: self.balance.0,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Credit,
    Debit,
}

/// One balance mutation within a settle batch. The store applies a batch
/// all-or-nothing; a debit that would overdraw fails the whole batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceMove {
    pub wallet_id: String,
    pub direction: MoveDirection,
    pub amount: Amount,
}

impl BalanceMove {
    pub fn credit(wallet_id: impl Into<String>, amount: Amount) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            direction: MoveDirection::Credit,
            amount,
        }
    }

    pub fn debit(wallet_id: impl Into<String>, amount: Amount) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            direction: MoveDirection::Debit,
            amount,
        }
    }
}

/// A withdrawal destination registered against a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: String,
    pub wallet_id: String,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
    pub is_default: bool,
}

impl BankAccount {
    pub fn new(wallet_id: impl Into<String>, details: NewBankAccount) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            wallet_id: wallet_id.into(),
            bank_name: details.bank_name,
            account_number: details.account_number,
            account_name: details.account_name,
            is_default: details.is_default,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBankAccount {
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
    pub is_default: bool,
}
