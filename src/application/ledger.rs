use crate::domain::money::{Amount, Balance};
use crate::domain::ports::WalletStoreBox;
use crate::domain::transaction::{Transaction, TransactionKind};
use crate::domain::wallet::{BalanceMove, BankAccount, NewBankAccount, Wallet};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::json;

const ACCOUNT_NUMBER_ATTEMPTS: usize = 5;

/// The wallet-side operations: opening and funding wallets, peer transfers,
/// bank withdrawals and transaction history.
///
/// Every method takes the resolved caller's user id explicitly; there is no
/// ambient identity. All validation runs against current persisted state
/// before any write, and every balance mutation goes through the store's
/// settle primitive so partial application is never observable.
pub struct Ledger {
    wallets: WalletStoreBox,
}

/// The outcome of a settled ledger operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub transaction: Transaction,
    /// The caller's wallet balance after settlement.
    pub new_balance: Balance,
}

/// Filters for [`Ledger::statement`]. The default returns the full history.
#[derive(Debug, Clone, Default)]
pub struct StatementQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub kind: Option<TransactionKind>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Ledger {
    pub fn new(wallets: WalletStoreBox) -> Self {
        Self { wallets }
    }

    /// Opens the caller's wallet under a freshly generated account number.
    pub async fn open_wallet(&self, user_id: &str, account_name: &str) -> Result<Wallet> {
        if self.wallets.wallet_by_owner(user_id).await?.is_some() {
            return Err(LedgerError::validation("Wallet already exists"));
        }

        let mut last_conflict = None;
        for _ in 0..ACCOUNT_NUMBER_ATTEMPTS {
            let account_number = generate_account_number();
            if self
                .wallets
                .wallet_by_account_number(&account_number)
                .await?
                .is_some()
            {
                continue;
            }
            match self
                .wallets
                .create_wallet(Wallet::open(user_id, &account_number, account_name))
                .await
            {
                Ok(wallet) => {
                    tracing::info!(
                        user_id,
                        account_number = %wallet.account_number,
                        "wallet opened"
                    );
                    return Ok(wallet);
                }
                Err(err @ LedgerError::Conflict { .. }) => last_conflict = Some(err),
                Err(err) => return Err(err),
            }
        }
        Err(last_conflict.unwrap_or_else(|| {
            LedgerError::Persistence("could not allocate a unique account number".to_string())
        }))
    }

    /// The caller's wallet.
    pub async fn wallet(&self, user_id: &str) -> Result<Wallet> {
        self.wallets
            .wallet_by_owner(user_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("wallet", user_id))
    }

    /// Credits the caller's wallet. The payment gateway is mocked: the
    /// pending transaction settles immediately.
    pub async fn top_up(&self, user_id: &str, amount: Amount) -> Result<Receipt> {
        let wallet = self.wallet(user_id).await?;

        let tx = Transaction::pending(
            &wallet.id,
            TransactionKind::Topup,
            amount,
            format!("Top-up of {amount}"),
        )
        .with_metadata(json!({
            "payment_method": "paystack",
            "payment_status": "successful",
        }));
        let tx = self.wallets.create_transaction(tx).await?;

        let (tx, updated) = self
            .settle_or_fail(&tx.id, &[BalanceMove::credit(&wallet.id, amount)])
            .await?;
        let new_balance = updated[0].balance;
        tracing::info!(user_id, amount = %amount, balance = %new_balance, "wallet topped up");
        Ok(Receipt {
            transaction: tx,
            new_balance,
        })
    }

    /// Moves funds to the wallet behind `recipient_account_number`. The
    /// debit and credit settle together or not at all.
    pub async fn transfer(
        &self,
        user_id: &str,
        recipient_account_number: &str,
        amount: Amount,
        description: Option<&str>,
    ) -> Result<Receipt> {
        let sender = self.wallet(user_id).await?;
        if sender.balance.0 < amount.value() {
            return Err(LedgerError::InsufficientFunds {
                required: amount.value(),
                available: sender.balance.0,
            });
        }

        let recipient = self
            .wallets
            .wallet_by_account_number(recipient_account_number)
            .await?
            .ok_or_else(|| LedgerError::not_found("recipient wallet", recipient_account_number))?;
        if recipient.id == sender.id {
            return Err(LedgerError::validation("Cannot transfer to own wallet"));
        }

        let tx = Transaction::pending(
            &sender.id,
            TransactionKind::Transfer,
            amount,
            description.unwrap_or("Transfer to user"),
        )
        .with_metadata(json!({
            "recipient_account_number": recipient.account_number,
            "recipient_account_name": recipient.account_name,
        }));
        let tx = self.wallets.create_transaction(tx).await?;

        let moves = [
            BalanceMove::debit(&sender.id, amount),
            BalanceMove::credit(&recipient.id, amount),
        ];
        let (tx, updated) = self.settle_or_fail(&tx.id, &moves).await?;
        let new_balance = updated[0].balance;
        tracing::info!(
            user_id,
            recipient = %recipient.account_number,
            amount = %amount,
            "transfer settled"
        );
        Ok(Receipt {
            transaction: tx,
            new_balance,
        })
    }

    /// Debits the caller's wallet towards one of their registered bank
    /// accounts. The payout leg is mocked.
    pub async fn withdraw(
        &self,
        user_id: &str,
        bank_account_id: &str,
        amount: Amount,
    ) -> Result<Receipt> {
        let wallet = self.wallet(user_id).await?;
        if wallet.balance.0 < amount.value() {
            return Err(LedgerError::InsufficientFunds {
                required: amount.value(),
                available: wallet.balance.0,
            });
        }

        let bank_account = self
            .wallets
            .bank_accounts_for_wallet(&wallet.id)
            .await?
            .into_iter()
            .find(|account| account.id == bank_account_id)
            .ok_or_else(|| LedgerError::not_found("bank account", bank_account_id))?;

        let tx = Transaction::pending(
            &wallet.id,
            TransactionKind::Withdrawal,
            amount,
            format!("Withdrawal to {}", bank_account.bank_name),
        )
        .with_metadata(json!({
            "bank_name": bank_account.bank_name,
            "account_number": bank_account.account_number,
            "account_name": bank_account.account_name,
        }));
        let tx = self.wallets.create_transaction(tx).await?;

        let (tx, updated) = self
            .settle_or_fail(&tx.id, &[BalanceMove::debit(&wallet.id, amount)])
            .await?;
        let new_balance = updated[0].balance;
        tracing::info!(user_id, amount = %amount, balance = %new_balance, "withdrawal settled");
        Ok(Receipt {
            transaction: tx,
            new_balance,
        })
    }

    pub async fn add_bank_account(
        &self,
        user_id: &str,
        details: NewBankAccount,
    ) -> Result<BankAccount> {
        let wallet = self.wallet(user_id).await?;
        let account = self
            .wallets
            .create_bank_account(BankAccount::new(&wallet.id, details))
            .await?;
        tracing::info!(user_id, bank = %account.bank_name, "bank account added");
        Ok(account)
    }

    pub async fn bank_accounts(&self, user_id: &str) -> Result<Vec<BankAccount>> {
        let wallet = self.wallet(user_id).await?;
        self.wallets.bank_accounts_for_wallet(&wallet.id).await
    }

    /// The caller's transaction history, newest first.
    pub async fn statement(
        &self,
        user_id: &str,
        query: &StatementQuery,
    ) -> Result<Vec<Transaction>> {
        let wallet = self.wallet(user_id).await?;
        let mut transactions = self.wallets.transactions_for_wallet(&wallet.id).await?;

        transactions.retain(|tx| {
            query.from.is_none_or(|from| tx.created_at >= from)
                && query.to.is_none_or(|to| tx.created_at <= to)
                && query.kind.is_none_or(|kind| tx.kind == kind)
        });
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(transactions
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    /// Consumes the ledger and returns the final state of all wallets.
    pub async fn into_results(self) -> Result<Vec<Wallet>> {
        self.wallets.all_wallets().await
    }

    async fn settle_or_fail(
        &self,
        transaction_id: &str,
        moves: &[BalanceMove],
    ) -> Result<(Transaction, Vec<Wallet>)> {
        match self.wallets.settle(transaction_id, moves).await {
            Ok(settled) => Ok(settled),
            Err(err) => {
                // The pending row must not outlive a refused settlement.
                if let Err(mark_err) = self.wallets.fail_transaction(transaction_id).await {
                    tracing::error!(
                        transaction_id,
                        error = %mark_err,
                        "failed to mark refused transaction"
                    );
                }
                Err(err)
            }
        }
    }
}

/// A random 10-digit account number.
fn generate_account_number() -> String {
    rand::thread_rng()
        .gen_range(1_000_000_000u64..10_000_000_000u64)
        .to_string()
}
