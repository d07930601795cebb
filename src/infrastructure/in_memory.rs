use crate::domain::loan::{Loan, LoanStatus, Repayment};
use crate::domain::ports::{LoanStore, WalletStore};
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::domain::wallet::{BalanceMove, BankAccount, MoveDirection, Wallet};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory backend for the wallet-side port.
///
/// All three maps sit behind one `RwLock`: the write guard is the in-memory
/// stand-in for the database transaction scope, which is what makes
/// `settle` atomic across transaction and wallet rows. `Clone` shares the
/// underlying state, so one store can back several services.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    inner: Arc<RwLock<LedgerCells>>,
}

#[derive(Default)]
struct LedgerCells {
    wallets: HashMap<String, Wallet>,
    transactions: HashMap<String, Transaction>,
    bank_accounts: HashMap<String, BankAccount>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryLedgerStore {
    async fn create_wallet(&self, wallet: Wallet) -> Result<Wallet> {
        let mut cells = self.inner.write().await;
        if cells.wallets.values().any(|w| w.owner == wallet.owner) {
            return Err(LedgerError::validation("Wallet already exists"));
        }
        if cells
            .wallets
            .values()
            .any(|w| w.account_number == wallet.account_number)
        {
            return Err(LedgerError::Conflict {
                entity: "wallet",
                id: wallet.account_number.clone(),
            });
        }
        cells.wallets.insert(wallet.id.clone(), wallet.clone());
        Ok(wallet)
    }

    async fn wallet(&self, wallet_id: &str) -> Result<Option<Wallet>> {
        let cells = self.inner.read().await;
        Ok(cells.wallets.get(wallet_id).cloned())
    }

    async fn wallet_by_owner(&self, user_id: &str) -> Result<Option<Wallet>> {
        let cells = self.inner.read().await;
        Ok(cells.wallets.values().find(|w| w.owner == user_id).cloned())
    }

    async fn wallet_by_account_number(&self, account_number: &str) -> Result<Option<Wallet>> {
        let cells = self.inner.read().await;
        Ok(cells
            .wallets
            .values()
            .find(|w| w.account_number == account_number)
            .cloned())
    }

    async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        let cells = self.inner.read().await;
        Ok(cells.wallets.values().cloned().collect())
    }

    async fn create_transaction(&self, tx: Transaction) -> Result<Transaction> {
        let mut cells = self.inner.write().await;
        cells.transactions.insert(tx.id.clone(), tx.clone());
        Ok(tx)
    }

    async fn transaction(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        let cells = self.inner.read().await;
        Ok(cells.transactions.get(transaction_id).cloned())
    }

    async fn transactions_for_wallet(&self, wallet_id: &str) -> Result<Vec<Transaction>> {
        let cells = self.inner.read().await;
        let mut transactions: Vec<Transaction> = cells
            .transactions
            .values()
            .filter(|tx| tx.wallet_id == wallet_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    async fn settle(
        &self,
        transaction_id: &str,
        moves: &[BalanceMove],
    ) -> Result<(Transaction, Vec<Wallet>)> {
        let mut cells = self.inner.write().await;

        let mut tx = cells
            .transactions
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))?;
        tx.transition(TransactionStatus::Successful)?;

        // Stage the mutations on copies; nothing escapes the guard until
        // every move has validated.
        let mut staged: Vec<Wallet> = Vec::with_capacity(moves.len());
        for mv in moves {
            let mut wallet = staged
                .iter()
                .find(|w| w.id == mv.wallet_id)
                .cloned()
                .or_else(|| cells.wallets.get(&mv.wallet_id).cloned())
                .ok_or_else(|| LedgerError::not_found("wallet", mv.wallet_id.clone()))?;
            match mv.direction {
                MoveDirection::Credit => wallet.credit(mv.amount),
                MoveDirection::Debit => wallet.debit(mv.amount)?,
            }
            if let Some(existing) = staged.iter_mut().find(|w| w.id == wallet.id) {
                *existing = wallet;
            } else {
                staged.push(wallet);
            }
        }

        for wallet in &staged {
            cells.wallets.insert(wallet.id.clone(), wallet.clone());
        }
        cells.transactions.insert(tx.id.clone(), tx.clone());
        Ok((tx, staged))
    }

    async fn fail_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        let mut cells = self.inner.write().await;
        let tx = cells
            .transactions
            .get_mut(transaction_id)
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))?;
        tx.transition(TransactionStatus::Failed)?;
        Ok(tx.clone())
    }

    async fn create_bank_account(&self, account: BankAccount) -> Result<BankAccount> {
        let mut cells = self.inner.write().await;
        if !cells.wallets.contains_key(&account.wallet_id) {
            return Err(LedgerError::not_found("wallet", account.wallet_id.clone()));
        }
        if account.is_default {
            for existing in cells
                .bank_accounts
                .values_mut()
                .filter(|a| a.wallet_id == account.wallet_id)
            {
                existing.is_default = false;
            }
        }
        cells
            .bank_accounts
            .insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn bank_accounts_for_wallet(&self, wallet_id: &str) -> Result<Vec<BankAccount>> {
        let cells = self.inner.read().await;
        Ok(cells
            .bank_accounts
            .values()
            .filter(|a| a.wallet_id == wallet_id)
            .cloned()
            .collect())
    }
}

/// A thread-safe in-memory backend for the loan port. Same locking scheme
/// as [`InMemoryLedgerStore`].
#[derive(Default, Clone)]
pub struct InMemoryLoanStore {
    inner: Arc<RwLock<LoanCells>>,
}

#[derive(Default)]
struct LoanCells {
    loans: HashMap<String, Loan>,
    repayments: HashMap<String, Repayment>,
}

impl InMemoryLoanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoanCells {
    fn swap_in(&mut self, mut loan: Loan, expected_version: u64) -> Result<Loan> {
        let current = self
            .loans
            .get(&loan.id)
            .ok_or_else(|| LedgerError::not_found("loan", loan.id.clone()))?;
        if current.version != expected_version {
            return Err(LedgerError::Conflict {
                entity: "loan",
                id: loan.id.clone(),
            });
        }
        loan.version = expected_version + 1;
        self.loans.insert(loan.id.clone(), loan.clone());
        Ok(loan)
    }
}

#[async_trait]
impl LoanStore for InMemoryLoanStore {
    async fn create_loan(&self, loan: Loan) -> Result<Loan> {
        let mut cells = self.inner.write().await;
        cells.loans.insert(loan.id.clone(), loan.clone());
        Ok(loan)
    }

    async fn loan(&self, loan_id: &str) -> Result<Option<Loan>> {
        let cells = self.inner.read().await;
        Ok(cells.loans.get(loan_id).cloned())
    }

    async fn loans_for_user(&self, user_id: &str) -> Result<Vec<Loan>> {
        let cells = self.inner.read().await;
        let mut loans: Vec<Loan> = cells
            .loans
            .values()
            .filter(|loan| loan.user_id == user_id)
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(loans)
    }

    async fn all_loans(&self, status: Option<LoanStatus>) -> Result<Vec<Loan>> {
        let cells = self.inner.read().await;
        let mut loans: Vec<Loan> = cells
            .loans
            .values()
            .filter(|loan| status.is_none_or(|s| loan.status == s))
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(loans)
    }

    async fn update_loan(&self, loan: Loan, expected_version: u64) -> Result<Loan> {
        let mut cells = self.inner.write().await;
        cells.swap_in(loan, expected_version)
    }

    async fn record_repayment(
        &self,
        repayment: Repayment,
        loan: Loan,
        expected_version: u64,
    ) -> Result<(Repayment, Loan)> {
        let mut cells = self.inner.write().await;
        // Version check first: the repayment row only lands with the loan.
        let loan = cells.swap_in(loan, expected_version)?;
        cells
            .repayments
            .insert(repayment.id.clone(), repayment.clone());
        Ok((repayment, loan))
    }

    async fn repayments_for_loan(&self, loan_id: &str) -> Result<Vec<Repayment>> {
        let cells = self.inner.read().await;
        let mut repayments: Vec<Repayment> = cells
            .repayments
            .values()
            .filter(|r| r.loan_id == loan_id)
            .cloned()
            .collect();
        repayments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(repayments)
    }
}
