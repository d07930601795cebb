use crate::domain::loan::{Loan, LoanStatus, Repayment};
use crate::domain::ports::{LoanStore, WalletStore};
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::domain::wallet::{BalanceMove, BankAccount, MoveDirection, Wallet};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for wallet states.
pub const CF_WALLETS: &str = "wallets";
/// Column Family for transaction history.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for registered bank accounts.
pub const CF_BANK_ACCOUNTS: &str = "bank_accounts";
/// Column Family for loans.
pub const CF_LOANS: &str = "loans";
/// Column Family for repayments.
pub const CF_REPAYMENTS: &str = "repayments";

/// A persistent backend for both ports using RocksDB.
///
/// Entities are stored as JSON values keyed by id, one column family per
/// entity. Multi-row units (`settle`, `record_repayment`) go through a
/// `WriteBatch`, and the `write_lock` serializes every read-modify-write
/// section, which is what upholds the ports' atomicity contract for a
/// single process.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// all required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [
            CF_WALLETS,
            CF_TRANSACTIONS,
            CF_BANK_ACCOUNTS,
            CF_LOANS,
            CF_REPAYMENTS,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
        .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::Persistence(format!("{name} column family not found")))
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &str, value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key.as_bytes(), serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, bytes) =
                item.map_err(|e| LedgerError::Persistence(format!("iteration error: {e}")))?;
            values.push(serde_json::from_slice(&bytes)?);
        }
        Ok(values)
    }
}

#[async_trait]
impl WalletStore for RocksDbStore {
    async fn create_wallet(&self, wallet: Wallet) -> Result<Wallet> {
        let _guard = self.write_lock.lock().await;
        let existing: Vec<Wallet> = self.scan(CF_WALLETS)?;
        if existing.iter().any(|w| w.owner == wallet.owner) {
            return Err(LedgerError::validation("Wallet already exists"));
        }
        if existing
            .iter()
            .any(|w| w.account_number == wallet.account_number)
        {
            return Err(LedgerError::Conflict {
                entity: "wallet",
                id: wallet.account_number.clone(),
            });
        }
        self.put(CF_WALLETS, &wallet.id, &wallet)?;
        Ok(wallet)
    }

    async fn wallet(&self, wallet_id: &str) -> Result<Option<Wallet>> {
        self.get(CF_WALLETS, wallet_id)
    }

    async fn wallet_by_owner(&self, user_id: &str) -> Result<Option<Wallet>> {
        let wallets: Vec<Wallet> = self.scan(CF_WALLETS)?;
        Ok(wallets.into_iter().find(|w| w.owner == user_id))
    }

    async fn wallet_by_account_number(&self, account_number: &str) -> Result<Option<Wallet>> {
        let wallets: Vec<Wallet> = self.scan(CF_WALLETS)?;
        Ok(wallets
            .into_iter()
            .find(|w| w.account_number == account_number))
    }

    async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        self.scan(CF_WALLETS)
    }

    async fn create_transaction(&self, tx: Transaction) -> Result<Transaction> {
        self.put(CF_TRANSACTIONS, &tx.id, &tx)?;
        Ok(tx)
    }

    async fn transaction(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        self.get(CF_TRANSACTIONS, transaction_id)
    }

    async fn transactions_for_wallet(&self, wallet_id: &str) -> Result<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = self.scan(CF_TRANSACTIONS)?;
        transactions.retain(|tx| tx.wallet_id == wallet_id);
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    async fn settle(
        &self,
        transaction_id: &str,
        moves: &[BalanceMove],
    ) -> Result<(Transaction, Vec<Wallet>)> {
        let _guard = self.write_lock.lock().await;

        let mut tx: Transaction = self
            .get(CF_TRANSACTIONS, transaction_id)?
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))?;
        tx.transition(TransactionStatus::Successful)?;

        let mut staged: Vec<Wallet> = Vec::with_capacity(moves.len());
        for mv in moves {
            let mut wallet = match staged.iter().find(|w| w.id == mv.wallet_id) {
                Some(wallet) => wallet.clone(),
                None => self
                    .get(CF_WALLETS, &mv.wallet_id)?
                    .ok_or_else(|| LedgerError::not_found("wallet", mv.wallet_id.clone()))?,
            };
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

        let mut batch = WriteBatch::default();
        let wallets_cf = self.cf(CF_WALLETS)?;
        for wallet in &staged {
            batch.put_cf(wallets_cf, wallet.id.as_bytes(), serde_json::to_vec(wallet)?);
        }
        let transactions_cf = self.cf(CF_TRANSACTIONS)?;
        batch.put_cf(transactions_cf, tx.id.as_bytes(), serde_json::to_vec(&tx)?);
        self.db.write(batch)?;

        Ok((tx, staged))
    }

    async fn fail_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        let _guard = self.write_lock.lock().await;
        let mut tx: Transaction = self
            .get(CF_TRANSACTIONS, transaction_id)?
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))?;
        tx.transition(TransactionStatus::Failed)?;
        self.put(CF_TRANSACTIONS, &tx.id, &tx)?;
        Ok(tx)
    }

    async fn create_bank_account(&self, account: BankAccount) -> Result<BankAccount> {
        let _guard = self.write_lock.lock().await;
        if self.get::<Wallet>(CF_WALLETS, &account.wallet_id)?.is_none() {
            return Err(LedgerError::not_found("wallet", account.wallet_id.clone()));
        }

        let mut batch = WriteBatch::default();
        let cf = self.cf(CF_BANK_ACCOUNTS)?;
        if account.is_default {
            let accounts: Vec<BankAccount> = self.scan(CF_BANK_ACCOUNTS)?;
            for mut existing in accounts
                .into_iter()
                .filter(|a| a.wallet_id == account.wallet_id && a.is_default)
            {
                existing.is_default = false;
                batch.put_cf(cf, existing.id.as_bytes(), serde_json::to_vec(&existing)?);
            }
        }
        batch.put_cf(cf, account.id.as_bytes(), serde_json::to_vec(&account)?);
        self.db.write(batch)?;
        Ok(account)
    }

    async fn bank_accounts_for_wallet(&self, wallet_id: &str) -> Result<Vec<BankAccount>> {
        let mut accounts: Vec<BankAccount> = self.scan(CF_BANK_ACCOUNTS)?;
        accounts.retain(|a| a.wallet_id == wallet_id);
        Ok(accounts)
    }
}

#[async_trait]
impl LoanStore for RocksDbStore {
    async fn create_loan(&self, loan: Loan) -> Result<Loan> {
        self.put(CF_LOANS, &loan.id, &loan)?;
        Ok(loan)
    }

    async fn loan(&self, loan_id: &str) -> Result<Option<Loan>> {
        self.get(CF_LOANS, loan_id)
    }

    async fn loans_for_user(&self, user_id: &str) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self.scan(CF_LOANS)?;
        loans.retain(|loan| loan.user_id == user_id);
        loans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(loans)
    }

    async fn all_loans(&self, status: Option<LoanStatus>) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self.scan(CF_LOANS)?;
        loans.retain(|loan| status.is_none_or(|s| loan.status == s));
        loans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(loans)
    }

    async fn update_loan(&self, mut loan: Loan, expected_version: u64) -> Result<Loan> {
        let _guard = self.write_lock.lock().await;
        let current: Loan = self
            .get(CF_LOANS, &loan.id)?
            .ok_or_else(|| LedgerError::not_found("loan", loan.id.clone()))?;
        if current.version != expected_version {
            return Err(LedgerError::Conflict {
                entity: "loan",
                id: loan.id.clone(),
            });
        }
        loan.version = expected_version + 1;
        self.put(CF_LOANS, &loan.id, &loan)?;
        Ok(loan)
    }

    async fn record_repayment(
        &self,
        repayment: Repayment,
        mut loan: Loan,
        expected_version: u64,
    ) -> Result<(Repayment, Loan)> {
        let _guard = self.write_lock.lock().await;
        let current: Loan = self
            .get(CF_LOANS, &loan.id)?
            .ok_or_else(|| LedgerError::not_found("loan", loan.id.clone()))?;
        if current.version != expected_version {
            return Err(LedgerError::Conflict {
                entity: "loan",
                id: loan.id.clone(),
            });
        }
        loan.version = expected_version + 1;

        let mut batch = WriteBatch::default();
        let loans_cf = self.cf(CF_LOANS)?;
        batch.put_cf(loans_cf, loan.id.as_bytes(), serde_json::to_vec(&loan)?);
        let repayments_cf = self.cf(CF_REPAYMENTS)?;
        batch.put_cf(
            repayments_cf,
            repayment.id.as_bytes(),
            serde_json::to_vec(&repayment)?,
        );
        self.db.write(batch)?;
        Ok((repayment, loan))
    }

    async fn repayments_for_loan(&self, loan_id: &str) -> Result<Vec<Repayment>> {
        let mut repayments: Vec<Repayment> = self.scan(CF_REPAYMENTS)?;
        repayments.retain(|r| r.loan_id == loan_id);
        repayments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(repayments)
    }
}
