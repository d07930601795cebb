use super::loan::{Loan, LoanStatus, Repayment};
use super::transaction::Transaction;
use super::wallet::{BalanceMove, BankAccount, Wallet};
use crate::error::Result;
use async_trait::async_trait;

/// Persistence port for wallets, transactions and bank accounts.
///
/// Implementations provide the atomicity guarantee the ledger relies on:
/// [`settle`](WalletStore::settle) applies its whole write-set or none of
/// it. A single backend struct may implement both this and [`LoanStore`].
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Persists a new wallet. Fails with a validation error if the owner
    /// already has one, and with a conflict if the account number is taken.
    async fn create_wallet(&self, wallet: Wallet) -> Result<Wallet>;
    async fn wallet(&self, wallet_id: &str) -> Result<Option<Wallet>>;
    async fn wallet_by_owner(&self, user_id: &str) -> Result<Option<Wallet>>;
    async fn wallet_by_account_number(&self, account_number: &str) -> Result<Option<Wallet>>;
    async fn all_wallets(&self) -> Result<Vec<Wallet>>;

    async fn create_transaction(&self, tx: Transaction) -> Result<Transaction>;
    async fn transaction(&self, transaction_id: &str) -> Result<Option<Transaction>>;
    /// Newest first.
    async fn transactions_for_wallet(&self, wallet_id: &str) -> Result<Vec<Transaction>>;

    /// Atomicity primitive for ledger operations: marks the pending
    /// transaction successful and applies every balance move, or fails
    /// leaving transaction and balances untouched. A move that would drive
    /// a balance negative fails the whole batch with `InsufficientFunds`.
    ///
    /// Returns the settled transaction and the updated wallets in move
    /// order (deduplicated when a wallet appears in several moves).
    async fn settle(
        &self,
        transaction_id: &str,
        moves: &[BalanceMove],
    ) -> Result<(Transaction, Vec<Wallet>)>;

    /// Marks a pending transaction failed without touching balances.
    async fn fail_transaction(&self, transaction_id: &str) -> Result<Transaction>;

    /// Persists a bank account; a default account demotes the wallet's
    /// previous default in the same write.
    async fn create_bank_account(&self, account: BankAccount) -> Result<BankAccount>;
    async fn bank_accounts_for_wallet(&self, wallet_id: &str) -> Result<Vec<BankAccount>>;
}

/// Persistence port for loans and repayments.
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn create_loan(&self, loan: Loan) -> Result<Loan>;
    async fn loan(&self, loan_id: &str) -> Result<Option<Loan>>;
    /// Newest first.
    async fn loans_for_user(&self, user_id: &str) -> Result<Vec<Loan>>;
    /// Newest first, optionally filtered by status.
    async fn all_loans(&self, status: Option<LoanStatus>) -> Result<Vec<Loan>>;

    /// Compare-and-swap update: succeeds only while the stored loan still
    /// carries `expected_version`, and stores the new state with the
    /// version bumped. A mismatch fails with `Conflict`.
    async fn update_loan(&self, loan: Loan, expected_version: u64) -> Result<Loan>;

    /// Atomic pair write for repayments: appends the repayment and swaps in
    /// the updated loan under the same version check, or fails leaving both
    /// untouched.
    async fn record_repayment(
        &self,
        repayment: Repayment,
        loan: Loan,
        expected_version: u64,
    ) -> Result<(Repayment, Loan)>;

    /// Oldest first.
    async fn repayments_for_loan(&self, loan_id: &str) -> Result<Vec<Repayment>>;
}

pub type WalletStoreBox = Box<dyn WalletStore>;
pub type LoanStoreBox = Box<dyn LoanStore>;
