use crate::domain::limits::{LoanLimitInfo, LoanSnapshot, compute_loan_limit};
use crate::domain::loan::{Loan, LoanApplication, LoanStatus, PaymentMethod, Repayment};
use crate::domain::money::Amount;
use crate::domain::ports::{LoanStoreBox, WalletStoreBox};
use crate::domain::schedule::compute_repayment_schedule;
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Flat rate applied once to every loan's principal.
const INTEREST_RATE: Decimal = dec!(0.005);

/// The loan lifecycle: application, approval or rejection, repayment, and
/// the caller's credit-limit view.
///
/// Like [`Ledger`](super::ledger::Ledger), every method takes the resolved
/// caller id explicitly. Loan mutations go through the store's
/// compare-and-swap update, so a stale read can never overwrite a
/// concurrent change.
pub struct LoanBook {
    loans: LoanStoreBox,
    wallets: WalletStoreBox,
}

/// Everything behind the caller's loan dashboard: the loans themselves, the
/// computed limit, and the inputs the limit was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanOverview {
    pub loans: Vec<Loan>,
    pub limit: LoanLimitInfo,
    pub factors: LimitFactors,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitFactors {
    pub wallet_balance: Decimal,
    pub total_loans: usize,
    pub approved_loans: usize,
    pub pending_loans: usize,
    pub completed_loans: usize,
    pub defaulted_loans: usize,
    pub total_loan_amount: Decimal,
    pub outstanding_amount: Decimal,
}

impl LoanBook {
    pub fn new(loans: LoanStoreBox, wallets: WalletStoreBox) -> Self {
        Self { loans, wallets }
    }

    /// Submits a loan application. The repayment schedule is computed up
    /// front, so a degenerate date range aborts before anything is written.
    pub async fn apply(&self, user_id: &str, application: LoanApplication) -> Result<Loan> {
        let schedule = compute_repayment_schedule(
            application.amount.value(),
            INTEREST_RATE,
            application.payment_mode,
            application.start_date,
            application.end_date,
        )?;
        let loan = Loan::new(user_id, &application, INTEREST_RATE, schedule);
        let loan = self.loans.create_loan(loan).await?;
        tracing::info!(loan_id = %loan.id, user_id, amount = %loan.amount, "loan application submitted");
        Ok(loan)
    }

    /// Approves a pending loan.
    pub async fn approve(&self, loan_id: &str, approver_id: &str) -> Result<Loan> {
        let mut loan = self.require_loan(loan_id).await?;
        let version = loan.version;
        loan.approve(approver_id, Utc::now())?;
        let loan = self.loans.update_loan(loan, version).await?;
        tracing::info!(loan_id, approver_id, "loan approved");
        Ok(loan)
    }

    /// Rejects a pending loan with a mandatory reason.
    pub async fn reject(&self, loan_id: &str, reason: &str) -> Result<Loan> {
        let mut loan = self.require_loan(loan_id).await?;
        let version = loan.version;
        loan.reject(reason)?;
        let loan = self.loans.update_loan(loan, version).await?;
        tracing::warn!(loan_id, reason, "loan rejected");
        Ok(loan)
    }

    /// Records a repayment against the caller's loan. The repayment row and
    /// the loan's remaining-amount decrement land together or not at all.
    pub async fn repay(
        &self,
        user_id: &str,
        loan_id: &str,
        amount: Amount,
        payment_method: PaymentMethod,
    ) -> Result<(Repayment, Loan)> {
        let mut loan = self.loan_owned_by(user_id, loan_id).await?;
        let version = loan.version;
        loan.apply_repayment(amount)?;
        let repayment = Repayment::new(loan_id, amount, payment_method);
        let (repayment, loan) = self
            .loans
            .record_repayment(repayment, loan, version)
            .await?;
        tracing::info!(
            loan_id,
            amount = %repayment.amount,
            remaining = %loan.remaining_amount,
            status = %loan.status,
            "repayment recorded"
        );
        Ok((repayment, loan))
    }

    /// The caller's loan with its repayment history.
    pub async fn loan(&self, user_id: &str, loan_id: &str) -> Result<(Loan, Vec<Repayment>)> {
        let loan = self.loan_owned_by(user_id, loan_id).await?;
        let repayments = self.loans.repayments_for_loan(loan_id).await?;
        Ok((loan, repayments))
    }

    /// The caller's loans together with their current credit limit.
    pub async fn overview(&self, user_id: &str) -> Result<LoanOverview> {
        let loans = self.loans.loans_for_user(user_id).await?;
        let wallet_balance = self
            .wallets
            .wallet_by_owner(user_id)
            .await?
            .map(|wallet| wallet.balance.0)
            .unwrap_or(Decimal::ZERO);

        let snapshots: Vec<LoanSnapshot> = loans.iter().map(LoanSnapshot::from).collect();
        let limit = compute_loan_limit(wallet_balance, &snapshots);

        let factors = LimitFactors {
            wallet_balance,
            total_loans: loans.len(),
            approved_loans: loans.iter().filter(|l| l.status.is_repayable()).count(),
            pending_loans: loans
                .iter()
                .filter(|l| l.status == LoanStatus::Pending)
                .count(),
            completed_loans: loans
                .iter()
                .filter(|l| l.status == LoanStatus::Completed)
                .count(),
            defaulted_loans: loans
                .iter()
                .filter(|l| l.status == LoanStatus::Defaulted)
                .count(),
            total_loan_amount: loans.iter().map(|l| l.amount).sum(),
            outstanding_amount: loans
                .iter()
                .filter(|l| l.status.is_repayable())
                .map(|l| l.remaining_amount)
                .sum(),
        };

        Ok(LoanOverview {
            loans,
            limit,
            factors,
        })
    }

    /// Admin listing of every loan, optionally filtered by status.
    pub async fn all_loans(&self, status: Option<LoanStatus>) -> Result<Vec<Loan>> {
        self.loans.all_loans(status).await
    }

    async fn require_loan(&self, loan_id: &str) -> Result<Loan> {
        self.loans
            .loan(loan_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("loan", loan_id))
    }

    async fn loan_owned_by(&self, user_id: &str, loan_id: &str) -> Result<Loan> {
        let loan = self.require_loan(loan_id).await?;
        // A foreign loan is indistinguishable from a missing one.
        if loan.user_id != user_id {
            return Err(LedgerError::not_found("loan", loan_id));
        }
        Ok(loan)
    }
}
