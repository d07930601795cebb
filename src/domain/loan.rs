use super::money::Amount;
use super::schedule::RepaymentScheduleEntry;
use super::transaction::generate_reference;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Declined,
    Disbursed,
    Completed,
    Defaulted,
}

impl LoanStatus {
    /// Approved and disbursed loans accept repayments.
    pub fn is_repayable(&self) -> bool {
        matches!(self, LoanStatus::Approved | LoanStatus::Disbursed)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Declined => "declined",
            LoanStatus::Disbursed => "disbursed",
            LoanStatus::Completed => "completed",
            LoanStatus::Defaulted => "defaulted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Card,
    Wallet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guarantor {
    pub name: String,
    pub phone_number: String,
}

/// Validated input for a new loan application.
#[derive(Debug, Clone)]
pub struct LoanApplication {
    pub amount: Amount,
    pub payment_mode: PaymentMode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guarantor1: Guarantor,
    pub guarantor2: Guarantor,
    pub personal_info: Value,
}

/// A credit extended to a user with a flat-interest total and a precomputed
/// installment schedule.
///
/// Status transitions are one-directional: pending moves to approved or
/// declined, repayments keep the loan disbursed until the remaining amount
/// reaches zero and the loan completes. Completed and declined are terminal.
/// Defaulted is only ever set by an external process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    pub user_id: String,
    /// Principal.
    pub amount: Decimal,
    pub interest_rate: Decimal,
    /// `amount * (1 + interest_rate)`.
    pub total_amount: Decimal,
    /// Starts at `total_amount`, non-increasing while the loan is active.
    pub remaining_amount: Decimal,
    pub status: LoanStatus,
    pub payment_mode: PaymentMode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guarantor1: Guarantor,
    pub guarantor2: Guarantor,
    pub personal_info: Value,
    pub repayment_schedule: Vec<RepaymentScheduleEntry>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    /// Optimistic-concurrency version, bumped by every store update.
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    pub fn new(
        user_id: impl Into<String>,
        application: &LoanApplication,
        interest_rate: Decimal,
        repayment_schedule: Vec<RepaymentScheduleEntry>,
    ) -> Self {
        let principal = application.amount.value();
        let total_amount = principal * (Decimal::ONE + interest_rate);
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            amount: principal,
            interest_rate,
            total_amount,
            remaining_amount: total_amount,
            status: LoanStatus::Pending,
            payment_mode: application.payment_mode,
            start_date: application.start_date,
            end_date: application.end_date,
            guarantor1: application.guarantor1.clone(),
            guarantor2: application.guarantor2.clone(),
            personal_info: application.personal_info.clone(),
            repayment_schedule,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            version: 0,
            created_at: Utc::now(),
        }
    }

    pub fn approve(&mut self, approver_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.ensure_pending()?;
        self.status = LoanStatus::Approved;
        self.approved_by = Some(approver_id.to_string());
        self.approved_at = Some(at);
        self.rejection_reason = None;
        Ok(())
    }

    pub fn reject(&mut self, reason: &str) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(LedgerError::validation("Rejection reason is required"));
        }
        self.ensure_pending()?;
        self.status = LoanStatus::Declined;
        self.rejection_reason = Some(reason.to_string());
        Ok(())
    }

    /// Applies a repayment against the remaining balance.
    ///
    /// The remaining amount is clamped at zero on overpayment; a full payoff
    /// completes the loan, anything less keeps it disbursed.
    pub fn apply_repayment(&mut self, amount: Amount) -> Result<()> {
        if !self.status.is_repayable() {
            return Err(LedgerError::InvalidLoanState {
                expected: "approved or disbursed",
                found: self.status.to_string(),
            });
        }
        let remaining = self.remaining_amount - amount.value();
        if remaining <= Decimal::ZERO {
            self.remaining_amount = Decimal::ZERO;
            self.status = LoanStatus::Completed;
        } else {
            self.remaining_amount = remaining;
            self.status = LoanStatus::Disbursed;
        }
        Ok(())
    }

    fn ensure_pending(&self) -> Result<()> {
        if self.status == LoanStatus::Pending {
            Ok(())
        } else {
            Err(LedgerError::InvalidLoanState {
                expected: "pending",
                found: self.status.to_string(),
            })
        }
    }
}

/// A partial or full payment against a loan's remaining balance.
/// Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repayment {
    pub id: String,
    pub loan_id: String,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl Repayment {
    pub fn new(loan_id: impl Into<String>, amount: Amount, payment_method: PaymentMethod) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            loan_id: loan_id.into(),
            amount,
            payment_method,
            reference: generate_reference("REP"),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn application(amount: Decimal) -> LoanApplication {
        LoanApplication {
            amount: Amount::new(amount).unwrap(),
            payment_mode: PaymentMode::Monthly,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            guarantor1: Guarantor {
                name: "Bola A".to_string(),
                phone_number: "+2348010000001".to_string(),
            },
            guarantor2: Guarantor {
                name: "Chidi E".to_string(),
                phone_number: "+2348010000002".to_string(),
            },
            personal_info: serde_json::json!({ "occupation": "trader" }),
        }
    }

    fn pending_loan(amount: Decimal) -> Loan {
        Loan::new("user-1", &application(amount), dec!(0.005), Vec::new())
    }

    #[test]
    fn test_new_loan_totals() {
        let loan = pending_loan(dec!(100000));
        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.total_amount, dec!(100500.000));
        assert_eq!(loan.remaining_amount, loan.total_amount);
        assert_eq!(loan.version, 0);
    }

    #[test]
    fn test_approve_pending_loan() {
        let mut loan = pending_loan(dec!(1000));
        loan.approve("admin-1", Utc::now()).unwrap();
        assert_eq!(loan.status, LoanStatus::Approved);
        assert_eq!(loan.approved_by.as_deref(), Some("admin-1"));
        assert!(loan.approved_at.is_some());
        assert!(loan.rejection_reason.is_none());
    }

    #[test]
    fn test_double_approve_rejected() {
        let mut loan = pending_loan(dec!(1000));
        loan.approve("admin-1", Utc::now()).unwrap();
        let result = loan.approve("admin-2", Utc::now());
        assert!(matches!(
            result,
            Err(LedgerError::InvalidLoanState { .. })
        ));
        assert_eq!(loan.approved_by.as_deref(), Some("admin-1"));
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut loan = pending_loan(dec!(1000));
        assert!(matches!(
            loan.reject("  "),
            Err(LedgerError::Validation(_))
        ));
        loan.reject("Incomplete guarantor details").unwrap();
        assert_eq!(loan.status, LoanStatus::Declined);
        assert!(loan.rejection_reason.is_some());
    }

    #[test]
    fn test_reject_after_approve_rejected() {
        let mut loan = pending_loan(dec!(1000));
        loan.approve("admin-1", Utc::now()).unwrap();
        assert!(matches!(
            loan.reject("too late"),
            Err(LedgerError::InvalidLoanState { .. })
        ));
    }

    #[test]
    fn test_partial_repayment_keeps_loan_disbursed() {
        let mut loan = pending_loan(dec!(1000));
        loan.approve("admin-1", Utc::now()).unwrap();

        loan.apply_repayment(Amount::new(dec!(500)).unwrap()).unwrap();
        assert_eq!(loan.status, LoanStatus::Disbursed);
        assert_eq!(loan.remaining_amount, dec!(505.000));
    }

    #[test]
    fn test_exact_payoff_completes_loan() {
        let mut loan = pending_loan(dec!(1000));
        loan.approve("admin-1", Utc::now()).unwrap();

        loan.apply_repayment(Amount::new(dec!(1005)).unwrap()).unwrap();
        assert_eq!(loan.status, LoanStatus::Completed);
        assert_eq!(loan.remaining_amount, Decimal::ZERO);
    }

    #[test]
    fn test_overpayment_clamps_remaining_to_zero() {
        let mut loan = pending_loan(dec!(1000));
        loan.approve("admin-1", Utc::now()).unwrap();

        loan.apply_repayment(Amount::new(dec!(2000)).unwrap()).unwrap();
        assert_eq!(loan.status, LoanStatus::Completed);
        assert_eq!(loan.remaining_amount, Decimal::ZERO);
    }

    #[test]
    fn test_completed_loan_refuses_repayment() {
        let mut loan = pending_loan(dec!(1000));
        loan.approve("admin-1", Utc::now()).unwrap();
        loan.apply_repayment(Amount::new(dec!(1005)).unwrap()).unwrap();

        let result = loan.apply_repayment(Amount::new(dec!(1)).unwrap());
        assert!(matches!(
            result,
            Err(LedgerError::InvalidLoanState { .. })
        ));
    }

    #[test]
    fn test_pending_loan_refuses_repayment() {
        let mut loan = pending_loan(dec!(1000));
        let result = loan.apply_repayment(Amount::new(dec!(100)).unwrap());
        assert!(matches!(
            result,
            Err(LedgerError::InvalidLoanState { .. })
        ));
    }
}
