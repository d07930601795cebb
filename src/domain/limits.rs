use super::loan::{Loan, LoanStatus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

const BASE_LIMIT_FLOOR: Decimal = dec!(100000);
const BALANCE_MULTIPLIER: Decimal = dec!(3);
const PORTFOLIO_MULTIPLIER: Decimal = dec!(1.2);
const COMPLETED_LOAN_BONUS: Decimal = dec!(50000);
const DEFAULT_PENALTY_RATE: Decimal = dec!(0.2);
const MAX_LOAN_SHARE: Decimal = dec!(0.6);

/// The slice of a loan the limit policy looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanSnapshot {
    pub amount: Decimal,
    pub remaining_amount: Decimal,
    pub status: LoanStatus,
}

impl From<&Loan> for LoanSnapshot {
    fn from(loan: &Loan) -> Self {
        Self {
            amount: loan.amount,
            remaining_amount: loan.remaining_amount,
            status: loan.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanLimitInfo {
    pub available_limit: Decimal,
    pub total_limit: Decimal,
    pub used_limit: Decimal,
    pub max_loan_amount: Decimal,
}

/// Heuristic credit-scoring policy, not a financial guarantee.
///
/// Step order matters: each rule reads the limit as mutated by the rules
/// before it. A negative wallet balance counts as zero. All outputs are
/// rounded to 2 decimal places.
pub fn compute_loan_limit(wallet_balance: Decimal, loans: &[LoanSnapshot]) -> LoanLimitInfo {
    let balance = wallet_balance.max(Decimal::ZERO);

    let outstanding: Decimal = loans
        .iter()
        .filter(|loan| loan.status.is_repayable())
        .map(|loan| loan.remaining_amount)
        .sum();
    let portfolio: Decimal = loans.iter().map(|loan| loan.amount).sum();

    let mut base_limit = BASE_LIMIT_FLOOR;
    if balance > Decimal::ZERO {
        base_limit = base_limit.max(balance * BALANCE_MULTIPLIER);
    }
    if portfolio > Decimal::ZERO {
        base_limit = base_limit.max(portfolio * PORTFOLIO_MULTIPLIER);
    }

    let completed = loans
        .iter()
        .filter(|loan| loan.status == LoanStatus::Completed)
        .count();
    base_limit += COMPLETED_LOAN_BONUS * Decimal::from(completed as u64);

    let defaulted = loans
        .iter()
        .filter(|loan| loan.status == LoanStatus::Defaulted)
        .count();
    if defaulted > 0 {
        let penalty = Decimal::ONE - DEFAULT_PENALTY_RATE * Decimal::from(defaulted as u64);
        base_limit = BASE_LIMIT_FLOOR.max(base_limit * penalty);
    }

    let available = (base_limit - outstanding).max(Decimal::ZERO);
    let max_loan = available.min(base_limit * MAX_LOAN_SHARE);

    LoanLimitInfo {
        available_limit: available.round_dp(2),
        total_limit: base_limit.round_dp(2),
        used_limit: outstanding.round_dp(2),
        max_loan_amount: max_loan.round_dp(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(amount: Decimal, remaining: Decimal, status: LoanStatus) -> LoanSnapshot {
        LoanSnapshot {
            amount,
            remaining_amount: remaining,
            status,
        }
    }

    #[test]
    fn test_first_time_borrower_gets_floor() {
        let info = compute_loan_limit(dec!(0), &[]);
        assert_eq!(info.available_limit, dec!(100000));
        assert_eq!(info.total_limit, dec!(100000));
        assert_eq!(info.used_limit, dec!(0));
        assert_eq!(info.max_loan_amount, dec!(60000));
    }

    #[test]
    fn test_negative_balance_counts_as_zero() {
        let info = compute_loan_limit(dec!(-500), &[]);
        assert_eq!(info.total_limit, dec!(100000));
    }

    #[test]
    fn test_balance_rule_raises_limit() {
        let info = compute_loan_limit(dec!(50000), &[]);
        assert_eq!(info.total_limit, dec!(150000));
        assert_eq!(info.max_loan_amount, dec!(90000));
    }

    #[test]
    fn test_portfolio_rule_raises_limit() {
        let loans = [snapshot(dec!(200000), dec!(0), LoanStatus::Declined)];
        let info = compute_loan_limit(dec!(0), &loans);
        assert_eq!(info.total_limit, dec!(240000.00));
    }

    #[test]
    fn test_outstanding_reduces_available() {
        let loans = [snapshot(dec!(80000), dec!(60000), LoanStatus::Disbursed)];
        let info = compute_loan_limit(dec!(0), &loans);
        // portfolio 80000 * 1.2 = 96000 < floor, so base stays 100000.
        assert_eq!(info.total_limit, dec!(100000));
        assert_eq!(info.available_limit, dec!(40000));
        assert_eq!(info.used_limit, dec!(60000));
        assert_eq!(info.max_loan_amount, dec!(40000));
    }

    #[test]
    fn test_completed_loans_add_bonus() {
        let loans = [
            snapshot(dec!(50000), dec!(0), LoanStatus::Completed),
            snapshot(dec!(50000), dec!(0), LoanStatus::Completed),
        ];
        let info = compute_loan_limit(dec!(0), &loans);
        // portfolio 100000 * 1.2 = 120000, plus 2 * 50000 bonus.
        assert_eq!(info.total_limit, dec!(220000.00));
    }

    #[test]
    fn test_defaulted_loans_cut_limit() {
        let loans = [
            snapshot(dec!(200000), dec!(0), LoanStatus::Declined),
            snapshot(dec!(10000), dec!(0), LoanStatus::Defaulted),
        ];
        let info = compute_loan_limit(dec!(0), &loans);
        // portfolio 210000 * 1.2 = 252000, then * (1 - 0.2) = 201600.
        assert_eq!(info.total_limit, dec!(201600.00));
    }

    #[test]
    fn test_default_penalty_reclamps_to_floor() {
        let loans = [
            snapshot(dec!(10000), dec!(0), LoanStatus::Defaulted),
            snapshot(dec!(10000), dec!(0), LoanStatus::Defaulted),
            snapshot(dec!(10000), dec!(0), LoanStatus::Defaulted),
            snapshot(dec!(10000), dec!(0), LoanStatus::Defaulted),
            snapshot(dec!(10000), dec!(0), LoanStatus::Defaulted),
        ];
        // 5 defaults make the multiplier zero; the floor still applies.
        let info = compute_loan_limit(dec!(0), &loans);
        assert_eq!(info.total_limit, dec!(100000));
    }

    #[test]
    fn test_outputs_round_to_two_places() {
        let loans = [snapshot(dec!(100), dec!(33.333), LoanStatus::Disbursed)];
        let info = compute_loan_limit(dec!(0), &loans);
        assert_eq!(info.used_limit, dec!(33.33));
        assert_eq!(info.available_limit, dec!(99966.67));
    }
}
