use super::loan::PaymentMode;
use crate::error::{LedgerError, Result};
use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One installment of a loan's repayment schedule.
///
/// `amount = principal + interest` for the installment; the full schedule
/// sums back to the loan's total, principal and interest figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentScheduleEntry {
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub principal: Decimal,
    pub interest: Decimal,
}

/// Computes the flat-interest repayment schedule for a loan.
///
/// The total owed is `principal * (1 + interest_rate)`, split evenly across
/// the period count: one installment per day, per 7 days, or per calendar
/// month between `start_date` and `end_date`. The monthly count is the
/// year/month field delta plus one, not elapsed days, so partial months
/// count as whole periods. Due dates step from `start_date` and are not
/// clamped to `end_date`.
pub fn compute_repayment_schedule(
    principal: Decimal,
    interest_rate: Decimal,
    payment_mode: PaymentMode,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<RepaymentScheduleEntry>> {
    if principal <= Decimal::ZERO {
        return Err(LedgerError::validation("Loan principal must be positive"));
    }
    if interest_rate < Decimal::ZERO {
        return Err(LedgerError::validation(
            "Interest rate must not be negative",
        ));
    }
    if end_date < start_date {
        return Err(LedgerError::InvalidSchedule(
            "end date precedes start date".to_string(),
        ));
    }

    let days = (end_date - start_date).num_days();
    let period_count = match payment_mode {
        PaymentMode::Daily => days,
        PaymentMode::Weekly => (days + 6) / 7,
        PaymentMode::Monthly => {
            i64::from(end_date.year() - start_date.year()) * 12
                + i64::from(end_date.month()) - i64::from(start_date.month())
                + 1
        }
    };
    if period_count <= 0 {
        return Err(LedgerError::InvalidSchedule(
            "date range yields no repayment periods".to_string(),
        ));
    }

    let total_amount = principal * (Decimal::ONE + interest_rate);
    let total_interest = total_amount - principal;
    let periods = Decimal::from(period_count);
    let amount = total_amount / periods;
    let entry_principal = principal / periods;
    let entry_interest = total_interest / periods;

    let mut schedule = Vec::with_capacity(period_count as usize);
    for i in 0..period_count {
        let due_date = match payment_mode {
            PaymentMode::Daily => start_date.checked_add_days(Days::new(i as u64)),
            PaymentMode::Weekly => start_date.checked_add_days(Days::new(7 * i as u64)),
            PaymentMode::Monthly => start_date.checked_add_months(Months::new(i as u32)),
        }
        .ok_or_else(|| LedgerError::InvalidSchedule("due date out of range".to_string()))?;

        schedule.push(RepaymentScheduleEntry {
            due_date,
            amount,
            principal: entry_principal,
            interest: entry_interest,
        });
    }

    Ok(schedule)
}
