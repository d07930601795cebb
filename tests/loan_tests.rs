mod common;

use chrono::NaiveDate;
use lendwallet::domain::loan::{
    Guarantor, LoanApplication, LoanStatus, PaymentMethod, PaymentMode,
};
use lendwallet::domain::money::Amount;
use lendwallet::error::LedgerError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn amt(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn application(amount: Decimal, mode: PaymentMode, start: NaiveDate, end: NaiveDate) -> LoanApplication {
    LoanApplication {
        amount: amt(amount),
        payment_mode: mode,
        start_date: start,
        end_date: end,
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

fn monthly_application(amount: Decimal) -> LoanApplication {
    application(
        amount,
        PaymentMode::Monthly,
        date(2024, 1, 1),
        date(2024, 3, 1),
    )
}

#[tokio::test]
async fn test_apply_creates_pending_loan_with_schedule() {
    let (book, _ledger) = common::loan_book();

    let loan = book
        .apply("alice", monthly_application(dec!(100000)))
        .await
        .unwrap();

    assert_eq!(loan.status, LoanStatus::Pending);
    assert_eq!(loan.total_amount, dec!(100500));
    assert_eq!(loan.remaining_amount, dec!(100500));
    assert_eq!(loan.repayment_schedule.len(), 3);
    for entry in &loan.repayment_schedule {
        assert_eq!(entry.amount, dec!(33500));
    }
    assert_eq!(loan.repayment_schedule[0].due_date, date(2024, 1, 1));
    assert_eq!(loan.repayment_schedule[2].due_date, date(2024, 3, 1));
}

#[tokio::test]
async fn test_apply_with_degenerate_range_writes_nothing() {
    let (book, _ledger) = common::loan_book();

    let result = book
        .apply(
            "alice",
            application(
                dec!(1000),
                PaymentMode::Daily,
                date(2024, 1, 1),
                date(2024, 1, 1),
            ),
        )
        .await;
    assert!(matches!(result, Err(LedgerError::InvalidSchedule(_))));

    let loans = book.all_loans(None).await.unwrap();
    assert!(loans.is_empty());
}

#[tokio::test]
async fn test_approve_then_double_approve() {
    let (book, _ledger) = common::loan_book();
    let loan = book
        .apply("alice", monthly_application(dec!(1000)))
        .await
        .unwrap();

    let approved = book.approve(&loan.id, "admin-1").await.unwrap();
    assert_eq!(approved.status, LoanStatus::Approved);
    assert_eq!(approved.approved_by.as_deref(), Some("admin-1"));

    let result = book.approve(&loan.id, "admin-2").await;
    assert!(matches!(result, Err(LedgerError::InvalidLoanState { .. })));

    let (reloaded, _) = book.loan("alice", &loan.id).await.unwrap();
    assert_eq!(reloaded.approved_by.as_deref(), Some("admin-1"));
}

#[tokio::test]
async fn test_reject_flow() {
    let (book, _ledger) = common::loan_book();
    let loan = book
        .apply("alice", monthly_application(dec!(1000)))
        .await
        .unwrap();

    let result = book.reject(&loan.id, "").await;
    assert!(matches!(result, Err(LedgerError::Validation(_))));

    let rejected = book
        .reject(&loan.id, "Incomplete guarantor details")
        .await
        .unwrap();
    assert_eq!(rejected.status, LoanStatus::Declined);
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("Incomplete guarantor details")
    );

    // Declined is terminal.
    let result = book.approve(&loan.id, "admin-1").await;
    assert!(matches!(result, Err(LedgerError::InvalidLoanState { .. })));
}

#[tokio::test]
async fn test_repay_until_completed() {
    let (book, _ledger) = common::loan_book();
    let loan = book
        .apply("alice", monthly_application(dec!(1000)))
        .await
        .unwrap();
    book.approve(&loan.id, "admin-1").await.unwrap();

    let (_, after_partial) = book
        .repay("alice", &loan.id, amt(dec!(500)), PaymentMethod::Wallet)
        .await
        .unwrap();
    assert_eq!(after_partial.status, LoanStatus::Disbursed);
    assert_eq!(after_partial.remaining_amount, dec!(505));

    let (_, after_payoff) = book
        .repay("alice", &loan.id, amt(dec!(505)), PaymentMethod::BankTransfer)
        .await
        .unwrap();
    assert_eq!(after_payoff.status, LoanStatus::Completed);
    assert_eq!(after_payoff.remaining_amount, Decimal::ZERO);

    // No further repayment is accepted.
    let result = book
        .repay("alice", &loan.id, amt(dec!(1)), PaymentMethod::Card)
        .await;
    assert!(matches!(result, Err(LedgerError::InvalidLoanState { .. })));

    let (_, repayments) = book.loan("alice", &loan.id).await.unwrap();
    assert_eq!(repayments.len(), 2);
}

#[tokio::test]
async fn test_overpayment_clamps_remaining() {
    let (book, _ledger) = common::loan_book();
    let loan = book
        .apply("alice", monthly_application(dec!(1000)))
        .await
        .unwrap();
    book.approve(&loan.id, "admin-1").await.unwrap();

    let (_, paid_off) = book
        .repay("alice", &loan.id, amt(dec!(5000)), PaymentMethod::Wallet)
        .await
        .unwrap();
    assert_eq!(paid_off.status, LoanStatus::Completed);
    assert_eq!(paid_off.remaining_amount, Decimal::ZERO);
}

#[tokio::test]
async fn test_repay_pending_loan_rejected() {
    let (book, _ledger) = common::loan_book();
    let loan = book
        .apply("alice", monthly_application(dec!(1000)))
        .await
        .unwrap();

    let result = book
        .repay("alice", &loan.id, amt(dec!(100)), PaymentMethod::Wallet)
        .await;
    assert!(matches!(result, Err(LedgerError::InvalidLoanState { .. })));
}

#[tokio::test]
async fn test_repay_foreign_loan_looks_missing() {
    let (book, _ledger) = common::loan_book();
    let loan = book
        .apply("alice", monthly_application(dec!(1000)))
        .await
        .unwrap();
    book.approve(&loan.id, "admin-1").await.unwrap();

    let result = book
        .repay("bob", &loan.id, amt(dec!(100)), PaymentMethod::Wallet)
        .await;
    assert!(matches!(result, Err(LedgerError::NotFound { .. })));
}

#[tokio::test]
async fn test_overview_for_first_time_borrower() {
    let (book, _ledger) = common::loan_book();

    let overview = book.overview("alice").await.unwrap();
    assert!(overview.loans.is_empty());
    assert_eq!(overview.limit.available_limit, dec!(100000));
    assert_eq!(overview.limit.total_limit, dec!(100000));
    assert_eq!(overview.limit.used_limit, dec!(0));
    assert_eq!(overview.limit.max_loan_amount, dec!(60000));
    assert_eq!(overview.factors.total_loans, 0);
}

#[tokio::test]
async fn test_overview_reflects_balance_and_outstanding() {
    let (book, ledger) = common::loan_book();
    ledger.open_wallet("alice", "Alice N").await.unwrap();
    ledger
        .top_up("alice", amt(dec!(50000)))
        .await
        .unwrap();

    let loan = book
        .apply("alice", monthly_application(dec!(10000)))
        .await
        .unwrap();
    book.approve(&loan.id, "admin-1").await.unwrap();

    let overview = book.overview("alice").await.unwrap();
    // Balance rule: 50000 * 3 = 150000 beats the floor and the portfolio.
    assert_eq!(overview.limit.total_limit, dec!(150000));
    assert_eq!(overview.limit.used_limit, dec!(10050));
    assert_eq!(overview.limit.available_limit, dec!(139950));
    assert_eq!(overview.factors.approved_loans, 1);
    assert_eq!(overview.factors.wallet_balance, dec!(50000));
    assert_eq!(overview.factors.outstanding_amount, dec!(10050));
}

#[tokio::test]
async fn test_all_loans_status_filter() {
    let (book, _ledger) = common::loan_book();
    let first = book
        .apply("alice", monthly_application(dec!(1000)))
        .await
        .unwrap();
    book.apply("bob", monthly_application(dec!(2000)))
        .await
        .unwrap();
    book.approve(&first.id, "admin-1").await.unwrap();

    let pending = book.all_loans(Some(LoanStatus::Pending)).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].user_id, "bob");

    let all = book.all_loans(None).await.unwrap();
    assert_eq!(all.len(), 2);
}
