pub mod ledger;
pub mod loans;
