use lendwallet::application::ledger::Ledger;
use lendwallet::application::loans::LoanBook;
use lendwallet::infrastructure::in_memory::{InMemoryLedgerStore, InMemoryLoanStore};
use std::fs::File;
use std::io::Error;
use std::path::Path;

/// A ledger over a fresh in-memory store, plus the store itself for
/// sharing with other services or direct inspection.
pub fn ledger() -> (Ledger, InMemoryLedgerStore) {
    let store = InMemoryLedgerStore::new();
    (Ledger::new(Box::new(store.clone())), store)
}

/// A loan book and a ledger sharing one wallet store, so wallet balances
/// feed the credit-limit computation.
pub fn loan_book() -> (LoanBook, Ledger) {
    let wallet_store = InMemoryLedgerStore::new();
    let loan_store = InMemoryLoanStore::new();
    let book = LoanBook::new(
        Box::new(loan_store.clone()),
        Box::new(wallet_store.clone()),
    );
    let ledger = Ledger::new(Box::new(wallet_store));
    (book, ledger)
}

/// Writes an operations CSV with the standard five-column header.
pub fn write_ops_csv(path: &Path, rows: &[[&str; 5]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["op", "user", "amount", "account", "detail"])?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
