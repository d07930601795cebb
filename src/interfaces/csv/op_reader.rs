use crate::error::LedgerError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Open,
    Topup,
    Transfer,
    Bank,
    Withdraw,
}

/// One row of the operations CSV: `op, user, amount, account, detail`.
///
/// Which columns are required depends on the op: `transfer` reads the
/// recipient user from `account`, `bank` and `withdraw` read the bank
/// account number from `account`, `open` and `bank` read a display name
/// from `detail`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OpRecord {
    pub op: OpKind,
    pub user: String,
    pub amount: Option<Decimal>,
    pub account: Option<String>,
    pub detail: Option<String>,
}

pub struct OpReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OpReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn records(self) -> impl Iterator<Item = Result<OpRecord, LedgerError>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}
