use crate::domain::wallet::Wallet;
use crate::error::Result;
use std::io::Write;

/// Writes final wallet balances as `user,account_number,balance` rows,
/// sorted by user for deterministic output. Balances are normalized so
/// trailing zeros from decimal arithmetic don't leak into the report.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(target: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().from_writer(target),
        }
    }

    pub fn write_wallets(&mut self, mut wallets: Vec<Wallet>) -> Result<()> {
        wallets.sort_by(|a, b| a.owner.cmp(&b.owner));

        self.writer
            .write_record(["user", "account_number", "balance"])?;
        for wallet in wallets {
            self.writer.write_record([
                wallet.owner.as_str(),
                wallet.account_number.as_str(),
                &wallet.balance.0.normalize().to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Amount;
    use rust_decimal_macros::dec;

    #[test]
    fn test_writer_sorts_and_normalizes() {
        let mut bob = Wallet::open("bob", "2000000002", "Bob");
        bob.credit(Amount::new(dec!(70.00)).unwrap());
        let mut alice = Wallet::open("alice", "1000000001", "Alice");
        alice.credit(Amount::new(dec!(500.0)).unwrap());

        let mut buffer = Vec::new();
        BalanceWriter::new(&mut buffer)
            .write_wallets(vec![bob, alice])
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "user,account_number,balance");
        assert_eq!(lines[1], "alice,1000000001,500");
        assert_eq!(lines[2], "bob,2000000002,70");
    }
}
