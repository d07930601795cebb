use clap::Parser;
use lendwallet::application::ledger::Ledger;
use lendwallet::domain::money::Amount;
use lendwallet::domain::ports::WalletStoreBox;
use lendwallet::domain::wallet::NewBankAccount;
use lendwallet::error::LedgerError;
use lendwallet::infrastructure::in_memory::InMemoryLedgerStore;
use lendwallet::interfaces::csv::balance_writer::BalanceWriter;
use lendwallet::interfaces::csv::op_reader::{OpKind, OpReader, OpRecord};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// Path to persistent database (optional). Requires the
    /// storage-rocksdb feature.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let wallets = open_store(cli.db_path)?;
    let ledger = Ledger::new(wallets);

    // Replay operations; a bad row never stops the run.
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OpReader::new(file);
    for record in reader.records() {
        match record {
            Ok(op) => {
                if let Err(e) = apply_op(&ledger, &op).await {
                    eprintln!("Error applying operation: {e}");
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {e}");
            }
        }
    }

    let wallets = ledger.into_results().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_wallets(wallets).into_diagnostic()?;

    Ok(())
}

async fn apply_op(ledger: &Ledger, op: &OpRecord) -> lendwallet::error::Result<()> {
    match op.op {
        OpKind::Open => {
            let account_name = op.detail.clone().unwrap_or_else(|| op.user.clone());
            ledger.open_wallet(&op.user, &account_name).await?;
        }
        OpKind::Topup => {
            ledger.top_up(&op.user, required_amount(op)?).await?;
        }
        OpKind::Transfer => {
            let recipient = op
                .account
                .as_deref()
                .ok_or_else(|| LedgerError::validation("transfer requires a recipient user"))?;
            let recipient_wallet = ledger.wallet(recipient).await?;
            ledger
                .transfer(
                    &op.user,
                    &recipient_wallet.account_number,
                    required_amount(op)?,
                    None,
                )
                .await?;
        }
        OpKind::Bank => {
            let account_number = op
                .account
                .clone()
                .ok_or_else(|| LedgerError::validation("bank requires an account number"))?;
            let bank_name = op
                .detail
                .clone()
                .ok_or_else(|| LedgerError::validation("bank requires a bank name"))?;
            ledger
                .add_bank_account(
                    &op.user,
                    NewBankAccount {
                        bank_name,
                        account_number,
                        account_name: op.user.clone(),
                        is_default: false,
                    },
                )
                .await?;
        }
        OpKind::Withdraw => {
            let account_number = op
                .account
                .as_deref()
                .ok_or_else(|| LedgerError::validation("withdraw requires a bank account number"))?;
            let bank_account = ledger
                .bank_accounts(&op.user)
                .await?
                .into_iter()
                .find(|a| a.account_number == account_number)
                .ok_or_else(|| LedgerError::not_found("bank account", account_number))?;
            ledger
                .withdraw(&op.user, &bank_account.id, required_amount(op)?)
                .await?;
        }
    }
    Ok(())
}

fn required_amount(op: &OpRecord) -> lendwallet::error::Result<Amount> {
    let value = op
        .amount
        .ok_or_else(|| LedgerError::validation("operation requires an amount"))?;
    Amount::new(value)
}

#[cfg(feature = "storage-rocksdb")]
fn open_persistent(path: PathBuf) -> Result<WalletStoreBox> {
    use lendwallet::infrastructure::rocksdb::RocksDbStore;
    let store = RocksDbStore::open(path).into_diagnostic()?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_persistent(_path: PathBuf) -> Result<WalletStoreBox> {
    Err(miette::miette!(
        "this build has no persistent storage; rebuild with --features storage-rocksdb"
    ))
}

fn open_store(db_path: Option<PathBuf>) -> Result<WalletStoreBox> {
    match db_path {
        Some(path) => open_persistent(path),
        None => Ok(Box::new(InMemoryLedgerStore::new())),
    }
}
