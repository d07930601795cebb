use super::money::Amount;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Topup,
    Transfer,
    Withdrawal,
    Repayment,
}

impl TransactionKind {
    fn reference_prefix(&self) -> &'static str {
        match self {
            TransactionKind::Topup => "TOPUP",
            TransactionKind::Transfer => "TRANSFER",
            TransactionKind::Withdrawal => "WITHDRAWAL",
            TransactionKind::Repayment => "REPAYMENT",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reference_prefix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Successful,
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Successful => "successful",
            TransactionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A record of wallet balance movement. Created pending, settled to
/// successful or failed exactly once, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub wallet_id: String,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub status: TransactionStatus,
    /// Globally unique, `PREFIX-<unix millis>-<hex>`.
    pub reference: String,
    pub description: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn pending(
        wallet_id: impl Into<String>,
        kind: TransactionKind,
        amount: Amount,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            wallet_id: wallet_id.into(),
            kind,
            amount,
            status: TransactionStatus::Pending,
            reference: generate_reference(kind.reference_prefix()),
            description: description.into(),
            metadata: Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Status only moves forward from pending.
    pub fn transition(&mut self, to: TransactionStatus) -> Result<()> {
        if self.status == TransactionStatus::Pending && to != TransactionStatus::Pending {
            self.status = to;
            Ok(())
        } else {
            Err(LedgerError::Validation(format!(
                "transaction {} cannot move from {} to {}",
                self.id, self.status, to
            )))
        }
    }
}

/// Builds a `PREFIX-<unix millis>-<hex>` reference.
pub fn generate_reference(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::random();
    format!("{prefix}-{millis}-{suffix:08X}")
}
