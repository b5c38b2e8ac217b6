use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SUCCESS" => Some(TransactionStatus::Success),
            "FAILED" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the transfer audit log.
/// Records are append-only: written once per transfer attempt, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    /// Assigned by storage on append, 0 until then
    pub sequence: i64,
    pub sender: String,
    pub recipient: String,
    pub amount_cents: Cents,
    pub status: TransactionStatus,
    /// Why the attempt failed (FAILED records only)
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount_cents: Cents,
        status: TransactionStatus,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence: 0,
            sender: sender.into(),
            recipient: recipient.into(),
            amount_cents,
            status,
            reason,
            timestamp: Utc::now(),
        }
    }

    pub fn success(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount_cents: Cents,
    ) -> Self {
        Self::new(
            sender,
            recipient,
            amount_cents,
            TransactionStatus::Success,
            None,
        )
    }

    pub fn failed(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount_cents: Cents,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            sender,
            recipient,
            amount_cents,
            TransactionStatus::Failed,
            Some(reason.into()),
        )
    }

    pub fn is_success(&self) -> bool {
        self.status == TransactionStatus::Success
    }

    /// Returns true if the given account took part in this transfer
    pub fn involves(&self, identifier: &str) -> bool {
        self.sender == identifier || self.recipient == identifier
    }
}
