use crate::domain::{Cents, TransactionRecord};

use super::{AppError, LedgerService, TransferResult};

/// An authenticated user's handle on the ledger.
///
/// Only `LedgerService::login` and `LedgerService::register` hand these out, so
/// every operation here runs as an account whose credentials were checked.
pub struct Session<'a> {
    service: &'a LedgerService,
    identifier: String,
}

impl<'a> Session<'a> {
    pub(crate) fn new(service: &'a LedgerService, identifier: String) -> Self {
        Self {
            service,
            identifier,
        }
    }

    /// The logged-in account's identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub async fn withdraw(&self, amount_cents: Cents) -> Result<Cents, AppError> {
        self.service.withdraw(&self.identifier, amount_cents).await
    }

    pub async fn deposit(&self, amount_cents: Cents) -> Result<Cents, AppError> {
        self.service.deposit(&self.identifier, amount_cents).await
    }

    pub async fn transfer(
        &self,
        recipient: &str,
        amount_cents: Cents,
    ) -> Result<TransferResult, AppError> {
        self.service
            .transfer(&self.identifier, recipient, amount_cents)
            .await
    }

    pub async fn balance(&self) -> Result<Cents, AppError> {
        self.service.check_balance(&self.identifier).await
    }

    pub async fn history(&self, limit: Option<usize>) -> Result<Vec<TransactionRecord>, AppError> {
        self.service
            .list_transactions(&self.identifier, limit)
            .await
    }
}
