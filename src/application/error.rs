use thiserror::Error;

use crate::domain::{AmountError, Cents, CredentialError, format_cents};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error(
        "Insufficient funds in account {identifier}: balance {}, required {}",
        format_cents(*.balance),
        format_cents(*.required)
    )]
    InsufficientFunds {
        identifier: String,
        balance: Cents,
        required: Cents,
    },

    #[error("Balance limit exceeded for account {0}")]
    BalanceOverflow(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    DuplicateIdentifier(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Cannot transfer to the same account: {0}")]
    SameAccount(String),

    #[error("Storage unavailable: {0:#}")]
    StorageUnavailable(#[from] anyhow::Error),
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        AppError::StorageUnavailable(anyhow::Error::new(err))
    }
}
