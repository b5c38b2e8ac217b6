// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use tellr::application::LedgerService;
use tellr::domain::{Cents, Registration};
use tempfile::TempDir;

pub const PASSWORD: &str = "correct horse";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Convert whole currency units to cents
pub fn units(amount: i64) -> Cents {
    amount * 100
}

/// Register an account with the shared test password and fund it.
/// `balance` must be zero or a valid deposit amount.
pub async fn open_account(service: &LedgerService, email: &str, balance: Cents) -> Result<()> {
    let name = email.split('@').next().unwrap_or(email);
    service
        .register(Registration::new(name, email, PASSWORD, "555-0100"))
        .await?;
    if balance > 0 {
        service.deposit(email, balance).await?;
    }
    Ok(())
}
