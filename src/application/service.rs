use tracing::{debug, info, warn};

use crate::domain::{
    Account, Cents, Registration, TransactionRecord, format_cents, hash_secret, validate_amount,
    verify_secret,
};
use crate::storage::{IntegrityStats, Repository, TransferOutcome};

use super::{AppError, Session};

/// Application service providing the ledger operations.
/// This is the primary interface for any client (menu loop, CLI commands, tests).
pub struct LedgerService {
    repo: Repository,
}

/// Result of a committed transfer
#[derive(Debug, Clone)]
pub struct TransferResult {
    pub record: TransactionRecord,
    pub sender_balance: Cents,
    pub recipient_balance: Cents,
}

/// Store integrity summary
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub stats: IntegrityStats,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path (creates the file and schema).
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Registration & authentication
    // ========================

    /// Register a new account and log it in.
    pub async fn register(&self, registration: Registration) -> Result<Session<'_>, AppError> {
        if let Some(field) = registration.missing_field() {
            return Err(AppError::MissingField(field));
        }

        let credential = hash_secret(&registration.secret)?;
        let account = Account::new(
            registration.identifier,
            registration.full_name,
            credential,
            registration.phone,
        );

        if !self.repo.insert_account(&account).await? {
            return Err(AppError::DuplicateIdentifier(account.identifier));
        }

        info!(identifier = %account.identifier, "account registered");
        Ok(Session::new(self, account.identifier))
    }

    /// Returns true iff the account exists and `secret` matches its credential.
    /// An unknown identifier is reported the same way as a wrong secret.
    /// Identifiers are trimmed; secrets are compared exactly as given.
    pub async fn validate_credentials(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<bool, AppError> {
        let identifier = identifier.trim();
        let Some(stored) = self.repo.get_credential(identifier).await? else {
            debug!(identifier, "credential lookup found no account");
            return Ok(false);
        };
        Ok(verify_secret(secret, &stored))
    }

    /// Authenticate and open a session.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Session<'_>, AppError> {
        let identifier = identifier.trim();
        if self.validate_credentials(identifier, secret).await? {
            info!(identifier, "login succeeded");
            Ok(Session::new(self, identifier.to_string()))
        } else {
            info!(identifier, "login failed");
            Err(AppError::InvalidCredentials)
        }
    }

    /// Get an account by identifier.
    pub async fn get_account(&self, identifier: &str) -> Result<Account, AppError> {
        let identifier = identifier.trim();
        self.repo
            .get_account(identifier)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(identifier.to_string()))
    }

    // ========================
    // Ledger operations
    // ========================

    /// Withdraw `amount_cents` if the balance covers it. Returns the new balance.
    pub async fn withdraw(&self, identifier: &str, amount_cents: Cents) -> Result<Cents, AppError> {
        let amount_cents = validate_amount(amount_cents)?;
        let identifier = identifier.trim();

        match self.repo.debit(identifier, amount_cents).await? {
            Some(balance) => {
                info!(identifier, amount = %format_cents(amount_cents), "withdrawal");
                Ok(balance)
            }
            None => match self.repo.get_balance(identifier).await? {
                Some(balance) => Err(AppError::InsufficientFunds {
                    identifier: identifier.to_string(),
                    balance,
                    required: amount_cents,
                }),
                None => Err(AppError::AccountNotFound(identifier.to_string())),
            },
        }
    }

    /// Deposit `amount_cents`. Returns the new balance.
    /// There is no upper bound beyond what a balance can represent.
    pub async fn deposit(&self, identifier: &str, amount_cents: Cents) -> Result<Cents, AppError> {
        let amount_cents = validate_amount(amount_cents)?;
        let identifier = identifier.trim();

        match self.repo.credit(identifier, amount_cents).await? {
            Some(balance) => {
                info!(identifier, amount = %format_cents(amount_cents), "deposit");
                Ok(balance)
            }
            None => match self.repo.get_balance(identifier).await? {
                Some(_) => Err(AppError::BalanceOverflow(identifier.to_string())),
                None => Err(AppError::AccountNotFound(identifier.to_string())),
            },
        }
    }

    /// Move money between two accounts, all or nothing.
    ///
    /// Every attempt that reaches storage leaves exactly one record in the
    /// transaction log: SUCCESS, written inside the transfer's own transaction,
    /// or FAILED, written after the rollback so it survives it.
    pub async fn transfer(
        &self,
        sender: &str,
        recipient: &str,
        amount_cents: Cents,
    ) -> Result<TransferResult, AppError> {
        let amount_cents = validate_amount(amount_cents)?;
        let sender = sender.trim();
        let recipient = recipient.trim();
        if sender == recipient {
            return Err(AppError::SameAccount(sender.to_string()));
        }

        let mut record = TransactionRecord::success(sender, recipient, amount_cents);
        let outcome = self.repo.transfer(&mut record).await;

        let err = match outcome {
            Ok(TransferOutcome::Committed {
                sender_balance,
                recipient_balance,
            }) => {
                info!(
                    sender,
                    recipient,
                    amount = %format_cents(amount_cents),
                    sequence = record.sequence,
                    "transfer committed"
                );
                return Ok(TransferResult {
                    record,
                    sender_balance,
                    recipient_balance,
                });
            }
            Ok(TransferOutcome::InsufficientFunds { balance }) => AppError::InsufficientFunds {
                identifier: sender.to_string(),
                balance,
                required: amount_cents,
            },
            Ok(TransferOutcome::SenderNotFound) => AppError::AccountNotFound(sender.to_string()),
            Ok(TransferOutcome::RecipientNotFound) => {
                AppError::AccountNotFound(recipient.to_string())
            }
            Ok(TransferOutcome::BalanceOverflow) => {
                AppError::BalanceOverflow(recipient.to_string())
            }
            Err(e) => AppError::StorageUnavailable(e),
        };

        match &err {
            AppError::StorageUnavailable(_) => {
                warn!(sender, recipient, amount = %format_cents(amount_cents), error = %err, "transfer aborted")
            }
            _ => info!(sender, recipient, amount = %format_cents(amount_cents), error = %err, "transfer rejected"),
        }

        let mut failed = TransactionRecord::failed(sender, recipient, amount_cents, err.to_string());
        if let Err(log_err) = self.repo.append_transaction(&mut failed).await {
            // The caller still gets the transfer error.
            warn!(error = %format!("{log_err:#}"), "could not record failed transfer");
        }

        Err(err)
    }

    /// Read the balance from the store.
    pub async fn check_balance(&self, identifier: &str) -> Result<Cents, AppError> {
        let identifier = identifier.trim();
        self.repo
            .get_balance(identifier)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(identifier.to_string()))
    }

    // ========================
    // Transaction log
    // ========================

    /// List the transaction log for one account, most recent `limit` records,
    /// oldest first.
    pub async fn list_transactions(
        &self,
        identifier: &str,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionRecord>, AppError> {
        let identifier = identifier.trim();
        // Failed transfers can name accounts that never existed, so a missing
        // account is only an error when it also has no history.
        let records = self
            .repo
            .list_transactions_for_account(identifier, limit)
            .await?;
        if records.is_empty() && self.repo.get_balance(identifier).await?.is_none() {
            return Err(AppError::AccountNotFound(identifier.to_string()));
        }
        Ok(records)
    }

    /// List the whole transaction log, ordered by sequence.
    pub async fn list_all_transactions(&self) -> Result<Vec<TransactionRecord>, AppError> {
        Ok(self.repo.list_transactions().await?)
    }

    // ========================
    // Integrity
    // ========================

    /// Check store integrity and return a report.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let stats = self.repo.get_integrity_stats().await?;
        let mut issues = Vec::new();

        if stats.negative_balances > 0 {
            issues.push(format!(
                "{} account(s) with a negative balance",
                stats.negative_balances
            ));
        }
        if stats.has_sequence_gaps {
            issues.push("Transaction log has sequence gaps".to_string());
        }
        if stats.unknown_parties > 0 {
            issues.push(format!(
                "{} committed transfer(s) reference unknown accounts",
                stats.unknown_parties
            ));
        }

        Ok(IntegrityReport { stats, issues })
    }
}
