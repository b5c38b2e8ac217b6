use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::domain::{Account, Cents, TransactionRecord, TransactionStatus, lock_order};

use super::MIGRATION_001_INITIAL;

/// How long a connection waits on SQLite's write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Statistics for store integrity verification.
#[derive(Debug, Clone)]
pub struct IntegrityStats {
    pub account_count: i64,
    pub total_balance: Cents,
    pub negative_balances: i64,
    pub success_count: i64,
    pub failed_count: i64,
    pub has_sequence_gaps: bool,
    pub unknown_parties: i64,
}

/// What happened to a transfer that reached storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Committed {
        sender_balance: Cents,
        recipient_balance: Cents,
    },
    InsufficientFunds {
        balance: Cents,
    },
    SenderNotFound,
    RecipientNotFound,
    /// The credit would push the recipient past `Cents::MAX`
    BalanceOverflow,
}

/// Repository over the account store and the transaction log.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    /// Use `mode=rwc` in the URL to create the file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to the database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run more than once.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Account operations
    // ========================

    /// Insert a new account.
    /// Returns false, without touching any row, if the identifier is taken.
    pub async fn insert_account(&self, account: &Account) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (identifier, full_name, credential, phone, balance_cents, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.identifier)
        .bind(&account.full_name)
        .bind(&account.credential)
        .bind(&account.phone)
        .bind(account.balance_cents)
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(false),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to save account")),
        }
    }

    /// Get an account by identifier.
    pub async fn get_account(&self, identifier: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT identifier, full_name, credential, phone, balance_cents, created_at
            FROM accounts
            WHERE identifier = ?
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Get the stored credential for an identifier.
    pub async fn get_credential(&self, identifier: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT credential FROM accounts WHERE identifier = ?")
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch credential")?;

        Ok(row.map(|row| row.get("credential")))
    }

    /// Read the current balance straight from the store.
    pub async fn get_balance(&self, identifier: &str) -> Result<Option<Cents>> {
        Self::balance_with(&self.pool, identifier).await
    }

    /// Subtract `amount_cents` only if the balance covers it.
    /// Returns the new balance, or None if no row matched (missing account or
    /// insufficient funds).
    pub async fn debit(&self, identifier: &str, amount_cents: Cents) -> Result<Option<Cents>> {
        Self::debit_with(&self.pool, identifier, amount_cents).await
    }

    /// Add `amount_cents` unless the balance would exceed `Cents::MAX`.
    /// Returns the new balance, or None if no row matched (missing account or
    /// overflow).
    pub async fn credit(&self, identifier: &str, amount_cents: Cents) -> Result<Option<Cents>> {
        Self::credit_with(&self.pool, identifier, amount_cents).await
    }

    async fn balance_with<'e, E>(executor: E, identifier: &str) -> Result<Option<Cents>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query("SELECT balance_cents FROM accounts WHERE identifier = ?")
            .bind(identifier)
            .fetch_optional(executor)
            .await
            .context("Failed to fetch balance")?;

        Ok(row.map(|row| row.get("balance_cents")))
    }

    async fn debit_with<'e, E>(
        executor: E,
        identifier: &str,
        amount_cents: Cents,
    ) -> Result<Option<Cents>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents - ?
            WHERE identifier = ? AND balance_cents >= ?
            RETURNING balance_cents
            "#,
        )
        .bind(amount_cents)
        .bind(identifier)
        .bind(amount_cents)
        .fetch_optional(executor)
        .await
        .context("Failed to debit account")?;

        Ok(row.map(|row| row.get("balance_cents")))
    }

    async fn credit_with<'e, E>(
        executor: E,
        identifier: &str,
        amount_cents: Cents,
    ) -> Result<Option<Cents>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents + ?
            WHERE identifier = ? AND balance_cents <= ?
            RETURNING balance_cents
            "#,
        )
        .bind(amount_cents)
        .bind(identifier)
        .bind(Cents::MAX - amount_cents)
        .fetch_optional(executor)
        .await
        .context("Failed to credit account")?;

        Ok(row.map(|row| row.get("balance_cents")))
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            identifier: row.get("identifier"),
            full_name: row.get("full_name"),
            credential: row.get("credential"),
            phone: row.get("phone"),
            balance_cents: row.get("balance_cents"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Transfer operations
    // ========================

    /// Move `record.amount_cents` from `record.sender` to `record.recipient` and
    /// append `record` (a SUCCESS record) in one transaction.
    ///
    /// Both legs are writes issued before any read, so the transaction holds the
    /// write lock from its first statement. Legs run in canonical identifier
    /// order. Anything short of `Committed` leaves every balance untouched and
    /// nothing appended; the caller records the failure.
    pub async fn transfer(&self, record: &mut TransactionRecord) -> Result<TransferOutcome> {
        let amount = record.amount_cents;
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transfer")?;

        let (first, _) = lock_order(&record.sender, &record.recipient);
        let sender_first = first == record.sender;

        let (sender_balance, recipient_balance) = if sender_first {
            let Some(sender_balance) = Self::debit_with(&mut *tx, &record.sender, amount).await?
            else {
                let outcome = Self::debit_failure(&mut tx, &record.sender).await?;
                tx.rollback().await.context("Failed to roll back transfer")?;
                return Ok(outcome);
            };
            let Some(recipient_balance) =
                Self::credit_with(&mut *tx, &record.recipient, amount).await?
            else {
                let outcome = Self::credit_failure(&mut tx, record).await?;
                tx.rollback().await.context("Failed to roll back transfer")?;
                return Ok(outcome);
            };
            (sender_balance, recipient_balance)
        } else {
            let Some(recipient_balance) =
                Self::credit_with(&mut *tx, &record.recipient, amount).await?
            else {
                let outcome = Self::credit_failure(&mut tx, record).await?;
                tx.rollback().await.context("Failed to roll back transfer")?;
                return Ok(outcome);
            };
            let Some(sender_balance) = Self::debit_with(&mut *tx, &record.sender, amount).await?
            else {
                let outcome = Self::debit_failure(&mut tx, &record.sender).await?;
                tx.rollback().await.context("Failed to roll back transfer")?;
                return Ok(outcome);
            };
            (sender_balance, recipient_balance)
        };

        let sequence = Self::append_with(&mut *tx, record).await?;
        tx.commit().await.context("Failed to commit transfer")?;
        record.sequence = sequence;

        Ok(TransferOutcome::Committed {
            sender_balance,
            recipient_balance,
        })
    }

    // Failure reads run inside the transfer, which already holds the write
    // lock, so the reported balance is the one the failed leg saw.

    async fn debit_failure(conn: &mut SqliteConnection, sender: &str) -> Result<TransferOutcome> {
        Ok(match Self::balance_with(&mut *conn, sender).await? {
            Some(balance) => TransferOutcome::InsufficientFunds { balance },
            None => TransferOutcome::SenderNotFound,
        })
    }

    async fn credit_failure(
        conn: &mut SqliteConnection,
        record: &TransactionRecord,
    ) -> Result<TransferOutcome> {
        // A missing sender must win over a missing recipient.
        if Self::balance_with(&mut *conn, &record.sender).await?.is_none() {
            return Ok(TransferOutcome::SenderNotFound);
        }
        Ok(match Self::balance_with(&mut *conn, &record.recipient).await? {
            Some(_) => TransferOutcome::BalanceOverflow,
            None => TransferOutcome::RecipientNotFound,
        })
    }

    // ========================
    // Transaction log
    // ========================

    /// Append a record to the log, outside any transfer transaction.
    /// Assigns the record's sequence number.
    pub async fn append_transaction(&self, record: &mut TransactionRecord) -> Result<()> {
        let sequence = Self::append_with(&self.pool, record).await?;
        record.sequence = sequence;
        Ok(())
    }

    async fn append_with<'e, E>(executor: E, record: &TransactionRecord) -> Result<i64>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (id, sender, recipient, amount_cents, status, reason, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING sequence
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.sender)
        .bind(&record.recipient)
        .bind(record.amount_cents)
        .bind(record.status.as_str())
        .bind(&record.reason)
        .bind(record.timestamp.to_rfc3339())
        .fetch_one(executor)
        .await
        .context("Failed to append transaction record")?;

        Ok(row.get("sequence"))
    }

    /// List all records, ordered by sequence.
    pub async fn list_transactions(&self) -> Result<Vec<TransactionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT sequence, id, sender, recipient, amount_cents, status, reason, timestamp
            FROM transactions
            ORDER BY sequence
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List records where the account is sender or recipient, ordered by
    /// sequence. With a limit, only the most recent `limit` records are kept.
    pub async fn list_transactions_for_account(
        &self,
        identifier: &str,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionRecord>> {
        // SQLite treats a negative LIMIT as no limit
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT sequence, id, sender, recipient, amount_cents, status, reason, timestamp
                FROM transactions
                WHERE sender = ? OR recipient = ?
                ORDER BY sequence DESC
                LIMIT ?
            )
            ORDER BY sequence
            "#,
        )
        .bind(identifier)
        .bind(identifier)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for account")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<TransactionRecord> {
        let id_str: String = row.get("id");
        let status_str: String = row.get("status");
        let timestamp_str: String = row.get("timestamp");

        Ok(TransactionRecord {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            sequence: row.get("sequence"),
            sender: row.get("sender"),
            recipient: row.get("recipient"),
            amount_cents: row.get("amount_cents"),
            status: TransactionStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction status: {}", status_str))?,
            reason: row.get("reason"),
            timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                .context("Invalid timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Integrity
    // ========================

    /// Get statistics for integrity checking.
    pub async fn get_integrity_stats(&self) -> Result<IntegrityStats> {
        let accounts = sqlx::query(
            r#"
            SELECT
                COUNT(*) as count,
                COALESCE(SUM(balance_cents), 0) as total,
                COALESCE(SUM(CASE WHEN balance_cents < 0 THEN 1 ELSE 0 END), 0) as negative
            FROM accounts
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to read account stats")?;

        let log = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'SUCCESS' THEN 1 ELSE 0 END), 0) as success,
                COALESCE(SUM(CASE WHEN status = 'FAILED' THEN 1 ELSE 0 END), 0) as failed,
                MIN(sequence) as min_seq,
                MAX(sequence) as max_seq,
                COUNT(*) as count
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to read transaction log stats")?;

        let min_seq: Option<i64> = log.get("min_seq");
        let max_seq: Option<i64> = log.get("max_seq");
        let count: i64 = log.get("count");

        let has_sequence_gaps = match (min_seq, max_seq) {
            (Some(min), Some(max)) => (max - min + 1) != count,
            _ => false,
        };

        // Committed transfers must name real accounts on both sides
        let unknown_parties: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM transactions t
            WHERE t.status = 'SUCCESS'
              AND (NOT EXISTS (SELECT 1 FROM accounts a WHERE a.identifier = t.sender)
                OR NOT EXISTS (SELECT 1 FROM accounts a WHERE a.identifier = t.recipient))
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to check transaction parties")?
        .get("count");

        Ok(IntegrityStats {
            account_count: accounts.get("count"),
            total_balance: accounts.get("total"),
            negative_balances: accounts.get("negative"),
            success_count: log.get("success"),
            failed_count: log.get("failed"),
            has_sequence_gaps,
            unknown_parties,
        })
    }
}
