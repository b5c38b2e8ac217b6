mod menu;

pub use menu::Menu;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::LedgerService;
use crate::domain::{TransactionRecord, format_cents};

/// Tellr - console banking ledger
#[derive(Parser)]
#[command(name = "tellr")]
#[command(about = "A console ATM banking ledger with atomic transfers and an audit log")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "tellr.db")]
    pub database: String,

    /// Enable verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Defaults to the interactive menu
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Run the interactive ATM menu
    Menu,

    /// Show or export the transaction log for an account
    History {
        /// Account email
        identifier: String,

        /// Only the most recent N records
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format: table, csv, json
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Output file for csv/json (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Verify store integrity
    Check,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command.unwrap_or(Commands::Menu) {
            Commands::Init => {
                LedgerService::init(&self.database)
                    .await
                    .context("Failed to initialize the database")?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Menu => {
                let service = connect(&self.database).await?;
                let stdin = std::io::stdin();
                Menu::new(&service, stdin.lock(), std::io::stdout())
                    .run()
                    .await?;
            }

            Commands::History {
                identifier,
                limit,
                format,
                output,
            } => {
                let service = connect(&self.database).await?;
                run_history_command(&service, &identifier, limit, &format, output.as_deref())
                    .await?;
            }

            Commands::Check => {
                let service = connect(&self.database).await?;
                run_check_command(&service).await?;
            }
        }

        Ok(())
    }
}

async fn connect(database: &str) -> Result<LedgerService> {
    LedgerService::connect(database)
        .await
        .with_context(|| format!("Failed to connect to the database '{}'", database))
}

async fn run_history_command(
    service: &LedgerService,
    identifier: &str,
    limit: Option<usize>,
    format: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let records = service.list_transactions(identifier, limit).await?;

    if format == "table" {
        print_history_table(identifier, &records);
        return Ok(());
    }

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let exporter = Exporter::new(identifier, &records);
    let count = match format {
        "csv" => exporter.export_csv(writer)?,
        "json" => exporter.export_json(writer)?,
        _ => anyhow::bail!(
            "Invalid format '{}'. Valid formats: table, csv, json",
            format
        ),
    };

    if output.is_some() {
        eprintln!("Exported {} transactions", count);
    }
    Ok(())
}

fn print_history_table(identifier: &str, records: &[TransactionRecord]) {
    if records.is_empty() {
        println!("No transactions found.");
        return;
    }

    println!(
        "{:<6} {:<20} {:<4} {:<24} {:>12} {:<8} REASON",
        "SEQ", "DATE", "DIR", "COUNTERPARTY", "AMOUNT", "STATUS"
    );
    println!("{}", "-".repeat(90));

    for record in records {
        let (direction, counterparty) = if record.sender == identifier {
            ("OUT", record.recipient.as_str())
        } else {
            ("IN", record.sender.as_str())
        };

        println!(
            "{:<6} {:<20} {:<4} {:<24} {:>12} {:<8} {}",
            record.sequence,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            direction,
            truncate(counterparty, 24),
            format_cents(record.amount_cents),
            record.status,
            record.reason.as_deref().unwrap_or("")
        );
    }
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;
    let stats = &report.stats;

    println!("Accounts:      {}", stats.account_count);
    println!("Total balance: {}", format_cents(stats.total_balance));
    println!(
        "Transfers:     {} ({} succeeded, {} failed)",
        stats.success_count + stats.failed_count,
        stats.success_count,
        stats.failed_count
    );
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
