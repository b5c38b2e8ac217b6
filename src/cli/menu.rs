//! Interactive ATM menu.
//!
//! The menu owns its input and output, so the same loop drives a terminal in
//! `main` and an in-memory script in tests. Ledger errors are reported to the
//! user and the loop carries on; only console I/O errors end it.

use std::io::{BufRead, Write};

use anyhow::Result;

use crate::application::{AppError, LedgerService, Session};
use crate::domain::{Registration, format_cents, parse_cents};

pub struct Menu<'a, R, W> {
    service: &'a LedgerService,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(service: &'a LedgerService, input: R, output: W) -> Self {
        Self {
            service,
            input,
            output,
        }
    }

    /// Run the main menu until the user exits or input runs out.
    pub async fn run(&mut self) -> Result<()> {
        writeln!(self.output, "Welcome to our ATM banking system!")?;

        loop {
            writeln!(self.output, "Main Menu:")?;
            writeln!(self.output, "1. Create an account")?;
            writeln!(self.output, "2. Login")?;
            writeln!(self.output, "3. Exit")?;
            let Some(choice) = self.prompt("Enter your choice: ")? else {
                return Ok(());
            };

            match choice.as_str() {
                "1" => self.handle_registration().await?,
                "2" => self.handle_login().await?,
                "3" => {
                    writeln!(
                        self.output,
                        "Thank you for using our banking ATM system! Goodbye!"
                    )?;
                    return Ok(());
                }
                _ => writeln!(self.output, "Enter a valid choice!")?,
            }
        }
    }

    async fn handle_registration(&mut self) -> Result<()> {
        let service = self.service;

        let Some(full_name) = self.prompt("Full Name: ")? else {
            return Ok(());
        };
        let Some(email) = self.prompt("Email: ")? else {
            return Ok(());
        };
        let Some(password) = self.prompt("Password: ")? else {
            return Ok(());
        };
        let Some(phone) = self.prompt("Phone number: ")? else {
            return Ok(());
        };

        match service
            .register(Registration::new(full_name, email, password, phone))
            .await
        {
            Ok(session) => {
                writeln!(self.output, "Registration successful!")?;
                self.account_menu(&session).await
            }
            Err(AppError::MissingField(_)) => {
                writeln!(self.output, "All fields are required.")?;
                Ok(())
            }
            Err(AppError::DuplicateIdentifier(email)) => {
                writeln!(self.output, "An account with email {} already exists.", email)?;
                Ok(())
            }
            Err(e) => {
                writeln!(self.output, "Error during registration: {}", e)?;
                Ok(())
            }
        }
    }

    async fn handle_login(&mut self) -> Result<()> {
        let service = self.service;

        writeln!(self.output, "Please login to continue.")?;
        let Some(email) = self.prompt("Email: ")? else {
            return Ok(());
        };
        let Some(password) = self.prompt("Password: ")? else {
            return Ok(());
        };

        match service.login(&email, &password).await {
            Ok(session) => {
                writeln!(self.output, "Login successful!")?;
                self.account_menu(&session).await
            }
            Err(AppError::InvalidCredentials) => {
                writeln!(
                    self.output,
                    "Invalid email or password. Please try again."
                )?;
                Ok(())
            }
            Err(e) => {
                writeln!(self.output, "Error during login: {}", e)?;
                Ok(())
            }
        }
    }

    async fn account_menu(&mut self, session: &Session<'_>) -> Result<()> {
        loop {
            writeln!(self.output, "1. Withdraw Money")?;
            writeln!(self.output, "2. Deposit Money")?;
            writeln!(self.output, "3. Transfer Money")?;
            writeln!(self.output, "4. Check Balance")?;
            writeln!(self.output, "5. Log Out")?;
            let Some(choice) = self.prompt("Enter your choice: ")? else {
                return Ok(());
            };

            match choice.as_str() {
                "1" => self.withdraw(session).await?,
                "2" => self.deposit(session).await?,
                "3" => self.transfer(session).await?,
                "4" => self.check_balance(session).await?,
                "5" => break,
                _ => writeln!(self.output, "Enter a valid choice!")?,
            }
        }

        writeln!(self.output, "You have been logged out.")?;
        Ok(())
    }

    async fn withdraw(&mut self, session: &Session<'_>) -> Result<()> {
        let Some(amount) = self.read_amount("withdraw")? else {
            return Ok(());
        };

        match session.withdraw(amount).await {
            Ok(balance) => writeln!(
                self.output,
                "Withdrawal successful. New balance: {}",
                format_cents(balance)
            )?,
            Err(AppError::InvalidAmount(_)) => self.invalid_amount("Withdraw")?,
            Err(AppError::InsufficientFunds { .. }) => {
                writeln!(self.output, "Insufficient funds.")?
            }
            Err(e) => writeln!(self.output, "Error during withdrawal: {}", e)?,
        }
        Ok(())
    }

    async fn deposit(&mut self, session: &Session<'_>) -> Result<()> {
        let Some(amount) = self.read_amount("deposit")? else {
            return Ok(());
        };

        match session.deposit(amount).await {
            Ok(balance) => writeln!(
                self.output,
                "Deposit successful. New balance: {}",
                format_cents(balance)
            )?,
            Err(AppError::InvalidAmount(_)) => self.invalid_amount("Deposit")?,
            Err(e) => writeln!(self.output, "Error during deposit: {}", e)?,
        }
        Ok(())
    }

    async fn transfer(&mut self, session: &Session<'_>) -> Result<()> {
        let Some(recipient) = self.prompt("Enter recipient email: ")? else {
            return Ok(());
        };
        let Some(amount) = self.read_amount("transfer")? else {
            return Ok(());
        };

        match session.transfer(&recipient, amount).await {
            Ok(result) => writeln!(
                self.output,
                "Transfer successful. New balance: {}",
                format_cents(result.sender_balance)
            )?,
            Err(AppError::InvalidAmount(_)) => self.invalid_amount("Transfer")?,
            Err(AppError::InsufficientFunds { .. }) => {
                writeln!(self.output, "Insufficient funds.")?
            }
            Err(AppError::AccountNotFound(who)) => {
                writeln!(self.output, "Account not found: {}", who)?
            }
            Err(AppError::SameAccount(_)) => writeln!(
                self.output,
                "You cannot transfer money to your own account."
            )?,
            Err(e) => writeln!(self.output, "Error during transfer: {}", e)?,
        }
        Ok(())
    }

    async fn check_balance(&mut self, session: &Session<'_>) -> Result<()> {
        match session.balance().await {
            Ok(balance) => writeln!(
                self.output,
                "Your current balance is: {}",
                format_cents(balance)
            )?,
            Err(AppError::AccountNotFound(_)) => writeln!(self.output, "Account not found.")?,
            Err(e) => writeln!(self.output, "Error checking balance: {}", e)?,
        }
        Ok(())
    }

    /// Prompt for an amount. Unparseable input is reported like any other
    /// invalid amount and yields `Some(0)`, which the ledger then rejects
    /// without touching storage.
    fn read_amount(&mut self, action: &str) -> Result<Option<i64>> {
        let Some(line) = self.prompt(&format!("Enter amount to {}: ", action))? else {
            return Ok(None);
        };
        Ok(Some(parse_cents(&line).unwrap_or(0)))
    }

    fn invalid_amount(&mut self, action: &str) -> Result<()> {
        writeln!(
            self.output,
            "Invalid amount. {} amount must be in multiples of 500 or 1000.",
            action
        )?;
        Ok(())
    }

    /// Print `label`, read one line and trim it. None means input is exhausted.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
