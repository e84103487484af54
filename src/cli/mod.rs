use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::application::{ErrorCategory, LedgerError, LedgerService};
use crate::domain::format_cents;

/// Cassa - PIN-protected account ledger
#[derive(Parser)]
#[command(name = "cassa")]
#[command(about = "A PIN-protected account ledger with atomic funds transfers")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "cassa.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Create a new account protected by a PIN
    Create {
        /// Account id (must be unique)
        id: String,

        /// PIN that will guard the account
        #[arg(short, long)]
        pin: String,
    },

    /// Add funds to an account
    Fund {
        /// Account id
        id: String,

        /// Amount to add (e.g., "50.00" or "50")
        #[arg(short, long)]
        amount: String,

        /// Account PIN
        #[arg(short, long)]
        pin: String,
    },

    /// Withdraw funds from an account
    Withdraw {
        /// Account id
        id: String,

        /// Amount to withdraw (e.g., "50.00" or "50")
        #[arg(short, long)]
        amount: String,

        /// Account PIN
        #[arg(short, long)]
        pin: String,
    },

    /// Transfer funds between two accounts
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Sender account id
        #[arg(long)]
        from: String,

        /// Recipient account id
        #[arg(long)]
        to: String,

        /// Sender's PIN
        #[arg(short, long)]
        pin: String,
    },

    /// Show the balance of an account
    Balance {
        /// Account id
        id: String,

        /// Account PIN
        #[arg(short, long)]
        pin: String,
    },

    /// Verify ledger integrity
    Check,
}

impl Cli {
    /// Set up process-wide logging on stderr.
    ///
    /// `RUST_LOG` wins when set; otherwise `--verbose` lowers the default
    /// level from warn to debug. PINs and hashes are never logged anywhere.
    pub fn init_tracing(&self) {
        let default_level = if self.verbose { "debug" } else { "warn" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }

    pub async fn run(self) -> Result<()> {
        let result = self.dispatch().await;

        if let Err(err) = &result {
            if is_internal(err) {
                tracing::error!("command failed: {err:?}");
            }
        }

        result
    }

    async fn dispatch(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Create { ref id, ref pin } => {
                let service = LedgerService::connect(&self.database).await?;
                let account = service
                    .create_account(Some(id.as_str()), Some(pin.as_str()))
                    .await?;

                if self.json {
                    println!("{}", serde_json::to_string_pretty(&account)?);
                } else {
                    println!("Account created successfully: {}", account.id);
                }
            }

            Commands::Fund {
                ref id,
                ref amount,
                ref pin,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let entry = service
                    .fund_account(Some(id.as_str()), Some(amount.as_str()), Some(pin.as_str()))
                    .await?;

                if self.json {
                    println!("{}", serde_json::to_string_pretty(&entry)?);
                } else {
                    println!(
                        "Account funded successfully: {} (balance {})",
                        entry.account_id,
                        format_cents(entry.balance)
                    );
                }
            }

            Commands::Withdraw {
                ref id,
                ref amount,
                ref pin,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let entry = service
                    .withdraw_funds(Some(id.as_str()), Some(amount.as_str()), Some(pin.as_str()))
                    .await?;

                if self.json {
                    println!("{}", serde_json::to_string_pretty(&entry)?);
                } else {
                    println!(
                        "Funds withdrawn successfully: {} (balance {})",
                        entry.account_id,
                        format_cents(entry.balance)
                    );
                }
            }

            Commands::Transfer {
                ref amount,
                ref from,
                ref to,
                ref pin,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let result = service
                    .transfer_funds(
                        Some(from.as_str()),
                        Some(to.as_str()),
                        Some(amount.as_str()),
                        Some(pin.as_str()),
                    )
                    .await?;

                if self.json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    println!(
                        "Funds transferred successfully: {} {} -> {}",
                        format_cents(result.amount),
                        result.sender_id,
                        result.recipient_id
                    );
                    println!("Sender balance: {}", format_cents(result.sender_balance));
                }
            }

            Commands::Balance { ref id, ref pin } => {
                let service = LedgerService::connect(&self.database).await?;
                let entry = service
                    .get_account_balance(Some(id.as_str()), Some(pin.as_str()))
                    .await?;

                if self.json {
                    println!("{}", serde_json::to_string_pretty(&entry)?);
                } else {
                    println!("{}: {}", entry.account_id, format_cents(entry.balance));
                }
            }

            Commands::Check => {
                let service = LedgerService::connect(&self.database).await?;
                run_check_command(&service, self.json).await?;
            }
        }

        Ok(())
    }
}

async fn run_check_command(service: &LedgerService, json: bool) -> Result<()> {
    let stats = service.verify_ledger().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Accounts:      {}", stats.account_count);
        println!("Total balance: {}", format_cents(stats.total_balance));
        println!();

        if stats.is_consistent() {
            println!("Ledger is consistent.");
        } else {
            println!("Issues found:");
            if stats.overdrawn_count > 0 {
                println!("  - {} account(s) with negative balance", stats.overdrawn_count);
            }
            if stats.empty_pin_hash_count > 0 {
                println!(
                    "  - {} account(s) with an empty PIN hash",
                    stats.empty_pin_hash_count
                );
            }
        }
    }

    if !stats.is_consistent() {
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

fn is_internal(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<LedgerError>() {
        Some(ledger_err) => ledger_err.category() == ErrorCategory::Internal,
        // Anything that is not a ledger error (connect failures etc.) gets
        // the same treatment as an internal failure.
        None => true,
    }
}
