//! IMLO - Uzbek spelling correction with a prepaid token balance

mod app;
mod config;

use app::{App, CheckOutcome};
use clap::{Parser, Subcommand};
use config::AppConfig;
use imlo_ledger::{PaymentRequest, VerificationOutcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "imlo")]
#[command(about = "Uzbek spelling correction with token metering", version)]
struct Cli {
    /// TOML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correct a text, spending one token
    Check {
        #[arg(short, long)]
        user: String,
        text: String,
    },

    /// Show a user's token balance
    Balance {
        #[arg(short, long)]
        user: String,
    },

    /// Show a user's account statistics
    Stats {
        #[arg(short, long)]
        user: String,
    },

    /// Issue a payment code for a user
    RequestPayment {
        #[arg(short, long)]
        user: String,
    },

    /// Verify a payment receipt for a user's pending code
    Verify {
        #[arg(short, long)]
        user: String,
        /// Receipt image URL or reference
        receipt: String,
    },

    /// Show service-wide usage counters
    Analytics,

    /// List top users by tokens earned
    Leaderboard {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

fn payment_instructions(request: &PaymentRequest) -> String {
    format!(
        "\n💳 Payment required\n\
         ═══════════════════════════════════\n\
         Pay {} {} via {}\n\
         Card:     {} ({})\n\
         Receiver: {}\n\
         Code:     {}\n\n\
         Send the receipt with `imlo verify` to receive {} tokens.\n",
        request.amount,
        request.currency,
        request.provider,
        request.card,
        request.card_last4,
        request.receiver,
        request.payment_code,
        request.tokens
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let app = App::open(&config)?;

    match cli.command {
        Commands::Check { user, text } => {
            let outcome = app.check(&user, &text).await?;
            let changed = outcome.changed();
            match outcome {
                CheckOutcome::Checked {
                    original,
                    corrected,
                    balance,
                } => {
                    if changed {
                        println!("✏️  {}", corrected);
                    } else {
                        println!("✅ Text is already correct: {}", original);
                    }
                    println!("Tokens left: {}", balance);
                }
                CheckOutcome::Empty => {
                    println!("Nothing to check, no token spent.");
                }
                CheckOutcome::PaymentRequired(request) => {
                    println!("⚠️  Out of tokens.");
                    println!("{}", payment_instructions(&request));
                }
            }
        }

        Commands::Balance { user } => {
            let balance = app.ledger.balance(&user)?;
            let state = app.ledger.payment_state(&user)?;
            println!("💰 {}: {} tokens ({:?})", user, balance, state);
        }

        Commands::Stats { user } => {
            let stats = app.ledger.user_stats(&user)?;
            println!("\n📊 Account {}", user);
            println!("═══════════════════════════════════");
            println!("Balance:         {}", stats.balance);
            println!("Tokens used:     {}", stats.total_tokens_used);
            println!("Tokens earned:   {}", stats.total_tokens_earned);
            println!("Payments:        {}", stats.total_payments);
            println!("Payment pending: {}", stats.payment_pending);
            println!("Joined:          {}", stats.join_date.format("%Y-%m-%d %H:%M"));
            println!("Last active:     {}", stats.last_active.format("%Y-%m-%d %H:%M"));
            println!();
        }

        Commands::RequestPayment { user } => {
            let request = app.ledger.request_payment(&user).await?;
            println!("{}", payment_instructions(&request));
        }

        Commands::Verify { user, receipt } => {
            match app.ledger.verify_payment(&user, &receipt).await? {
                VerificationOutcome::Verified {
                    tokens_added,
                    new_balance,
                    confidence,
                    ..
                } => {
                    println!(
                        "✅ Payment verified ({:.0}% confidence): +{} tokens, balance {}",
                        confidence, tokens_added, new_balance
                    );
                }
                VerificationOutcome::Rejected { reason, .. } => {
                    println!("❌ Payment not verified: {}", reason);
                }
            }
        }

        Commands::Analytics => {
            let stats = app.ledger.usage_stats();
            println!("\n📈 Usage");
            println!("═══════════════════════════════════");
            println!("Tokens spent:      {}", stats.tokens_spent);
            println!("Corrections:       {}", stats.corrections_performed);
            println!("Payment requests:  {}", stats.payment_requests);
            println!("Payment successes: {}", stats.payment_successes);
            println!("Payment failures:  {}", stats.payment_failures);
            match stats.payment_success_rate() {
                Some(rate) => println!("Success rate:      {}%", rate),
                None => println!("Success rate:      n/a"),
            }
            println!();
        }

        Commands::Leaderboard { limit } => {
            let entries = app.ledger.leaderboard(limit);
            if entries.is_empty() {
                println!("🏆 No users yet.");
                return Ok(());
            }
            println!("\n🏆 Leaderboard");
            println!("═══════════════════════════════════");
            for (i, entry) in entries.iter().enumerate() {
                println!(
                    "{}. {} - {} tokens, {} payments, last active {}",
                    i + 1,
                    entry.user_id,
                    entry.tokens_earned,
                    entry.total_payments,
                    entry.last_active.format("%Y-%m-%d")
                );
            }
            println!();
        }
    }

    Ok(())
}
