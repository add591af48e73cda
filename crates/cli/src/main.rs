//! Open Impact CLI - Database migrations and account provisioning.
//!
//! # Usage
//!
//! ```bash
//! # Run account and session migrations
//! oi-cli migrate
//!
//! # Create an individual account
//! OI_ACCOUNT_PASSWORD=... oi-cli account create -e ada@example.org -n "Ada Lovelace"
//!
//! # Create a company account
//! OI_ACCOUNT_PASSWORD=... oi-cli account create -e grace@acme.example -n "Grace Hopper" \
//!     -t company --organization "Acme" --industry Technology --size 11-50
//!
//! # Look up an account
//! oi-cli account show -e ada@example.org
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `account create` - Create an account with a password
//! - `account show` - Print an account's identity

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "oi-cli")]
#[command(author, version, about = "Open Impact CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations (accounts and sessions)
    Migrate,
    /// Manage accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    /// Create a new account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account type (`individual`, `company`, `nonprofit`)
        #[arg(short = 't', long = "type", default_value = "individual")]
        account_type: String,

        /// Organization name (company and nonprofit accounts)
        #[arg(long)]
        organization: Option<String>,

        /// Organization industry, e.g. `Technology`
        #[arg(long)]
        industry: Option<String>,

        /// Organization size bracket, e.g. `11-50`
        #[arg(long)]
        size: Option<String>,

        /// Password (prefer the environment variable over the flag)
        #[arg(long, env = "OI_ACCOUNT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show an account's identity
    Show {
        /// Email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Account { action } => match action {
            AccountAction::Create {
                email,
                name,
                account_type,
                organization,
                industry,
                size,
                password,
            } => {
                let request = commands::account::CreateAccount {
                    email,
                    name,
                    account_type,
                    organization,
                    industry,
                    size,
                    password: password.into(),
                };
                commands::account::create(&request).await?;
            }
            AccountAction::Show { email } => commands::account::show(&email).await?,
        },
    }
    Ok(())
}
