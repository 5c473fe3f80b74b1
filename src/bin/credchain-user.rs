#![forbid(unsafe_code)]
//! Register or check credentials directly against the ledger file

use clap::{Parser, Subcommand};
use colored::*;
use credchain::cli::{load_config_with_overrides, open_service};
use credchain::credentials::{LoginOutcome, RegisterOutcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file (overrides ledger.path)
    #[arg(short, long, global = true)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Registers a new username
    Register {
        username: String,
        /// Password; prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Checks a username and password
    Login {
        username: String,
        /// Password; prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

fn read_password(given: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    match given {
        Some(p) => Ok(p),
        None => Ok(rpassword::prompt_password("Password: ")?),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config_with_overrides(cli.config.as_deref(), cli.ledger)?;
    let service = open_service(&config);

    let success = match cli.command {
        Commands::Register { username, password } => {
            let password = read_password(password)?;
            let outcome = service.register(&username, &password)?;
            match outcome {
                RegisterOutcome::Registered => {
                    println!("{} {}", "✅".green(), outcome.message().bright_green())
                }
                RegisterOutcome::UsernameExists => {
                    eprintln!("{} {}", "❌".red(), outcome.message().red())
                }
            }
            outcome == RegisterOutcome::Registered
        }
        Commands::Login { username, password } => {
            let password = read_password(password)?;
            let outcome = service.login(&username, &password)?;
            match outcome {
                LoginOutcome::Success => {
                    println!("{} {}", "✅".green(), outcome.message().bright_green())
                }
                LoginOutcome::IncorrectPassword | LoginOutcome::UserNotFound => {
                    eprintln!("{} {}", "❌".red(), outcome.message().red())
                }
            }
            outcome == LoginOutcome::Success
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
