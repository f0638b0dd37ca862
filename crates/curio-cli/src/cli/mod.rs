//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use curio_core::{config, logging};

mod commands;

#[derive(Parser)]
#[command(name = "curio")]
#[command(version)]
#[command(about = "Sign in to the curio admin area and manage the session")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in with email and password (password is read from stdin)
    Login {
        /// Account email address
        #[arg(long)]
        email: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Request a password-reset email
    ResetPassword {
        /// Account email address
        #[arg(long)]
        email: String,
    },

    /// Show who is signed in and when the session expires
    Status,

    /// Interactive session (one process behaves like one browser tab)
    Shell,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Logging is best effort; the CLI still works without a log file.
    let _log_guard = match logging::init(&config::paths::logs_dir()) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("warning: {err:#}");
            None
        }
    };

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let load = || config::Config::load().context("load config");

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
        Commands::Login { email } => commands::auth::login(&load()?, &email).await,
        Commands::Logout => commands::auth::logout(&load()?).await,
        Commands::ResetPassword { email } => {
            commands::auth::reset_password(&load()?, &email).await
        }
        Commands::Status => commands::status::run(&load()?).await,
        Commands::Shell => commands::shell::run(&load()?).await,
    }
}
