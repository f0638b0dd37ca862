//! Auth command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use curio_core::config::Config;

use super::App;

/// Reads one line from stdin; prompts only when stdin is a terminal.
fn read_password() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        print!("Password: ");
        io::stdout().flush()?;
    }

    let mut input = String::new();
    stdin
        .lock()
        .read_line(&mut input)
        .context("read password from stdin")?;
    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }
    Ok(password)
}

pub async fn login(config: &Config, email: &str) -> Result<()> {
    let password = read_password()?;
    let mut app = App::new(config)?;

    let result = app.controller.sign_in(email.trim(), &password).await;
    app.flush();
    result.map(|_| ()).context("sign in")
}

pub async fn logout(config: &Config) -> Result<()> {
    let mut app = App::new(config)?;
    app.controller.sign_out().await;
    app.flush();
    Ok(())
}

pub async fn reset_password(config: &Config, email: &str) -> Result<()> {
    let mut app = App::new(config)?;
    let result = app.controller.reset_password_request(email.trim()).await;
    app.flush();
    result.context("request password reset")
}
