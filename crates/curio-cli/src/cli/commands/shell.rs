//! Interactive shell.
//!
//! One shell process plays the part of one browser tab: it owns a single
//! controller (with its own login-attempt counters) for its whole lifetime,
//! and notices from the background expiry monitor are printed as they arrive.

use std::io::{IsTerminal, Write};

use anyhow::{Context, Result};
use curio_core::config::Config;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{App, print_event, status};

const HELP: &str = "\
Commands:
  login <email> <password>   Sign in
  logout                     Sign out
  reset <email>              Request a password-reset email
  status                     Show the current session
  admin                      Open the admin area
  help                       Show this help
  quit                       Exit";

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand<'a> {
    Login { email: &'a str, password: &'a str },
    Logout,
    Reset { email: &'a str },
    Status,
    Admin,
    Help,
    Quit,
    Empty,
}

impl ShellCommand<'_> {
    fn name(&self) -> &'static str {
        match self {
            ShellCommand::Login { .. } => "login",
            ShellCommand::Logout => "logout",
            ShellCommand::Reset { .. } => "reset",
            ShellCommand::Status => "status",
            ShellCommand::Admin => "admin",
            ShellCommand::Help => "help",
            ShellCommand::Quit => "quit",
            ShellCommand::Empty => "",
        }
    }
}

fn parse(line: &str) -> Result<ShellCommand<'_>, String> {
    let line = line.trim();
    let (name, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(name, rest)| (name, rest.trim()));

    match name {
        "" => Ok(ShellCommand::Empty),
        "login" => match rest.split_once(char::is_whitespace) {
            Some((email, password)) if !password.trim().is_empty() => Ok(ShellCommand::Login {
                email,
                password: password.trim(),
            }),
            _ => Err("Usage: login <email> <password>".to_string()),
        },
        "logout" => Ok(ShellCommand::Logout),
        "reset" if !rest.is_empty() => Ok(ShellCommand::Reset { email: rest }),
        "reset" => Err("Usage: reset <email>".to_string()),
        "status" => Ok(ShellCommand::Status),
        "admin" => Ok(ShellCommand::Admin),
        "help" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        other => Err(format!("Unknown command: {other} (try `help`)")),
    }
}

fn prompt(interactive: bool) -> Result<()> {
    if interactive {
        print!("curio> ");
        std::io::stdout().flush()?;
    }
    Ok(())
}

pub async fn run(config: &Config) -> Result<()> {
    let mut app = App::new(config)?;
    let scope = app.controller.start();
    app.wait_loaded().await;

    let interactive = std::io::stdin().is_terminal();
    if interactive {
        println!("curio shell. Type `help` for commands.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        app.flush();
        prompt(interactive)?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("read command")?,
            Some(event) = app.next_event() => {
                if interactive {
                    println!();
                }
                print_event(&event);
                continue;
            }
        };
        let Some(line) = line else {
            break;
        };

        let command = match parse(&line) {
            Ok(command) => command,
            Err(usage) => {
                println!("{usage}");
                continue;
            }
        };
        tracing::debug!(command = command.name(), "shell command");

        match command {
            ShellCommand::Empty => {}
            ShellCommand::Login { email, password } => {
                if !app.controller.redirect_if_signed_in() {
                    // The failure notice has already been emitted.
                    let _ = app.controller.sign_in(email, password).await;
                }
            }
            ShellCommand::Logout => app.controller.sign_out().await,
            ShellCommand::Reset { email } => {
                let _ = app.controller.reset_password_request(email).await;
            }
            ShellCommand::Status => {
                println!("{}", status::describe(&app.controller.store().snapshot()));
            }
            ShellCommand::Admin => app.open_admin().await,
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => break,
        }
    }

    scope.shutdown().await;
    app.flush();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_keeps_spaces_in_password() {
        assert_eq!(
            parse("login a@example.com correct horse"),
            Ok(ShellCommand::Login {
                email: "a@example.com",
                password: "correct horse",
            })
        );
    }

    #[test]
    fn test_parse_usage_errors() {
        assert_eq!(
            parse("login a@example.com"),
            Err("Usage: login <email> <password>".to_string())
        );
        assert_eq!(parse("reset"), Err("Usage: reset <email>".to_string()));
        assert!(parse("sudo").unwrap_err().contains("Unknown command: sudo"));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse("  "), Ok(ShellCommand::Empty));
        assert_eq!(parse("logout"), Ok(ShellCommand::Logout));
        assert_eq!(parse("status\n"), Ok(ShellCommand::Status));
        assert_eq!(parse("admin"), Ok(ShellCommand::Admin));
        assert_eq!(parse("exit"), Ok(ShellCommand::Quit));
        assert_eq!(
            parse("reset a@example.com"),
            Ok(ShellCommand::Reset {
                email: "a@example.com"
            })
        );
    }
}
