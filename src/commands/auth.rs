// src/commands/auth.rs
//! Account commands: login, register, logout

use super::Session;
use anyhow::{Context, Result, bail};
use console::Term;
use std::io::{BufRead, Write};
use zarch::{Lifecycle, LogoutOutcome};

pub fn cmd_login(session: &Session, username: Option<&str>) -> Result<()> {
    let username = match username {
        Some(u) => u.to_string(),
        None => prompt("Username: ")?,
    };
    let password = prompt_password("Password: ")?;

    let registry = session.registry()?;
    let lifecycle = Lifecycle::new(&session.config, &registry);
    let credentials = lifecycle.login(&username, &password)?;

    println!("Logged in as {}", credentials.username);
    Ok(())
}

pub fn cmd_register(session: &Session, username: Option<&str>, email: Option<&str>) -> Result<()> {
    let username = match username {
        Some(u) => u.to_string(),
        None => prompt("Username: ")?,
    };
    let email = match email {
        Some(e) => e.to_string(),
        None => prompt("Email: ")?,
    };
    let password = prompt_password("Password: ")?;
    let confirm = prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }

    let registry = session.registry()?;
    let lifecycle = Lifecycle::new(&session.config, &registry);
    let credentials = lifecycle.register(&username, &password, &email)?;

    println!("Registered and logged in as {}", credentials.username);
    Ok(())
}

pub fn cmd_logout(session: &Session) -> Result<()> {
    let lifecycle = Lifecycle::local(&session.config);

    match lifecycle.logout()? {
        LogoutOutcome::LoggedOut { username } if username.is_empty() => println!("Logged out"),
        LogoutOutcome::LoggedOut { username } => println!("Logged out {}", username),
        LogoutOutcome::NotLoggedIn => println!("Not logged in"),
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    let term = Term::stderr();
    let value = if term.is_term() {
        term.write_str(label)?;
        term.read_line().context("Failed to read input")?
    } else {
        read_stdin_line(label)?
    };
    let value = value.trim().to_string();
    if value.is_empty() {
        bail!("{} cannot be empty", label.trim_end_matches([':', ' ']));
    }
    Ok(value)
}

/// Hidden input on a terminal, a plain line from stdin otherwise
fn prompt_password(label: &str) -> Result<String> {
    let term = Term::stderr();
    let value = if term.is_term() {
        term.write_str(label)?;
        term.read_secure_line().context("Failed to read password")?
    } else {
        read_stdin_line(label)?
    };
    let value = value.trim_end_matches(['\r', '\n']).to_string();
    if value.is_empty() {
        bail!("Password cannot be empty");
    }
    Ok(value)
}

fn read_stdin_line(label: &str) -> Result<String> {
    eprint!("{}", label);
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line)
}
