//! Account commands: `quickboard register`, `login`, `logout`.

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use quickboard::client::{BoardApi, CredentialFile, Credentials};
use quickboard::config::QuickboardConfig;

use super::http_client;

fn prompt_username(given: Option<&str>) -> Result<String> {
    match given {
        Some(name) => Ok(name.to_string()),
        None => Input::<String>::new()
            .with_prompt("Username")
            .interact_text()
            .context("Failed to read username"),
    }
}

fn prompt_password(confirm: bool) -> Result<String> {
    let prompt = Password::new().with_prompt("Password");
    let prompt = if confirm {
        prompt.with_confirmation("Confirm password", "Passwords do not match")
    } else {
        prompt
    };
    prompt.interact().context("Failed to read password")
}

pub async fn cmd_register(config: &QuickboardConfig, username: Option<&str>) -> Result<()> {
    let username = prompt_username(username)?;
    let password = prompt_password(true)?;
    let api = http_client(config)?;

    api.register(&username, &password)
        .await
        .context("Registration failed")?;
    println!("Account '{}' created.", username);

    login_with(api.as_ref(), config, &username, &password).await
}

pub async fn cmd_login(config: &QuickboardConfig, username: Option<&str>) -> Result<()> {
    let username = prompt_username(username)?;
    let password = prompt_password(false)?;
    let api = http_client(config)?;
    login_with(api.as_ref(), config, &username, &password).await
}

async fn login_with(
    api: &dyn BoardApi,
    config: &QuickboardConfig,
    username: &str,
    password: &str,
) -> Result<()> {
    let resp = api
        .login(username, password)
        .await
        .context("Login failed")?;
    let file = CredentialFile::new(config.client.session_file());
    file.save(&Credentials {
        token: resp.token,
        username: resp.username.clone(),
    })?;
    tracing::debug!(path = %file.path().display(), "session stored");
    println!(
        "Logged in as {}",
        console::style(&resp.username).bold().green()
    );
    Ok(())
}

pub fn cmd_logout(config: &QuickboardConfig) -> Result<()> {
    let file = CredentialFile::new(config.client.session_file());
    let had_session = file.load().ok().flatten().is_some();
    file.clear()?;
    if had_session {
        println!("Logged out.");
    } else {
        println!("No active session.");
    }
    Ok(())
}
