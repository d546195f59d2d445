//! `corpai login`, `corpai logout`, `corpai whoami`.
//!
//! Login failures never say why: bad credentials, a rejected form and an
//! unreachable server all print the same line.

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::ApiClient;
use crate::chat::{NOT_LOGGED_IN, SESSION_EXPIRED};

pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
pub const PASSWORD_ENV: &str = "CORPAI_PASSWORD";

/// A validated login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    /// Both fields are required; the username must look like an e-mail.
    pub fn new(username: &str, password: &str) -> Result<Self> {
        let username = username.trim();
        if username.is_empty() {
            bail!("Please input your Email!");
        }
        if !looks_like_email(username) {
            bail!("Please enter a valid email!");
        }
        if password.is_empty() {
            bail!("Please input your Password!");
        }
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !s.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Password from the flag, then the environment, then one stdin line.
pub async fn resolve_password(flag: Option<String>) -> Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    eprint!("Password: ");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let line = lines
        .next_line()
        .await
        .context("Failed to read password from stdin")?;
    Ok(line.unwrap_or_default())
}

/// Sign in and store the token.
pub async fn run_login(client: &ApiClient, username: &str, password: &str) -> Result<()> {
    let form = LoginForm::new(username, password)?;

    match client.login(&form.username, &form.password).await {
        Ok(token) => {
            client.session().sign_in(&token)?;
            tracing::info!(user = %form.username, "signed in");
            println!("Login successful!");
            Ok(())
        }
        Err(e) => {
            tracing::debug!("login failed: {}", e);
            bail!(LOGIN_FAILED)
        }
    }
}

pub fn run_logout(client: &ApiClient) -> Result<()> {
    client.session().sign_out()?;
    println!("Logged out.");
    Ok(())
}

/// Print the signed-in user's profile.
pub async fn run_whoami(client: &ApiClient) -> Result<()> {
    if !client.session().is_authenticated() {
        bail!(NOT_LOGGED_IN);
    }

    match client.me().await {
        Ok(profile) => {
            println!("  Name:        {}", profile.display_name());
            println!("  Email:       {}", profile.email);
            println!("  Department:  {}", profile.department);
            println!("  Position:    {}", profile.position);
            Ok(())
        }
        Err(e) if e.is_auth() || e.detail().is_some() => {
            client.session().invalidate()?;
            bail!(SESSION_EXPIRED)
        }
        Err(e) => Err(e).context("Failed to load profile"),
    }
}
