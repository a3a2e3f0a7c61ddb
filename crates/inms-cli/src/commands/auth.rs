//! Authentication commands.

use super::describe;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use inms_client::auth_context;
use std::io::{self, Write};
use std::time::Duration;

const REVOKE_GRACE: Duration = Duration::from_millis(300);

/// Login with username or email and password.
pub async fn login(username: Option<String>, format: &OutputFormat) -> Result<()> {
    let ctx = auth_context();

    if ctx.session().is_authenticated() {
        let who = ctx
            .status()?
            .user
            .map(|user| user.display_name().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        output::print_error(
            &format!("Already logged in as {}. Run 'inms logout' first", who),
            format,
        );
        return Ok(());
    }

    let username = match username {
        Some(name) => name,
        None => {
            print!("Username or email: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            line.trim().to_string()
        }
    };

    if username.is_empty() {
        output::print_error("Username or email is required", format);
        return Ok(());
    }

    // Prompt for password (hidden)
    let password = rpassword::prompt_password("Password: ")?;

    if password.is_empty() {
        output::print_error("Password is required", format);
        return Ok(());
    }

    match ctx.session().login(&username, &password).await {
        Ok(user) => {
            output::print_success(&format!("Logged in as {}", user.display_name()), format);
            Ok(())
        }
        Err(e) if e.is_unauthorized() => anyhow::bail!("Login failed: invalid credentials"),
        Err(e) => Err(describe(e).context("Login failed")),
    }
}

/// Logout and clear the stored session.
pub async fn logout(format: &OutputFormat) -> Result<()> {
    let ctx = auth_context();
    let was_signed_in = ctx.session().is_authenticated();

    ctx.session().logout().await?;
    // The revoke runs in the background; give it a head start before exit.
    tokio::time::sleep(REVOKE_GRACE).await;

    if was_signed_in {
        output::print_success("Logged out successfully", format);
    } else {
        output::print_success("No active session", format);
    }
    Ok(())
}

/// Show the local session state. Makes no network calls.
pub async fn status(format: &OutputFormat) -> Result<()> {
    let snapshot = auth_context().status()?;

    match format {
        OutputFormat::Text => {
            output::print_row("Session", snapshot.state.as_str());
            if let Some(user) = &snapshot.user {
                output::print_row("User", user.display_name());
                output::print_row("User ID", &user.id);
                if !user.roles.is_empty() {
                    output::print_row("Roles", &user.roles.join(", "));
                }
            }
            output::print_row(
                "Refresh token",
                if snapshot.has_refresh_token { "present" } else { "absent" },
            );
        }
        OutputFormat::Json => output::print_json(&snapshot)?,
    }
    Ok(())
}

/// Fetch the profile, falling back to the cached user when the API can't answer.
pub async fn whoami(format: &OutputFormat) -> Result<()> {
    let user = auth_context().session().current_user().await.map_err(describe)?;

    let Some(user) = user else {
        output::print_error("Not logged in", format);
        return Ok(());
    };

    match format {
        OutputFormat::Text => {
            output::print_row("Name", user.display_name());
            output::print_row("ID", &user.id);
            if let Some(email) = &user.email {
                output::print_row("Email", email);
            }
            if let Some(username) = &user.username {
                output::print_row("Username", username);
            }
            output::print_row("Roles", &user.roles.join(", "));
        }
        OutputFormat::Json => output::print_json(&user)?,
    }
    Ok(())
}
