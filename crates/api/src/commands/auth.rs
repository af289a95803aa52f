//! Account sign-in commands

use std::io::Write;

use anyhow::Result;
use tracing::info;

use crate::AppContext;

/// Signs in to `account`, through the browser unless `device_code` is set.
pub async fn login(ctx: &AppContext, account: &str, device_code: bool, out: &mut dyn Write) -> Result<()> {
    let manager = ctx.account(account)?;

    let signed_in_as = if device_code {
        manager
            .login_device_code(|authorization| {
                let _ = match &authorization.message {
                    Some(message) => writeln!(out, "{message}"),
                    None => writeln!(
                        out,
                        "Visit {} and enter the code {}",
                        authorization.verification_uri, authorization.user_code
                    ),
                };
            })
            .await?
    } else {
        manager
            .login_interactive(|url| {
                let _ = writeln!(out, "Open this link to sign in to {account}:\n{url}");
            })
            .await?
    };

    info!(account = manager.provider(), "login complete");
    match signed_in_as {
        Some(email) => writeln!(out, "Signed in to {} as {email}", manager.provider())?,
        None => writeln!(out, "Signed in to {}", manager.provider())?,
    }
    Ok(())
}

pub async fn logout(ctx: &AppContext, account: &str, out: &mut dyn Write) -> Result<()> {
    let manager = ctx.account(account)?;
    manager.logout().await?;
    writeln!(out, "Signed out of {}", manager.provider())?;
    Ok(())
}
