//! Command-line interface

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use crate::{commands, AppContext};

#[derive(Debug, Parser)]
#[command(name = "actionarc", version, about = "Calendar, mail, music and montage agents")]
pub struct Cli {
    /// Config file (`.toml` or `.json`); overrides ACTIONARC_CONFIG
    #[arg(long, global = true, env = "ACTIONARC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Account {
    Microsoft,
    Google,
    Spotify,
}

impl Account {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Microsoft => "microsoft",
            Self::Google => "google",
            Self::Spotify => "spotify",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in to a provider account
    Login {
        account: Account,
        /// Use the device-code flow instead of a browser redirect
        #[arg(long)]
        device_code: bool,
    },
    /// Forget the cached tokens of a provider account
    Logout { account: Account },
    /// Run one action, e.g. `run calendar.findTodaysEvents`
    Run {
        /// `<agent>.<actionName>`
        action: String,
        /// Parameters as a JSON object
        parameters: Option<String>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sync the calendar cache once
    Sync,
    /// List installed TaskFlow recipes
    Recipes,
    /// Keep the calendar cache synced until Ctrl-C
    Serve,
}

/// Executes `command` against a built context.
pub async fn execute(command: Command, ctx: &AppContext, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Login { account, device_code } => {
            let device_code = device_code || (account == Account::Microsoft && ctx.config.microsoft.use_device_code);
            commands::login(ctx, account.as_str(), device_code, out).await
        }
        Command::Logout { account } => commands::logout(ctx, account.as_str(), out).await,
        Command::Run { action, parameters, json } => {
            commands::run_action(ctx, &action, parameters.as_deref(), json, out).await
        }
        Command::Sync => commands::sync_now(ctx, out).await,
        Command::Recipes => commands::list_recipes(ctx, out).await,
        Command::Serve => {
            let shutdown = async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %err, "failed to listen for Ctrl-C");
                }
            };
            commands::serve(ctx, shutdown, out).await
        }
    }
}
