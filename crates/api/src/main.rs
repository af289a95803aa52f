//! ActionArc - agent actions over calendar, mail, music and montage

use actionarc_app::cli::{self, Cli};
use actionarc_app::utils::logging::init_logging;
use actionarc_app::AppContext;
use actionarc_infra::config;
use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Before logging so RUST_LOG can come from .env
    let dotenv = dotenvy::dotenv();
    init_logging();
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "could not load .env"),
    }

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            let mut config = config::load_from_file(Some(path.clone()))?;
            config::apply_env_overrides(&mut config)?;
            config
        }
        None => config::load()?,
    };

    let ctx = AppContext::build(config).await?;
    let mut stdout = std::io::stdout().lock();
    cli::execute(cli.command, &ctx, &mut stdout).await
}
