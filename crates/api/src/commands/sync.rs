//! Calendar sync commands

use std::io::Write;
use std::sync::Arc;

use actionarc_infra::integrations::{CalendarSyncWorker, SyncOutcome};
use anyhow::{anyhow, Result};
use tracing::info;

use crate::AppContext;

fn worker(ctx: &AppContext) -> Result<Arc<CalendarSyncWorker>> {
    ctx.calendar_sync
        .clone()
        .ok_or_else(|| anyhow!("calendar sync is unavailable: enable [calendar] and configure its account"))
}

/// Runs a single sync and reports what changed.
pub async fn sync_now(ctx: &AppContext, out: &mut dyn Write) -> Result<()> {
    match worker(ctx)?.sync_once().await? {
        SyncOutcome::Synced(diff) => writeln!(
            out,
            "Synced {} events ({} added, {} updated, {} removed)",
            ctx.calendar_cache.read().len(),
            diff.added.len(),
            diff.updated.len(),
            diff.removed.len()
        )?,
        SyncOutcome::Skipped => writeln!(out, "A sync is already running")?,
    }
    Ok(())
}

/// Keeps the calendar cache synced until `shutdown` resolves.
pub async fn serve<F>(ctx: &AppContext, shutdown: F, out: &mut dyn Write) -> Result<()>
where
    F: std::future::Future<Output = ()>,
{
    let interval = ctx.sync_interval();
    let handle = worker(ctx)?.start(interval);
    writeln!(out, "Syncing calendar every {} min; press Ctrl-C to stop", interval.as_secs() / 60)?;

    shutdown.await;
    info!("shutdown requested");
    handle.stop().await?;
    writeln!(out, "Stopped")?;
    Ok(())
}
