// ABOUTME: Long-running mode: optional cluster login, then the reconciliation loop.
// ABOUTME: Stops cleanly on Ctrl-C.

use shipyard::error::{Error, Result};
use shipyard::scripts::LOGIN_SCRIPT;
use std::sync::Arc;
use tokio::sync::watch;

use super::Context;

pub async fn serve(ctx: &Context) -> Result<()> {
    if let Some(login) = &ctx.config.login {
        let token = login.token.resolve()?;
        ctx.output
            .progress(&format!("Logging in to {}", login.server));
        ctx.scripts()
            .run(LOGIN_SCRIPT, &[login.server.clone(), token])
            .await
            .map_err(Error::Login)?;
    }

    let reconciler = Arc::new(ctx.reconciler());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = reconciler.clone().spawn(shutdown_rx);

    ctx.output.progress(&format!(
        "Reconciling deployments every {:?} (Ctrl-C to stop)",
        reconciler.interval()
    ));

    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(true);
    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "reconciler task ended abnormally");
    }

    ctx.output.success("Stopped");
    Ok(())
}
