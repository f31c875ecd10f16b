// ABOUTME: Deploy, stop and status command implementations.
// ABOUTME: Reports build submissions, cancellations and observed cluster state.

use serde::Serialize;
use shipyard::deploy::DeployOptions;
use shipyard::error::Result;
use shipyard::model::DeploymentRecord;
use shipyard::types::AppName;

use super::Context;

pub async fn deploy(
    ctx: &mut Context,
    app: AppName,
    force: bool,
    refresh: bool,
    cancel: bool,
) -> Result<()> {
    let sequencer = ctx.sequencer();

    if cancel {
        match sequencer.cancel_build(&app).await? {
            Some(record) => ctx
                .output
                .success(&format!("Cancelled build of {app} ({})", record.id)),
            None => ctx.output.success(&format!("Removed builds of {app}")),
        }
        return Ok(());
    }

    ctx.output.start_timer();
    ctx.output.progress(&format!(
        "Deploying {app}{}",
        if refresh { " (refresh)" } else { "" }
    ));

    let submitted = sequencer
        .deploy(&app, DeployOptions { force, refresh })
        .await?;

    if let Some(cancelled) = &submitted.cancelled {
        ctx.output
            .warning(&format!("cancelled in-flight deployment {}", cancelled.id));
    }
    for warning in submitted.diagnostics.warnings() {
        ctx.output.warning(&warning.message);
    }
    ctx.output.success(&format!(
        "Submitted build {} for {app} (deployment {})",
        submitted.build, submitted.record.id
    ));
    Ok(())
}

pub async fn stop(ctx: &Context, app: AppName) -> Result<()> {
    let (state, cancelled) = ctx.sequencer().stop_and_record(&app).await?;
    let mut message = format!("Stopped {app} (build was {state})");
    if let Some(record) = cancelled {
        message.push_str(&format!(", cancelled deployment {}", record.id));
    }
    ctx.output.success(&message);
    Ok(())
}

pub async fn status(ctx: &Context, app: AppName) -> Result<()> {
    let state = ctx.status().status(&app).await?;
    let lines = vec![
        format!("Deployment: {}", state.deployment_state),
        format!("Build: {}", state.build_state),
        format!("Stage: {}", state.stage_state),
    ];
    ctx.output.data(&lines, &state);
    Ok(())
}

pub async fn routes(ctx: &Context, app: AppName) -> Result<()> {
    let routes = ctx.status().routes(&app).await?;
    ctx.output.data(&routes, &routes);
    Ok(())
}

#[derive(Serialize)]
struct RecordView<'a> {
    id: &'a str,
    holder: &'a str,
    start_time: String,
    end_time: Option<String>,
    build_triggered: bool,
    status: Option<String>,
}

impl<'a> From<&'a DeploymentRecord> for RecordView<'a> {
    fn from(r: &'a DeploymentRecord) -> Self {
        Self {
            id: r.id.as_str(),
            holder: &r.holder,
            start_time: r.start_time.to_rfc3339(),
            end_time: r.end_time.map(|t| t.to_rfc3339()),
            build_triggered: r.build_triggered,
            status: r.status.map(|s| s.to_string()),
        }
    }
}

pub async fn history(ctx: &Context, app: AppName) -> Result<()> {
    let records = ctx.catalog().history(&app).await?;
    let lines: Vec<String> = records
        .iter()
        .map(|r| {
            let outcome = match r.status {
                Some(status) => status.to_string(),
                None if r.build_triggered => "BUILDING".to_string(),
                None => "OPEN".to_string(),
            };
            format!("{}  {}  {}", r.start_time.to_rfc3339(), outcome, r.id)
        })
        .collect();
    let views: Vec<RecordView> = records.iter().map(RecordView::from).collect();
    ctx.output.data(&lines, &views);
    Ok(())
}
