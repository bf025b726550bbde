use std::io;

use acc_unlock_aps::{ClientCredentials, DataManagementClient};
use acc_unlock_core::{
    model::RunSummary,
    orchestrator::RunOrchestrator,
    remote::{HierarchyClient, TokenProvider},
};
use color_eyre::Result;
use tracing::info;

use crate::{cli::RunArgs, config, report, secrets};

/// Resolve settings, run against the live project and print the report.
pub async fn run(cfg: &config::Config, args: RunArgs) -> Result<()> {
    let env = |key: &str| std::env::var(key).ok();
    let aps = config::resolve_aps(cfg, env, secrets::stored_client_secret)?;
    let user_id = config::resolve_user_id(cfg, &args, env)?;
    let options = config::run_options(cfg, &args);
    info!(
        project = %aps.project(),
        dry_run = options.dry_run,
        concurrency = options.unlock_concurrency,
        "starting unlock run"
    );

    let auth = ClientCredentials::new(aps.clone())?;
    let orchestrator = RunOrchestrator::new(DataManagementClient::new(aps)?, options);
    let summary = execute(&orchestrator, &auth, &user_id).await?;

    let mut stdout = io::stdout().lock();
    if args.json {
        report::write_json(&summary, &mut stdout)?;
    } else {
        report::write_text(&summary, &mut stdout)?;
    }
    Ok(())
}

async fn execute<C, A>(
    orchestrator: &RunOrchestrator<C>,
    auth: &A,
    user_id: &str,
) -> Result<RunSummary>
where
    C: HierarchyClient,
    A: TokenProvider,
{
    let summary = orchestrator.run(auth, user_id).await?;
    info!(
        run_id = %summary.run_id,
        locked = summary.total_locked,
        unlocked = summary.succeeded(),
        failed = summary.failed(),
        "run finished"
    );
    Ok(summary)
}
