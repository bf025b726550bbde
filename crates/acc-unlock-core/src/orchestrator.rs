use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    classify::{ClassifyErrorPolicy, LockClassifier},
    error::RunError,
    model::{RunState, RunSummary},
    reconcile::UnlockReconciler,
    remote::{HierarchyClient, TokenProvider},
    walker::{FolderErrorPolicy, TreeWalker, WalkReport},
};

/// Knobs for a single run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunOptions {
    pub on_classify_error: ClassifyErrorPolicy,
    pub on_folder_error: FolderErrorPolicy,
    pub unlock_concurrency: usize,
    /// Walk and report, but leave every file locked.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            on_classify_error: ClassifyErrorPolicy::TreatAsUnlocked,
            on_folder_error: FolderErrorPolicy::Abort,
            unlock_concurrency: 1,
            dry_run: false,
        }
    }
}

/// Sequences authentication, discovery, traversal and reconciliation.
pub struct RunOrchestrator<C> {
    client: C,
    options: RunOptions,
}

impl<C: HierarchyClient> RunOrchestrator<C> {
    pub fn new(client: C, options: RunOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Runs once to completion. Per-item unlock failures are part of the
    /// summary; only authentication, discovery and (under `Abort`) listing
    /// failures end the run early.
    #[instrument(skip_all, fields(client = self.client.name(), user_id = %user_id))]
    pub async fn run<A>(&self, auth: &A, user_id: &str) -> Result<RunSummary, RunError>
    where
        A: TokenProvider + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut state = RunState::Init;

        let token = auth.acquire_token().await?;
        advance(&mut state, RunState::Authenticated);

        let folders = self
            .client
            .list_top_level_folders(&token)
            .await
            .map_err(RunError::Discovery)?;
        info!(count = folders.len(), "discovered top-level folders");
        advance(&mut state, RunState::FoldersDiscovered);

        let walker = TreeWalker::new(
            &self.client,
            LockClassifier::new(self.options.on_classify_error),
            self.options.on_folder_error,
        );
        let mut report = WalkReport::default();
        for folder in &folders {
            walker.walk(&token, folder, &mut report).await?;
        }
        info!("found {} locked files", report.locked.len());
        advance(&mut state, RunState::Walked);

        let outcomes = if self.options.dry_run {
            info!("dry run, leaving locked files untouched");
            Vec::new()
        } else {
            UnlockReconciler::new(&self.client, user_id)
                .with_concurrency(self.options.unlock_concurrency)
                .reconcile(&token, &report.locked)
                .await
        };
        advance(&mut state, RunState::Reconciled);
        advance(&mut state, RunState::Reported);

        Ok(RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            state,
            dry_run: self.options.dry_run,
            total_locked: report.locked.len(),
            locked: report.locked,
            outcomes,
            skipped_folders: report.skipped_folders,
            folders_visited: report.folders_visited,
            items_inspected: report.items_inspected,
        })
    }
}

fn advance(state: &mut RunState, next: RunState) {
    debug_assert!(next > *state, "run state must move forward");
    info!(from = ?state, to = ?next, "run state changed");
    *state = next;
}
