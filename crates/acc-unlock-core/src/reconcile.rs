use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::{
    error::RemoteError,
    model::{LockedFile, Token, UnlockOutcome, UnlockResult},
    remote::HierarchyClient,
};

/// Releases locked files on behalf of an administrative user.
pub struct UnlockReconciler<'c, C: ?Sized> {
    client: &'c C,
    user_id: String,
    concurrency: usize,
}

impl<'c, C> UnlockReconciler<'c, C>
where
    C: HierarchyClient + ?Sized,
{
    pub fn new(client: &'c C, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            concurrency: 1,
        }
    }

    /// Upper bound on mutations in flight. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Clears the reserved flag of one file. Never fails; rejections become
    /// [`UnlockResult::Failure`].
    #[instrument(skip_all, fields(item_id = %file.item_id))]
    pub async fn unlock(&self, token: &Token, file: &LockedFile) -> UnlockOutcome {
        info!("unlocking {} ({})", file.item_name, file.item_id);
        let result = match self
            .client
            .set_item_lock(token, &file.item_id, &self.user_id, false)
            .await
        {
            Ok(status) if status.is_success() => UnlockResult::Success,
            Ok(status) => UnlockResult::Failure {
                status: Some(status.code),
                detail: status.body,
            },
            Err(RemoteError::Status { status, body }) => UnlockResult::Failure {
                status: Some(status),
                detail: body,
            },
            Err(err) => UnlockResult::Failure {
                status: None,
                detail: err.to_string(),
            },
        };
        match &result {
            UnlockResult::Success => info!("unlocked {}", file.item_id),
            UnlockResult::Failure { status, detail } => {
                warn!(?status, %detail, "failed to unlock {}", file.item_id)
            }
        }
        UnlockOutcome {
            item_id: file.item_id.clone(),
            item_name: file.item_name.clone(),
            result,
        }
    }

    /// Unlocks every file; outcomes come back in the order of `files`.
    pub async fn reconcile(&self, token: &Token, files: &[LockedFile]) -> Vec<UnlockOutcome> {
        stream::iter(files)
            .map(|file| self.unlock(token, file))
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use serde_json::Value;

    use super::*;
    use crate::{
        memory::{Event, InMemoryHierarchy},
        model::{FolderRef, ItemEntry, MutationStatus},
    };

    fn locked(id: &str) -> LockedFile {
        LockedFile {
            item_id: id.into(),
            item_name: format!("{id}.rvt"),
        }
    }

    fn project_with(items: &[&str]) -> InMemoryHierarchy {
        let project = InMemoryHierarchy::new();
        let root = project.add_top_folder("root", "Root");
        for id in items {
            project.add_item(&root, id, &format!("{id}.rvt"), true);
        }
        project
    }

    #[tokio::test]
    async fn unlock_is_idempotent() {
        let project = project_with(&["x"]);
        let reconciler = UnlockReconciler::new(&project, "admin-1");
        let token = Token::new("t");

        let first = reconciler.unlock(&token, &locked("x")).await;
        let second = reconciler.unlock(&token, &locked("x")).await;

        assert_eq!(first.result, UnlockResult::Success);
        assert_eq!(second.result, UnlockResult::Success);
        assert_eq!(project.is_reserved("x"), Some(false));
    }

    #[tokio::test]
    async fn mutation_is_attributed_to_user() {
        let project = project_with(&["x"]);
        UnlockReconciler::new(&project, "admin-1")
            .unlock(&Token::new("t"), &locked("x"))
            .await;

        assert_eq!(
            project.events(),
            vec![Event::Mutated {
                item_id: "x".into(),
                user_id: "admin-1".into(),
                locked: false,
            }]
        );
    }

    #[tokio::test]
    async fn rejection_is_recorded_and_processing_continues() {
        let project = project_with(&["x", "y", "z"]);
        project.reject_mutation("x", 403, r#"{"errors":[{"detail":"forbidden"}]}"#);
        project.fail_mutation("y");

        let outcomes = UnlockReconciler::new(&project, "admin-1")
            .reconcile(&Token::new("t"), &[locked("x"), locked("y"), locked("z")])
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes[0].result,
            UnlockResult::Failure {
                status: Some(403),
                detail: r#"{"errors":[{"detail":"forbidden"}]}"#.into(),
            }
        );
        assert!(matches!(
            outcomes[1].result,
            UnlockResult::Failure { status: None, .. }
        ));
        assert_eq!(outcomes[2].result, UnlockResult::Success);
        assert_eq!(project.is_reserved("x"), Some(true));
        assert_eq!(project.is_reserved("z"), Some(false));
    }

    /// Wraps the in-memory project and tracks how many mutations overlap.
    struct Gauge {
        inner: InMemoryHierarchy,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HierarchyClient for Gauge {
        fn name(&self) -> &'static str {
            "gauge"
        }

        async fn list_top_level_folders(&self, token: &Token) -> Result<Vec<FolderRef>, RemoteError> {
            self.inner.list_top_level_folders(token).await
        }

        fn list_folder_contents<'a>(
            &'a self,
            token: &'a Token,
            folder_id: &str,
        ) -> BoxStream<'a, Result<ItemEntry, RemoteError>> {
            self.inner.list_folder_contents(token, folder_id)
        }

        async fn get_item_metadata(&self, token: &Token, item_id: &str) -> Result<Value, RemoteError> {
            self.inner.get_item_metadata(token, item_id).await
        }

        async fn set_item_lock(
            &self,
            token: &Token,
            item_id: &str,
            user_id: &str,
            locked: bool,
        ) -> Result<MutationStatus, RemoteError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            let result = self.inner.set_item_lock(token, item_id, user_id, locked).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    #[tokio::test]
    async fn concurrency_is_capped_and_order_preserved() {
        let ids: Vec<String> = (0..10).map(|i| format!("i{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let gauge = Gauge {
            inner: project_with(&id_refs),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        };
        let files: Vec<LockedFile> = ids.iter().map(|id| locked(id)).collect();

        let outcomes = UnlockReconciler::new(&gauge, "admin-1")
            .with_concurrency(3)
            .reconcile(&Token::new("t"), &files)
            .await;

        let peak = gauge.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight {peak} exceeds cap");
        assert!(peak > 1, "mutations never overlapped");
        let order: Vec<&str> = outcomes.iter().map(|o| o.item_id.as_str()).collect();
        assert_eq!(order, id_refs);
        assert!(outcomes.iter().all(UnlockOutcome::is_success));
    }

    #[test]
    fn zero_concurrency_means_sequential() {
        let project = InMemoryHierarchy::new();
        let reconciler = UnlockReconciler::new(&project, "u").with_concurrency(0);
        assert_eq!(reconciler.concurrency, 1);
    }
}
