use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    classify::{LockClassifier, LockState},
    error::{FolderFailure, RemoteError, WalkError},
    model::{FolderRef, ItemEntry, ItemKind, LockedFile, Token},
    remote::HierarchyClient,
};

/// What to do when a folder listing fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FolderErrorPolicy {
    /// Stop the walk and return the error.
    #[default]
    Abort,
    /// Record the folder as skipped and carry on with its siblings.
    Skip,
}

/// Results accumulated across one or more walks. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkReport {
    pub locked: Vec<LockedFile>,
    pub skipped_folders: Vec<FolderFailure>,
    pub folders_visited: usize,
    pub items_inspected: usize,
}

/// Depth-first, pre-order traversal of a folder tree.
///
/// Uses an explicit stack of open folder listings instead of recursion, so
/// the visit order matches a recursive walk while tree depth only costs heap.
pub struct TreeWalker<'c, C: ?Sized> {
    client: &'c C,
    classifier: LockClassifier,
    folder_policy: FolderErrorPolicy,
}

impl<'c, C> TreeWalker<'c, C>
where
    C: HierarchyClient + ?Sized,
{
    pub fn new(client: &'c C, classifier: LockClassifier, folder_policy: FolderErrorPolicy) -> Self {
        Self {
            client,
            classifier,
            folder_policy,
        }
    }

    /// Walks `root` and everything below it, appending to `report`. On error the
    /// entries already in `report` are left intact.
    #[instrument(skip_all, fields(folder_id = %root.id, folder = %root.name))]
    pub async fn walk(
        &self,
        token: &Token,
        root: &FolderRef,
        report: &mut WalkReport,
    ) -> Result<(), WalkError> {
        report.folders_visited += 1;
        let mut stack = vec![(root.clone(), self.client.list_folder_contents(token, &root.id))];

        while let Some((folder, listing)) = stack.last_mut() {
            let next = listing.next().await;
            match next {
                None => {
                    stack.pop();
                }
                Some(Ok(entry)) => match entry.kind {
                    ItemKind::Folder => {
                        debug!(parent = %folder.id, folder_id = %entry.id, "descending into folder");
                        report.folders_visited += 1;
                        let listing = self.client.list_folder_contents(token, &entry.id);
                        stack.push((FolderRef::new(entry.id, entry.name), listing));
                    }
                    ItemKind::LeafItem => self.inspect(token, entry, report).await?,
                },
                Some(Err(source)) => {
                    let folder = folder.clone();
                    stack.pop();
                    self.listing_failed(folder, source, report)?;
                }
            }
        }
        Ok(())
    }

    async fn inspect(
        &self,
        token: &Token,
        entry: ItemEntry,
        report: &mut WalkReport,
    ) -> Result<(), WalkError> {
        report.items_inspected += 1;
        let state = self
            .classifier
            .classify_item(self.client, token, &entry.id)
            .await
            .map_err(|source| WalkError::Classification {
                item_id: entry.id.clone(),
                source,
            })?;
        if state == LockState::Locked {
            info!(item_id = %entry.id, item = %entry.name, "found locked file");
            report.locked.push(LockedFile {
                item_id: entry.id,
                item_name: entry.name,
            });
        }
        Ok(())
    }

    fn listing_failed(
        &self,
        folder: FolderRef,
        source: RemoteError,
        report: &mut WalkReport,
    ) -> Result<(), WalkError> {
        match self.folder_policy {
            FolderErrorPolicy::Abort => Err(WalkError::Listing {
                folder_id: folder.id,
                source,
            }),
            FolderErrorPolicy::Skip => {
                warn!(folder_id = %folder.id, folder = %folder.name, error = %source, "skipping folder");
                report.skipped_folders.push(FolderFailure {
                    folder_id: folder.id,
                    folder_name: folder.name,
                    error: source.to_string(),
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        classify::ClassifyErrorPolicy,
        memory::{Event, InMemoryHierarchy},
    };

    fn walker(project: &InMemoryHierarchy, policy: FolderErrorPolicy) -> TreeWalker<'_, InMemoryHierarchy> {
        TreeWalker::new(project, LockClassifier::default(), policy)
    }

    fn locked_ids(report: &WalkReport) -> Vec<&str> {
        report.locked.iter().map(|f| f.item_id.as_str()).collect()
    }

    #[tokio::test]
    async fn collects_exactly_the_reserved_items() {
        let project = InMemoryHierarchy::new();
        let root = project.add_top_folder("root", "Root");
        let plans = project.add_folder(&root, "plans", "Plans");
        let level1 = project.add_folder(&plans, "level1", "Level 1");
        for i in 0..6 {
            project.add_item(&plans, &format!("p{i}"), &format!("p{i}.dwg"), i % 2 == 0);
            project.add_item(&level1, &format!("l{i}"), &format!("l{i}.rvt"), i % 3 == 0);
        }

        let mut report = WalkReport::default();
        walker(&project, FolderErrorPolicy::Abort)
            .walk(&Token::new("t"), &FolderRef::new("root", "Root"), &mut report)
            .await
            .expect("walk");

        assert_eq!(report.locked.len(), 5);
        let distinct: HashSet<_> = locked_ids(&report).into_iter().collect();
        assert_eq!(distinct.len(), 5);
        assert_eq!(report.items_inspected, 12);
        assert_eq!(report.folders_visited, 3);
    }

    #[tokio::test]
    async fn visits_subfolder_before_following_sibling() {
        let project = InMemoryHierarchy::new();
        let a = project.add_top_folder("a", "A");
        let b = project.add_folder(&a, "b", "B");
        project.add_item(&a, "x", "x.rvt", false);
        project.add_item(&b, "y", "y.rvt", false);

        let mut report = WalkReport::default();
        walker(&project, FolderErrorPolicy::Abort)
            .walk(&Token::new("t"), &FolderRef::new("a", "A"), &mut report)
            .await
            .expect("walk");

        assert_eq!(
            project.events(),
            vec![
                Event::Listed("a".into()),
                Event::Listed("b".into()),
                Event::Inspected("y".into()),
                Event::Inspected("x".into()),
            ]
        );
    }

    #[tokio::test]
    async fn uninspectable_item_is_excluded() {
        let project = InMemoryHierarchy::new();
        let root = project.add_top_folder("root", "Root");
        project.add_item(&root, "x", "x.rvt", true);
        project.add_item(&root, "y", "y.rvt", true);
        project.fail_metadata("x");

        let mut report = WalkReport::default();
        walker(&project, FolderErrorPolicy::Abort)
            .walk(&Token::new("t"), &FolderRef::new("root", "Root"), &mut report)
            .await
            .expect("walk never fails on classification under fail-open");

        assert_eq!(locked_ids(&report), vec!["y"]);
    }

    #[tokio::test]
    async fn classification_error_surfaces_under_abort_policy() {
        let project = InMemoryHierarchy::new();
        let root = project.add_top_folder("root", "Root");
        project.add_item(&root, "x", "x.rvt", true);
        project.fail_metadata("x");

        let mut report = WalkReport::default();
        let err = TreeWalker::new(
            &project,
            LockClassifier::new(ClassifyErrorPolicy::Abort),
            FolderErrorPolicy::Abort,
        )
        .walk(&Token::new("t"), &FolderRef::new("root", "Root"), &mut report)
        .await
        .expect_err("abort policy");

        assert!(matches!(err, WalkError::Classification { ref item_id, .. } if item_id == "x"));
    }

    #[tokio::test]
    async fn listing_failure_aborts_but_keeps_prior_results() {
        let project = InMemoryHierarchy::new();
        let root = project.add_top_folder("root", "Root");
        project.add_item(&root, "x", "x.rvt", true);
        project.add_folder(&root, "b", "FolderB");
        project.add_item(&root, "z", "z.rvt", true);
        project.fail_listing("b");

        let mut report = WalkReport::default();
        let err = walker(&project, FolderErrorPolicy::Abort)
            .walk(&Token::new("t"), &FolderRef::new("root", "Root"), &mut report)
            .await
            .expect_err("listing failure is fatal");

        assert!(matches!(err, WalkError::Listing { ref folder_id, .. } if folder_id == "b"));
        assert_eq!(locked_ids(&report), vec!["x"]);
        assert!(report.skipped_folders.is_empty());
    }

    #[tokio::test]
    async fn skip_policy_continues_with_siblings() {
        let project = InMemoryHierarchy::new();
        let root = project.add_top_folder("root", "Root");
        let b = project.add_folder(&root, "b", "FolderB");
        project.add_item(&b, "b1", "b1.rvt", true);
        project.add_item(&b, "b2", "b2.rvt", true);
        project.add_item(&root, "z", "z.rvt", true);
        project.fail_listing_after("b", 1);

        let mut report = WalkReport::default();
        walker(&project, FolderErrorPolicy::Skip)
            .walk(&Token::new("t"), &FolderRef::new("root", "Root"), &mut report)
            .await
            .expect("skip policy never fails on listings");

        assert_eq!(locked_ids(&report), vec!["b1", "z"]);
        assert_eq!(report.skipped_folders.len(), 1);
        assert_eq!(report.skipped_folders[0].folder_id, "b");
        assert_eq!(report.skipped_folders[0].folder_name, "FolderB");
    }

    #[tokio::test]
    async fn deep_trees_do_not_grow_the_call_stack() {
        let project = InMemoryHierarchy::new();
        let mut parent = project.add_top_folder("d0", "d0");
        for depth in 1..5_000 {
            parent = project.add_folder(&parent, &format!("d{depth}"), &format!("d{depth}"));
        }
        project.add_item(&parent, "bottom", "bottom.rvt", true);

        let mut report = WalkReport::default();
        walker(&project, FolderErrorPolicy::Abort)
            .walk(&Token::new("t"), &FolderRef::new("d0", "d0"), &mut report)
            .await
            .expect("walk");

        assert_eq!(locked_ids(&report), vec!["bottom"]);
        assert_eq!(report.folders_visited, 5_000);
    }
}
