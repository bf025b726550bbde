use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FolderFailure;

/// Opaque bearer credential handed to every remote call.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// A folder node to visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

impl FolderRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Folder,
    LeafItem,
}

/// One entry of a folder listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemEntry {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
}

impl ItemEntry {
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ItemKind::Folder,
        }
    }

    pub fn leaf(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ItemKind::LeafItem,
        }
    }

    pub fn as_folder(&self) -> Option<FolderRef> {
        match self.kind {
            ItemKind::Folder => Some(FolderRef::new(self.id.clone(), self.name.clone())),
            ItemKind::LeafItem => None,
        }
    }
}

/// A leaf item confirmed reserved during the walk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockedFile {
    pub item_id: String,
    pub item_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum UnlockResult {
    Success,
    /// `status` is `None` when the request never produced an HTTP response.
    Failure { status: Option<u16>, detail: String },
}

/// Result of one unlock mutation, reported in reconciliation order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnlockOutcome {
    pub item_id: String,
    pub item_name: String,
    #[serde(flatten)]
    pub result: UnlockResult,
}

impl UnlockOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.result, UnlockResult::Success)
    }
}

/// Raw response of the lock mutation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationStatus {
    pub code: u16,
    pub body: String,
}

impl MutationStatus {
    pub fn new(code: u16, body: impl Into<String>) -> Self {
        Self {
            code,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Run lifecycle; each step only moves forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    Authenticated,
    FoldersDiscovered,
    Walked,
    Reconciled,
    Reported,
}

/// Everything a finished run reports back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub state: RunState,
    pub dry_run: bool,
    pub total_locked: usize,
    pub locked: Vec<LockedFile>,
    pub outcomes: Vec<UnlockOutcome>,
    pub skipped_folders: Vec<FolderFailure>,
    pub folders_visited: usize,
    pub items_inspected: usize,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}
