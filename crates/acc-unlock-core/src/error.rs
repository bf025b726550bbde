use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Credential exchange failed; fatal to the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Transport(String),
    #[error("token request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("token response malformed: {0}")]
    MalformedResponse(String),
}

/// Failure talking to the document-management service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalkError {
    #[error("listing folder {folder_id} failed: {source}")]
    Listing {
        folder_id: String,
        #[source]
        source: RemoteError,
    },
    #[error("inspecting item {item_id} failed: {source}")]
    Classification {
        item_id: String,
        #[source]
        source: RemoteError,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("listing top-level folders failed: {0}")]
    Discovery(#[source] RemoteError),
    #[error(transparent)]
    Walk(#[from] WalkError),
}

/// A folder whose listing failed and was skipped under [`crate::walker::FolderErrorPolicy::Skip`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderFailure {
    pub folder_id: String,
    pub folder_name: String,
    pub error: String,
}
