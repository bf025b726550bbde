use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::{
    error::{AuthError, RemoteError},
    model::{FolderRef, ItemEntry, MutationStatus, Token},
};

/// Source of the bearer token used for a run.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_token(&self) -> Result<Token, AuthError>;
}

/// Contract for the remote document-management service.
#[async_trait]
pub trait HierarchyClient: Send + Sync {
    /// Short name used for logging.
    fn name(&self) -> &'static str;

    /// Folders directly under the project root.
    async fn list_top_level_folders(&self, token: &Token) -> Result<Vec<FolderRef>, RemoteError>;

    /// Lazily pages through a folder's direct children. The stream is finite and
    /// cannot be restarted; an `Err` element means the listing stopped there.
    fn list_folder_contents<'a>(
        &'a self,
        token: &'a Token,
        folder_id: &str,
    ) -> BoxStream<'a, Result<ItemEntry, RemoteError>>;

    /// Raw item record, as returned by the service.
    async fn get_item_metadata(&self, token: &Token, item_id: &str) -> Result<Value, RemoteError>;

    /// Set the item's reserved flag to an absolute value on behalf of `user_id`.
    /// A rejected request is still `Ok`; inspect [`MutationStatus::is_success`].
    async fn set_item_lock(
        &self,
        token: &Token,
        item_id: &str,
        user_id: &str,
        locked: bool,
    ) -> Result<MutationStatus, RemoteError>;
}
