use acc_unlock_core::{
    error::RemoteError,
    model::{FolderRef, ItemEntry, MutationStatus, Token},
    remote::HierarchyClient,
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::{
    config::ApsConfig,
    jsonapi::{Document, Resource},
};

const JSON_API: &str = "application/vnd.api+json";
const USER_ID_HEADER: &str = "x-user-id";

/// Data Management API client scoped to one ACC project.
pub struct DataManagementClient {
    cfg: ApsConfig,
    client: reqwest::Client,
}

impl DataManagementClient {
    pub fn new(cfg: ApsConfig) -> reqwest::Result<Self> {
        let client = cfg.http_client()?;
        Ok(Self { cfg, client })
    }

    fn top_folders_url(&self) -> String {
        format!(
            "{}/project/v1/hubs/{}/projects/{}/topFolders",
            self.cfg.base_url(),
            self.cfg.hub_id(),
            self.cfg.project()
        )
    }

    fn contents_url(&self, folder_id: &str) -> String {
        format!(
            "{}/data/v1/projects/{}/folders/{}/contents",
            self.cfg.base_url(),
            self.cfg.project(),
            folder_id
        )
    }

    fn item_url(&self, item_id: &str) -> String {
        format!(
            "{}/data/v1/projects/{}/items/{}",
            self.cfg.base_url(),
            self.cfg.project(),
            item_id
        )
    }

    async fn get<T: DeserializeOwned>(&self, token: &Token, url: &str) -> Result<T, RemoteError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        resp.json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

#[async_trait]
impl HierarchyClient for DataManagementClient {
    fn name(&self) -> &'static str {
        "aps"
    }

    #[instrument(skip_all, fields(project = %self.cfg.project()))]
    async fn list_top_level_folders(&self, token: &Token) -> Result<Vec<FolderRef>, RemoteError> {
        let doc: Document = self.get(token, &self.top_folders_url()).await?;
        Ok(doc.data.into_iter().map(Resource::into_folder_ref).collect())
    }

    fn list_folder_contents<'a>(
        &'a self,
        token: &'a Token,
        folder_id: &str,
    ) -> BoxStream<'a, Result<ItemEntry, RemoteError>> {
        let first = self.contents_url(folder_id);
        stream::try_unfold(Some(first), move |next| async move {
            let Some(url) = next else {
                return Ok::<_, RemoteError>(None);
            };
            debug!(%url, "fetching folder contents page");
            let doc: Document = self.get(token, &url).await?;
            let next = doc.next_page();
            let entries: Vec<Result<ItemEntry, RemoteError>> = doc
                .data
                .into_iter()
                .filter_map(Resource::into_entry)
                .map(Ok)
                .collect();
            Ok::<_, RemoteError>(Some((stream::iter(entries), next)))
        })
        .try_flatten()
        .boxed()
    }

    #[instrument(skip(self, token))]
    async fn get_item_metadata(&self, token: &Token, item_id: &str) -> Result<Value, RemoteError> {
        self.get(token, &self.item_url(item_id)).await
    }

    #[instrument(skip(self, token))]
    async fn set_item_lock(
        &self,
        token: &Token,
        item_id: &str,
        user_id: &str,
        locked: bool,
    ) -> Result<MutationStatus, RemoteError> {
        let payload = json!({
            "jsonapi": { "version": "1.0" },
            "data": {
                "type": "items",
                "id": item_id,
                "attributes": { "reserved": locked }
            }
        });
        let resp = self
            .client
            .patch(self.item_url(item_id))
            .bearer_auth(token.as_str())
            .header(USER_ID_HEADER, user_id)
            .header(CONTENT_TYPE, JSON_API)
            .body(payload.to_string())
            .send()
            .await
            .map_err(transport)?;
        let code = resp.status().as_u16();
        let body = resp.text().await.map_err(transport)?;
        Ok(MutationStatus { code, body })
    }
}
