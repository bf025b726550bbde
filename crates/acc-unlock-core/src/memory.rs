//! In-memory stand-ins for the remote service, used by tests and offline smoke runs.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Value};

use crate::{
    error::{AuthError, RemoteError},
    model::{FolderRef, ItemEntry, MutationStatus, Token},
    remote::{HierarchyClient, TokenProvider},
};

/// Remote calls observed by [`InMemoryHierarchy`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Listed(String),
    Inspected(String),
    Mutated {
        item_id: String,
        user_id: String,
        locked: bool,
    },
}

#[derive(Debug, Default)]
struct State {
    fail_top_level: bool,
    top_folders: Vec<FolderRef>,
    children: HashMap<String, Vec<ItemEntry>>,
    metadata: HashMap<String, Value>,
    // folder id -> number of entries yielded before the listing errors
    failing_listings: HashMap<String, usize>,
    failing_metadata: HashSet<String>,
    failing_mutations: HashSet<String>,
    rejected_mutations: HashMap<String, MutationStatus>,
    events: Vec<Event>,
}

/// A project tree held in memory. Clones share the same tree.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHierarchy {
    inner: Arc<Mutex<State>>,
}

impl InMemoryHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_top_folder(&self, id: &str, name: &str) -> String {
        let mut state = self.state();
        state.top_folders.push(FolderRef::new(id, name));
        state.children.entry(id.to_string()).or_default();
        id.to_string()
    }

    pub fn add_folder(&self, parent: &str, id: &str, name: &str) -> String {
        let mut state = self.state();
        state
            .children
            .entry(parent.to_string())
            .or_default()
            .push(ItemEntry::folder(id, name));
        state.children.entry(id.to_string()).or_default();
        id.to_string()
    }

    pub fn add_item(&self, parent: &str, id: &str, name: &str, reserved: bool) {
        let metadata = json!({
            "data": {
                "type": "items",
                "id": id,
                "attributes": { "displayName": name, "reserved": reserved }
            }
        });
        self.add_item_with_metadata(parent, id, name, metadata);
    }

    pub fn add_item_with_metadata(&self, parent: &str, id: &str, name: &str, metadata: Value) {
        let mut state = self.state();
        state
            .children
            .entry(parent.to_string())
            .or_default()
            .push(ItemEntry::leaf(id, name));
        state.metadata.insert(id.to_string(), metadata);
    }

    pub fn fail_top_level(&self) {
        self.state().fail_top_level = true;
    }

    /// Listing of `folder_id` errors immediately.
    pub fn fail_listing(&self, folder_id: &str) {
        self.fail_listing_after(folder_id, 0);
    }

    /// Listing of `folder_id` yields `entries` children, then errors.
    pub fn fail_listing_after(&self, folder_id: &str, entries: usize) {
        self.state()
            .failing_listings
            .insert(folder_id.to_string(), entries);
    }

    pub fn fail_metadata(&self, item_id: &str) {
        self.state().failing_metadata.insert(item_id.to_string());
    }

    /// Mutation for `item_id` fails before any response is received.
    pub fn fail_mutation(&self, item_id: &str) {
        self.state().failing_mutations.insert(item_id.to_string());
    }

    /// Mutation for `item_id` is answered with the given status and body.
    pub fn reject_mutation(&self, item_id: &str, status: u16, body: &str) {
        self.state()
            .rejected_mutations
            .insert(item_id.to_string(), MutationStatus::new(status, body));
    }

    /// Current reserved flag of an item, if the item exists and carries one.
    pub fn is_reserved(&self, item_id: &str) -> Option<bool> {
        self.state()
            .metadata
            .get(item_id)
            .and_then(|m| m.pointer("/data/attributes/reserved"))
            .and_then(Value::as_bool)
    }

    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }
}

#[async_trait]
impl HierarchyClient for InMemoryHierarchy {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list_top_level_folders(&self, _token: &Token) -> Result<Vec<FolderRef>, RemoteError> {
        let state = self.state();
        if state.fail_top_level {
            return Err(RemoteError::Status {
                status: 503,
                body: "service unavailable".into(),
            });
        }
        Ok(state.top_folders.clone())
    }

    fn list_folder_contents<'a>(
        &'a self,
        _token: &'a Token,
        folder_id: &str,
    ) -> BoxStream<'a, Result<ItemEntry, RemoteError>> {
        let mut state = self.state();
        state.events.push(Event::Listed(folder_id.to_string()));
        let entries = state.children.get(folder_id).cloned();
        let Some(entries) = entries else {
            return stream::iter([Err(RemoteError::Status {
                status: 404,
                body: format!("folder {folder_id} not found"),
            })])
            .boxed();
        };
        let mut results: Vec<Result<ItemEntry, RemoteError>> = entries.into_iter().map(Ok).collect();
        if let Some(&after) = state.failing_listings.get(folder_id) {
            results.truncate(after);
            results.push(Err(RemoteError::Status {
                status: 500,
                body: format!("listing {folder_id} failed"),
            }));
        }
        stream::iter(results).boxed()
    }

    async fn get_item_metadata(&self, _token: &Token, item_id: &str) -> Result<Value, RemoteError> {
        let mut state = self.state();
        state.events.push(Event::Inspected(item_id.to_string()));
        if state.failing_metadata.contains(item_id) {
            return Err(RemoteError::Transport("connection reset by peer".into()));
        }
        state
            .metadata
            .get(item_id)
            .cloned()
            .ok_or_else(|| RemoteError::Status {
                status: 404,
                body: format!("item {item_id} not found"),
            })
    }

    async fn set_item_lock(
        &self,
        _token: &Token,
        item_id: &str,
        user_id: &str,
        locked: bool,
    ) -> Result<MutationStatus, RemoteError> {
        let mut state = self.state();
        state.events.push(Event::Mutated {
            item_id: item_id.to_string(),
            user_id: user_id.to_string(),
            locked,
        });
        if state.failing_mutations.contains(item_id) {
            return Err(RemoteError::Transport("connection timed out".into()));
        }
        if let Some(status) = state.rejected_mutations.get(item_id) {
            return Ok(status.clone());
        }
        let Some(metadata) = state.metadata.get_mut(item_id) else {
            return Ok(MutationStatus::new(404, format!("item {item_id} not found")));
        };
        if let Some(attributes) = metadata
            .pointer_mut("/data/attributes")
            .and_then(Value::as_object_mut)
        {
            attributes.insert("reserved".into(), Value::Bool(locked));
        } else {
            *metadata = json!({ "data": { "id": item_id, "attributes": { "reserved": locked } } });
        }
        Ok(MutationStatus::new(200, ""))
    }
}

/// Token provider returning a fixed result.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    result: Result<Token, AuthError>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            result: Ok(Token::new(token)),
        }
    }

    pub fn failing(err: AuthError) -> Self {
        Self { result: Err(err) }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn acquire_token(&self) -> Result<Token, AuthError> {
        self.result.clone()
    }
}
