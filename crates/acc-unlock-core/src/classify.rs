use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::RemoteError,
    model::Token,
    remote::HierarchyClient,
};

const RESERVED_POINTER: &str = "/data/attributes/reserved";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    NotLocked,
}

/// What to do when an item's metadata cannot be fetched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifyErrorPolicy {
    /// Fail open: an item that cannot be inspected counts as not locked.
    #[default]
    TreatAsUnlocked,
    /// Surface the error to the walker.
    Abort,
}

/// Reads the reserved flag from raw item metadata. Anything other than an
/// explicit `true` at `data.attributes.reserved` is `NotLocked`.
pub fn classify(metadata: &Value) -> LockState {
    match metadata.pointer(RESERVED_POINTER).and_then(Value::as_bool) {
        Some(true) => LockState::Locked,
        _ => LockState::NotLocked,
    }
}

/// Fetches an item's metadata and classifies it under a fixed error policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockClassifier {
    policy: ClassifyErrorPolicy,
}

impl LockClassifier {
    pub fn new(policy: ClassifyErrorPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ClassifyErrorPolicy {
        self.policy
    }

    /// Only returns `Err` under [`ClassifyErrorPolicy::Abort`].
    pub async fn classify_item<C>(
        &self,
        client: &C,
        token: &Token,
        item_id: &str,
    ) -> Result<LockState, RemoteError>
    where
        C: HierarchyClient + ?Sized,
    {
        match client.get_item_metadata(token, item_id).await {
            Ok(metadata) => {
                let state = classify(&metadata);
                debug!(item_id, ?state, "classified item");
                Ok(state)
            }
            Err(err) => match self.policy {
                ClassifyErrorPolicy::TreatAsUnlocked => {
                    warn!(item_id, error = %err, "metadata unavailable, treating item as not locked");
                    Ok(LockState::NotLocked)
                }
                ClassifyErrorPolicy::Abort => Err(err),
            },
        }
    }
}
