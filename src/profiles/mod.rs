//! Layout profiles and their on-disk collection
//!
//! A profile is a named, ordered list of per-display displayplacer arguments.
//! Profiles live in a single JSON array at `<data dir>/DisplayLayouts/profiles.json`.

pub mod signature;
mod store;

pub use signature::{Signature, find_active, signature};
pub use store::{ProfileStore, StoreEvent};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One saved monitor arrangement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutProfile {
    /// Assigned once by the store, never changed
    pub id: Uuid,
    pub name: String,
    /// One self-contained directive per physical display
    pub args: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LayoutProfile {
    /// Fresh profile with `created_at == updated_at`
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            args,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn signature(&self) -> Signature {
        signature(&self.args)
    }
}
