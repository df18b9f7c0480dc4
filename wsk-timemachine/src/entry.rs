//! `/.time/entries/<id>.json` — a single recorded, reversible mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Change {
    File {
        path: String,
        #[serde(rename = "beforeExists")]
        before_exists: bool,
        #[serde(rename = "afterExists")]
        after_exists: bool,
        #[serde(rename = "beforeBlob", skip_serializing_if = "Option::is_none")]
        before_blob: Option<String>,
        #[serde(rename = "afterBlob", skip_serializing_if = "Option::is_none")]
        after_blob: Option<String>,
        #[serde(rename = "beforeSize", skip_serializing_if = "Option::is_none")]
        before_size: Option<u64>,
        #[serde(rename = "afterSize", skip_serializing_if = "Option::is_none")]
        after_size: Option<u64>,
    },
    Dir {
        path: String,
        #[serde(rename = "beforeExists")]
        before_exists: bool,
        #[serde(rename = "afterExists")]
        after_exists: bool,
    },
}

impl Change {
    pub fn path(&self) -> &str {
        match self {
            Change::File { path, .. } => path,
            Change::Dir { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub tool: String,
    #[serde(default)]
    pub note: String,
    pub changes: Vec<Change>,
    #[serde(rename = "compactedFrom", skip_serializing_if = "Option::is_none")]
    pub compacted_from: Option<Vec<String>>,
}

pub fn entry_path(id: &str) -> String {
    format!("{}/{id}.json", crate::state::ENTRIES_DIR)
}
