//! `/.time/state.json` — the journal's header: timestamps, entry
//! summaries, cursor, and retention policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATE_PATH: &str = "/.time/state.json";
pub const ENTRIES_DIR: &str = "/.time/entries";
pub const BLOBS_DIR: &str = "/.time/blobs";
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    #[serde(rename = "keepRecent")]
    pub keep_recent: usize,
    #[serde(rename = "maxEntries")]
    pub max_entries: usize,
    #[serde(rename = "mergeGroup")]
    pub merge_group: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_recent: 50,
            max_entries: 200,
            merge_group: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySummary {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub tool: String,
    pub compacted: bool,
    #[serde(rename = "changedPaths")]
    pub changed_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmState {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    pub entries: Vec<EntrySummary>,
    pub cursor: usize,
    pub retention: RetentionPolicy,
}

impl TmState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            created_at: now,
            updated_at: now,
            entries: Vec::new(),
            cursor: 0,
            retention: RetentionPolicy::default(),
        }
    }
}
