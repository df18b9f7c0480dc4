//! Request/response shapes for the tools facade.

use serde::{Deserialize, Serialize};

/// Text-vs-base64 encoding selector shared by `fs_read` and `fs_write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Text,
    Base64,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Text
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResult {
    pub path: String,
    pub content: String,
    pub encoding: Encoding,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineEntry {
    #[serde(rename = "lineNumber")]
    pub line_number: usize,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadLinesResult {
    pub path: String,
    #[serde(rename = "startLine")]
    pub start_line: usize,
    #[serde(rename = "endLine")]
    pub end_line: usize,
    #[serde(rename = "totalLines")]
    pub total_lines: usize,
    pub lines: Vec<LineEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchResult {
    pub path: String,
    #[serde(rename = "startLine")]
    pub start_line: usize,
    #[serde(rename = "endLine")]
    pub end_line: usize,
    #[serde(rename = "newTotalLines")]
    pub new_total_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub path: String,
    #[serde(rename = "matchLine")]
    pub match_line: usize,
    #[serde(rename = "contextStartLine")]
    pub context_start_line: usize,
    #[serde(rename = "contextEndLine")]
    pub context_end_line: usize,
    pub lines: Vec<LineEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSummary {
    pub results: Vec<SearchResult>,
    pub truncated: bool,
    #[serde(rename = "scannedFiles")]
    pub scanned_files: usize,
    #[serde(rename = "matchedFiles")]
    pub matched_files: usize,
    #[serde(rename = "skippedBinaryFiles")]
    pub skipped_binary_files: usize,
}

/// Parameters for `fs_search`, with defaults matching spec §4.3.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub path_prefix: String,
    pub max_results: usize,
    pub context_lines: usize,
    pub max_line_length: usize,
    pub case_sensitive: Option<bool>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            path_prefix: "/".to_string(),
            max_results: 8,
            context_lines: 2,
            max_line_length: 240,
            case_sensitive: None,
        }
    }
}
