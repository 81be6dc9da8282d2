//! Messages the core process answers.

use serde::{Deserialize, Serialize};

use super::MessageType;

message! {
    /// Liveness check. The core echoes the payload back.
    pub struct Ping = "ping"; String => String
}

message! {
    /// Inline completion at a cursor position.
    pub struct AutocompleteComplete = "autocomplete/complete";
        AutocompleteInput => AutocompleteOutcome
}

message! {
    /// Raw prompt completion, streamed chunk by chunk.
    pub struct LlmStreamComplete = "llm/streamComplete"; StreamCompleteInput => stream String
}

message! {
    /// The host saw files change on disk.
    pub struct FilesChanged = "files/changed"; FilesChangedInput => ()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutocompleteInput {
    pub filepath: String,
    /// Zero-based line of the cursor.
    pub line: u32,
    /// Zero-based character offset of the cursor within `line`.
    pub character: u32,
    /// Extra stop tokens on top of the configured ones.
    #[serde(default)]
    pub stop_tokens: Vec<String>,
    /// Overrides the configured multiline setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiline: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutocompleteOutcome {
    pub completion: String,
    /// The pipeline cut the generation short.
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamCompleteInput {
    pub prompt: String,
    #[serde(default)]
    pub stop_tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesChangedInput {
    pub uris: Vec<String>,
}
