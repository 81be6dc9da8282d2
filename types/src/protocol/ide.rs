//! Editor-host operations. The core and the webview both call these.

use serde::{Deserialize, Serialize};

use super::MessageType;

message! {
    pub struct ReadFile = "readFile"; ReadFileInput => String
}

message! {
    pub struct WriteFile = "writeFile"; WriteFileInput => ()
}

message! {
    pub struct OpenFile = "openFile"; OpenFileInput => ()
}

message! {
    /// Presents proposed contents for `filepath` as a diff.
    pub struct ShowDiff = "showDiff"; ShowDiffInput => ()
}

message! {
    pub struct GetOpenFiles = "getOpenFiles"; () => Vec<String>
}

message! {
    pub struct GetWorkspaceDirs = "getWorkspaceDirs"; () => Vec<String>
}

message! {
    /// Runs a command in the editor's terminal.
    pub struct RunCommand = "runCommand"; RunCommandInput => ()
}

message! {
    pub struct GetSearchResults = "getSearchResults"; SearchInput => String
}

message! {
    /// Runs a shell command to completion and returns `(stdout, stderr)`.
    pub struct Subprocess = "subprocess"; SubprocessInput => SubprocessOutput
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFileInput {
    pub filepath: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFileInput {
    pub path: String,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenFileInput {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowDiffInput {
    pub filepath: String,
    pub new_contents: String,
    pub step_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCommandInput {
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchInput {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubprocessInput {
    pub command: String,
}

pub type SubprocessOutput = (String, String);

message! {
    /// One-line error notification in the editor.
    pub struct ErrorPopup = "errorPopup"; PopupInput => ()
}

message! {
    pub struct InfoPopup = "infoPopup"; PopupInput => ()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupInput {
    pub message: String,
}
