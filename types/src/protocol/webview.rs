//! Messages that involve the UI surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::MessageType;

message! {
    /// Reveal a file in the editor.
    pub struct ShowFile = "showFile"; ShowFileInput => ()
}

message! {
    /// Create an empty file under the first workspace dir and open it.
    pub struct CreateFile = "createFile"; CreateFileInput => ()
}

message! {
    /// Returns whether the surface is full screen after toggling.
    pub struct ToggleFullScreen = "toggleFullScreen"; () => bool
}

message! {
    pub struct ConfigUpdate = "configUpdate"; ConfigUpdateInput => ()
}

message! {
    pub struct IndexProgress = "indexProgress"; IndexProgressInput => ()
}

message! {
    pub struct GetDefaultModelTitle = "getDefaultModelTitle"; () => Option<String>
}

message! {
    pub struct FocusInput = "focusInput"; () => ()
}

message! {
    pub struct NewSession = "newSession"; () => ()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowFileInput {
    pub filepath: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFileInput {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdateInput {
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexProgressInput {
    /// Fraction in `0.0..=1.0`.
    pub progress: f64,
    pub desc: String,
    pub status: String,
}
