//! The editor-host operations the core and the webview may call.

use std::fmt;
use std::future::Future;

use serde_json::Value;
use tether_bus::{BusError, decode_payload, encode_payload};
use tether_types::protocol::{
    ErrorPopup, GetOpenFiles, GetSearchResults, GetWorkspaceDirs, InfoPopup, MessageType, OpenFile,
    ReadFile, RunCommand, ShowDiff, Subprocess, WriteFile,
};

/// Editor collaborator. Failures become `collaboratorFailure` responses.
pub trait Ide: Send + Sync + 'static {
    fn read_file(&self, filepath: &str) -> impl Future<Output = anyhow::Result<String>> + Send;

    fn write_file(
        &self,
        path: &str,
        contents: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn open_file(&self, path: &str) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn show_diff(
        &self,
        filepath: &str,
        new_contents: &str,
        step_index: u32,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn get_open_files(&self) -> impl Future<Output = anyhow::Result<Vec<String>>> + Send;

    fn get_workspace_dirs(&self) -> impl Future<Output = anyhow::Result<Vec<String>>> + Send;

    fn run_command(&self, command: &str) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn get_search_results(&self, query: &str)
    -> impl Future<Output = anyhow::Result<String>> + Send;

    /// Run `command` to completion, returning `(stdout, stderr)`.
    fn subprocess(
        &self,
        command: &str,
    ) -> impl Future<Output = anyhow::Result<(String, String)>> + Send;

    fn show_error_popup(&self, message: &str) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn show_info_popup(&self, message: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdeOp {
    ReadFile,
    WriteFile,
    OpenFile,
    ShowDiff,
    GetOpenFiles,
    GetWorkspaceDirs,
    RunCommand,
    GetSearchResults,
    Subprocess,
    ErrorPopup,
    InfoPopup,
}

impl IdeOp {
    pub const ALL: [Self; 11] = [
        Self::ReadFile,
        Self::WriteFile,
        Self::OpenFile,
        Self::ShowDiff,
        Self::GetOpenFiles,
        Self::GetWorkspaceDirs,
        Self::RunCommand,
        Self::GetSearchResults,
        Self::Subprocess,
        Self::ErrorPopup,
        Self::InfoPopup,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadFile => ReadFile::NAME,
            Self::WriteFile => WriteFile::NAME,
            Self::OpenFile => OpenFile::NAME,
            Self::ShowDiff => ShowDiff::NAME,
            Self::GetOpenFiles => GetOpenFiles::NAME,
            Self::GetWorkspaceDirs => GetWorkspaceDirs::NAME,
            Self::RunCommand => RunCommand::NAME,
            Self::GetSearchResults => GetSearchResults::NAME,
            Self::Subprocess => Subprocess::NAME,
            Self::ErrorPopup => ErrorPopup::NAME,
            Self::InfoPopup => InfoPopup::NAME,
        }
    }
}

impl fmt::Display for IdeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn collaborator_failure(operation: &str, err: &anyhow::Error) -> BusError {
    BusError::CollaboratorFailure(format!("{operation}: {err:#}"))
}

async fn call<M, F, Fut>(data: Value, f: F) -> Result<Value, BusError>
where
    M: MessageType,
    F: FnOnce(M::Request) -> Fut,
    Fut: Future<Output = anyhow::Result<M::Response>>,
{
    let request = decode_payload::<M, M::Request>(data)?;
    let response = f(request)
        .await
        .map_err(|e| collaborator_failure(M::NAME, &e))?;
    encode_payload::<M, _>(&response)
}

/// Decode `data` for `op`, call the collaborator and encode its answer.
pub async fn dispatch_ide<I: Ide>(ide: &I, op: IdeOp, data: Value) -> Result<Value, BusError> {
    tracing::debug!(%op, "ide call");
    match op {
        IdeOp::ReadFile => {
            call::<ReadFile, _, _>(data, |r| async move { ide.read_file(&r.filepath).await }).await
        }
        IdeOp::WriteFile => {
            call::<WriteFile, _, _>(data, |r| async move {
                ide.write_file(&r.path, &r.contents).await
            })
            .await
        }
        IdeOp::OpenFile => {
            call::<OpenFile, _, _>(data, |r| async move { ide.open_file(&r.path).await }).await
        }
        IdeOp::ShowDiff => {
            call::<ShowDiff, _, _>(data, |r| async move {
                ide.show_diff(&r.filepath, &r.new_contents, r.step_index)
                    .await
            })
            .await
        }
        IdeOp::GetOpenFiles => {
            call::<GetOpenFiles, _, _>(data, |()| async move { ide.get_open_files().await }).await
        }
        IdeOp::GetWorkspaceDirs => {
            call::<GetWorkspaceDirs, _, _>(data, |()| async move {
                ide.get_workspace_dirs().await
            })
            .await
        }
        IdeOp::RunCommand => {
            call::<RunCommand, _, _>(data, |r| async move { ide.run_command(&r.command).await })
                .await
        }
        IdeOp::GetSearchResults => {
            call::<GetSearchResults, _, _>(data, |r| async move {
                ide.get_search_results(&r.query).await
            })
            .await
        }
        IdeOp::Subprocess => {
            call::<Subprocess, _, _>(data, |r| async move { ide.subprocess(&r.command).await })
                .await
        }
        IdeOp::ErrorPopup => {
            call::<ErrorPopup, _, _>(data, |r| async move {
                ide.show_error_popup(&r.message).await
            })
            .await
        }
        IdeOp::InfoPopup => {
            call::<InfoPopup, _, _>(data, |r| async move { ide.show_info_popup(&r.message).await })
                .await
        }
    }
}
