//! The four inbound tables.
//!
//! Each end of a connection accepts exactly one table:
//!
//! | Table         | Accepted by | Sent by           |
//! |---------------|-------------|-------------------|
//! | `ToCore`      | core        | host (and webview, forwarded) |
//! | `FromCore`    | host        | core              |
//! | `FromWebview` | host        | webview           |
//! | `ToWebview`   | webview     | host (and core, forwarded)    |

use std::fmt;

use super::{
    AutocompleteComplete, ConfigUpdate, CreateFile, ErrorPopup, FilesChanged, FocusInput,
    GetDefaultModelTitle, GetOpenFiles, GetSearchResults, GetWorkspaceDirs, IndexProgress,
    InfoPopup, LlmStreamComplete, Member, MessageType, NewSession, OpenFile, Ping, ReadFile,
    RunCommand, ShowDiff, ShowFile, Subprocess, Table, ToggleFullScreen, WriteFile,
};

protocol_table! {
    /// Messages the core process handles.
    pub table ToCore => ToCoreType {
        Ping => Ping,
        AutocompleteComplete => AutocompleteComplete,
        LlmStreamComplete => LlmStreamComplete,
        FilesChanged => FilesChanged,
    }
}

protocol_table! {
    /// Messages the core process sends to the host.
    pub table FromCore => FromCoreType {
        ReadFile => ReadFile,
        WriteFile => WriteFile,
        OpenFile => OpenFile,
        ShowDiff => ShowDiff,
        GetOpenFiles => GetOpenFiles,
        GetWorkspaceDirs => GetWorkspaceDirs,
        RunCommand => RunCommand,
        GetSearchResults => GetSearchResults,
        Subprocess => Subprocess,
        ErrorPopup => ErrorPopup,
        InfoPopup => InfoPopup,
        ConfigUpdate => ConfigUpdate,
        IndexProgress => IndexProgress,
        GetDefaultModelTitle => GetDefaultModelTitle,
    }
}

protocol_table! {
    /// Messages the webview sends to the host.
    pub table FromWebview => FromWebviewType {
        Ping => Ping,
        AutocompleteComplete => AutocompleteComplete,
        LlmStreamComplete => LlmStreamComplete,
        ReadFile => ReadFile,
        WriteFile => WriteFile,
        OpenFile => OpenFile,
        ShowDiff => ShowDiff,
        GetOpenFiles => GetOpenFiles,
        GetWorkspaceDirs => GetWorkspaceDirs,
        RunCommand => RunCommand,
        GetSearchResults => GetSearchResults,
        Subprocess => Subprocess,
        ErrorPopup => ErrorPopup,
        InfoPopup => InfoPopup,
        ShowFile => ShowFile,
        CreateFile => CreateFile,
        ToggleFullScreen => ToggleFullScreen,
    }
}

protocol_table! {
    /// Messages the webview handles.
    pub table ToWebview => ToWebviewType {
        ConfigUpdate => ConfigUpdate,
        IndexProgress => IndexProgress,
        GetDefaultModelTitle => GetDefaultModelTitle,
        FocusInput => FocusInput,
        NewSession => NewSession,
    }
}
