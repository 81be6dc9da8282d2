//! Where each inbound message type goes.
//!
//! The route functions match on the closed tag enums, so adding a type to a
//! table without deciding its route fails to compile. The pass-through sets
//! are derived from the same functions.

use std::sync::LazyLock;

use tether_types::protocol::{
    AutocompleteComplete, ConfigUpdate, FromCoreType, FromWebviewType, GetDefaultModelTitle,
    IndexProgress, LlmStreamComplete, Member, Ping, ToCore, ToCoreType, ToWebview, ToWebviewType,
};

use crate::IdeOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebviewRoute {
    ForwardToCore(ToCoreType),
    Ide(IdeOp),
    Local(LocalOp),
}

/// Host features only the webview asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalOp {
    ShowFile,
    CreateFile,
    ToggleFullScreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreRoute {
    ForwardToWebview(ToWebviewType),
    Ide(IdeOp),
}

#[must_use]
pub const fn route_from_webview(tag: FromWebviewType) -> WebviewRoute {
    match tag {
        FromWebviewType::Ping => WebviewRoute::ForwardToCore(<Ping as Member<ToCore>>::TAG),
        FromWebviewType::AutocompleteComplete => {
            WebviewRoute::ForwardToCore(<AutocompleteComplete as Member<ToCore>>::TAG)
        }
        FromWebviewType::LlmStreamComplete => {
            WebviewRoute::ForwardToCore(<LlmStreamComplete as Member<ToCore>>::TAG)
        }
        FromWebviewType::ReadFile => WebviewRoute::Ide(IdeOp::ReadFile),
        FromWebviewType::WriteFile => WebviewRoute::Ide(IdeOp::WriteFile),
        FromWebviewType::OpenFile => WebviewRoute::Ide(IdeOp::OpenFile),
        FromWebviewType::ShowDiff => WebviewRoute::Ide(IdeOp::ShowDiff),
        FromWebviewType::GetOpenFiles => WebviewRoute::Ide(IdeOp::GetOpenFiles),
        FromWebviewType::GetWorkspaceDirs => WebviewRoute::Ide(IdeOp::GetWorkspaceDirs),
        FromWebviewType::RunCommand => WebviewRoute::Ide(IdeOp::RunCommand),
        FromWebviewType::GetSearchResults => WebviewRoute::Ide(IdeOp::GetSearchResults),
        FromWebviewType::Subprocess => WebviewRoute::Ide(IdeOp::Subprocess),
        FromWebviewType::ErrorPopup => WebviewRoute::Ide(IdeOp::ErrorPopup),
        FromWebviewType::InfoPopup => WebviewRoute::Ide(IdeOp::InfoPopup),
        FromWebviewType::ShowFile => WebviewRoute::Local(LocalOp::ShowFile),
        FromWebviewType::CreateFile => WebviewRoute::Local(LocalOp::CreateFile),
        FromWebviewType::ToggleFullScreen => WebviewRoute::Local(LocalOp::ToggleFullScreen),
    }
}

#[must_use]
pub const fn route_from_core(tag: FromCoreType) -> CoreRoute {
    match tag {
        FromCoreType::ReadFile => CoreRoute::Ide(IdeOp::ReadFile),
        FromCoreType::WriteFile => CoreRoute::Ide(IdeOp::WriteFile),
        FromCoreType::OpenFile => CoreRoute::Ide(IdeOp::OpenFile),
        FromCoreType::ShowDiff => CoreRoute::Ide(IdeOp::ShowDiff),
        FromCoreType::GetOpenFiles => CoreRoute::Ide(IdeOp::GetOpenFiles),
        FromCoreType::GetWorkspaceDirs => CoreRoute::Ide(IdeOp::GetWorkspaceDirs),
        FromCoreType::RunCommand => CoreRoute::Ide(IdeOp::RunCommand),
        FromCoreType::GetSearchResults => CoreRoute::Ide(IdeOp::GetSearchResults),
        FromCoreType::Subprocess => CoreRoute::Ide(IdeOp::Subprocess),
        FromCoreType::ErrorPopup => CoreRoute::Ide(IdeOp::ErrorPopup),
        FromCoreType::InfoPopup => CoreRoute::Ide(IdeOp::InfoPopup),
        FromCoreType::ConfigUpdate => {
            CoreRoute::ForwardToWebview(<ConfigUpdate as Member<ToWebview>>::TAG)
        }
        FromCoreType::IndexProgress => {
            CoreRoute::ForwardToWebview(<IndexProgress as Member<ToWebview>>::TAG)
        }
        FromCoreType::GetDefaultModelTitle => {
            CoreRoute::ForwardToWebview(<GetDefaultModelTitle as Member<ToWebview>>::TAG)
        }
    }
}

/// Webview types forwarded to the core unchanged.
pub static WEBVIEW_TO_CORE_PASS_THROUGH: LazyLock<Vec<ToCoreType>> = LazyLock::new(|| {
    FromWebviewType::ALL
        .iter()
        .filter_map(|&tag| match route_from_webview(tag) {
            WebviewRoute::ForwardToCore(target) => Some(target),
            WebviewRoute::Ide(_) | WebviewRoute::Local(_) => None,
        })
        .collect()
});

/// Core types forwarded to the webview unchanged.
pub static CORE_TO_WEBVIEW_PASS_THROUGH: LazyLock<Vec<ToWebviewType>> = LazyLock::new(|| {
    FromCoreType::ALL
        .iter()
        .filter_map(|&tag| match route_from_core(tag) {
            CoreRoute::ForwardToWebview(target) => Some(target),
            CoreRoute::Ide(_) => None,
        })
        .collect()
});
