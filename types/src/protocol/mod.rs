//! Protocol tables.
//!
//! Every message type is a zero-sized marker implementing [`MessageType`],
//! which names it on the wire and fixes its request and response shapes.
//! A [`Table`] groups the types one end accepts from one direction into a
//! closed tag enum, so a `match` over the tags is checked for exhaustiveness
//! at build time. [`Member`] ties a marker to its tag in a given table.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A named request/response pair.
///
/// For streaming types `Response` is the shape of one streamed chunk; the
/// final response carries no payload.
pub trait MessageType: Send + Sync + 'static {
    const NAME: &'static str;
    const STREAMING: bool = false;
    type Request: Serialize + DeserializeOwned + Send + 'static;
    type Response: Serialize + DeserializeOwned + Send + 'static;
}

/// A closed set of message types accepted in one direction.
pub trait Table: Send + Sync + 'static {
    type Tag: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static;

    const NAME: &'static str;

    fn tags() -> &'static [Self::Tag];
    fn tag_name(tag: Self::Tag) -> &'static str;
    fn is_streaming(tag: Self::Tag) -> bool;
    fn lookup(name: &str) -> Option<Self::Tag>;
}

/// `Self` is listed in table `T` under `TAG`.
pub trait Member<T: Table>: MessageType {
    const TAG: T::Tag;
}

/// Declares a marker type and its [`MessageType`] impl. The invoking module
/// must have `MessageType` in scope.
///
/// ```text
/// message! {
///     pub struct Ping = "ping"; String => String
/// }
/// ```
///
/// `Req => stream Chunk` marks a streaming type.
macro_rules! message {
    (
        @define [$($meta:meta)*]
        $vis:vis $name:ident, $wire:literal, $streaming:literal, $req:ty, $resp:ty
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis struct $name;

        impl MessageType for $name {
            const NAME: &'static str = $wire;
            const STREAMING: bool = $streaming;
            type Request = $req;
            type Response = $resp;
        }
    };
    ($(#[$meta:meta])* $vis:vis struct $name:ident = $wire:literal; $req:ty => stream $resp:ty) => {
        message!(@define [$($meta)*] $vis $name, $wire, true, $req, $resp);
    };
    ($(#[$meta:meta])* $vis:vis struct $name:ident = $wire:literal; $req:ty => $resp:ty) => {
        message!(@define [$($meta)*] $vis $name, $wire, false, $req, $resp);
    };
}

/// Declares a table marker, its tag enum, the [`Table`] impl and one
/// [`Member`] impl per listed message type. The invoking module must have
/// `fmt`, `Member`, `MessageType` and `Table` in scope.
macro_rules! protocol_table {
    (
        $(#[$meta:meta])*
        $vis:vis table $table:ident => $tag:ident {
            $($variant:ident => $msg:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        $vis struct $table;

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $tag {
            $($variant),+
        }

        impl $tag {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => <$msg as MessageType>::NAME),+
                }
            }

            #[must_use]
            pub const fn is_streaming(self) -> bool {
                match self {
                    $(Self::$variant => <$msg as MessageType>::STREAMING),+
                }
            }

            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|tag| tag.as_str() == name)
            }
        }

        impl fmt::Display for $tag {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Table for $table {
            type Tag = $tag;

            const NAME: &'static str = stringify!($table);

            fn tags() -> &'static [$tag] {
                $tag::ALL
            }

            fn tag_name(tag: $tag) -> &'static str {
                tag.as_str()
            }

            fn is_streaming(tag: $tag) -> bool {
                tag.is_streaming()
            }

            fn lookup(name: &str) -> Option<$tag> {
                $tag::from_name(name)
            }
        }

        $(
            impl Member<$table> for $msg {
                const TAG: $tag = $tag::$variant;
            }
        )+
    };
}

mod core_api;
mod ide;
mod tables;
mod webview;

pub use core_api::{
    AutocompleteComplete, AutocompleteInput, AutocompleteOutcome, FilesChanged,
    FilesChangedInput, LlmStreamComplete, Ping, StreamCompleteInput,
};
pub use ide::{
    ErrorPopup, GetOpenFiles, GetSearchResults, GetWorkspaceDirs, InfoPopup, OpenFile,
    OpenFileInput, PopupInput, ReadFile, ReadFileInput, RunCommand, RunCommandInput, SearchInput,
    ShowDiff, ShowDiffInput, Subprocess, SubprocessInput, SubprocessOutput, WriteFile,
    WriteFileInput,
};
pub use tables::{
    FromCore, FromCoreType, FromWebview, FromWebviewType, ToCore, ToCoreType, ToWebview,
    ToWebviewType,
};
pub use webview::{
    ConfigUpdate, ConfigUpdateInput, CreateFile, CreateFileInput, FocusInput,
    GetDefaultModelTitle, IndexProgress, IndexProgressInput, NewSession, ShowFile,
    ShowFileInput, ToggleFullScreen,
};
