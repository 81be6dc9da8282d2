//! The core process.
//!
//! [`Core`] answers the requests of the [`ToCore`](tether_types::protocol::ToCore)
//! table. Completions come from a [`Generator`] and are shaped by the
//! `tether-stream` pipeline; editor state is read back through
//! [`MessengerIde`], which calls the host over the same connection.

mod generator;
mod handlers;
mod ide;
mod prompt_log;

pub use generator::{CommandGenerator, Generator, UnconfiguredGenerator};
pub use handlers::{CompletionSettings, Core, prompt_prefix};
pub use ide::MessengerIde;
pub use prompt_log::PromptLog;
