//! Stream transformation pipeline for generated text.
//!
//! Every stage is a pull-based [`Stream`] adapter over `String` chunks: it
//! advances its upstream only when polled itself, and ends by returning
//! `Poll::Ready(None)`. Stages compose in any order through
//! [`CompletionStreamExt`]; [`Pipeline`] wires up the order autocomplete uses.

use futures_util::Stream;

mod leading_newline;
mod line_boundary;
mod pipeline;
mod stop_tokens;

pub use leading_newline::NoFirstCharNewline;
pub use line_boundary::StopAtLineBoundary;
pub use pipeline::{Pipeline, PipelineOptions};
pub use stop_tokens::StopAtStopTokens;

/// Line-break characters used when none are configured.
pub const DEFAULT_END_OF_LINE: [char; 2] = ['\n', '\r'];

pub trait CompletionStreamExt: Stream<Item = String> + Sized {
    /// End without output if the first non-empty chunk starts with a line break.
    fn no_first_char_newline(self) -> NoFirstCharNewline<Self> {
        NoFirstCharNewline::new(self)
    }

    /// Cut after the first line break that is followed by non-whitespace,
    /// calling `on_stop` once when that happens.
    fn stop_at_line_boundary<F: FnOnce()>(
        self,
        end_of_line: impl IntoIterator<Item = char>,
        on_stop: F,
    ) -> StopAtLineBoundary<Self, F> {
        StopAtLineBoundary::new(self, end_of_line, on_stop)
    }

    /// End at the earliest occurrence of any token, emitting nothing from it.
    fn stop_at_stop_tokens<I, T>(self, tokens: I) -> StopAtStopTokens<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        StopAtStopTokens::new(self, tokens)
    }
}

impl<S: Stream<Item = String>> CompletionStreamExt for S {}
