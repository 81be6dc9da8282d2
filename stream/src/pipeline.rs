use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};

use crate::{CompletionStreamExt, DEFAULT_END_OF_LINE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub stop_tokens: Vec<String>,
    /// When `false`, output is cut at the first line boundary.
    pub multiline: bool,
    pub end_of_line: Vec<char>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            stop_tokens: Vec::new(),
            multiline: false,
            end_of_line: DEFAULT_END_OF_LINE.to_vec(),
        }
    }
}

/// The autocomplete composition: leading-newline veto, then stop tokens,
/// then (single-line only) the line-boundary cut.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    #[must_use]
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// `on_stop` runs at most once, when the line-boundary cut fires.
    pub fn apply<S, F>(&self, source: S, on_stop: F) -> BoxStream<'static, String>
    where
        S: Stream<Item = String> + Send + Unpin + 'static,
        F: FnOnce() + Send + Unpin + 'static,
    {
        let stage = source
            .no_first_char_newline()
            .stop_at_stop_tokens(self.options.stop_tokens.clone());
        if self.options.multiline {
            stage.boxed()
        } else {
            stage
                .stop_at_line_boundary(self.options.end_of_line.clone(), on_stop)
                .boxed()
        }
    }
}
