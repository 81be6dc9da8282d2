use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::{Stream, StreamExt};

/// Returned by [`crate::CompletionStreamExt::stop_at_line_boundary`].
///
/// A line break that ends a chunk is held back until the next chunk shows
/// what follows it, so a boundary split across chunks is found exactly once.
pub struct StopAtLineBoundary<S, F> {
    inner: S,
    end_of_line: Vec<char>,
    on_stop: Option<F>,
    held: Option<char>,
    done: bool,
}

impl<S, F> StopAtLineBoundary<S, F> {
    pub(crate) fn new(inner: S, end_of_line: impl IntoIterator<Item = char>, on_stop: F) -> Self {
        Self {
            inner,
            end_of_line: end_of_line.into_iter().collect(),
            on_stop: Some(on_stop),
            held: None,
            done: false,
        }
    }

    fn is_eol(&self, c: char) -> bool {
        self.end_of_line.contains(&c)
    }

    /// Byte offset just past the first line break followed by non-whitespace.
    fn find_cut(&self, text: &str) -> Option<usize> {
        let mut chars = text.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            let Some(&(_, next)) = chars.peek() else {
                break;
            };
            if self.is_eol(c) && !next.is_whitespace() {
                return Some(i + c.len_utf8());
            }
        }
        None
    }
}

impl<S, F> Stream for StopAtLineBoundary<S, F>
where
    S: Stream<Item = String> + Unpin,
    F: FnOnce() + Unpin,
{
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let this = self.get_mut();
        loop {
            if this.done {
                return Poll::Ready(None);
            }

            let Some(chunk) = ready!(this.inner.poll_next_unpin(cx)) else {
                this.done = true;
                return Poll::Ready(this.held.take().map(String::from));
            };

            let mut text = String::with_capacity(chunk.len() + 1);
            text.extend(this.held.take());
            text.push_str(&chunk);

            if let Some(cut) = this.find_cut(&text) {
                text.truncate(cut);
                this.done = true;
                if let Some(on_stop) = this.on_stop.take() {
                    on_stop();
                }
                return Poll::Ready(Some(text));
            }

            if let Some(last) = text.chars().next_back()
                && this.is_eol(last)
            {
                text.pop();
                this.held = Some(last);
            }
            if !text.is_empty() {
                return Poll::Ready(Some(text));
            }
        }
    }
}
