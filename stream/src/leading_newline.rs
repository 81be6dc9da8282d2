use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::{Stream, StreamExt};

/// Returned by [`crate::CompletionStreamExt::no_first_char_newline`].
///
/// Empty chunks before the first character do not count as the start.
#[derive(Debug)]
pub struct NoFirstCharNewline<S> {
    inner: S,
    started: bool,
    done: bool,
}

impl<S> NoFirstCharNewline<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            started: false,
            done: false,
        }
    }
}

impl<S: Stream<Item = String> + Unpin> Stream for NoFirstCharNewline<S> {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let this = self.get_mut();
        loop {
            if this.done {
                return Poll::Ready(None);
            }
            let Some(chunk) = ready!(this.inner.poll_next_unpin(cx)) else {
                this.done = true;
                return Poll::Ready(None);
            };
            if !this.started {
                if chunk.is_empty() {
                    continue;
                }
                this.started = true;
                if chunk.starts_with(['\n', '\r']) {
                    tracing::trace!("completion starts with a line break, dropping it");
                    this.done = true;
                    continue;
                }
            }
            return Poll::Ready(Some(chunk));
        }
    }
}
