use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::{Stream, StreamExt};

/// Returned by [`crate::CompletionStreamExt::stop_at_stop_tokens`].
///
/// Holds back a window as long as the longest token (in chars). While the
/// window is full, its front char is released only if no token starts
/// there. When upstream ends, the remaining window is shorter than the
/// longest token and is flushed verbatim.
#[derive(Debug)]
pub struct StopAtStopTokens<S> {
    inner: S,
    tokens: Vec<Vec<char>>,
    window_len: usize,
    window: VecDeque<char>,
    done: bool,
}

impl<S> StopAtStopTokens<S> {
    pub(crate) fn new<I, T>(inner: S, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: Vec<Vec<char>> = tokens
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| !t.is_empty())
            .map(|t| t.chars().collect())
            .collect();
        let window_len = tokens.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            inner,
            tokens,
            window_len,
            window: VecDeque::new(),
            done: false,
        }
    }

    /// Whether some token starts at the front of the window.
    fn token_at_front(&self) -> bool {
        self.tokens.iter().any(|token| {
            token.len() <= self.window.len()
                && token.iter().zip(&self.window).all(|(a, b)| a == b)
        })
    }

    /// Release chars while the window is full. Returns `true` on a match.
    fn drain_full_window(&mut self, out: &mut String) -> bool {
        while self.window.len() >= self.window_len {
            if self.token_at_front() {
                return true;
            }
            out.extend(self.window.pop_front());
        }
        false
    }

    /// Upstream is finished.
    fn drain_tail(&mut self, out: &mut String) {
        out.extend(self.window.drain(..));
    }
}

impl<S: Stream<Item = String> + Unpin> Stream for StopAtStopTokens<S> {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.tokens.is_empty() {
            return this.inner.poll_next_unpin(cx);
        }

        loop {
            let Some(chunk) = ready!(this.inner.poll_next_unpin(cx)) else {
                this.done = true;
                let mut out = String::new();
                this.drain_tail(&mut out);
                return Poll::Ready((!out.is_empty()).then_some(out));
            };
            this.window.extend(chunk.chars());

            let mut out = String::new();
            if this.drain_full_window(&mut out) {
                tracing::trace!("stop token matched");
                this.done = true;
                this.window.clear();
                return Poll::Ready((!out.is_empty()).then_some(out));
            }
            if !out.is_empty() {
                return Poll::Ready(Some(out));
            }
        }
    }
}
