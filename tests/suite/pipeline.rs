//! Pipeline output must not depend on how the generator chunks its text.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use tether_stream::{CompletionStreamExt, Pipeline, PipelineOptions};

/// Every way of cutting `text` into two or three chunks.
fn chunkings(text: &str) -> Vec<Vec<String>> {
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain([text.len()])
        .collect();
    let mut out = vec![vec![text.to_string()]];
    for (n, &a) in bounds.iter().enumerate() {
        out.push(vec![text[..a].to_string(), text[a..].to_string()]);
        for &b in &bounds[n..] {
            out.push(vec![
                text[..a].to_string(),
                text[a..b].to_string(),
                text[b..].to_string(),
            ]);
        }
    }
    out
}

fn source(parts: Vec<String>) -> BoxStream<'static, String> {
    stream::iter(parts).boxed()
}

async fn collect(s: impl Stream<Item = String>) -> String {
    s.collect::<Vec<_>>().await.concat()
}

async fn run(options: &PipelineOptions, parts: Vec<String>) -> String {
    collect(Pipeline::new(options.clone()).apply(source(parts), || {})).await
}

#[tokio::test]
async fn stop_tokens_are_chunking_invariant() {
    let text = "let a = 1; // STOP here";
    for parts in chunkings(text) {
        let out = collect(source(parts.clone()).stop_at_stop_tokens(["STOP", "//"])).await;
        assert_eq!(out, "let a = 1; ", "{parts:?}");
    }
}

#[tokio::test]
async fn line_boundary_is_chunking_invariant() {
    let text = "foo(bar)\n  baz\nqux";
    for parts in chunkings(text) {
        let out = collect(source(parts.clone()).stop_at_line_boundary(['\n'], || {})).await;
        assert_eq!(out, "foo(bar)\n  baz\n", "{parts:?}");
    }
}

#[tokio::test]
async fn single_line_pipeline_is_chunking_invariant() {
    let options = PipelineOptions {
        stop_tokens: vec!["```".into()],
        ..PipelineOptions::default()
    };
    for parts in chunkings("value)```\nrest") {
        assert_eq!(run(&options, parts.clone()).await, "value)", "{parts:?}");
    }
    for parts in chunkings("x + 1;\ny + 2;") {
        assert_eq!(run(&options, parts.clone()).await, "x + 1;\n", "{parts:?}");
    }
}

#[tokio::test]
async fn leading_newline_vetoes_any_chunking() {
    let options = PipelineOptions::default();
    for parts in chunkings("\nfn next() {}") {
        assert_eq!(run(&options, parts.clone()).await, "", "{parts:?}");
    }
}

#[tokio::test]
async fn stages_pull_lazily() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pulled);
    let endless = stream::repeat("ab\n".to_string()).inspect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let mut stopped = false;
    let out = collect(
        endless
            .no_first_char_newline()
            .stop_at_stop_tokens(["b\na"])
            .stop_at_line_boundary(['\n'], || stopped = true),
    )
    .await;

    assert_eq!(out, "a");
    assert!(!stopped);
    assert!(pulled.load(Ordering::SeqCst) <= 3);
}
