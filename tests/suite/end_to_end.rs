//! Webview -> router -> core round trips over in-process transports.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use tether_bus::ConnectionState;
use tether_core::CompletionSettings;
use tether_router::Ide;
use tether_types::protocol::{
    AutocompleteComplete, AutocompleteInput, ConfigUpdate, ConfigUpdateInput, FilesChanged,
    FilesChangedInput, GetDefaultModelTitle, GetSearchResults, LlmStreamComplete, Ping,
    MessageType, SearchInput, StreamCompleteInput, ToggleFullScreen,
};
use tether_types::{ErrorKind, MessageId, SurfaceId};

use crate::common::{MemoryIde, ScriptedGenerator, stack};

const MAIN_RS: &str = "fn main() {\n    println!(\n}\n";

fn cursor_in_main() -> AutocompleteInput {
    AutocompleteInput {
        filepath: "/w/main.rs".into(),
        line: 1,
        character: 13,
        stop_tokens: Vec::new(),
        multiline: None,
    }
}

#[tokio::test]
async fn autocomplete_reads_through_the_host_and_cuts_the_line() {
    let generator = ScriptedGenerator::new(&["\"hi\");\n", "}"]);
    let s = stack(
        MemoryIde::with_files(&[("/w/main.rs", MAIN_RS)]),
        generator.clone(),
        CompletionSettings::default(),
    );

    let outcome = s
        .webview
        .request::<AutocompleteComplete>(cursor_in_main())
        .await
        .unwrap();

    assert_eq!(outcome.completion, "\"hi\");\n");
    assert!(outcome.truncated);
    assert_eq!(
        *generator.prompts.lock().unwrap(),
        ["fn main() {\n    println!("]
    );
}

#[tokio::test]
async fn core_failure_reaches_the_webview_with_its_kind() {
    let s = stack(
        MemoryIde::default(),
        ScriptedGenerator::new(&["x"]),
        CompletionSettings::default(),
    );

    let err = s
        .webview
        .request::<AutocompleteComplete>(cursor_in_main())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CollaboratorFailure);
    assert!(err.to_string().contains("is not open"), "{err}");
}

#[tokio::test]
async fn stream_complete_is_forwarded_chunk_by_chunk() {
    let settings = CompletionSettings {
        stop_tokens: vec!["</s>".into()],
        multiline: false,
    };
    let s = stack(
        MemoryIde::default(),
        ScriptedGenerator::new(&["The answer", " is 42.", "</s>ignored"]),
        settings,
    );

    let chunks: Vec<String> = s
        .webview
        .request_stream::<LlmStreamComplete>(StreamCompleteInput {
            prompt: "What is the answer?".into(),
            stop_tokens: Vec::new(),
        })
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(chunks.concat(), "The answer is 42.");
}

#[tokio::test]
async fn pass_through_answers_under_the_callers_id() {
    let s = stack(
        MemoryIde::default(),
        ScriptedGenerator::new(&[]),
        CompletionSettings::default(),
    );

    let answer = s
        .webview
        .connection()
        .request_with_id(
            MessageId::from_raw("webview-7"),
            Ping::NAME,
            json!("alive?"),
        )
        .await
        .unwrap();
    assert_eq!(answer, json!("alive?"));
}

#[tokio::test]
async fn core_updates_reach_the_webview() {
    let s = stack(
        MemoryIde::default(),
        ScriptedGenerator::new(&[]),
        CompletionSettings::default(),
    );
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    s.webview
        .on::<ConfigUpdate, _, _>(move |input| {
            sink.lock().unwrap().push(input.config);
            async { Ok(()) }
        })
        .unwrap();
    s.webview
        .on::<GetDefaultModelTitle, _, _>(|()| async { Ok(Some("local-model".to_string())) })
        .unwrap();

    s.core
        .messenger()
        .request::<ConfigUpdate>(ConfigUpdateInput {
            config: json!({"models": ["local-model"]}),
        })
        .await
        .unwrap();
    let title = s
        .core
        .messenger()
        .request::<GetDefaultModelTitle>(())
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), [json!({"models": ["local-model"]})]);
    assert_eq!(title.as_deref(), Some("local-model"));
}

#[tokio::test]
async fn core_drives_the_editor() {
    let s = stack(
        MemoryIde::with_files(&[("/w/main.rs", MAIN_RS), ("/w/lib.rs", "pub fn f() {}")]),
        ScriptedGenerator::new(&[]),
        CompletionSettings::default(),
    );

    s.core.ide().run_command("cargo fmt").await.unwrap();
    s.core
        .ide()
        .write_file("/w/new.rs", "// new")
        .await
        .unwrap();
    let dirs = s.core.ide().get_workspace_dirs().await.unwrap();
    s.core
        .ide()
        .show_error_popup("generator exited with status 1")
        .await
        .unwrap();

    assert_eq!(*s.ide.commands.lock().unwrap(), ["cargo fmt"]);
    assert_eq!(
        *s.ide.popups.lock().unwrap(),
        ["error: generator exited with status 1"]
    );
    assert_eq!(
        s.ide.files.lock().unwrap().get("/w/new.rs").map(String::as_str),
        Some("// new")
    );
    assert_eq!(dirs, ["/w"]);
}

#[tokio::test]
async fn webview_uses_the_editor_directly() {
    let s = stack(
        MemoryIde::with_files(&[("/w/main.rs", MAIN_RS), ("/w/lib.rs", "pub fn f() {}")]),
        ScriptedGenerator::new(&[]),
        CompletionSettings::default(),
    );

    let hits = s
        .webview
        .request::<GetSearchResults>(SearchInput {
            query: "fn".into(),
        })
        .await
        .unwrap();
    assert_eq!(hits, "/w/lib.rs\n/w/main.rs");

    assert!(s.webview.request::<ToggleFullScreen>(()).await.unwrap());
    assert_eq!(
        s.surfaces.full_screen_surface(),
        Some(SurfaceId::new("panel"))
    );
}

#[tokio::test]
async fn core_only_types_are_rejected_from_the_webview() {
    let s = stack(
        MemoryIde::default(),
        ScriptedGenerator::new(&[]),
        CompletionSettings::default(),
    );

    let err = s
        .webview
        .connection()
        .request(FilesChanged::NAME, json!({"uris": []}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownMessageType);

    s.router
        .request_core::<FilesChanged>(FilesChangedInput {
            uris: vec!["file:///w/main.rs".into()],
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn router_shutdown_closes_core_and_webview() {
    let s = stack(
        MemoryIde::default(),
        ScriptedGenerator::new(&[]),
        CompletionSettings::default(),
    );

    s.router.shutdown();
    tokio::time::timeout(Duration::from_secs(5), s.core.closed())
        .await
        .unwrap();
    s.webview.connection().closed().await;

    assert_eq!(
        s.router.states(),
        (ConnectionState::Closed, ConnectionState::Closed)
    );
    assert!(s.surfaces.is_empty());
    let err = s.webview.request::<Ping>("late".into()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportDisconnected);
}
