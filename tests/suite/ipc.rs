//! Content-Length framed transport over byte-stream pairs, the way the core
//! talks to its parent over stdin/stdout.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use insta::assert_snapshot;
use serde_json::json;
use tether_bus::codec::{DEFAULT_MAX_FRAME_BYTES, FrameReader, FrameWriter};
use tether_bus::transport::{Attached, ipc};
use tether_bus::{Connection, Messenger};
use tether_core::{CompletionSettings, Core};
use tether_types::protocol::{
    AutocompleteComplete, AutocompleteInput, FromCore, LlmStreamComplete, MessageType, Ping,
    ReadFile, StreamCompleteInput, ToCore,
};
use tether_types::{ErrorKind, MessageId, WireMessage};
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::process::Command;

use crate::common::ScriptedGenerator;

type RawPeer = (ReadHalf<DuplexStream>, WriteHalf<DuplexStream>);

/// A framed connection and the raw byte streams of its peer.
fn framed_with_raw_peer(max_frame_bytes: usize) -> (Connection, RawPeer) {
    let (ours, theirs) = tokio::io::duplex(1024);
    let (reader, writer) = tokio::io::split(ours);
    let connection = Connection::new("host", ipc::from_streams(reader, writer, max_frame_bytes));
    connection.start().unwrap();
    (connection, tokio::io::split(theirs))
}

fn framed_pair() -> (Connection, Connection) {
    let (left, right) = tokio::io::duplex(4096);
    let (lr, lw) = tokio::io::split(left);
    let (rr, rw) = tokio::io::split(right);
    (
        Connection::new("host", ipc::from_streams(lr, lw, DEFAULT_MAX_FRAME_BYTES)),
        Connection::new("core", ipc::from_streams(rr, rw, DEFAULT_MAX_FRAME_BYTES)),
    )
}

#[tokio::test]
async fn core_serves_a_host_over_framed_streams() {
    let (host, core) = framed_pair();
    let core = Core::new(
        core,
        ScriptedGenerator::new(&["1 + 1", "\nnext line"]),
        CompletionSettings::default(),
    )
    .unwrap();
    core.start().unwrap();

    let host: Messenger<FromCore, ToCore> = Messenger::new(host);
    host.on::<ReadFile, _, _>(|_| async { Ok("let two = ".to_string()) })
        .unwrap();
    host.connection().start().unwrap();

    assert_eq!(host.request::<Ping>("ipc".into()).await.unwrap(), "ipc");
    let outcome = host
        .request::<AutocompleteComplete>(AutocompleteInput {
            filepath: "/w/two.rs".into(),
            line: 0,
            character: 10,
            stop_tokens: Vec::new(),
            multiline: None,
        })
        .await
        .unwrap();
    assert_eq!(outcome.completion, "1 + 1\n");

    let chunks: Vec<String> = host
        .request_stream::<LlmStreamComplete>(StreamCompleteInput {
            prompt: "p".into(),
            stop_tokens: Vec::new(),
        })
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(chunks, ["1 + 1", "\nnext line"]);
}

#[tokio::test]
async fn slow_writer_frames_are_reassembled() {
    let (host, (peer_read, mut peer_write)) = framed_with_raw_peer(DEFAULT_MAX_FRAME_BYTES);

    let pending = tokio::spawn({
        let host = host.clone();
        async move { host.request(Ping::NAME, json!("slow")).await }
    });

    let mut reader = FrameReader::new(peer_read);
    let request: WireMessage = reader.read_frame().await.unwrap().unwrap();
    let reply = WireMessage::reply_success(request.message_id, Ping::NAME, json!("slow"));

    let mut bytes = Vec::new();
    FrameWriter::new(&mut bytes).write_frame(&reply).await.unwrap();
    for piece in bytes.chunks(3) {
        peer_write.write_all(piece).await.unwrap();
        peer_write.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert_eq!(pending.await.unwrap().unwrap(), json!("slow"));
}

#[tokio::test]
async fn malformed_frame_fails_pending_requests() {
    let (host, (peer_read, mut peer_write)) = framed_with_raw_peer(DEFAULT_MAX_FRAME_BYTES);

    let first = tokio::spawn({
        let host = host.clone();
        async move { host.request(Ping::NAME, json!(1)).await }
    });
    let second = tokio::spawn({
        let host = host.clone();
        async move { host.request(Ping::NAME, json!(2)).await }
    });

    let mut reader = FrameReader::new(peer_read);
    for _ in 0..2 {
        let _: WireMessage = reader.read_frame().await.unwrap().unwrap();
    }
    peer_write
        .write_all(b"Content-Length: twelve\r\n\r\n")
        .await
        .unwrap();

    for pending in [first, second] {
        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FramingError);
    }
    host.closed().await;
    let err = host.request(Ping::NAME, json!(3)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FramingError);
}

#[tokio::test]
async fn oversized_frame_closes_the_connection() {
    let (host, (_peer_read, mut peer_write)) = framed_with_raw_peer(64);

    peer_write
        .write_all(b"Content-Length: 4096\r\n\r\n")
        .await
        .unwrap();

    host.closed().await;
    let err = host.request(Ping::NAME, json!(null)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FramingError);
}

#[tokio::test]
async fn peer_exit_disconnects() {
    let (host, peer) = framed_with_raw_peer(DEFAULT_MAX_FRAME_BYTES);
    let pending = tokio::spawn({
        let host = host.clone();
        async move { host.request(Ping::NAME, json!("anyone?")).await }
    });
    // Let the request reach the wire before the peer goes away.
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(peer);

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportDisconnected);
}

/// Starts the built core binary against a scratch home directory.
fn spawn_core(home: &Path) -> Attached {
    let mut command = Command::new(env!("CARGO_BIN_EXE_tether-core"));
    command
        .env("HOME", home)
        .env_remove("TETHER_DEVELOPMENT")
        .env_remove("TETHER_TCP_ADDR")
        .env_remove("RUST_LOG");
    ipc::spawn_command(command, DEFAULT_MAX_FRAME_BYTES).unwrap()
}

#[tokio::test]
async fn spawned_core_binary_answers_ping() {
    let home = tempfile::tempdir().unwrap();
    let host: Messenger<FromCore, ToCore> =
        Messenger::new(Connection::new("host", spawn_core(home.path())));
    host.connection().start().unwrap();

    let answer = tokio::time::timeout(Duration::from_secs(10), host.request::<Ping>("x".into()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(answer, "x");
    assert!(home.path().join(".tether/logs/core.log").is_file());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn closing_the_connection_ends_the_child() {
    let home = tempfile::tempdir().unwrap();
    let attached = spawn_core(home.path());
    let pid = attached.transport.child_pid().unwrap();
    let host = Connection::new("host", attached);
    host.start().unwrap();
    let answer = tokio::time::timeout(
        Duration::from_secs(10),
        host.request(Ping::NAME, json!("up")),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(answer, json!("up"));

    host.close();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while process_running(pid) {
        assert!(tokio::time::Instant::now() < deadline, "child {pid} still running");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Present in /proc and not a zombie.
#[cfg(target_os = "linux")]
fn process_running(pid: u32) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat")).is_ok_and(|stat| {
        stat.rsplit_once(") ")
            .is_some_and(|(_, rest)| !rest.starts_with(['Z', 'X']))
    })
}

#[tokio::test]
async fn framed_record_layout() {
    let reply = WireMessage::reply_success(MessageId::from_raw("req-1"), Ping::NAME, json!("pong"));
    let mut bytes = Vec::new();
    FrameWriter::new(&mut bytes).write_frame(&reply).await.unwrap();
    let record = String::from_utf8(bytes).unwrap();
    assert_snapshot!(
        format!("{record:?}"),
        @r#""Content-Length: 88\r\n\r\n{\"messageId\":\"req-1\",\"messageType\":\"ping\",\"data\":\"pong\",\"metadata\":{\"status\":\"success\"}}""#
    );
}
