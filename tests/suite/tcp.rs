//! Development mode: the core listens on TCP and the host connects.

use std::time::Duration;

use tether_bus::codec::DEFAULT_MAX_FRAME_BYTES;
use tether_bus::transport::tcp::{self, DEFAULT_CONNECT_TIMEOUT, TcpTransportListener};
use tether_bus::{Connection, Messenger};
use tether_core::{CompletionSettings, Core};
use tether_types::ErrorKind;
use tether_types::protocol::{
    AutocompleteComplete, AutocompleteInput, FromCore, Ping, ReadFile, ToCore,
};
use tokio::sync::oneshot;

use crate::common::ScriptedGenerator;

#[tokio::test]
async fn host_connects_to_a_listening_core() {
    let listener = TcpTransportListener::bind("127.0.0.1:0", DEFAULT_MAX_FRAME_BYTES)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let attached = listener.await_connection().await.unwrap();
        let core = Core::new(
            Connection::new("core", attached),
            ScriptedGenerator::new(&["world\"", ")\n", "more"]),
            CompletionSettings::default(),
        )
        .unwrap();
        core.start().unwrap();
        core.closed().await;
    });

    let attached = tcp::connect(addr, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_FRAME_BYTES)
        .await
        .unwrap();
    let host: Messenger<FromCore, ToCore> = Messenger::new(Connection::new("host", attached));
    host.on::<ReadFile, _, _>(|_| async { Ok("print(\"hello ".to_string()) })
        .unwrap();
    host.connection().start().unwrap();

    assert_eq!(host.request::<Ping>("tcp".into()).await.unwrap(), "tcp");
    let outcome = host
        .request::<AutocompleteComplete>(AutocompleteInput {
            filepath: "/w/hello.py".into(),
            line: 0,
            character: 13,
            stop_tokens: Vec::new(),
            multiline: None,
        })
        .await
        .unwrap();
    assert_eq!(outcome.completion, "world\")\n");

    host.connection().close();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn core_disconnect_fails_waiters_at_once() {
    let listener = TcpTransportListener::bind("127.0.0.1:0", DEFAULT_MAX_FRAME_BYTES)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let (received_tx, received_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let attached = listener.await_connection().await.unwrap();
        let core = Connection::new("core", attached);
        let received_tx = std::sync::Mutex::new(Some(received_tx));
        core.on_request("ping", move |_id, _data| {
            if let Some(tx) = received_tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
            std::future::pending()
        })
        .unwrap();
        core.start().unwrap();
        core
    });

    let attached = tcp::connect(addr, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_FRAME_BYTES)
        .await
        .unwrap();
    let host = Connection::new("host", attached);
    host.start().unwrap();

    let pending = tokio::spawn({
        let host = host.clone();
        async move { host.request("ping", serde_json::json!("hang")).await }
    });
    received_rx.await.unwrap();
    let core = server.await.unwrap();
    core.close();

    let err = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportDisconnected);
}

#[tokio::test]
async fn connect_to_nothing_fails() {
    let listener = TcpTransportListener::bind("127.0.0.1:0", DEFAULT_MAX_FRAME_BYTES)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert!(
        tcp::connect(addr, Duration::from_secs(1), DEFAULT_MAX_FRAME_BYTES)
            .await
            .is_err()
    );
}
