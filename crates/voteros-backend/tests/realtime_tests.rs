// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime client tests against an in-process websocket server.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use voteros_backend::SupabaseGateway;
use voteros_config::model::{BackendConfig, RealtimeConfig};
use voteros_core::{ChangeEventKind, DataGateway};

const WAIT: Duration = Duration::from_secs(5);

/// Accepts one socket. Every text frame the client sends is forwarded to
/// `seen`; every frame pushed into the returned sender goes to the client.
async fn spawn_server() -> (String, mpsc::UnboundedReceiver<Value>, mpsc::UnboundedSender<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    let (push_tx, mut push_rx) = mpsc::unbounded_channel::<Value>();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let socket = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let (mut sink, mut stream) = socket.split();
        loop {
            tokio::select! {
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let frame: Value = serde_json::from_str(text.as_str()).unwrap();
                        if seen_tx.send(frame).is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                },
                Some(frame) = push_rx.recv() => {
                    sink.send(Message::Text(frame.to_string().into())).await.unwrap();
                }
            }
        }
    });

    (format!("http://{addr}"), seen_rx, push_tx)
}

fn gateway(url: String) -> SupabaseGateway {
    let backend = BackendConfig {
        url: Some(url),
        api_key: Some("anon-key".into()),
        ..BackendConfig::default()
    };
    let realtime = RealtimeConfig {
        heartbeat_secs: 3600,
        ..RealtimeConfig::default()
    };
    SupabaseGateway::new(&backend, &realtime).unwrap()
}

async fn next_frame(seen: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    timeout(WAIT, seen.recv())
        .await
        .expect("server should see a frame")
        .expect("server still running")
}

#[tokio::test]
async fn subscription_joins_receives_and_leaves() {
    let (url, mut seen, push) = spawn_server().await;
    let gateway = gateway(url);

    let mut sub = gateway
        .subscribe("communications", ChangeEventKind::Insert)
        .await
        .unwrap();

    let join = next_frame(&mut seen).await;
    assert_eq!(join["event"], "phx_join");
    assert_eq!(join["topic"], sub.id().0.as_str());
    let filter = &join["payload"]["config"]["postgres_changes"][0];
    assert_eq!(filter["table"], "communications");
    assert_eq!(filter["event"], "INSERT");

    push.send(json!({
        "topic": join["topic"],
        "event": "phx_reply",
        "payload": { "status": "ok", "response": {} },
        "ref": join["ref"]
    }))
    .unwrap();
    push.send(json!({
        "topic": join["topic"],
        "event": "postgres_changes",
        "payload": { "data": {
            "type": "INSERT",
            "table": "communications",
            "record": { "id": "c9", "content": "hello" }
        }},
        "ref": null
    }))
    .unwrap();

    let event = timeout(WAIT, sub.recv()).await.unwrap().unwrap();
    assert_eq!(event.kind, ChangeEventKind::Insert);
    assert_eq!(event.record["id"], "c9");

    let topic = sub.id().0.clone();
    drop(sub);

    let leave = next_frame(&mut seen).await;
    assert_eq!(leave["event"], "phx_leave");
    assert_eq!(leave["topic"], topic.as_str());
}

#[tokio::test]
async fn events_are_routed_by_topic_and_kind() {
    let (url, mut seen, push) = spawn_server().await;
    let gateway = gateway(url);

    let mut inserts = gateway
        .subscribe("scheduled_messages", ChangeEventKind::Insert)
        .await
        .unwrap();
    let mut updates = gateway
        .subscribe("scheduled_messages", ChangeEventKind::Update)
        .await
        .unwrap();
    assert_ne!(inserts.id(), updates.id());

    let first = next_frame(&mut seen).await;
    let second = next_frame(&mut seen).await;
    assert_eq!(first["topic"], inserts.id().0.as_str());
    assert_eq!(second["topic"], updates.id().0.as_str());

    // An UPDATE pushed on the insert topic is not delivered there.
    push.send(json!({
        "topic": first["topic"],
        "event": "postgres_changes",
        "payload": { "data": { "type": "UPDATE", "table": "scheduled_messages", "record": { "id": "x" } } }
    }))
    .unwrap();
    push.send(json!({
        "topic": second["topic"],
        "event": "postgres_changes",
        "payload": { "data": { "type": "UPDATE", "table": "scheduled_messages", "record": { "id": "m1", "status": "sent" } } }
    }))
    .unwrap();
    push.send(json!({
        "topic": first["topic"],
        "event": "postgres_changes",
        "payload": { "data": { "type": "INSERT", "table": "scheduled_messages", "record": { "id": "m2" } } }
    }))
    .unwrap();

    let update = timeout(WAIT, updates.recv()).await.unwrap().unwrap();
    assert_eq!(update.record["id"], "m1");
    let insert = timeout(WAIT, inserts.recv()).await.unwrap().unwrap();
    assert_eq!(insert.record["id"], "m2");
}

#[tokio::test]
async fn shutdown_ends_open_subscriptions() {
    let (url, mut seen, _push) = spawn_server().await;
    let gateway = gateway(url);

    let mut sub = gateway
        .subscribe("message_templates", ChangeEventKind::Insert)
        .await
        .unwrap();
    let _join = next_frame(&mut seen).await;

    voteros_core::PluginAdapter::shutdown(&gateway).await.unwrap();

    let ended = timeout(WAIT, sub.recv()).await.unwrap();
    assert!(ended.is_none());
}

#[tokio::test]
async fn connect_failure_is_a_realtime_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = gateway(format!("http://{addr}"))
        .subscribe("communications", ChangeEventKind::Insert)
        .await
        .unwrap_err();
    assert!(matches!(err, voteros_core::VoterosError::Realtime { .. }));
}
