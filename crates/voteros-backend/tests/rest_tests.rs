// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST surface tests against a mock backend.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voteros_backend::SupabaseGateway;
use voteros_config::model::{BackendConfig, RealtimeConfig};
use voteros_core::{DataGateway, EntityKind, VoterosError};

fn gateway_for(server: &MockServer) -> SupabaseGateway {
    let backend = BackendConfig {
        url: Some(server.uri()),
        api_key: Some("anon-key".into()),
        ..BackendConfig::default()
    };
    let realtime = RealtimeConfig {
        enabled: false,
        ..RealtimeConfig::default()
    };
    SupabaseGateway::new(&backend, &realtime).unwrap()
}

#[tokio::test]
async fn fetch_sends_auth_ordering_and_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/communications"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .and(query_param("select", "*"))
        .and(query_param("order", "sent_at.desc"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "c2", "content": "newer" },
            { "id": "c1", "content": "older" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let rows = gateway
        .fetch_all(&EntityKind::Communications.default_query().limit(20))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], "c2");
}

#[tokio::test]
async fn templates_are_ordered_by_created_at() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/message_templates"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = gateway_for(&server)
        .fetch_all(&EntityKind::Templates.default_query())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn server_error_becomes_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .fetch_all(&EntityKind::ScheduledMessages.default_query())
        .await
        .unwrap_err();

    match err {
        VoterosError::Gateway { message, .. } => {
            assert!(message.contains("503"), "got: {message}");
            assert!(message.contains("maintenance"), "got: {message}");
        }
        other => panic!("expected Gateway error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_array_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "oops": true })))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .fetch_all(&EntityKind::Templates.default_query())
        .await
        .unwrap_err();
    assert!(matches!(err, VoterosError::Decode { table, .. } if table == "message_templates"));
}

#[tokio::test]
async fn unreachable_backend_is_a_gateway_error() {
    let backend = BackendConfig {
        url: Some("http://127.0.0.1:1".into()),
        api_key: Some("k".into()),
        request_timeout_secs: 2,
        ..BackendConfig::default()
    };
    let realtime = RealtimeConfig {
        enabled: false,
        ..RealtimeConfig::default()
    };
    let gateway = SupabaseGateway::new(&backend, &realtime).unwrap();

    let err = gateway
        .fetch_all(&EntityKind::Templates.default_query())
        .await
        .unwrap_err();
    assert!(matches!(err, VoterosError::Gateway { .. }));
}

#[tokio::test]
async fn insert_returns_stored_row() {
    let server = MockServer::start().await;
    let payload = json!({
        "content": "Rally at 3PM",
        "message_type": "sms",
        "recipient_count": 40,
        "status": "sent",
        "tags": null,
        "sent_at": "2026-10-16T09:00:00Z"
    });
    Mock::given(method("POST"))
        .and(path("/rest/v1/communications"))
        .and(header("prefer", "return=representation"))
        .and(body_json(&payload))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": "c77",
            "content": "Rally at 3PM",
            "message_type": "sms",
            "recipient_count": 40,
            "status": "sent",
            "sent_at": "2026-10-16T09:00:00Z"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let row = gateway_for(&server)
        .insert("communications", payload)
        .await
        .unwrap();
    assert_eq!(row["id"], "c77");
}

#[tokio::test]
async fn empty_insert_response_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .insert("message_templates", json!({ "title": "t" }))
        .await
        .unwrap_err();
    assert!(matches!(err, VoterosError::Decode { .. }));
}

#[tokio::test]
async fn update_targets_row_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/scheduled_messages"))
        .and(query_param("id", "eq.m1"))
        .and(body_json(json!({ "status": "cancelled" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": "m1", "status": "cancelled" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let row = gateway_for(&server)
        .update("scheduled_messages", "m1", json!({ "status": "cancelled" }))
        .await
        .unwrap();
    assert_eq!(row["status"], "cancelled");
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = gateway_for(&server)
        .update("scheduled_messages", "nope", json!({ "status": "cancelled" }))
        .await
        .unwrap_err();
    assert!(matches!(err, VoterosError::NotFound { id, .. } if id == "nope"));
}

#[tokio::test]
async fn delete_targets_row_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/message_templates"))
        .and(query_param("id", "eq.t1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    gateway_for(&server)
        .delete("message_templates", "t1")
        .await
        .unwrap();
}
