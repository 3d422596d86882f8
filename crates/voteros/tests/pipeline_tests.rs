// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: configuration file, REST gateway, reconciler and
//! messaging service wired together against a mock backend.

use std::io::Write;
use std::sync::Arc;

use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voteros_backend::SupabaseGateway;
use voteros_config::VoterosConfig;
use voteros_core::{EntityKind, HealthStatus, MessageType, PluginAdapter, VoterosError};
use voteros_sync::{AckMode, DataSource, MessagingService, Reconciler};
use voteros_test_utils::records;

fn config_for(server: &MockServer, extra: &str) -> VoterosConfig {
    let toml = format!(
        r#"
[backend]
url = "{}"
api_key = "anon-key"

[realtime]
enabled = false
{extra}
"#,
        server.uri()
    );
    voteros_config::load_and_validate_str(&toml).unwrap()
}

fn wire(config: &VoterosConfig) -> (Arc<SupabaseGateway>, Reconciler, MessagingService) {
    let gateway = Arc::new(SupabaseGateway::new(&config.backend, &config.realtime).unwrap());
    let reconciler = Reconciler::new(
        gateway.clone(),
        config.sync.clone(),
        config.backend.communications_limit,
    );
    let messaging = MessagingService::new(gateway.clone(), &config.sync);
    (gateway, reconciler, messaging)
}

#[tokio::test]
async fn start_loads_live_rows_and_falls_back_per_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/message_templates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            records::template("t2", "Newer"),
            records::template("t1", "Older"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/scheduled_messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            records::scheduled("m1", "pending"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/communications"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let config = config_for(&server, "");
    let (gateway, reconciler, _) = wire(&config);

    // No change feed without realtime; the caches still load.
    reconciler.start().await.unwrap();
    assert!(!gateway.realtime_enabled());

    let titles: Vec<_> = reconciler
        .templates()
        .get_all()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, ["Newer", "Older"]);
    assert_eq!(reconciler.source(EntityKind::ScheduledMessages), DataSource::Live);
    assert_eq!(reconciler.source(EntityKind::Communications), DataSource::Placeholder);
    assert_eq!(reconciler.count(EntityKind::Communications), 1);

    match reconciler.health_check().await.unwrap() {
        HealthStatus::Degraded(reason) => assert!(reason.contains("communications")),
        other => panic!("expected Degraded, got {other:?}"),
    }
    match gateway.health_check().await.unwrap() {
        HealthStatus::Degraded(_) => {}
        other => panic!("expected Degraded without realtime, got {other:?}"),
    }
}

#[tokio::test]
async fn send_message_posts_communication_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/communications"))
        .and(body_partial_json(json!({
            "content": "Rally at 3PM",
            "message_type": "whatsapp",
            "recipient_count": 2,
            "status": "sent"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            records::with_message_type(records::communication("c9", "Rally at 3PM"), "whatsapp"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, "");
    let (_, _, messaging) = wire(&config);

    let ack = messaging
        .send_message(
            "Rally at 3PM",
            MessageType::Whatsapp,
            &["+254700000001".to_string(), "+254700000002".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(ack.mode, AckMode::Live);
    assert_eq!(ack.value.unwrap().id, "c9");
}

#[tokio::test]
async fn rejected_write_is_masked_or_returned_per_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/message_templates"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let template = || voteros_core::NewTemplate {
        title: "Turnout".into(),
        content: "Vote tomorrow".into(),
        message_type: MessageType::Sms,
        language: "en".into(),
        tags: None,
    };

    let masked = config_for(&server, "");
    let (_, _, messaging) = wire(&masked);
    let ack = messaging.create_template(template()).await.unwrap();
    assert!(ack.is_demo());
    assert!(ack.value.id.starts_with("demo-"));

    let strict = config_for(&server, "[sync]\nmask_backend_failures = false");
    let (_, _, messaging) = wire(&strict);
    let err = messaging.create_template(template()).await.unwrap_err();
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn accepted_write_with_unreadable_row_is_not_demo() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/communications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": "c9" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/message_templates"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": "t9" }])))
        .mount(&server)
        .await;

    let config = config_for(&server, "");
    let (_, _, messaging) = wire(&config);

    let ack = messaging
        .send_message("Rally at 3PM", MessageType::Sms, &["+254700000001".to_string()])
        .await
        .unwrap();
    assert_eq!(ack.mode, AckMode::Live);
    assert!(ack.value.is_none());

    let err = messaging
        .create_template(voteros_core::NewTemplate {
            title: "Turnout".into(),
            content: "Vote tomorrow".into(),
            message_type: MessageType::Sms,
            language: "en".into(),
            tags: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, VoterosError::Decode { .. }));
}

#[tokio::test]
#[serial]
async fn config_file_drives_the_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/communications"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            records::communication("c1", "Hello"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[backend]
url = "{}"
api_key = "anon-key"
communications_limit = 5

[realtime]
enabled = false
"#,
        server.uri()
    )
    .unwrap();

    let config = voteros_config::load_and_validate_path(file.path()).unwrap();
    let (_, reconciler, _) = wire(&config);
    reconciler.initialize(EntityKind::Communications).await.unwrap();
    assert_eq!(reconciler.communications().get_all()[0].content, "Hello");
}
