use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use studio_core::{CtaSource, CtaSuggestion};
use studio_engine::{
    fetch_enriched_calls, keys, ApiSettings, BackendApi, ChatSession, FailureKind,
    ProgressStore, ReqwestBackend, PING_MESSAGE,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> ReqwestBackend {
    studio_logging::initialize_for_tests();
    ReqwestBackend::new(ApiSettings {
        base_url: format!("{}/api", server.uri()),
        connect_timeout: Duration::from_secs(2),
        request_timeout: Some(Duration::from_secs(2)),
    })
    .expect("client")
}

fn call(id: &str) -> serde_json::Value {
    json!({ "id": id, "title": format!("Call {id}"), "duration": 300 })
}

#[tokio::test]
async fn enrichment_survives_a_failed_detail_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/fetch-calls"))
        .and(body_json(json!({ "daysBack": 7, "limit": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "calls": [call("a"), call("b"), call("c")],
            "total_found": 17
        })))
        .mount(&server)
        .await;
    for id in ["a", "c"] {
        Mock::given(method("GET"))
            .and(path(format!("/api/calls/{id}/conversation-details")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { "call": id, "topics": ["pricing"] } })),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/calls/b/conversation-details"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = backend(&server);
    let fetched = fetch_enriched_calls(&api, 7, 3).await.expect("primary ok");

    assert_eq!(fetched.returned, 3);
    assert_eq!(fetched.enriched, 2);
    assert_eq!(fetched.total_found, 17);
    let ids: Vec<_> = fetched.calls.iter().map(|c| c.item.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(fetched.calls[0].is_enriched());
    assert!(!fetched.calls[1].is_enriched());
    assert_eq!(
        fetched.calls[2].detail.as_ref().map(|d| d.0["call"].clone()),
        Some(json!("c"))
    );
}

#[tokio::test]
async fn primary_failure_fails_the_whole_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/fetch-calls"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = fetch_enriched_calls(&backend(&server), 7, 3).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(503));
    assert!(err.user_message().contains("HTTP 503"));
}

#[tokio::test]
async fn server_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/convert-to-markdown"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "Research data is too short" })),
        )
        .mount(&server)
        .await;

    let err = backend(&server)
        .convert_to_markdown("AE", "tiny")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(422));
    assert_eq!(err.user_message(), "Research data is too short");
}

#[tokio::test]
async fn generated_ctas_are_validated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cta-generation/generate-from-url"))
        .and(body_json(json!({ "url": "https://example.com/post" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ctas": [
                { "id": "c1", "headline": "See it", "button_text": "Book" },
                { "id": "c2", "headline": "", "button_text": "Go" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/cta-generation/generate-from-text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ctas": [{ "id": "t1", "headline": "Learn more", "button_text": "Read" }]
        })))
        .mount(&server)
        .await;

    let api = backend(&server);
    let err = api
        .generate_ctas(&CtaSource::Url("https://example.com/post".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidResponse);

    let ctas = api
        .generate_ctas(&CtaSource::Text("A long article body".to_string()))
        .await
        .unwrap();
    assert_eq!(
        ctas,
        vec![CtaSuggestion {
            id: "t1".to_string(),
            headline: "Learn more".to_string(),
            button_text: "Read".to_string(),
            target_url: None,
            placement_hint: None,
        }]
    );
}

#[tokio::test]
async fn empty_placement_content_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cta-generation/apply-placements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": "  " })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .apply_placements(&CtaSource::Markdown("# Post".to_string()), &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidResponse);
}

#[tokio::test]
async fn stale_conversation_is_replaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/gong-chat/message"))
        .and(body_json(json!({ "conversation_id": "old", "message": PING_MESSAGE })))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "not found" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/gong-chat/start-conversation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "conversation_id": "new" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/gong-chat/message"))
        .and(body_json(json!({ "conversation_id": "new", "message": "Top objections?" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "Pricing.", "message_id": "m1" })),
        )
        .mount(&server)
        .await;

    let store = Arc::new(ProgressStore::in_memory());
    store.save(keys::CHAT_CONVERSATION, &"old".to_string());
    let api: Arc<dyn BackendApi> = Arc::new(backend(&server));
    let mut chat = ChatSession::new(api, Arc::clone(&store));

    assert_eq!(chat.resume_or_start().await.unwrap(), "new");
    assert_eq!(
        store.load::<String>(keys::CHAT_CONVERSATION).as_deref(),
        Some("new")
    );

    let reply = chat.send("  Top objections?  ").await.unwrap();
    assert_eq!(reply.content, "Pricing.");
    assert_eq!(chat.transcript().len(), 2);

    let err = chat.send("   ").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidRequest);

    chat.forget();
    assert_eq!(store.load::<String>(keys::CHAT_CONVERSATION), None);
}

#[tokio::test]
async fn live_conversation_is_resumed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/gong-chat/message"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "pong" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/gong-chat/start-conversation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "conversation_id": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(ProgressStore::in_memory());
    store.save(keys::CHAT_CONVERSATION, &"alive".to_string());
    let mut chat = ChatSession::new(Arc::new(backend(&server)), store);

    assert_eq!(chat.resume_or_start().await.unwrap(), "alive");
    assert_eq!(chat.conversation_id(), Some("alive"));
}
