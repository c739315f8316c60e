//! End-to-end gateway scenarios over the real router, SQLite stores, and
//! mock providers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use tmai_api::rest::build_router;
use tmai_api::session::StaticSessionVerifier;
use tmai_api::state::{default_platform_prompt, AppState, RuntimeSettings};
use tmai_core::{ApiKeyId, KeyLimits, TenantId, UsageCounterStore, WindowKind};
use tmai_embedding::MockEmbeddingProvider;
use tmai_llm::{ChatModel, GenerationRequest, GenerationResponse, LlmResult, MockChatModel, TokenUsage};
use tmai_metadata::{
    create_sqlite_pool, run_migrations, SqliteApiKeyRepository, SqliteDocumentRepository,
    SqliteServiceCatalog, SqliteUsageCounterStore,
};

const OWNER_TOKEN: &str = "owner-token";
const OTHER_TOKEN: &str = "other-token";

/// Generator double that records every prompt it is asked to complete.
#[derive(Default)]
struct CapturingChatModel {
    prompts: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl ChatModel for CapturingChatModel {
    async fn generate(&self, request: GenerationRequest) -> LlmResult<GenerationResponse> {
        self.prompts.lock().push(request.prompt);
        Ok(GenerationResponse {
            model: request.model,
            text: "captured".to_string(),
            usage: TokenUsage::default(),
        })
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    owner_tenant: TenantId,
}

fn temp_db_url() -> String {
    let path: PathBuf =
        std::env::temp_dir().join(format!("tmai-api-test-{}.db", Uuid::now_v7()));
    format!("sqlite://{}", path.display())
}

async fn setup_app(limits: KeyLimits, generator: Arc<dyn ChatModel>) -> TestApp {
    let pool = create_sqlite_pool(&temp_db_url())
        .await
        .expect("failed to create pool");
    run_migrations(&pool).await.expect("failed migrations");

    let owner_tenant = TenantId::new();
    let other_tenant = TenantId::new();
    let sessions = StaticSessionVerifier::new(HashMap::from([
        (OWNER_TOKEN.to_string(), owner_tenant),
        (OTHER_TOKEN.to_string(), other_tenant),
    ]));

    let state = AppState {
        services: Arc::new(SqliteServiceCatalog::new(pool.clone())),
        api_keys: Arc::new(SqliteApiKeyRepository::new(pool.clone())),
        counters: Arc::new(SqliteUsageCounterStore::new(pool.clone())),
        documents: Arc::new(SqliteDocumentRepository::new(pool)),
        embedder: Arc::new(MockEmbeddingProvider::with_dimension(16)),
        generator,
        sessions: Arc::new(sessions),
        settings: Arc::new(RuntimeSettings {
            default_limits: limits,
            max_chunk_chars: 50,
            top_k: 5,
            candidate_pool: 50,
            embedding_model: "mock-embed-16".to_string(),
            embedding_dimension: 16,
            generation_model: "mock-chat".to_string(),
            platform_prompt: default_platform_prompt(),
        }),
    };

    TestApp {
        router: build_router(state.clone()),
        state,
        owner_tenant,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body read failed");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is not JSON")
    };
    (status, body)
}

fn post_json(uri: &str, session: Option<&str>, api_key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = session {
        builder = builder.header("x-session-token", token);
    }
    if let Some(secret) = api_key {
        builder = builder.header("x-api-key", secret);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("serialize")))
        .expect("build request")
}

async fn create_service(app: &TestApp, session: &str, name: &str) -> Uuid {
    let (status, body) = send(
        &app.router,
        post_json("/services", Some(session), None, json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create service failed: {body}");
    Uuid::parse_str(body["id"].as_str().expect("service id")).expect("uuid")
}

async fn issue_key(app: &TestApp, service_id: Uuid) -> (String, Uuid) {
    let (status, body) = send(
        &app.router,
        post_json(
            "/keys",
            Some(OWNER_TOKEN),
            None,
            json!({ "serviceId": service_id, "name": "integration key" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "issue key failed: {body}");
    let secret = body["secret"].as_str().expect("secret").to_string();
    let id = Uuid::parse_str(body["id"].as_str().expect("key id")).expect("uuid");
    (secret, id)
}

fn chat_body(service_id: Option<Uuid>, message: &str) -> Value {
    match service_id {
        Some(id) => json!({ "serviceId": id, "messages": [{ "role": "user", "content": message }] }),
        None => json!({ "messages": [{ "role": "user", "content": message }] }),
    }
}

#[tokio::test]
async fn issued_key_answers_chat() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::fixed("grounded answer"))).await;
    let service = create_service(&app, OWNER_TOKEN, "Support Bot").await;
    let (secret, _) = issue_key(&app, service).await;

    let (status, body) = send(
        &app.router,
        post_json("/chat", None, Some(&secret), chat_body(None, "hello")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "grounded answer");
}

#[tokio::test]
async fn issue_response_carries_the_secret_exactly_once() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::new())).await;
    let service = create_service(&app, OWNER_TOKEN, "Once Bot").await;
    let (secret, _) = issue_key(&app, service).await;
    assert!(secret.starts_with("tmai_"));
    assert_eq!(secret.len(), 48);

    // Listing afterwards exposes only display fields.
    let (status, body) = send(
        &app.router,
        Request::builder()
            .method("GET")
            .uri(format!("/keys?serviceId={service}"))
            .header("x-session-token", OWNER_TOKEN)
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["keys"].as_array().expect("keys");
    assert_eq!(listed.len(), 1);
    assert!(listed[0].get("secret").is_none());
    assert!(!body.to_string().contains(&secret));
    assert!(secret.starts_with(listed[0]["prefix"].as_str().expect("prefix")));
}

#[tokio::test]
async fn minute_limit_of_two_yields_200_200_429() {
    let app = setup_app(
        KeyLimits {
            per_minute: Some(2),
            per_month: None,
        },
        Arc::new(MockChatModel::fixed("ok")),
    )
    .await;
    let service = create_service(&app, OWNER_TOKEN, "Limited Bot").await;
    let (secret, _) = issue_key(&app, service).await;

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let (status, _) = send(
            &app.router,
            post_json("/chat", None, Some(&secret), chat_body(None, "hi")),
        )
        .await;
        statuses.push(status);
    }
    assert_eq!(
        statuses,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );
}

#[tokio::test]
async fn minute_rejection_spares_the_month_window() {
    let app = setup_app(
        KeyLimits {
            per_minute: Some(1),
            per_month: Some(100),
        },
        Arc::new(MockChatModel::fixed("ok")),
    )
    .await;
    let service = create_service(&app, OWNER_TOKEN, "Windowed Bot").await;
    let (secret, key_id) = issue_key(&app, service).await;

    for _ in 0..2 {
        send(
            &app.router,
            post_json("/chat", None, Some(&secret), chat_body(None, "hi")),
        )
        .await;
    }

    let key_id = ApiKeyId::from_uuid(key_id);
    let month_count = app
        .state
        .counters
        .window_count(
            key_id,
            WindowKind::Month,
            WindowKind::Month.window_start(Utc::now()),
        )
        .await
        .expect("month count");
    assert_eq!(month_count, 1, "the rejected request never touched the month window");
}

#[tokio::test]
async fn revoked_key_chat_is_401_and_revoke_stays_idempotent() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::fixed("ok"))).await;
    let service = create_service(&app, OWNER_TOKEN, "Revoked Bot").await;
    let (secret, key_id) = issue_key(&app, service).await;

    let (status, _) = send(
        &app.router,
        post_json(&format!("/keys/{key_id}/revoke"), Some(OWNER_TOKEN), None, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Second revoke returns success, not an error.
    let (status, _) = send(
        &app.router,
        post_json(&format!("/keys/{key_id}/revoke"), Some(OWNER_TOKEN), None, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app.router,
        post_json("/chat", None, Some(&secret), chat_body(None, "hi")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn key_scoped_to_x_requesting_y_is_403() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::fixed("ok"))).await;
    let service_x = create_service(&app, OWNER_TOKEN, "Service X").await;
    let service_y = create_service(&app, OWNER_TOKEN, "Service Y").await;
    let (secret, _) = issue_key(&app, service_x).await;

    let (status, _) = send(
        &app.router,
        post_json("/chat", None, Some(&secret), chat_body(Some(service_y), "hi")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ingest_120_chars_with_chunk_size_50_yields_three_chunks() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::new())).await;
    let service = create_service(&app, OWNER_TOKEN, "Ingest Bot").await;

    let (status, body) = send(
        &app.router,
        post_json(
            "/ingest",
            Some(OWNER_TOKEN),
            None,
            json!({ "serviceId": service, "text": "a".repeat(120), "title": "Handbook" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "ingest failed: {body}");
    assert_eq!(body["totalChunks"], 3);
    assert_eq!(body["chunksInserted"], 3);
}

#[tokio::test]
async fn ingesting_empty_text_is_400() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::new())).await;
    let service = create_service(&app, OWNER_TOKEN, "Empty Bot").await;

    let (status, _) = send(
        &app.router,
        post_json(
            "/ingest",
            Some(OWNER_TOKEN),
            None,
            json!({ "serviceId": service, "text": "   " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_without_credentials_is_401() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::new())).await;
    let service = create_service(&app, OWNER_TOKEN, "Anon Bot").await;

    let (status, _) = send(
        &app.router,
        post_json("/chat", None, None, chat_body(Some(service), "hi")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_chat_requires_an_explicit_service_id() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::new())).await;
    create_service(&app, OWNER_TOKEN, "Session Bot").await;

    let (status, _) = send(
        &app.router,
        post_json("/chat", Some(OWNER_TOKEN), None, chat_body(None, "hi")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_chat_enforces_service_ownership() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::fixed("ok"))).await;
    let service = create_service(&app, OWNER_TOKEN, "Owned Bot").await;

    // The owner's session works.
    let (status, _) = send(
        &app.router,
        post_json("/chat", Some(OWNER_TOKEN), None, chat_body(Some(service), "hi")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Another tenant's session is forbidden.
    let (status, _) = send(
        &app.router,
        post_json("/chat", Some(OTHER_TOKEN), None, chat_body(Some(service), "hi")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn session_path_is_not_quota_limited() {
    let app = setup_app(
        KeyLimits {
            per_minute: Some(1),
            per_month: Some(1),
        },
        Arc::new(MockChatModel::fixed("ok")),
    )
    .await;
    let service = create_service(&app, OWNER_TOKEN, "Dashboard Bot").await;

    for _ in 0..4 {
        let (status, _) = send(
            &app.router,
            post_json("/chat", Some(OWNER_TOKEN), None, chat_body(Some(service), "hi")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn failed_generation_still_consumes_quota() {
    let app = setup_app(
        KeyLimits {
            per_minute: Some(10),
            per_month: None,
        },
        Arc::new(MockChatModel::failing("provider down")),
    )
    .await;
    let service = create_service(&app, OWNER_TOKEN, "Flaky Bot").await;
    let (secret, key_id) = issue_key(&app, service).await;

    let (status, _) = send(
        &app.router,
        post_json("/chat", None, Some(&secret), chat_body(None, "hi")),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // Accepted-requests metering: the failed generation counted.
    let minute_count = app
        .state
        .counters
        .window_count(
            ApiKeyId::from_uuid(key_id),
            WindowKind::Minute,
            WindowKind::Minute.window_start(Utc::now()),
        )
        .await
        .expect("minute count");
    assert_eq!(minute_count, 1);
}

#[tokio::test]
async fn delete_requires_revocation_first_and_returns_204_after() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::new())).await;
    let service = create_service(&app, OWNER_TOKEN, "Delete Bot").await;
    let (_, key_id) = issue_key(&app, service).await;

    let delete_request = || {
        Request::builder()
            .method("DELETE")
            .uri(format!("/keys/{key_id}"))
            .header("x-session-token", OWNER_TOKEN)
            .body(Body::empty())
            .expect("request")
    };

    let (status, _) = send(&app.router, delete_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app.router,
        post_json(&format!("/keys/{key_id}/revoke"), Some(OWNER_TOKEN), None, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, delete_request()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn key_name_over_80_chars_is_400() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::new())).await;
    let service = create_service(&app, OWNER_TOKEN, "Naming Bot").await;

    let (status, _) = send(
        &app.router,
        post_json(
            "/keys",
            Some(OWNER_TOKEN),
            None,
            json!({ "serviceId": service, "name": "n".repeat(81) }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_service_slug_is_409() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::new())).await;
    create_service(&app, OWNER_TOKEN, "Slug Bot").await;

    let (status, _) = send(
        &app.router,
        post_json("/services", Some(OWNER_TOKEN), None, json!({ "name": "Slug Bot" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn issuing_a_key_for_another_tenants_service_is_403() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::new())).await;
    let service = create_service(&app, OWNER_TOKEN, "Guarded Bot").await;

    let (status, _) = send(
        &app.router,
        post_json(
            "/keys",
            Some(OTHER_TOKEN),
            None,
            json!({ "serviceId": service, "name": "stolen key" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn retrieval_grounds_the_prompt_with_only_the_scoped_services_chunks() {
    let generator = Arc::new(CapturingChatModel::default());
    let app = setup_app(KeyLimits::standard(), generator.clone()).await;
    let service_a = create_service(&app, OWNER_TOKEN, "Grounded A").await;
    let service_b = create_service(&app, OWNER_TOKEN, "Grounded B").await;

    for (service, text) in [
        (service_a, "alpha knowledge only"),
        (service_b, "beta knowledge only"),
    ] {
        let (status, _) = send(
            &app.router,
            post_json(
                "/ingest",
                Some(OWNER_TOKEN),
                None,
                json!({ "serviceId": service, "text": text }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (secret, _) = issue_key(&app, service_a).await;
    let (status, _) = send(
        &app.router,
        post_json("/chat", None, Some(&secret), chat_body(None, "what do you know?")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let prompts = generator.prompts.lock();
    let prompt = prompts.last().expect("a prompt was generated");
    assert!(prompt.contains("Source 1:"), "retrieved context is labeled");
    assert!(prompt.contains("alpha knowledge only"));
    assert!(
        !prompt.contains("beta knowledge only"),
        "another service's chunks never leak into the prompt"
    );
    assert!(prompt.ends_with("User message:\nwhat do you know?"));
}

#[tokio::test]
async fn legacy_chat_body_still_works() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::fixed("legacy ok"))).await;
    let service = create_service(&app, OWNER_TOKEN, "Legacy Bot").await;
    let (secret, _) = issue_key(&app, service).await;

    let (status, body) = send(
        &app.router,
        post_json(
            "/chat",
            None,
            Some(&secret),
            json!({
                "message": "hello from the old client",
                "serviceId": service,
                "history": [{ "role": "assistant", "content": "earlier" }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "legacy chat failed: {body}");
    assert_eq!(body["response"], "legacy ok");
}

#[tokio::test]
async fn tenant_scope_is_recorded_on_the_service() {
    let app = setup_app(KeyLimits::standard(), Arc::new(MockChatModel::new())).await;
    let service = create_service(&app, OWNER_TOKEN, "Scoped Bot").await;

    let descriptor = app
        .state
        .services
        .get(tmai_core::ServiceId::from_str(&service.to_string()).expect("id"))
        .await
        .expect("get")
        .expect("present");
    assert_eq!(descriptor.tenant_id, app.owner_tenant);
}
