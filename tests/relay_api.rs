use actix_web::{test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;

use studybuddy::api;
use studybuddy::api::middleware::ApiKeyAuth;
use studybuddy::config::{
    AppConfig, AuthConfig, ChatConfig, DatabaseConfig, LlmConfig, ServerConfig,
};
use studybuddy::db::{get_connection, service::DbService};
use studybuddy::email::{LogMailer, Mailer};
use studybuddy::llm::GatewayClient;

const API_KEY: &str = "test-key";

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            public_url: None,
        },
        database: DatabaseConfig {
            path: ":memory:".to_string(),
        },
        auth: AuthConfig {
            api_keys: vec![API_KEY.to_string()],
            token_expiry_hours: 1,
        },
        llm: LlmConfig {
            // Never reached: these tests only exercise rejection paths.
            api_base: "http://127.0.0.1:9".to_string(),
            api_key: "unused".to_string(),
            model: "test-model".to_string(),
        },
        chat: ChatConfig::default(),
        email: None,
    }
}

macro_rules! test_app {
    () => {{
        let config = test_config();
        let pool = get_connection(&config.database).unwrap();
        let gateway = GatewayClient::new(&config.llm);
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
        test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(gateway))
                .app_data(web::Data::new(mailer))
                .wrap(ApiKeyAuth)
                .configure(api::routes::configure)
                .configure(api::account::configure)
                .service(api::relay::study_chat),
        )
        .await
    }};
    // Variant that also hands the caller a handle on the pool.
    (with_pool) => {{
        let config = test_config();
        let pool = get_connection(&config.database).unwrap();
        let handle = pool.clone();
        let gateway = GatewayClient::new(&config.llm);
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(gateway))
                .app_data(web::Data::new(mailer))
                .wrap(ApiKeyAuth)
                .configure(api::routes::configure)
                .configure(api::account::configure)
                .service(api::relay::study_chat),
        )
        .await;
        (app, handle)
    }};
}

fn chat_body(messages: Value) -> Value {
    json!({ "messages": messages })
}

#[actix_web::test]
async fn missing_bearer_token_is_unauthorized() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/v1/study-chat")
        .set_json(chat_body(json!([{ "role": "user", "content": "hi" }])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid or missing API key");
}

#[actix_web::test]
async fn unknown_bearer_token_is_unauthorized() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/v1/study-chat")
        .insert_header(("Authorization", "Bearer wrong-key"))
        .set_json(chat_body(json!([{ "role": "user", "content": "hi" }])))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn invalid_json_body_is_bad_request() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/v1/study-chat")
        .insert_header(("Authorization", format!("Bearer {}", API_KEY)))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid JSON in request body");
}

#[actix_web::test]
async fn non_object_body_is_bad_request() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/v1/study-chat")
        .insert_header(("Authorization", format!("Bearer {}", API_KEY)))
        .set_json(json!(["not", "an", "object"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Request body must be an object");
}

#[actix_web::test]
async fn validation_errors_carry_the_specific_reason() {
    let app = test_app!();

    let cases = [
        (json!("nope"), "Messages must be an array"),
        (json!([]), "At least one message is required"),
        (
            json!([{ "role": "system", "content": "x" }]),
            "Message 1 has invalid role. Must be 'user' or 'assistant'",
        ),
        (
            json!([{ "role": "user", "content": "   " }]),
            "Message 1 content cannot be empty",
        ),
    ];

    for (messages, expected) in cases {
        let req = test::TestRequest::post()
            .uri("/v1/study-chat")
            .insert_header(("Authorization", format!("Bearer {}", API_KEY)))
            .set_json(chat_body(messages))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], expected);
    }
}

#[actix_web::test]
async fn missing_messages_field_reads_as_invalid_shape() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/v1/study-chat")
        .insert_header(("Authorization", format!("Bearer {}", API_KEY)))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Messages must be an array");
}

#[actix_web::test]
async fn session_message_endpoint_rejects_invalid_roles() {
    let app = test_app!();

    let create = test::TestRequest::post()
        .uri("/sessions")
        .insert_header(("Authorization", format!("Bearer {}", API_KEY)))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, create).await;
    assert_eq!(resp.status(), 201);
    let session: Value = test::read_body_json(resp).await;
    let id = session["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/sessions/{}/messages", id))
        .insert_header(("Authorization", format!("Bearer {}", API_KEY)))
        .set_json(json!({ "role": "system", "content": "sneaky" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"],
        "Message 1 has invalid role. Must be 'user' or 'assistant'"
    );
}

#[actix_web::test]
async fn deletion_request_requires_auth_and_a_plausible_email() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/account/deletion-request")
        .set_json(json!({ "email": "student@example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::post()
        .uri("/account/deletion-request")
        .insert_header(("Authorization", format!("Bearer {}", API_KEY)))
        .set_json(json!({ "email": "not-an-email" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::post()
        .uri("/account/deletion-request")
        .insert_header(("Authorization", format!("Bearer {}", API_KEY)))
        .set_json(json!({ "email": "student@example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
}

#[actix_web::test]
async fn emailed_confirmation_link_deletes_without_auth() {
    let (app, pool) = test_app!(with_pool);

    // Seed data and a pending request the way the POST flow would.
    let token = {
        let conn = pool.lock().unwrap();
        let session = DbService::insert_session(&conn, "New Chat").unwrap();
        DbService::insert_message(&conn, session.id, "user", "forget me").unwrap();
        DbService::insert_deletion_request(&conn, "student@example.com", 1)
            .unwrap()
            .token
    };

    // The recipient clicks the link: a bare GET, no Authorization header.
    let req = test::TestRequest::get()
        .uri(&format!("/account/confirm-deletion?token={}", token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let conn = pool.lock().unwrap();
    assert!(DbService::list_sessions(&conn, 10, 0).unwrap().is_empty());
    assert!(DbService::find_pending_request(&conn, token).unwrap().is_none());
}

#[actix_web::test]
async fn confirmation_link_with_unknown_token_is_not_found() {
    let app = test_app!();

    let req = test::TestRequest::get()
        .uri(&format!(
            "/account/confirm-deletion?token={}",
            uuid::Uuid::new_v4()
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn database_failure_reads_as_500_not_404() {
    let (app, pool) = test_app!(with_pool);

    {
        let conn = pool.lock().unwrap();
        conn.execute("DROP TABLE sessions", []).unwrap();
    }

    let req = test::TestRequest::delete()
        .uri(&format!("/sessions/{}", uuid::Uuid::new_v4()))
        .insert_header(("Authorization", format!("Bearer {}", API_KEY)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
}

#[actix_web::test]
async fn confirm_deletion_skips_auth_but_rejects_unknown_tokens() {
    let app = test_app!();

    // No Authorization header at all: the emailed token is the credential.
    let req = test::TestRequest::post()
        .uri("/account/confirm-deletion")
        .set_json(json!({ "token": uuid::Uuid::new_v4() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid or expired confirmation link");
}

#[actix_web::test]
async fn health_endpoint_is_public() {
    // /health is registered in main, outside this app; verify the middleware
    // exemption by routing a bare handler through it.
    let config = test_config();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(config))
            .route(
                "/health",
                web::get().to(|| async {
                    actix_web::HttpResponse::Ok().json(json!({"status": "healthy"}))
                }),
            )
            .wrap(ApiKeyAuth),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}
